//! Raw structures that can be deserialized from binary data.
//!
//! The structures in here don't try to verify their values and store
//! everything as raw values (flag words as `u32`, magic as `u32`). That's left
//! to do for the user-facing wrappers in `header` and `security`.
//!
//! This module also serves to document the memory layout of the XEX headers:
//! All struct fields are parsed in-order using `bincode` (there is no padding
//! anywhere).
//!
//! Everything is Big Endian. Every read and write goes through [`codec`].
//!
//! [`codec`]: fn.codec.html

use crate::blob::{Digest, Key, Signature};
use crate::Error;

use bincode::Options;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// The bincode configuration matching the on-disk encoding: fixed-width
/// integers in big-endian byte order, no length prefixes.
pub fn codec() -> impl Options {
    bincode::options()
        .with_big_endian()
        .with_fixint_encoding()
        .allow_trailing_bytes()
}

/// Decodes a `T` from the front of `data`, advancing the slice.
///
/// The caller must have checked that `data` is long enough. A failure here
/// is reported as a decoder bug.
pub fn decode<T: DeserializeOwned>(what: &str, data: &mut &[u8]) -> Result<T, Error> {
    codec().deserialize_from(data).map_err(|e| Error::codec(what, e))
}

/// Encodes `value` with the on-disk layout.
pub fn encode<T: Serialize>(what: &str, value: &T) -> Result<Vec<u8>, Error> {
    codec().serialize(value).map_err(|e| Error::codec(what, e))
}

/// Primary header used by XEX2, XEX1, XEX25 and XEX2D (`0x18` Bytes).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Header {
    pub magic: u32,
    pub module_flags: u32,
    /// Size of all headers, starting at offset 0.
    pub size_of_headers: u32,
    pub size_of_discardable_headers: u32,
    /// File offset of the security info block.
    pub security_info: u32,
    pub header_directory_entry_count: u32,
}

/// Primary header used by the `XEX?` ("3F") revision (`0x1C` Bytes).
///
/// There's no security info offset in this header.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Header3F {
    pub magic: u32,
    pub module_flags: u32,
    pub size_of_headers: u32,
    pub size_of_discardable_headers: u32,
    pub load_address: u32,
    /// Grows with the file size, might not be exactly the image size.
    pub image_size: u32,
    pub header_directory_entry_count: u32,
}

/// Header directory entry (`8` Bytes).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DirectoryEntry {
    pub key: u32,
    pub value: u32,
}

/// XEX2 image info (`0x174` Bytes).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Xex2HvImageInfo {
    pub signature: Signature,
    pub info_size: u32,
    pub image_flags: u32,
    pub load_address: u32,
    pub image_hash: Digest,
    pub import_table_count: u32,
    pub import_digest: Digest,
    pub media_id: Key,
    pub image_key: Key,
    pub export_table_address: u32,
    pub header_hash: Digest,
    pub game_region: u32,
}

/// XEX2 security info (`0x184` Bytes).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Xex2SecurityInfo {
    pub size: u32,
    pub image_size: u32,
    pub image_info: Xex2HvImageInfo,
    pub allowed_media_types: u32,
    pub page_descriptor_count: u32,
}

/// XEX1 image info (`0x158` Bytes).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Xex1HvImageInfo {
    pub signature: Signature,
    pub image_hash: Digest,
    pub import_digest: Digest,
    pub load_address: u32,
    pub image_key: Key,
    pub media_id: Key,
    pub game_region: u32,
    pub image_flags: u32,
    pub export_table_address: u32,
}

/// XEX1 security info (`0x168` Bytes).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Xex1SecurityInfo {
    pub size: u32,
    pub image_size: u32,
    pub image_info: Xex1HvImageInfo,
    pub allowed_media_types: u32,
    pub page_descriptor_count: u32,
}

/// XEX25 image info (`0x144` Bytes).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Xex25HvImageInfo {
    pub signature: Signature,
    pub image_hash: Digest,
    pub import_digest: Digest,
    pub load_address: u32,
    pub image_key: Key,
    pub image_flags: u32,
    pub export_table_address: u32,
}

/// XEX25 security info (`0x154` Bytes).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Xex25SecurityInfo {
    pub size: u32,
    pub image_size: u32,
    pub image_info: Xex25HvImageInfo,
    pub allowed_media_types: u32,
    pub page_descriptor_count: u32,
}

/// XEX2D image info (`0x138` Bytes).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Xex2DHvImageInfo {
    pub signature: Signature,
    pub image_hash: Digest,
    pub import_digest: Digest,
    pub load_address: u32,
    pub image_flags: u32,
    pub export_table_address: u32,
    /// Meaning unknown.
    pub unknown: u32,
}

/// XEX2D security info (`0x144` Bytes). Has no `image_size`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Xex2DSecurityInfo {
    pub size: u32,
    pub image_info: Xex2DHvImageInfo,
    pub allowed_media_types: u32,
    pub page_descriptor_count: u32,
}

//! Parser for the headers of the `XEX` file format used by Xbox 360
//! executables.
//!
//! An XEX image starts with a fixed primary header, followed by a directory of
//! key/value entries locating the optional headers, and (for all but the
//! oldest revision) a security info block describing image integrity,
//! encryption and allowed media. Five on-disk revisions exist, identified by
//! their magic: `XEX2`, `XEX1`, `XEX%`, `XEX-` and `XEX?`.
//!
//! The most important type is [`Xex`], which decodes all of these headers from
//! a byte slice. The decoded structures own their data and don't borrow from
//! the input.
//!
//! Decrypting or decompressing the image body, and interpreting the data the
//! directory entries point to, is out of scope.
//!
//! [`Xex`]: struct.Xex.html

#![doc(html_root_url = "https://docs.rs/xex/0.1.0")]
#![warn(missing_debug_implementations)]
#![forbid(unsafe_code)]
// Deny unchecked slice indexing. This can almost always result in a panic
// with a malformed XEX.
#![deny(clippy::indexing_slicing)]
#![cfg_attr(test, allow(clippy::indexing_slicing))]
#![allow(clippy::unreadable_literal)]

#[macro_use] extern crate bitflags;
#[macro_use] extern crate log;
#[macro_use] extern crate serde_derive;
extern crate bincode;
extern crate byteorder;
extern crate num_enum;
extern crate serde;

mod blob;
pub mod directory;
mod error;
pub mod flags;
pub mod header;
mod raw;
pub mod security;
mod utils;

pub use crate::blob::{Blob, Digest, Key, Signature};
pub use crate::directory::DirectoryEntry;
pub use crate::error::Error;
pub use crate::header::{Magic, PrimaryHeader};
pub use crate::security::{HvImageInfo, SecurityInfo, SecurityLayout};

/// The decoded headers of an Xbox 360 executable (XEX).
///
/// Using the `parse` method, you can decode an `Xex` from raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Xex {
    header: PrimaryHeader,
    directory: Vec<DirectoryEntry>,
    security_info: Option<SecurityInfo>,
}

impl Xex {
    /// Tries to decode the headers of an XEX image from raw data.
    ///
    /// `data` must start at the beginning of the image. Only the headers are
    /// looked at, so the slice may be cut off after `SizeOfHeaders` Bytes.
    pub fn parse(data: &[u8]) -> Result<Self, Error> {
        let header = PrimaryHeader::parse(data)?;

        let directory = directory::parse_table(
            data,
            header.fixed_size(),
            header.directory_entry_count(),
            header.size_of_headers(),
        )?;

        let security_info = match header.security_info_offset() {
            Some(offset) => Some(SecurityInfo::parse_at(data, header.magic(), offset)?),
            None => {
                debug!("{:?} header has no security info", header.magic());
                None
            }
        };

        Ok(Self {
            header,
            directory,
            security_info,
        })
    }

    /// Returns the image's magic, which identifies the format revision.
    pub fn magic(&self) -> Magic {
        self.header.magic()
    }

    /// Returns the primary header.
    pub fn header(&self) -> &PrimaryHeader {
        &self.header
    }

    /// Returns the header directory, in file order.
    pub fn directory_entries(&self) -> &[DirectoryEntry] {
        &self.directory
    }

    /// Returns all directory entries with the given key, in file order.
    ///
    /// Keys may occur more than once. Which occurrence takes precedence is up
    /// to the consumer of that entry.
    pub fn entries_with_key(&self, key: u32) -> impl Iterator<Item = &DirectoryEntry> {
        self.directory.iter().filter(move |entry| entry.key == key)
    }

    /// Returns the security info.
    ///
    /// `XEX?` images don't have one, so this returns `None` for them.
    pub fn security_info(&self) -> Option<&SecurityInfo> {
        self.security_info.as_ref()
    }
}

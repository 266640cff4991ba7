//! The header directory: key/value entries that locate the optional headers.

use crate::header::DIRECTORY_ENTRY_SIZE;
use crate::raw;
use crate::utils::{span, SliceExt};
use crate::Error;

use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::convert::TryFrom;

/// An entry in the header directory.
///
/// Entries are kept exactly as stored; unknown keys are not an error.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct DirectoryEntry {
    pub key: u32,
    pub value: u32,
}

impl DirectoryEntry {
    /// Looks the key up among the documented optional header keys.
    pub fn known_key(&self) -> Option<DirectoryKey> {
        DirectoryKey::try_from(self.key).ok()
    }

    /// Determines where the entry's data lives, based on the low byte of the
    /// key.
    ///
    /// This doesn't read or check the data.
    pub fn data(&self) -> EntryData {
        match self.key & 0xFF {
            0x00 | 0x01 => EntryData::Inline(self.value),
            0xFF => EntryData::Prefixed { offset: self.value },
            dwords => EntryData::Sized {
                offset: self.value,
                len: dwords * 4,
            },
        }
    }

    /// Encodes the entry into its 8-Byte on-disk form.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        raw::encode("directory entry", &self.to_raw())
    }

    fn from_raw(raw: &raw::DirectoryEntry) -> Self {
        Self {
            key: raw.key,
            value: raw.value,
        }
    }

    fn to_raw(&self) -> raw::DirectoryEntry {
        raw::DirectoryEntry {
            key: self.key,
            value: self.value,
        }
    }
}

/// Location of the data an entry refers to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EntryData {
    /// The entry's value is the data.
    Inline(u32),
    /// The data is `len` Bytes at file offset `offset`.
    Sized { offset: u32, len: u32 },
    /// The data is at file offset `offset`, and starts with its own size.
    Prefixed { offset: u32 },
}

/// Documented optional header keys.
#[repr(u32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
pub enum DirectoryKey {
    ResourceInfo = 0x0000_02FF,
    BaseFileFormat = 0x0000_03FF,
    BaseReference = 0x0000_0405,
    DeltaPatchDescriptor = 0x0000_05FF,
    BoundingPath = 0x0000_80FF,
    DeviceId = 0x0000_8105,
    OriginalBaseAddress = 0x0001_0001,
    EntryPoint = 0x0001_0100,
    ImageBaseAddress = 0x0001_0201,
    ImportLibraries = 0x0001_03FF,
    ChecksumTimestamp = 0x0001_8002,
    EnabledForCallcap = 0x0001_8102,
    EnabledForFastcap = 0x0001_8200,
    OriginalPeName = 0x0001_83FF,
    StaticLibraries = 0x0002_00FF,
    TlsInfo = 0x0002_0104,
    DefaultStackSize = 0x0002_0200,
    DefaultFilesystemCacheSize = 0x0002_0301,
    DefaultHeapSize = 0x0002_0401,
    PageHeapSizeAndFlags = 0x0002_8002,
    SystemFlags = 0x0003_0000,
    ExecutionId = 0x0004_0006,
    ServiceIdList = 0x0004_01FF,
    TitleWorkspaceSize = 0x0004_0201,
    GameRatings = 0x0004_0310,
    LanKey = 0x0004_0404,
    Xbox360Logo = 0x0004_05FF,
    MultidiscMediaIds = 0x0004_06FF,
    AlternateTitleIds = 0x0004_07FF,
    AdditionalTitleMemory = 0x0004_0801,
    ExportsByName = 0x00E1_0402,
}

/// Decodes `count` directory entries starting at file offset `start`.
///
/// The table must end within both `data` and the first `size_of_headers`
/// Bytes. Entry order is preserved and duplicate keys are kept.
pub fn parse_table(
    data: &[u8],
    start: u32,
    count: u32,
    size_of_headers: u32,
) -> Result<Vec<DirectoryEntry>, Error> {
    let range = span(start, u64::from(count) * u64::from(DIRECTORY_ENTRY_SIZE));
    let limit = u64::from(size_of_headers).min(data.len() as u64);
    if range.end > limit {
        return Err(Error::TruncatedDirectory {
            required: range.end,
            available: limit,
        });
    }
    let mut table = data.try_get(range).map_err(|oob| Error::TruncatedDirectory {
        required: oob.end,
        available: oob.len as u64,
    })?;

    debug!("{} directory entries at {:#X}", count, start);

    let mut entries = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let raw: raw::DirectoryEntry = raw::decode("directory entry", &mut table)?;
        entries.push(DirectoryEntry::from_raw(&raw));
    }
    Ok(entries)
}

/// Encodes a directory table into its on-disk form.
pub fn encode_table(entries: &[DirectoryEntry]) -> Result<Vec<u8>, Error> {
    let mut out = Vec::with_capacity(entries.len() * DIRECTORY_ENTRY_SIZE as usize);
    for entry in entries {
        out.extend_from_slice(&entry.to_bytes()?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_table() {
        assert_eq!(parse_table(&[], 0, 0, 0).unwrap(), Vec::new());
        assert_eq!(parse_table(&[0; 0x18], 0x18, 0, 0x18).unwrap(), Vec::new());
    }

    #[test]
    fn order_and_duplicates_preserved() {
        let data = [
            0x00, 0x01, 0x01, 0x00, 0x82, 0x00, 0x10, 0x00, //
            0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0x00, 0x00, 0x01, //
            0x00, 0x01, 0x01, 0x00, 0x82, 0x00, 0x20, 0x00, //
        ];
        let entries = parse_table(&data, 0, 3, 0x18).unwrap();
        assert_eq!(
            entries,
            [
                DirectoryEntry { key: 0x00010100, value: 0x82001000 },
                DirectoryEntry { key: 0xDEADBEEF, value: 1 },
                DirectoryEntry { key: 0x00010100, value: 0x82002000 },
            ]
        );
        assert_eq!(entries[0].known_key(), Some(DirectoryKey::EntryPoint));
        assert_eq!(entries[1].known_key(), None);
        assert_eq!(encode_table(&entries).unwrap(), data);
    }

    #[test]
    fn truncated_by_buffer() {
        let data = [0u8; 0x1F];
        match parse_table(&data, 0x18, 1, 0x100) {
            Err(Error::TruncatedDirectory { required: 0x20, available: 0x1F }) => {}
            other => panic!("unexpected result {:?}", other),
        }
        assert_eq!(parse_table(&[0u8; 0x20], 0x18, 1, 0x100).unwrap().len(), 1);
    }

    #[test]
    fn truncated_by_size_of_headers() {
        let data = [0u8; 0x100];
        match parse_table(&data, 0x18, 2, 0x20) {
            Err(Error::TruncatedDirectory { required: 0x28, available: 0x20 }) => {}
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn huge_count_does_not_allocate() {
        match parse_table(&[0u8; 0x20], 0x18, u32::MAX, u32::MAX) {
            Err(Error::TruncatedDirectory { .. }) => {}
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn entry_data_location() {
        let inline = DirectoryEntry { key: 0x00010100, value: 0x82001000 };
        assert_eq!(inline.data(), EntryData::Inline(0x82001000));
        let inline = DirectoryEntry { key: 0x00010201, value: 0x82000000 };
        assert_eq!(inline.data(), EntryData::Inline(0x82000000));

        let sized = DirectoryEntry { key: 0x00020104, value: 0x200 };
        assert_eq!(sized.data(), EntryData::Sized { offset: 0x200, len: 0x10 });

        let prefixed = DirectoryEntry { key: 0x000183FF, value: 0x300 };
        assert_eq!(prefixed.data(), EntryData::Prefixed { offset: 0x300 });
        assert_eq!(prefixed.known_key(), Some(DirectoryKey::OriginalPeName));
        assert_eq!(u32::from(DirectoryKey::OriginalPeName), 0x000183FF);
    }
}

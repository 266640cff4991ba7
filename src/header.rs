//! The primary header at the start of every XEX image.

use crate::flags::{retain_logged, ModuleFlags};
use crate::raw;
use crate::utils::SliceExt;
use crate::Error;

use byteorder::{ByteOrder, BE};
use std::fmt;

/// Size of the fixed primary header for all magics except `XEX?`.
pub const STANDARD_HEADER_SIZE: u32 = 0x18;

/// Size of the fixed primary header of `XEX?` images.
pub const XEX3F_HEADER_SIZE: u32 = 0x1C;

/// Size of a single header directory entry.
pub const DIRECTORY_ENTRY_SIZE: u32 = 8;

/// Magic number identifying the on-disk revision of an image.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub enum Magic {
    /// `"XEX2"`, the retail format.
    Xex2,
    /// `"XEX1"`
    Xex1,
    /// `"XEX%"`
    Xex25,
    /// `"XEX-"`
    Xex2D,
    /// `"XEX?"`, the oldest format, with a different primary header.
    Xex3F,
}

impl Magic {
    const XEX2: u32 = 0x58455832;
    const XEX1: u32 = 0x58455831;
    const XEX25: u32 = 0x58455825;
    const XEX2D: u32 = 0x5845582D;
    const XEX3F: u32 = 0x5845583F;

    /// Identifies a magic number, returning `None` if it isn't a known one.
    pub fn from_raw(raw: u32) -> Option<Self> {
        Some(match raw {
            Self::XEX2 => Magic::Xex2,
            Self::XEX1 => Magic::Xex1,
            Self::XEX25 => Magic::Xex25,
            Self::XEX2D => Magic::Xex2D,
            Self::XEX3F => Magic::Xex3F,
            _ => return None,
        })
    }

    /// Returns the magic as stored in the file (read as big-endian `u32`).
    pub fn raw(self) -> u32 {
        match self {
            Magic::Xex2 => Self::XEX2,
            Magic::Xex1 => Self::XEX1,
            Magic::Xex25 => Self::XEX25,
            Magic::Xex2D => Self::XEX2D,
            Magic::Xex3F => Self::XEX3F,
        }
    }

    /// Size of the fixed primary header used with this magic.
    pub fn header_size(self) -> u32 {
        match self {
            Magic::Xex3F => XEX3F_HEADER_SIZE,
            _ => STANDARD_HEADER_SIZE,
        }
    }
}

impl fmt::Debug for Magic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let bytes = self.raw().to_be_bytes();
        write!(f, "{:?}", String::from_utf8_lossy(&bytes))
    }
}

/// The primary header, in one of its two shapes.
///
/// Which shape is used is determined by the magic alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimaryHeader {
    Standard(StandardHeader),
    Xex3F(Xex3FHeader),
}

/// Primary header of `XEX2`, `XEX1`, `XEX%` and `XEX-` images.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandardHeader {
    /// Any magic except `Magic::Xex3F`.
    pub magic: Magic,
    pub module_flags: ModuleFlags,
    /// Size of all headers, counted from the start of the image.
    pub size_of_headers: u32,
    pub size_of_discardable_headers: u32,
    /// File offset of the security info.
    pub security_info: u32,
    pub directory_entry_count: u32,
}

/// Primary header of `XEX?` images.
///
/// This header has no security info pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Xex3FHeader {
    pub module_flags: ModuleFlags,
    pub size_of_headers: u32,
    pub size_of_discardable_headers: u32,
    pub load_address: u32,
    pub image_size: u32,
    pub directory_entry_count: u32,
}

impl PrimaryHeader {
    /// Decodes the primary header at the start of `data`.
    ///
    /// Checks that `SizeOfHeaders` covers the fixed header and the directory
    /// table following it, but doesn't look at the directory or the security
    /// info.
    pub fn parse(data: &[u8]) -> Result<Self, Error> {
        let truncated = |oob: crate::utils::OutOfBounds| Error::TruncatedHeader {
            required: oob.end,
            available: oob.len,
        };

        let raw_magic = BE::read_u32(data.try_get(..4u64).map_err(truncated)?);
        let magic = Magic::from_raw(raw_magic).ok_or(Error::UnrecognizedFormat(raw_magic))?;
        let mut bytes = data
            .try_get(..u64::from(magic.header_size()))
            .map_err(truncated)?;

        debug!("magic {:?}, {:#X} Byte primary header", magic, magic.header_size());

        let header = match magic {
            Magic::Xex3F => {
                let raw: raw::Header3F = raw::decode("primary header", &mut bytes)?;
                PrimaryHeader::Xex3F(Xex3FHeader::from_raw(&raw))
            }
            _ => {
                let raw: raw::Header = raw::decode("primary header", &mut bytes)?;
                PrimaryHeader::Standard(StandardHeader::from_raw(magic, &raw))
            }
        };

        header.check_sizes()?;
        Ok(header)
    }

    fn check_sizes(&self) -> Result<(), Error> {
        let required = u64::from(self.fixed_size())
            + u64::from(self.directory_entry_count()) * u64::from(DIRECTORY_ENTRY_SIZE);
        if u64::from(self.size_of_headers()) < required {
            return Err(Error::InconsistentHeaderSize {
                size_of_headers: self.size_of_headers(),
                required,
            });
        }
        Ok(())
    }

    /// Encodes the header back into its on-disk form.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        match self {
            PrimaryHeader::Standard(h) => raw::encode("primary header", &h.to_raw()),
            PrimaryHeader::Xex3F(h) => raw::encode("primary header", &h.to_raw()),
        }
    }

    pub fn magic(&self) -> Magic {
        match self {
            PrimaryHeader::Standard(h) => h.magic,
            PrimaryHeader::Xex3F(_) => Magic::Xex3F,
        }
    }

    /// Size of the fixed part of this header (`0x18` or `0x1C`).
    ///
    /// The directory table starts right after it.
    pub fn fixed_size(&self) -> u32 {
        self.magic().header_size()
    }

    pub fn module_flags(&self) -> ModuleFlags {
        match self {
            PrimaryHeader::Standard(h) => h.module_flags,
            PrimaryHeader::Xex3F(h) => h.module_flags,
        }
    }

    /// Size of all headers, counted from the start of the image.
    pub fn size_of_headers(&self) -> u32 {
        match self {
            PrimaryHeader::Standard(h) => h.size_of_headers,
            PrimaryHeader::Xex3F(h) => h.size_of_headers,
        }
    }

    pub fn size_of_discardable_headers(&self) -> u32 {
        match self {
            PrimaryHeader::Standard(h) => h.size_of_discardable_headers,
            PrimaryHeader::Xex3F(h) => h.size_of_discardable_headers,
        }
    }

    /// File offset of the security info, if this header shape records one.
    pub fn security_info_offset(&self) -> Option<u32> {
        match self {
            PrimaryHeader::Standard(h) => Some(h.security_info),
            PrimaryHeader::Xex3F(_) => None,
        }
    }

    /// Load address stored in `XEX?` headers.
    pub fn load_address(&self) -> Option<u32> {
        match self {
            PrimaryHeader::Standard(_) => None,
            PrimaryHeader::Xex3F(h) => Some(h.load_address),
        }
    }

    /// Image size stored in `XEX?` headers.
    pub fn image_size(&self) -> Option<u32> {
        match self {
            PrimaryHeader::Standard(_) => None,
            PrimaryHeader::Xex3F(h) => Some(h.image_size),
        }
    }

    pub fn directory_entry_count(&self) -> u32 {
        match self {
            PrimaryHeader::Standard(h) => h.directory_entry_count,
            PrimaryHeader::Xex3F(h) => h.directory_entry_count,
        }
    }
}

impl StandardHeader {
    fn from_raw(magic: Magic, raw: &raw::Header) -> Self {
        Self {
            magic,
            module_flags: retain_logged("module", raw.module_flags),
            size_of_headers: raw.size_of_headers,
            size_of_discardable_headers: raw.size_of_discardable_headers,
            security_info: raw.security_info,
            directory_entry_count: raw.header_directory_entry_count,
        }
    }

    fn to_raw(&self) -> raw::Header {
        raw::Header {
            magic: self.magic.raw(),
            module_flags: self.module_flags.bits(),
            size_of_headers: self.size_of_headers,
            size_of_discardable_headers: self.size_of_discardable_headers,
            security_info: self.security_info,
            header_directory_entry_count: self.directory_entry_count,
        }
    }
}

impl Xex3FHeader {
    fn from_raw(raw: &raw::Header3F) -> Self {
        Self {
            module_flags: retain_logged("module", raw.module_flags),
            size_of_headers: raw.size_of_headers,
            size_of_discardable_headers: raw.size_of_discardable_headers,
            load_address: raw.load_address,
            image_size: raw.image_size,
            directory_entry_count: raw.header_directory_entry_count,
        }
    }

    fn to_raw(&self) -> raw::Header3F {
        raw::Header3F {
            magic: Magic::Xex3F.raw(),
            module_flags: self.module_flags.bits(),
            size_of_headers: self.size_of_headers,
            size_of_discardable_headers: self.size_of_discardable_headers,
            load_address: self.load_address,
            image_size: self.image_size,
            header_directory_entry_count: self.directory_entry_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_table() {
        for magic in &[Magic::Xex2, Magic::Xex1, Magic::Xex25, Magic::Xex2D, Magic::Xex3F] {
            assert_eq!(Magic::from_raw(magic.raw()), Some(*magic));
        }
        assert_eq!(Magic::Xex2.raw().to_be_bytes(), *b"XEX2");
        assert_eq!(Magic::Xex1.raw().to_be_bytes(), *b"XEX1");
        assert_eq!(Magic::Xex25.raw().to_be_bytes(), *b"XEX%");
        assert_eq!(Magic::Xex2D.raw().to_be_bytes(), *b"XEX-");
        assert_eq!(Magic::Xex3F.raw().to_be_bytes(), *b"XEX?");
        assert_eq!(Magic::from_raw(u32::from_be_bytes(*b"XBEH")), None);
        assert_eq!(format!("{:?}", Magic::Xex25), "\"XEX%\"");
    }

    #[test]
    fn parse_standard() {
        let data = [
            b'X', b'E', b'X', b'2', //
            0x80, 0x00, 0x00, 0x81, // module flags
            0x00, 0x00, 0x00, 0x28, // SizeOfHeaders
            0x00, 0x00, 0x00, 0x10, // SizeOfDiscardableHeaders
            0x00, 0x00, 0x00, 0x20, // SecurityInfo
            0x00, 0x00, 0x00, 0x02, // HeaderDirectoryEntryCount
        ];
        let header = PrimaryHeader::parse(&data).unwrap();
        assert_eq!(header.magic(), Magic::Xex2);
        assert_eq!(header.module_flags().bits(), 0x80000081);
        assert_eq!(header.size_of_headers(), 0x28);
        assert_eq!(header.size_of_discardable_headers(), 0x10);
        assert_eq!(header.security_info_offset(), Some(0x20));
        assert_eq!(header.directory_entry_count(), 2);
        assert_eq!(header.load_address(), None);
        assert_eq!(header.to_bytes().unwrap(), data);
    }

    #[test]
    fn parse_3f() {
        let data = [
            b'X', b'E', b'X', b'?', //
            0x00, 0x00, 0x00, 0x01, // module flags
            0x00, 0x00, 0x00, 0x1C, // SizeOfHeaders
            0x00, 0x00, 0x00, 0x00, // SizeOfDiscardableHeaders
            0x82, 0x00, 0x00, 0x00, // LoadAddress
            0x00, 0x01, 0x00, 0x00, // ImageSize
            0x00, 0x00, 0x00, 0x00, // HeaderDirectoryEntryCount
        ];
        let header = PrimaryHeader::parse(&data).unwrap();
        assert_eq!(header.magic(), Magic::Xex3F);
        assert_eq!(header.fixed_size(), 0x1C);
        assert_eq!(header.security_info_offset(), None);
        assert_eq!(header.load_address(), Some(0x82000000));
        assert_eq!(header.image_size(), Some(0x10000));
        assert_eq!(header.to_bytes().unwrap(), data);
    }

    #[test]
    fn too_short() {
        match PrimaryHeader::parse(b"XE") {
            Err(Error::TruncatedHeader { required: 4, available: 2 }) => {}
            other => panic!("unexpected result {:?}", other),
        }
        match PrimaryHeader::parse(b"XEX?\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0") {
            Err(Error::TruncatedHeader { required: 0x1C, available: 0x18 }) => {}
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn unknown_magic() {
        match PrimaryHeader::parse(b"XEX3\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0") {
            Err(Error::UnrecognizedFormat(0x58455833)) => {}
            other => panic!("unexpected result {:?}", other),
        }
    }
}

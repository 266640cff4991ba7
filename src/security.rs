//! Contains the security info data structures.
//!
//! The security info describes the integrity of the image (signature, hashes),
//! the key used to encrypt it, its load address and where it may run. Four
//! structurally different layouts exist. None of them carries a type tag, so
//! the layout is picked from the image's magic and the block's declared size.

use crate::blob::{Digest, Key, Signature};
use crate::flags::{retain_logged, AllowedMediaTypes, GameRegion, ImageFlags};
use crate::header::Magic;
use crate::raw;
use crate::utils::{span, SliceExt};
use crate::Error;

use byteorder::{ByteOrder, BE};

/// The four security info layouts.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SecurityLayout {
    Xex2,
    Xex1,
    Xex25,
    Xex2D,
}

impl SecurityLayout {
    /// Size of this layout in Bytes. The block's `Size` field must hold
    /// exactly this value.
    pub fn size(self) -> u32 {
        match self {
            SecurityLayout::Xex2 => 0x184,
            SecurityLayout::Xex1 => 0x168,
            SecurityLayout::Xex25 => 0x154,
            SecurityLayout::Xex2D => 0x144,
        }
    }

    /// The layouts that can occur in images with the given magic, most likely
    /// first.
    ///
    /// `XEX?` images have no security info.
    pub fn candidates(magic: Magic) -> &'static [SecurityLayout] {
        match magic {
            Magic::Xex2 => &[SecurityLayout::Xex2],
            Magic::Xex1 => &[SecurityLayout::Xex1],
            Magic::Xex25 => &[SecurityLayout::Xex25, SecurityLayout::Xex2D],
            Magic::Xex2D => &[SecurityLayout::Xex2D, SecurityLayout::Xex25],
            Magic::Xex3F => &[],
        }
    }

    /// Picks the layout among the candidates for `magic` whose size is exactly
    /// `declared_size`.
    pub fn resolve(magic: Magic, declared_size: u32) -> Result<Self, Error> {
        Self::candidates(magic)
            .iter()
            .copied()
            .find(|layout| layout.size() == declared_size)
            .ok_or(Error::UnknownSecurityInfoLayout {
                magic: magic.raw(),
                size: declared_size,
            })
    }
}

/// A decoded security info block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecurityInfo {
    Xex2(Xex2SecurityInfo),
    Xex1(Xex1SecurityInfo),
    Xex25(Xex25SecurityInfo),
    Xex2D(Xex2DSecurityInfo),
}

impl SecurityInfo {
    /// Decodes the security info at file offset `offset`, determining the
    /// layout from `magic` and the block's `Size` field.
    pub fn parse_at(data: &[u8], magic: Magic, offset: u32) -> Result<Self, Error> {
        let size_field = data.try_get(span(offset, 4)).map_err(|oob| {
            Error::TruncatedSecurityInfo {
                offset,
                required: oob.end,
                available: oob.len,
            }
        })?;
        let declared_size = BE::read_u32(size_field);
        debug!("security info at {:#X}, declared size {:#X}", offset, declared_size);

        let layout = SecurityLayout::resolve(magic, declared_size)?;
        info!("{:?} image uses {:?} security info", magic, layout);

        Self::parse(data, offset, layout)
    }

    /// Decodes the security info at file offset `offset` using `layout`.
    ///
    /// Fails with `DecoderInvariantViolation` if the decoded `Size` field
    /// doesn't match the layout, i.e. the wrong layout was requested.
    pub fn parse(data: &[u8], offset: u32, layout: SecurityLayout) -> Result<Self, Error> {
        let mut block = data
            .try_get(span(offset, u64::from(layout.size())))
            .map_err(|oob| Error::TruncatedSecurityInfo {
                offset,
                required: oob.end,
                available: oob.len,
            })?;
        let block = &mut block;

        let info = match layout {
            SecurityLayout::Xex2 => {
                SecurityInfo::Xex2(Xex2SecurityInfo::from_raw(&raw::decode("security info", block)?))
            }
            SecurityLayout::Xex1 => {
                SecurityInfo::Xex1(Xex1SecurityInfo::from_raw(&raw::decode("security info", block)?))
            }
            SecurityLayout::Xex25 => {
                SecurityInfo::Xex25(Xex25SecurityInfo::from_raw(&raw::decode("security info", block)?))
            }
            SecurityLayout::Xex2D => {
                SecurityInfo::Xex2D(Xex2DSecurityInfo::from_raw(&raw::decode("security info", block)?))
            }
        };

        if !block.is_empty() {
            return Err(Error::DecoderInvariantViolation(format!(
                "{:?} security info left {} of its {:#X} Bytes undecoded",
                layout,
                block.len(),
                layout.size()
            )));
        }
        if info.size() != layout.size() {
            return Err(Error::DecoderInvariantViolation(format!(
                "{:?} security info at {:#X} has Size {:#X}, expected {:#X}",
                layout,
                offset,
                info.size(),
                layout.size()
            )));
        }

        Ok(info)
    }

    /// Encodes the block back into its on-disk form.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        match self {
            SecurityInfo::Xex2(s) => raw::encode("security info", &s.to_raw()),
            SecurityInfo::Xex1(s) => raw::encode("security info", &s.to_raw()),
            SecurityInfo::Xex25(s) => raw::encode("security info", &s.to_raw()),
            SecurityInfo::Xex2D(s) => raw::encode("security info", &s.to_raw()),
        }
    }

    pub fn layout(&self) -> SecurityLayout {
        match self {
            SecurityInfo::Xex2(_) => SecurityLayout::Xex2,
            SecurityInfo::Xex1(_) => SecurityLayout::Xex1,
            SecurityInfo::Xex25(_) => SecurityLayout::Xex25,
            SecurityInfo::Xex2D(_) => SecurityLayout::Xex2D,
        }
    }

    /// The block's declared size.
    pub fn size(&self) -> u32 {
        match self {
            SecurityInfo::Xex2(s) => s.size,
            SecurityInfo::Xex1(s) => s.size,
            SecurityInfo::Xex25(s) => s.size,
            SecurityInfo::Xex2D(s) => s.size,
        }
    }

    /// Size of the image. Not stored in the XEX2D layout.
    pub fn image_size(&self) -> Option<u32> {
        match self {
            SecurityInfo::Xex2(s) => Some(s.image_size),
            SecurityInfo::Xex1(s) => Some(s.image_size),
            SecurityInfo::Xex25(s) => Some(s.image_size),
            SecurityInfo::Xex2D(_) => None,
        }
    }

    pub fn image_info(&self) -> HvImageInfo<'_> {
        match self {
            SecurityInfo::Xex2(s) => HvImageInfo::Xex2(&s.image_info),
            SecurityInfo::Xex1(s) => HvImageInfo::Xex1(&s.image_info),
            SecurityInfo::Xex25(s) => HvImageInfo::Xex25(&s.image_info),
            SecurityInfo::Xex2D(s) => HvImageInfo::Xex2D(&s.image_info),
        }
    }

    pub fn allowed_media_types(&self) -> AllowedMediaTypes {
        match self {
            SecurityInfo::Xex2(s) => s.allowed_media_types,
            SecurityInfo::Xex1(s) => s.allowed_media_types,
            SecurityInfo::Xex25(s) => s.allowed_media_types,
            SecurityInfo::Xex2D(s) => s.allowed_media_types,
        }
    }

    pub fn page_descriptor_count(&self) -> u32 {
        match self {
            SecurityInfo::Xex2(s) => s.page_descriptor_count,
            SecurityInfo::Xex1(s) => s.page_descriptor_count,
            SecurityInfo::Xex25(s) => s.page_descriptor_count,
            SecurityInfo::Xex2D(s) => s.page_descriptor_count,
        }
    }
}

/// Borrowed view of the image info inside a `SecurityInfo`.
///
/// Fields that a layout doesn't have are returned as `None`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum HvImageInfo<'a> {
    Xex2(&'a Xex2HvImageInfo),
    Xex1(&'a Xex1HvImageInfo),
    Xex25(&'a Xex25HvImageInfo),
    Xex2D(&'a Xex2DHvImageInfo),
}

impl<'a> HvImageInfo<'a> {
    pub fn signature(&self) -> &'a Signature {
        match *self {
            HvImageInfo::Xex2(i) => &i.signature,
            HvImageInfo::Xex1(i) => &i.signature,
            HvImageInfo::Xex25(i) => &i.signature,
            HvImageInfo::Xex2D(i) => &i.signature,
        }
    }

    pub fn image_hash(&self) -> &'a Digest {
        match *self {
            HvImageInfo::Xex2(i) => &i.image_hash,
            HvImageInfo::Xex1(i) => &i.image_hash,
            HvImageInfo::Xex25(i) => &i.image_hash,
            HvImageInfo::Xex2D(i) => &i.image_hash,
        }
    }

    pub fn import_digest(&self) -> &'a Digest {
        match *self {
            HvImageInfo::Xex2(i) => &i.import_digest,
            HvImageInfo::Xex1(i) => &i.import_digest,
            HvImageInfo::Xex25(i) => &i.import_digest,
            HvImageInfo::Xex2D(i) => &i.import_digest,
        }
    }

    /// Virtual address the image is loaded at.
    pub fn load_address(&self) -> u32 {
        match *self {
            HvImageInfo::Xex2(i) => i.load_address,
            HvImageInfo::Xex1(i) => i.load_address,
            HvImageInfo::Xex25(i) => i.load_address,
            HvImageInfo::Xex2D(i) => i.load_address,
        }
    }

    pub fn image_flags(&self) -> ImageFlags {
        match *self {
            HvImageInfo::Xex2(i) => i.image_flags,
            HvImageInfo::Xex1(i) => i.image_flags,
            HvImageInfo::Xex25(i) => i.image_flags,
            HvImageInfo::Xex2D(i) => i.image_flags,
        }
    }

    pub fn export_table_address(&self) -> u32 {
        match *self {
            HvImageInfo::Xex2(i) => i.export_table_address,
            HvImageInfo::Xex1(i) => i.export_table_address,
            HvImageInfo::Xex25(i) => i.export_table_address,
            HvImageInfo::Xex2D(i) => i.export_table_address,
        }
    }

    /// The (encrypted) image key. Missing in XEX2D.
    pub fn image_key(&self) -> Option<&'a Key> {
        match *self {
            HvImageInfo::Xex2(i) => Some(&i.image_key),
            HvImageInfo::Xex1(i) => Some(&i.image_key),
            HvImageInfo::Xex25(i) => Some(&i.image_key),
            HvImageInfo::Xex2D(_) => None,
        }
    }

    pub fn media_id(&self) -> Option<&'a Key> {
        match *self {
            HvImageInfo::Xex2(i) => Some(&i.media_id),
            HvImageInfo::Xex1(i) => Some(&i.media_id),
            HvImageInfo::Xex25(_) | HvImageInfo::Xex2D(_) => None,
        }
    }

    pub fn game_region(&self) -> Option<GameRegion> {
        match *self {
            HvImageInfo::Xex2(i) => Some(i.game_region),
            HvImageInfo::Xex1(i) => Some(i.game_region),
            HvImageInfo::Xex25(_) | HvImageInfo::Xex2D(_) => None,
        }
    }

    pub fn info_size(&self) -> Option<u32> {
        match *self {
            HvImageInfo::Xex2(i) => Some(i.info_size),
            _ => None,
        }
    }

    pub fn import_table_count(&self) -> Option<u32> {
        match *self {
            HvImageInfo::Xex2(i) => Some(i.import_table_count),
            _ => None,
        }
    }

    pub fn header_hash(&self) -> Option<&'a Digest> {
        match *self {
            HvImageInfo::Xex2(i) => Some(&i.header_hash),
            _ => None,
        }
    }
}

/// XEX2 security info.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Xex2SecurityInfo {
    pub size: u32,
    pub image_size: u32,
    pub image_info: Xex2HvImageInfo,
    pub allowed_media_types: AllowedMediaTypes,
    pub page_descriptor_count: u32,
}

/// XEX2 image info.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Xex2HvImageInfo {
    pub signature: Signature,
    pub info_size: u32,
    pub image_flags: ImageFlags,
    pub load_address: u32,
    pub image_hash: Digest,
    pub import_table_count: u32,
    pub import_digest: Digest,
    pub media_id: Key,
    pub image_key: Key,
    pub export_table_address: u32,
    /// Hash over the headers.
    pub header_hash: Digest,
    pub game_region: GameRegion,
}

impl Xex2SecurityInfo {
    fn from_raw(raw: &raw::Xex2SecurityInfo) -> Self {
        let info = &raw.image_info;
        Self {
            size: raw.size,
            image_size: raw.image_size,
            image_info: Xex2HvImageInfo {
                signature: info.signature,
                info_size: info.info_size,
                image_flags: retain_logged("image", info.image_flags),
                load_address: info.load_address,
                image_hash: info.image_hash,
                import_table_count: info.import_table_count,
                import_digest: info.import_digest,
                media_id: info.media_id,
                image_key: info.image_key,
                export_table_address: info.export_table_address,
                header_hash: info.header_hash,
                game_region: retain_logged("game region", info.game_region),
            },
            allowed_media_types: retain_logged("media type", raw.allowed_media_types),
            page_descriptor_count: raw.page_descriptor_count,
        }
    }

    fn to_raw(&self) -> raw::Xex2SecurityInfo {
        let info = &self.image_info;
        raw::Xex2SecurityInfo {
            size: self.size,
            image_size: self.image_size,
            image_info: raw::Xex2HvImageInfo {
                signature: info.signature,
                info_size: info.info_size,
                image_flags: info.image_flags.bits(),
                load_address: info.load_address,
                image_hash: info.image_hash,
                import_table_count: info.import_table_count,
                import_digest: info.import_digest,
                media_id: info.media_id,
                image_key: info.image_key,
                export_table_address: info.export_table_address,
                header_hash: info.header_hash,
                game_region: info.game_region.bits(),
            },
            allowed_media_types: self.allowed_media_types.bits(),
            page_descriptor_count: self.page_descriptor_count,
        }
    }
}

/// XEX1 security info.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Xex1SecurityInfo {
    pub size: u32,
    pub image_size: u32,
    pub image_info: Xex1HvImageInfo,
    pub allowed_media_types: AllowedMediaTypes,
    pub page_descriptor_count: u32,
}

/// XEX1 image info.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Xex1HvImageInfo {
    pub signature: Signature,
    pub image_hash: Digest,
    pub import_digest: Digest,
    pub load_address: u32,
    pub image_key: Key,
    pub media_id: Key,
    pub game_region: GameRegion,
    pub image_flags: ImageFlags,
    pub export_table_address: u32,
}

impl Xex1SecurityInfo {
    fn from_raw(raw: &raw::Xex1SecurityInfo) -> Self {
        let info = &raw.image_info;
        Self {
            size: raw.size,
            image_size: raw.image_size,
            image_info: Xex1HvImageInfo {
                signature: info.signature,
                image_hash: info.image_hash,
                import_digest: info.import_digest,
                load_address: info.load_address,
                image_key: info.image_key,
                media_id: info.media_id,
                game_region: retain_logged("game region", info.game_region),
                image_flags: retain_logged("image", info.image_flags),
                export_table_address: info.export_table_address,
            },
            allowed_media_types: retain_logged("media type", raw.allowed_media_types),
            page_descriptor_count: raw.page_descriptor_count,
        }
    }

    fn to_raw(&self) -> raw::Xex1SecurityInfo {
        let info = &self.image_info;
        raw::Xex1SecurityInfo {
            size: self.size,
            image_size: self.image_size,
            image_info: raw::Xex1HvImageInfo {
                signature: info.signature,
                image_hash: info.image_hash,
                import_digest: info.import_digest,
                load_address: info.load_address,
                image_key: info.image_key,
                media_id: info.media_id,
                game_region: info.game_region.bits(),
                image_flags: info.image_flags.bits(),
                export_table_address: info.export_table_address,
            },
            allowed_media_types: self.allowed_media_types.bits(),
            page_descriptor_count: self.page_descriptor_count,
        }
    }
}

/// XEX25 security info.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Xex25SecurityInfo {
    pub size: u32,
    pub image_size: u32,
    pub image_info: Xex25HvImageInfo,
    pub allowed_media_types: AllowedMediaTypes,
    pub page_descriptor_count: u32,
}

/// XEX25 image info.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Xex25HvImageInfo {
    pub signature: Signature,
    pub image_hash: Digest,
    pub import_digest: Digest,
    pub load_address: u32,
    pub image_key: Key,
    pub image_flags: ImageFlags,
    pub export_table_address: u32,
}

impl Xex25SecurityInfo {
    fn from_raw(raw: &raw::Xex25SecurityInfo) -> Self {
        let info = &raw.image_info;
        Self {
            size: raw.size,
            image_size: raw.image_size,
            image_info: Xex25HvImageInfo {
                signature: info.signature,
                image_hash: info.image_hash,
                import_digest: info.import_digest,
                load_address: info.load_address,
                image_key: info.image_key,
                image_flags: retain_logged("image", info.image_flags),
                export_table_address: info.export_table_address,
            },
            allowed_media_types: retain_logged("media type", raw.allowed_media_types),
            page_descriptor_count: raw.page_descriptor_count,
        }
    }

    fn to_raw(&self) -> raw::Xex25SecurityInfo {
        let info = &self.image_info;
        raw::Xex25SecurityInfo {
            size: self.size,
            image_size: self.image_size,
            image_info: raw::Xex25HvImageInfo {
                signature: info.signature,
                image_hash: info.image_hash,
                import_digest: info.import_digest,
                load_address: info.load_address,
                image_key: info.image_key,
                image_flags: info.image_flags.bits(),
                export_table_address: info.export_table_address,
            },
            allowed_media_types: self.allowed_media_types.bits(),
            page_descriptor_count: self.page_descriptor_count,
        }
    }
}

/// XEX2D security info.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Xex2DSecurityInfo {
    pub size: u32,
    pub image_info: Xex2DHvImageInfo,
    pub allowed_media_types: AllowedMediaTypes,
    pub page_descriptor_count: u32,
}

/// XEX2D image info.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Xex2DHvImageInfo {
    pub signature: Signature,
    pub image_hash: Digest,
    pub import_digest: Digest,
    pub load_address: u32,
    pub image_flags: ImageFlags,
    pub export_table_address: u32,
    /// Meaning unknown, kept as stored.
    pub unknown: u32,
}

impl Xex2DSecurityInfo {
    fn from_raw(raw: &raw::Xex2DSecurityInfo) -> Self {
        let info = &raw.image_info;
        Self {
            size: raw.size,
            image_info: Xex2DHvImageInfo {
                signature: info.signature,
                image_hash: info.image_hash,
                import_digest: info.import_digest,
                load_address: info.load_address,
                image_flags: retain_logged("image", info.image_flags),
                export_table_address: info.export_table_address,
                unknown: info.unknown,
            },
            allowed_media_types: retain_logged("media type", raw.allowed_media_types),
            page_descriptor_count: raw.page_descriptor_count,
        }
    }

    fn to_raw(&self) -> raw::Xex2DSecurityInfo {
        let info = &self.image_info;
        raw::Xex2DSecurityInfo {
            size: self.size,
            image_info: raw::Xex2DHvImageInfo {
                signature: info.signature,
                image_hash: info.image_hash,
                import_digest: info.import_digest,
                load_address: info.load_address,
                image_flags: info.image_flags.bits(),
                export_table_address: info.export_table_address,
                unknown: info.unknown,
            },
            allowed_media_types: self.allowed_media_types.bits(),
            page_descriptor_count: self.page_descriptor_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_LAYOUTS: [SecurityLayout; 4] = [
        SecurityLayout::Xex2,
        SecurityLayout::Xex1,
        SecurityLayout::Xex25,
        SecurityLayout::Xex2D,
    ];

    const ALL_MAGICS: [Magic; 5] = [Magic::Xex2, Magic::Xex1, Magic::Xex25, Magic::Xex2D, Magic::Xex3F];

    #[test]
    fn layout_size_table() {
        assert_eq!(SecurityLayout::Xex2.size(), 0x184);
        assert_eq!(SecurityLayout::Xex1.size(), 0x168);
        assert_eq!(SecurityLayout::Xex25.size(), 0x154);
        assert_eq!(SecurityLayout::Xex2D.size(), 0x144);
    }

    #[test]
    fn candidate_table() {
        assert_eq!(SecurityLayout::candidates(Magic::Xex2), &[SecurityLayout::Xex2]);
        assert_eq!(SecurityLayout::candidates(Magic::Xex1), &[SecurityLayout::Xex1]);
        assert_eq!(
            SecurityLayout::candidates(Magic::Xex25),
            &[SecurityLayout::Xex25, SecurityLayout::Xex2D]
        );
        assert_eq!(
            SecurityLayout::candidates(Magic::Xex2D),
            &[SecurityLayout::Xex2D, SecurityLayout::Xex25]
        );
        assert!(SecurityLayout::candidates(Magic::Xex3F).is_empty());
    }

    #[test]
    fn resolve_exact_sizes_only() {
        for &magic in ALL_MAGICS.iter() {
            for &layout in ALL_LAYOUTS.iter() {
                let expected = SecurityLayout::candidates(magic).contains(&layout);
                match SecurityLayout::resolve(magic, layout.size()) {
                    Ok(resolved) => {
                        assert!(expected, "{:?} resolved {:?}", magic, resolved);
                        assert_eq!(resolved, layout);
                    }
                    Err(Error::UnknownSecurityInfoLayout { magic: m, size }) => {
                        assert!(!expected, "{:?} rejected {:?}", magic, layout);
                        assert_eq!(m, magic.raw());
                        assert_eq!(size, layout.size());
                    }
                    Err(e) => panic!("unexpected error {}", e),
                }
            }

            for &bogus in &[0, 0x183, 0x185, 0x160, 0xFFFFFFFF] {
                match SecurityLayout::resolve(magic, bogus) {
                    Err(Error::UnknownSecurityInfoLayout { .. }) => {}
                    other => panic!("{:?} with size {:#X}: {:?}", magic, bogus, other),
                }
            }
        }
    }

    #[test]
    fn xex25_and_xex2d_disambiguated_by_size() {
        assert_eq!(SecurityLayout::resolve(Magic::Xex25, 0x144).unwrap(), SecurityLayout::Xex2D);
        assert_eq!(SecurityLayout::resolve(Magic::Xex2D, 0x154).unwrap(), SecurityLayout::Xex25);
    }

    #[test]
    fn wrong_layout_is_an_invariant_violation() {
        let mut data = vec![0u8; 0x184];
        data[..4].copy_from_slice(&0x168u32.to_be_bytes());
        match SecurityInfo::parse(&data, 0, SecurityLayout::Xex2) {
            Err(Error::DecoderInvariantViolation(_)) => {}
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn size_field_out_of_bounds() {
        match SecurityInfo::parse_at(&[0u8; 0x10], Magic::Xex2, 0x0E) {
            Err(Error::TruncatedSecurityInfo { offset: 0x0E, required: 0x12, available: 0x10 }) => {}
            other => panic!("unexpected result {:?}", other),
        }
    }
}

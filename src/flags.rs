//! Bit flag words and small packed values used throughout the XEX headers.
//!
//! All flag types keep every bit of the word they were decoded from, even bits
//! that have no name (yet). `bits()` always returns the original word, so
//! re-encoding a decoded structure is lossless.

use bitflags::Flags;

use std::fmt;

/// Builds a flag set that keeps every bit of `raw`, logging bits that have no
/// name.
pub(crate) fn retain_logged<F>(what: &str, raw: u32) -> F
where
    F: Flags<Bits = u32>,
{
    let known = F::from_bits_truncate(raw);
    if known.bits() != raw {
        warn!(
            "unknown {} flags: known flags: {:#X}, raw flags: {:#X}",
            what,
            known.bits(),
            raw
        );
    }
    F::from_bits_retain(raw)
}

bitflags! {
    /// Flags stored in the primary header.
    ///
    /// Bits `0x00000100`-`0x20000000` are reserved.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct ModuleFlags: u32 {
        const TITLE_PROCESS = 0x00000001;
        const TITLE_IMPORTS = 0x00000002;
        const DEBUGGER      = 0x00000004;
        const DLL           = 0x00000008;
        const PATCH         = 0x00000010;
        const PATCH_FULL    = 0x00000020;
        const PATCH_DELTA   = 0x00000040;
        const USER_MODE     = 0x00000080;
        const BOUND_PATH    = 0x40000000;
        const SILENT_LOAD   = 0x80000000;
    }
}

bitflags! {
    /// Flags stored in the `HvImageInfo` of the security info.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct ImageFlags: u32 {
        const MANUFACTURING_UTILITY         = 0x00000002;
        const MANUFACTURING_SUPPORT_TOOL    = 0x00000004;
        const MANUFACTURING_AWARE_MODULE    = 0x00000006;
        const XGD2_MEDIA_ONLY               = 0x00000008;
        const DATA_CENTER_REQUIRED          = 0x00000010;
        const DATA_CENTER_AWARE             = 0x00000020;
        const CARDEA_KEY                    = 0x00000100;
        const XEIKA_KEY                     = 0x00000200;
        const TITLE_USER_MODE               = 0x00000400;
        const SYSTEM_USER_MODE              = 0x00000800;
        const ORANGE0                       = 0x00001000;
        const ORANGE1                       = 0x00002000;
        const ORANGE2                       = 0x00004000;
        const IPTV_SIGNUP_APPLICATION       = 0x00010000;
        const IPTV_TITLE_APPLICATION        = 0x00020000;
        const KEY_VAULT_PRIVILEGES_REQUIRED = 0x04000000;
        const ONLINE_ACTIVATION_REQUIRED    = 0x08000000;
        /// Image uses 4 KB pages instead of 64 KB pages.
        const PAGE_SIZE_4KB                 = 0x10000000;
        const NO_GAME_REGION                = 0x20000000;
        const REVOCATION_CHECK_OPTIONAL     = 0x40000000;
        const REVOCATION_CHECK_REQUIRED     = 0x80000000;
    }
}

bitflags! {
    /// Media the image may be launched from.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct AllowedMediaTypes: u32 {
        const HARD_DISK                     = 0x00000001;
        const DVD_X2                        = 0x00000002;
        const DVD_CD                        = 0x00000004;
        const DVD_5                         = 0x00000008;
        const DVD_9                         = 0x00000010;
        const SYSTEM_FLASH                  = 0x00000020;
        const MEMORY_UNIT                   = 0x00000080;
        const MASS_STORAGE_DEVICE           = 0x00000100;
        const SMB_FILESYSTEM                = 0x00000200;
        const DIRECT_FROM_RAM               = 0x00000400;
        const SECURE_VIRTUAL_OPTICAL_DEVICE = 0x00001000;
        /// `\Device\Nomnil`
        const WIRELESS_N_STORAGE_DEVICE     = 0x00002000;
        /// SEP
        const SYSTEM_EXTENDED_PARTITION     = 0x00004000;
        /// SAP
        const SYSTEM_AUXILIARY_PARTITION    = 0x00008000;
        const INSECURE_PACKAGE              = 0x01000000;
        const SAVE_GAME_PACKAGE             = 0x02000000;
        const LOCALLY_SIGNED_PACKAGE        = 0x04000000;
        const LIVE_SIGNED_PACKAGE           = 0x08000000;
        const XBOX_PLATFORM_PACKAGE         = 0x10000000;
    }
}

bitflags! {
    /// Regions in which the image may run.
    ///
    /// Most regions span several bits (sub-regions), and `EUROPE` is the union
    /// of `AUSTRALIA_NEW_ZEALAND` and `REST_OF_EUROPE`.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct GameRegion: u32 {
        const NORTH_AMERICA         = 0x000000FF;
        const JAPAN                 = 0x00000100;
        const CHINA                 = 0x00000200;
        const REST_OF_ASIA          = 0x0000FC00;
        const AUSTRALIA_NEW_ZEALAND = 0x00010000;
        const REST_OF_EUROPE        = 0x00FE0000;
        const EUROPE                = 0x00FF0000;
        const REST_OF_WORLD         = 0xFF000000;
        const ALL                   = 0xFFFFFFFF;
    }
}

/// Approval state of a linked library.
///
/// Values outside the four known ones are kept as `Unknown`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ApprovalType {
    Unapproved,
    PossiblyApproved,
    Approved,
    Expired,
    Unknown(u8),
}

impl From<u8> for ApprovalType {
    fn from(raw: u8) -> Self {
        match raw {
            0x00 => ApprovalType::Unapproved,
            0x20 => ApprovalType::PossiblyApproved,
            0x40 => ApprovalType::Approved,
            0x60 => ApprovalType::Expired,
            other => ApprovalType::Unknown(other),
        }
    }
}

impl From<ApprovalType> for u8 {
    fn from(approval: ApprovalType) -> u8 {
        match approval {
            ApprovalType::Unapproved => 0x00,
            ApprovalType::PossiblyApproved => 0x20,
            ApprovalType::Approved => 0x40,
            ApprovalType::Expired => 0x60,
            ApprovalType::Unknown(raw) => raw,
        }
    }
}

/// A packed `major.minor.build.qfe` version number.
///
/// Layout, from the least significant bit: QFE (8 bits), build (16 bits),
/// minor (4 bits), major (4 bits).
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Version(u32);

impl Version {
    pub fn from_raw(raw: u32) -> Self {
        Version(raw)
    }

    pub fn new(major: u8, minor: u8, build: u16, qfe: u8) -> Self {
        Version(
            u32::from(major & 0xF) << 28
                | u32::from(minor & 0xF) << 24
                | u32::from(build) << 8
                | u32::from(qfe),
        )
    }

    /// Returns the packed word.
    pub fn raw(&self) -> u32 {
        self.0
    }

    pub fn major(&self) -> u8 {
        (self.0 >> 28) as u8
    }

    pub fn minor(&self) -> u8 {
        ((self.0 >> 24) & 0xF) as u8
    }

    pub fn build(&self) -> u16 {
        (self.0 >> 8) as u16
    }

    pub fn qfe(&self) -> u8 {
        self.0 as u8
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}.{}.{}", self.major(), self.minor(), self.build(), self.qfe())
    }
}

impl fmt::Debug for Version {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Version({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_disjoint<F: Flags<Bits = u32>>() {
        let mut seen = 0u32;
        for flag in F::FLAGS {
            let bits = flag.value().bits();
            // single-bit flags must not overlap; multi-bit constants are unions
            if bits.count_ones() == 1 {
                assert_eq!(seen & bits, 0, "{} overlaps another flag", flag.name());
                seen |= bits;
            }
        }
    }

    #[test]
    fn named_bits_are_disjoint() {
        assert_disjoint::<ModuleFlags>();
        assert_disjoint::<ImageFlags>();
        assert_disjoint::<AllowedMediaTypes>();
    }

    #[test]
    fn module_flags_bit_scenario() {
        let flags: ModuleFlags = retain_logged("module", 0x80000081);
        assert!(flags.contains(ModuleFlags::TITLE_PROCESS));
        assert!(flags.contains(ModuleFlags::USER_MODE));
        assert!(flags.contains(ModuleFlags::SILENT_LOAD));
        assert_eq!(
            flags,
            ModuleFlags::TITLE_PROCESS | ModuleFlags::USER_MODE | ModuleFlags::SILENT_LOAD
        );
        for other in &[
            ModuleFlags::TITLE_IMPORTS,
            ModuleFlags::DEBUGGER,
            ModuleFlags::DLL,
            ModuleFlags::PATCH,
            ModuleFlags::PATCH_FULL,
            ModuleFlags::PATCH_DELTA,
            ModuleFlags::BOUND_PATH,
        ] {
            assert!(!flags.intersects(*other));
        }
        assert_eq!(flags.bits(), 0x80000081);
    }

    #[test]
    fn reserved_bits_are_kept() {
        let flags: ModuleFlags = retain_logged("module", 0x00012301);
        assert_eq!(flags.bits(), 0x00012301);
        assert!(flags.contains(ModuleFlags::TITLE_PROCESS));

        let media: AllowedMediaTypes = retain_logged("media type", 0x00000841);
        assert_eq!(media.bits(), 0x00000841);
        assert!(media.contains(AllowedMediaTypes::HARD_DISK));

        let image: ImageFlags = retain_logged("image", 0x00000001);
        assert_eq!(image.bits(), 1);
        assert!(image.iter_names().next().is_none());
    }

    #[test]
    fn composite_flags() {
        let image = ImageFlags::MANUFACTURING_UTILITY | ImageFlags::MANUFACTURING_SUPPORT_TOOL;
        assert!(image.contains(ImageFlags::MANUFACTURING_AWARE_MODULE));

        let region = GameRegion::from_bits_retain(0x00FF0000);
        assert_eq!(region, GameRegion::EUROPE);
        assert!(region.contains(GameRegion::AUSTRALIA_NEW_ZEALAND));
        assert!(region.contains(GameRegion::REST_OF_EUROPE));
        assert!(!region.contains(GameRegion::JAPAN));
        assert!(GameRegion::ALL.contains(GameRegion::NORTH_AMERICA | GameRegion::REST_OF_WORLD));
    }

    #[test]
    fn approval_type() {
        assert_eq!(ApprovalType::from(0x00), ApprovalType::Unapproved);
        assert_eq!(ApprovalType::from(0x20), ApprovalType::PossiblyApproved);
        assert_eq!(ApprovalType::from(0x40), ApprovalType::Approved);
        assert_eq!(ApprovalType::from(0x60), ApprovalType::Expired);
        assert_eq!(ApprovalType::from(0x10), ApprovalType::Unknown(0x10));
        assert_eq!(u8::from(ApprovalType::Unknown(0x80)), 0x80);
        assert_eq!(u8::from(ApprovalType::Approved), 0x40);
    }

    #[test]
    fn version_packing() {
        let version = Version::from_raw(0x2101_2345);
        assert_eq!(version.major(), 2);
        assert_eq!(version.minor(), 1);
        assert_eq!(version.build(), 0x0123);
        assert_eq!(version.qfe(), 0x45);
        assert_eq!(version.to_string(), "2.1.291.69");
        assert_eq!(Version::new(2, 1, 0x0123, 0x45), version);
        assert_eq!(version.raw(), 0x2101_2345);
    }
}

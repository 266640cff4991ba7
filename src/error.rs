use std::{error, fmt};

/// The error type used by the `xex` library.
#[derive(Debug)]
pub enum Error {
    /// The buffer is too short to hold the magic number or the fixed part of
    /// the primary header.
    TruncatedHeader { required: u64, available: usize },
    /// The magic number is not one of the known XEX magics.
    UnrecognizedFormat(u32),
    /// `SizeOfHeaders` is too small for the fixed header plus the directory it
    /// claims to contain.
    InconsistentHeaderSize { size_of_headers: u32, required: u64 },
    /// The directory entry table extends past the end of the buffer (or past
    /// `SizeOfHeaders`).
    TruncatedDirectory { required: u64, available: u64 },
    /// The security info block extends past the end of the buffer.
    TruncatedSecurityInfo { offset: u32, required: u64, available: usize },
    /// The declared security info size matches none of the layouts that can
    /// occur with this magic.
    UnknownSecurityInfoLayout { magic: u32, size: u32 },
    /// A post-decode consistency check failed. This indicates a bug in the
    /// decoder, not bad input.
    DecoderInvariantViolation(String),
}

impl Error {
    /// Creates an `Error` for a codec failure on a range that was already
    /// bounds-checked.
    pub(crate) fn codec(what: &str, e: bincode::Error) -> Self {
        Error::DecoderInvariantViolation(format!("failed to transcode {}: {}", what, e))
    }
}

impl error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::TruncatedHeader { required, available } => write!(
                f,
                "truncated header: need {} Bytes, buffer has {}",
                required, available
            ),
            Error::UnrecognizedFormat(magic) => {
                write!(f, "unrecognized format (magic {:#010X})", magic)
            }
            Error::InconsistentHeaderSize { size_of_headers, required } => write!(
                f,
                "inconsistent header size: SizeOfHeaders is {:#X}, but at least {:#X} Bytes are required",
                size_of_headers, required
            ),
            Error::TruncatedDirectory { required, available } => write!(
                f,
                "truncated directory: table ends at {:#X}, only {:#X} Bytes available",
                required, available
            ),
            Error::TruncatedSecurityInfo { offset, required, available } => write!(
                f,
                "truncated security info at {:#X}: block ends at {:#X}, buffer has {:#X} Bytes",
                offset, required, available
            ),
            Error::UnknownSecurityInfoLayout { magic, size } => write!(
                f,
                "unknown security info layout (magic {:#010X}, declared size {:#X})",
                magic, size
            ),
            Error::DecoderInvariantViolation(s) => write!(f, "decoder invariant violated: {}", s),
        }
    }
}

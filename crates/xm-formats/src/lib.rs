//! Extended Module (XM) file support.
//!
//! Reads XM files into the `xm-ir` model and writes the model back out.

mod delta;
mod headers;
mod xm_format;
mod xm_writer;

use std::io;

pub use delta::{delta_decode_16, delta_decode_8, delta_encode_16, delta_encode_8};
pub use xm_format::{load, load_with, load_xm, read_xm, unpack_pattern};
pub use xm_writer::write_xm;

/// Version word of the current XM layout.
pub const XM_VERSION: u16 = 0x0104;

/// Error type for module loading.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Magic string or 0x1A marker did not match
    #[error("not an XM module (bad magic)")]
    BadMagic,
    /// Version word other than 0x0104, only returned in strict mode
    #[error("unsupported XM version {0:#06x}")]
    UnsupportedVersion(u16),
    /// File ended before the structure it declares
    #[error("module data is truncated")]
    Truncated,
    #[error("I/O error: {0}")]
    Io(#[source] io::Error),
    /// Decoded module breaks a structural invariant
    #[error("invalid module: {0}")]
    Invalid(#[from] xm_ir::InvariantError),
    /// Malformed packed data
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<io::Error> for LoadError {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            LoadError::Truncated
        } else {
            LoadError::Io(err)
        }
    }
}

impl From<binrw::Error> for LoadError {
    fn from(err: binrw::Error) -> Self {
        match err {
            binrw::Error::BadMagic { .. } => LoadError::BadMagic,
            binrw::Error::Io(e) => LoadError::from(e),
            binrw::Error::Backtrace(bt) => LoadError::from(*bt.error),
            other => LoadError::Decode(other.to_string()),
        }
    }
}

/// Loader settings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Reject files whose version word is not 0x0104 instead of warning
    pub strict_version: bool,
}

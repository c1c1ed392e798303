use base64::DecodeError;
use thiserror::Error;

/// Every failure mode the core can produce, per the error taxonomy in the design
/// document: container parsing, key recovery, and stream-state misuse all land here.
#[derive(Debug, Error)]
pub enum Error {
    /// Container magic/trailer does not identify a known format.
    #[error("file type mismatch: {0}")]
    FileTypeMismatch(String),

    /// Recognized container, but the key format isn't supported (and no fallback
    /// was requested, or the fallback itself failed).
    #[error("unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// A structural field violated an invariant (pad length, QTag field count, ...).
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// The optional Tencent-TEA-CBC zero-check failed.
    #[error("validation failed: {0}")]
    ValidationError(String),

    /// Caller-supplied parameter is out of range (wrong key length, odd TEA rounds, ...).
    #[error("invalid parameter: {0}")]
    InvalidParam(String),

    /// Seek attempted on a cipher/stream that doesn't support offset addressing.
    #[error("stream is not seekable")]
    NotSeekable,

    /// Read attempted on a cipher/stream that doesn't support decryption.
    #[error("stream is not readable")]
    NotReadable,

    /// Write attempted on a cipher/stream that doesn't support encryption.
    #[error("stream is not writable")]
    NotWritable,

    /// Operation attempted on a stream that has already been closed.
    #[error("stream is closed")]
    Closed,

    /// XOR of two unequal-length byte strings.
    #[error("xor operands have different lengths ({0} != {1})")]
    LengthMismatch(usize, usize),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("base64 decode error: {0}")]
    Base64(#[from] DecodeError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("tagging error: {0}")]
    Tag(String),
}

pub type Result<T> = std::result::Result<T, Error>;

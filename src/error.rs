use thiserror::Error;

/// Everything that can go wrong while mounting or walking a monofs image.
///
/// Mount-time validation failures (`NotThisFormat`, `UnsupportedBlockSize`)
/// are terminal: the mount attempt aborts and no state is retained.
/// `NotFound` is the normal negative-lookup outcome and is never an
/// integrity problem; `CorruptFormat` is, and is never folded into it.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("magic number {found:#010x} does not identify a monofs image")]
    NotThisFormat { found: u64 },
    #[error("image formatted with unsupported block size {found}")]
    UnsupportedBlockSize { found: u64 },
    #[error("not found")]
    NotFound,
    #[error("corrupt filesystem: {0}")]
    CorruptFormat(String),
    #[error("no free data blocks left")]
    OutOfSpace,
    #[error("no free inode slots left")]
    OutOfInodes,
    #[error("not a directory")]
    NotDirectory,
    #[error("not a regular file")]
    NotRegularFile,
    #[error("contents exceed a single data block")]
    FileTooLarge,
    #[error("invalid file name")]
    InvalidName,
    #[error("name already present in directory")]
    AlreadyExists,
    #[error("block {0} is outside the device or data region")]
    BadBlock(u64),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<bincode::error::EncodeError> for FsError {
    fn from(e: bincode::error::EncodeError) -> Self {
        FsError::CorruptFormat(e.to_string())
    }
}

impl From<bincode::error::DecodeError> for FsError {
    fn from(e: bincode::error::DecodeError) -> Self {
        FsError::CorruptFormat(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FsError>;

use serde::{Deserialize, Serialize};

use crate::error::{FsError, Result};

/// The kind of object an inode describes, decoded from the type bits of
/// its stored mode. The format knows exactly two kinds; anything else in
/// the type bits is a format-integrity violation, not a recoverable case.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
pub enum FileKind {
    RegularFile,
    Directory,
}

impl FileKind {
    /// Decodes the `S_IFMT` bits of a stored mode.
    pub fn from_mode(mode: u64) -> Result<Self> {
        match mode as u32 & libc::S_IFMT {
            libc::S_IFREG => Ok(FileKind::RegularFile),
            libc::S_IFDIR => Ok(FileKind::Directory),
            other => Err(FsError::CorruptFormat(format!(
                "unrecognized inode type bits {other:#o}"
            ))),
        }
    }

    /// The `S_IFMT` bits this kind stores.
    pub fn type_bits(self) -> u64 {
        match self {
            FileKind::RegularFile => libc::S_IFREG as u64,
            FileKind::Directory => libc::S_IFDIR as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_round_trip() {
        let mode = FileKind::Directory.type_bits() | 0o755;
        assert_eq!(FileKind::from_mode(mode).unwrap(), FileKind::Directory);
        let mode = FileKind::RegularFile.type_bits() | 0o644;
        assert_eq!(FileKind::from_mode(mode).unwrap(), FileKind::RegularFile);
    }

    #[test]
    fn unknown_type_bits_are_corrupt() {
        assert!(matches!(
            FileKind::from_mode(libc::S_IFLNK as u64 | 0o777),
            Err(FsError::CorruptFormat(_))
        ));
    }
}

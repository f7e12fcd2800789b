//! Fixed-layout record encoding.
//!
//! All on-disk records use bincode's legacy configuration: fixed-width
//! little-endian integers, no length prefixes for arrays. Record sizes are
//! therefore compile-time constants (`SUPERBLOCK_SIZE`, `INODE_RECORD_SIZE`,
//! `DIR_ENTRY_SIZE` in [`crate::layout`]).

use serde::{de::DeserializeOwned, Serialize};

use crate::error::Result;

pub(crate) fn config() -> bincode::config::Configuration<
    bincode::config::LittleEndian,
    bincode::config::Fixint,
    bincode::config::NoLimit,
> {
    bincode::config::legacy()
}

/// Serde-backed records (superblock, inode record) encode through this
/// trait. `DirEntry` carries a fixed byte array serde cannot derive for,
/// so it uses bincode's own derives with the same configuration.
pub trait DiskRecord: Serialize + DeserializeOwned {
    /// Encodes into the front of `buf`, returning the number of bytes
    /// written.
    fn encode_into(&self, buf: &mut [u8]) -> Result<usize> {
        Ok(bincode::serde::encode_into_slice(self, buf, config())?)
    }

    fn decode_from(buf: &[u8]) -> Result<Self> {
        let (record, _) = bincode::serde::decode_from_slice(buf, config())?;
        Ok(record)
    }
}

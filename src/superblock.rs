//! The superblock: filesystem-wide metadata in block 0.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::cache::BlockCacheManager;
use crate::codec::DiskRecord;
use crate::error::{FsError, Result};
use crate::layout::{
    BLOCK_SIZE, DATA_REGION_START, FS_MAGIC, FS_VERSION, SUPERBLOCK_BLOCK, SUPERBLOCK_SIZE,
};

/// The on-disk superblock record. Read once at mount and held immutable
/// for the mount's duration; only the format producer and the block
/// allocator ever write it back.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct SuperBlock {
    /// Must equal [`FS_MAGIC`] or the image is not this format.
    pub magic: u64,
    pub version: u64,
    /// Must equal [`BLOCK_SIZE`]; no other value is supported.
    pub block_size: u64,
    /// Number of inode records in use in the inode store.
    pub inodes_count: u64,
    /// Free-block bitmap word: bit `i` set means block `i` is free.
    /// Blocks 0 and 1 are never free.
    pub free_blocks: u64,
}

impl DiskRecord for SuperBlock {}

impl SuperBlock {
    pub fn new(inodes_count: u64, free_blocks: u64) -> Self {
        Self {
            magic: FS_MAGIC,
            version: FS_VERSION,
            block_size: BLOCK_SIZE as u64,
            inodes_count,
            free_blocks,
        }
    }

    /// Reads and validates block 0. Checks the magic number first, then
    /// the block size; either mismatch aborts the mount with the matching
    /// terminal error. On success returns the snapshot the rest of the
    /// mount works from.
    pub fn load(cache: &mut BlockCacheManager) -> Result<SuperBlock> {
        let guard = cache.get(SUPERBLOCK_BLOCK)?;
        let buffer = guard.lock().unwrap();
        let sb = SuperBlock::decode_from(&buffer.data()[..SUPERBLOCK_SIZE])?;

        debug!("magic number read from device: {:#010x}", sb.magic);
        if sb.magic != FS_MAGIC {
            return Err(FsError::NotThisFormat { found: sb.magic });
        }
        if sb.block_size != BLOCK_SIZE as u64 {
            return Err(FsError::UnsupportedBlockSize {
                found: sb.block_size,
            });
        }
        info!(
            "monofs version {} detected, block size {}, {} inodes",
            sb.version, sb.block_size, sb.inodes_count
        );
        Ok(sb)
    }

    /// Writes the record back to block 0 through the cache.
    pub fn store(&self, cache: &mut BlockCacheManager) -> Result<()> {
        let guard = cache.get(SUPERBLOCK_BLOCK)?;
        let mut buffer = guard.lock().unwrap();
        self.encode_into(&mut buffer.data_mut()[..SUPERBLOCK_SIZE])?;
        Ok(())
    }

    /// Number of free data blocks according to the bitmap word.
    pub fn free_block_count(&self) -> u32 {
        (self.free_blocks >> DATA_REGION_START).count_ones()
    }
}

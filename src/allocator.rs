//! Free-block tracking for the data region.
//!
//! The bitmap is the superblock's `free_blocks` word: bit `i` set means
//! block `i` is free. The allocator keeps a working copy as a bit vector,
//! rebuilt from the superblock at mount, and writes the word back through
//! block 0 after every change. Blocks 0 and 1 are never allocatable.

use bitvec::prelude::*;

use crate::cache::BlockCacheManager;
use crate::codec::DiskRecord;
use crate::error::{FsError, Result};
use crate::layout::{is_data_block, DATA_REGION_START, MAX_BLOCKS, SUPERBLOCK_SIZE};
use crate::layout::{INODE_STORE_CAPACITY, SUPERBLOCK_BLOCK};
use crate::superblock::SuperBlock;

pub struct BlockAllocator {
    bitmap: BitVec<u8, Lsb0>,
}

impl BlockAllocator {
    /// Rebuilds the allocator from a mounted superblock's bitmap word,
    /// clamped to the `total_blocks` the device actually holds.
    pub fn from_superblock(sb: &SuperBlock, total_blocks: u64) -> Self {
        let mut bitmap = BitVec::from_slice(&sb.free_blocks.to_le_bytes());
        // The reserved blocks must never look free, whatever is on disk,
        // and neither must blocks past the device end.
        bitmap.set(SUPERBLOCK_BLOCK as usize, false);
        bitmap.set(crate::layout::INODE_STORE_BLOCK as usize, false);
        for block in total_blocks.min(MAX_BLOCKS)..MAX_BLOCKS {
            bitmap.set(block as usize, false);
        }
        Self { bitmap }
    }

    /// A fresh bitmap with the whole data region of a `total_blocks`
    /// device marked free. Used by the format producer.
    pub fn with_all_free(total_blocks: u64) -> Self {
        let mut bitmap = bitvec![u8, Lsb0; 0; MAX_BLOCKS as usize];
        for block in DATA_REGION_START..total_blocks.min(MAX_BLOCKS) {
            bitmap.set(block as usize, true);
        }
        Self { bitmap }
    }

    /// The bitmap as the superblock stores it.
    pub fn word(&self) -> u64 {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(self.bitmap.as_raw_slice());
        u64::from_le_bytes(bytes)
    }

    pub fn free_count(&self) -> usize {
        self.bitmap[DATA_REGION_START as usize..].count_ones()
    }

    /// Claims the first free data block, persists the updated bitmap, and
    /// returns the block index. `OutOfSpace` when the data region is
    /// exhausted.
    pub fn allocate(&mut self, cache: &mut BlockCacheManager) -> Result<u64> {
        let block = self
            .bitmap
            .iter_ones()
            .find(|&i| i as u64 >= DATA_REGION_START)
            .ok_or(FsError::OutOfSpace)?;
        self.bitmap.set(block, false);
        self.sync(cache)?;
        Ok(block as u64)
    }

    /// Marks a data block free again. Freeing a reserved block, a block
    /// outside the data region, or a block that is already free is an
    /// error.
    pub fn free(&mut self, cache: &mut BlockCacheManager, block: u64) -> Result<()> {
        if !is_data_block(block) {
            return Err(FsError::BadBlock(block));
        }
        if self.bitmap[block as usize] {
            return Err(FsError::BadBlock(block));
        }
        self.bitmap.set(block as usize, true);
        self.sync(cache)
    }

    /// Claims a specific block. Used by the format producer while laying
    /// out seed files.
    pub(crate) fn reserve(&mut self, block: u64) -> Result<()> {
        if !is_data_block(block) || !self.bitmap[block as usize] {
            return Err(FsError::OutOfSpace);
        }
        self.bitmap.set(block as usize, false);
        Ok(())
    }

    /// Writes the bitmap word back into the persisted superblock.
    fn sync(&self, cache: &mut BlockCacheManager) -> Result<()> {
        let guard = cache.get(SUPERBLOCK_BLOCK)?;
        let mut buffer = guard.lock().unwrap();
        let mut sb = SuperBlock::decode_from(&buffer.data()[..SUPERBLOCK_SIZE])?;
        sb.free_blocks = self.word();
        sb.encode_into(&mut buffer.data_mut()[..SUPERBLOCK_SIZE])?;
        Ok(())
    }
}

/// Hands out the next dense inode number, or `OutOfInodes` when the store
/// block is full. Inode numbers start after the reserved range.
pub fn next_inode_no(sb: &SuperBlock) -> Result<u64> {
    if sb.inodes_count as usize >= INODE_STORE_CAPACITY {
        return Err(FsError::OutOfInodes);
    }
    Ok(sb.inodes_count + 1)
}

//! The format producer.
//!
//! Lays a fresh monofs image onto a block device: superblock, inode
//! store, a root directory, and optionally some seed files created at
//! format time (one data block each). This is a library routine, not a
//! CLI; tests and tooling call it to produce images the mount path then
//! validates.

use std::sync::Arc;

use log::info;

use crate::allocator::BlockAllocator;
use crate::cache::BlockCacheManager;
use crate::device::BlockDevice;
use crate::directory::DirEntry;
use crate::error::{FsError, Result};
use crate::inode::{self, InodeRecord};
use crate::layout::{
    dir_entry_offset, BLOCK_SIZE, DATA_REGION_START, DIR_ENTRIES_PER_BLOCK, DIR_ENTRY_SIZE,
    INODE_STORE_BLOCK, INODE_STORE_CAPACITY, MAX_BLOCKS, ROOT_INODE_NO, SUPERBLOCK_BLOCK,
};
use crate::superblock::SuperBlock;

/// A regular file written into the root directory at format time.
pub struct SeedFile<'a> {
    pub name: &'a str,
    pub contents: &'a [u8],
}

fn check_seed(device: &dyn BlockDevice, seed: &[SeedFile<'_>]) -> Result<()> {
    // Root directory occupies the first data block; each seed file one more.
    let blocks_needed = DATA_REGION_START + 1 + seed.len() as u64;
    if blocks_needed > device.num_blocks() || blocks_needed > MAX_BLOCKS {
        return Err(FsError::OutOfSpace);
    }
    if seed.len() > DIR_ENTRIES_PER_BLOCK {
        return Err(FsError::OutOfSpace);
    }
    if 1 + seed.len() > INODE_STORE_CAPACITY {
        return Err(FsError::OutOfInodes);
    }
    for file in seed {
        if file.contents.len() > BLOCK_SIZE {
            return Err(FsError::FileTooLarge);
        }
    }
    for (i, file) in seed.iter().enumerate() {
        if seed[..i].iter().any(|other| other.name == file.name) {
            return Err(FsError::AlreadyExists);
        }
    }
    Ok(())
}

/// Formats `device` with a root directory (inode 1) containing `seed`.
/// Seed files get dense inode numbers from 2 and consecutive data blocks
/// after the root directory's.
pub fn mkfs(device: Arc<dyn BlockDevice>, seed: &[SeedFile<'_>]) -> Result<()> {
    check_seed(device.as_ref(), seed)?;

    let mut cache = BlockCacheManager::new(Arc::clone(&device));
    let mut allocator = BlockAllocator::with_all_free(device.num_blocks());

    // Inode store: clear the block, then lay records densely from slot 0.
    {
        let guard = cache.get(INODE_STORE_BLOCK)?;
        guard.lock().unwrap().data_mut().fill(0);
    }

    let root_block = DATA_REGION_START;
    allocator.reserve(root_block)?;
    let mut root = InodeRecord::new_directory(ROOT_INODE_NO, root_block, 0o755);
    root.dir_children_count = seed.len() as u64;
    root.size = (seed.len() * DIR_ENTRY_SIZE) as u64;
    inode::store_record(&mut cache, 0, &root)?;

    // Root directory block: entries for the seed files, zeroes beyond.
    {
        let guard = cache.get(root_block)?;
        let mut buffer = guard.lock().unwrap();
        buffer.data_mut().fill(0);
        for (i, file) in seed.iter().enumerate() {
            let inode_no = ROOT_INODE_NO + 1 + i as u64;
            let entry = DirEntry::new(file.name.as_bytes(), inode_no)?;
            let offset = dir_entry_offset(i);
            entry.encode_into(&mut buffer.data_mut()[offset..offset + DIR_ENTRY_SIZE])?;
        }
    }

    // Seed files: one record and one data block each.
    for (i, file) in seed.iter().enumerate() {
        let inode_no = ROOT_INODE_NO + 1 + i as u64;
        let data_block = root_block + 1 + i as u64;
        allocator.reserve(data_block)?;
        let record = InodeRecord::new_regular_file(
            inode_no,
            data_block,
            file.contents.len() as u64,
            0o644,
        );
        inode::store_record(&mut cache, 1 + i, &record)?;

        let guard = cache.get(data_block)?;
        let mut buffer = guard.lock().unwrap();
        buffer.data_mut().fill(0);
        buffer.data_mut()[..file.contents.len()].copy_from_slice(file.contents);
    }

    let sb = SuperBlock::new(1 + seed.len() as u64, allocator.word());
    {
        let guard = cache.get(SUPERBLOCK_BLOCK)?;
        guard.lock().unwrap().data_mut().fill(0);
    }
    sb.store(&mut cache)?;

    cache.flush()?;
    info!(
        "formatted device: {} inodes, {} free data blocks",
        sb.inodes_count,
        sb.free_block_count()
    );
    Ok(())
}

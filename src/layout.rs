//! Where everything lives on disk.
//!
//! The layout is fixed: block 0 holds the superblock, block 1 the inode
//! store, and every block from 2 on is a data block. Each inode owns at
//! most one data block, so a directory is a single block of fixed-size
//! entries and a regular file is a single block of bytes.

/// Stamped in the superblock to identify the format.
pub const FS_MAGIC: u64 = 0x10032094;
pub const FS_VERSION: u64 = 1;

/// The single supported block size. Images formatted with anything else
/// are rejected at mount time.
pub const BLOCK_SIZE: usize = 4096;

pub const SUPERBLOCK_BLOCK: u64 = 0;
pub const INODE_STORE_BLOCK: u64 = 1;
pub const DATA_REGION_START: u64 = 2;

/// The free-block bitmap is a single word in the superblock, so the
/// format addresses at most 64 blocks.
pub const MAX_BLOCKS: u64 = 64;

/// Inode 0 is invalid and inode 1 is the root directory.
pub const ROOT_INODE_NO: u64 = 1;

/// Encoded size of one on-disk inode record (five u64 fields).
pub const INODE_RECORD_SIZE: usize = 40;
/// How many inode records fit in the inode store block.
pub const INODE_STORE_CAPACITY: usize = BLOCK_SIZE / INODE_RECORD_SIZE;

pub const FILENAME_MAXLEN: usize = 56;
/// Encoded size of one directory entry: padded name plus inode number.
pub const DIR_ENTRY_SIZE: usize = FILENAME_MAXLEN + 8;
pub const DIR_ENTRIES_PER_BLOCK: usize = BLOCK_SIZE / DIR_ENTRY_SIZE;

/// Encoded size of the superblock record (five u64 fields).
pub const SUPERBLOCK_SIZE: usize = 40;

/// True if `block` lies in the data region the format can address.
/// The device itself may be smaller; the block cache bounds-checks that.
pub fn is_data_block(block: u64) -> bool {
    (DATA_REGION_START..MAX_BLOCKS).contains(&block)
}

pub fn inode_slot_offset(slot: usize) -> usize {
    slot * INODE_RECORD_SIZE
}

pub fn dir_entry_offset(index: usize) -> usize {
    index * DIR_ENTRY_SIZE
}

//! monofs is a minimal block filesystem with a fixed linear layout:
//!
//! - Block 0: superblock (magic, version, block size, inode count,
//!   free-block bitmap word)
//! - Block 1: inode store (flat array of fixed-size records)
//! - Blocks 2..: data blocks, one per inode
//!
//! Files and directories occupy exactly one data block, which keeps the
//! resolution path simple: mount validates block 0, the root directory is
//! materialized at inode 1, and every path component is resolved by
//! scanning the parent directory's single entry block.
//!
//! The crate is the on-disk format plus its resolution and validation
//! logic. Host integration (a FUSE adapter, a kernel shim) and command
//! line tools sit on top of [`Monofs`] and [`mkfs`] and are out of scope
//! here.

pub mod allocator;
pub mod cache;
pub mod codec;
pub mod device;
pub mod directory;
pub mod error;
pub mod filekind;
mod fs;
pub mod inode;
pub mod layout;
pub mod mkfs;
pub mod superblock;
pub mod vfs;

pub use device::{BlockDevice, ImageDisk};
pub use directory::DirEntry;
pub use error::{FsError, Result};
pub use filekind::FileKind;
pub use fs::Monofs;
pub use inode::{find_inode, InodeRecord};
pub use layout::{
    BLOCK_SIZE, DATA_REGION_START, FILENAME_MAXLEN, FS_MAGIC, FS_VERSION, INODE_STORE_BLOCK,
    MAX_BLOCKS, ROOT_INODE_NO, SUPERBLOCK_BLOCK,
};
pub use mkfs::{mkfs, SeedFile};
pub use superblock::SuperBlock;
pub use vfs::{Inode, Timestamps};

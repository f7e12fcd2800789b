//! The mount handle.
//!
//! Mount lifecycle: a device goes through validation (superblock load,
//! root materialization) and either comes back as a [`Monofs`] handle or
//! fails with the reported error and no retained state. Lookups are only
//! possible through a live handle; dropping it is the unmount.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::{info, warn};

use crate::allocator::BlockAllocator;
use crate::cache::BlockCacheManager;
use crate::device::BlockDevice;
use crate::error::{FsError, Result};
use crate::layout::ROOT_INODE_NO;
use crate::superblock::SuperBlock;
use crate::vfs::{self, Inode};

/// State shared by the handle and every runtime inode of one mount.
pub(crate) struct FsInner {
    pub(crate) cache: Mutex<BlockCacheManager>,
    /// Immutable snapshot taken at mount; the allocator maintains the
    /// persisted copy's bitmap word separately.
    pub(crate) superblock: SuperBlock,
    pub(crate) allocator: Mutex<BlockAllocator>,
}

/// A mounted filesystem. Owns the block cache, the allocator state, and
/// the pool of materialized inodes; all of it is torn down when the
/// handle goes away.
pub struct Monofs {
    inner: Arc<FsInner>,
    root: Arc<Inode>,
    pool: Mutex<HashMap<u64, Arc<Inode>>>,
}

impl Monofs {
    /// Validates the device and produces a mount handle. Fails with
    /// `NotThisFormat`/`UnsupportedBlockSize` on superblock mismatch and
    /// `CorruptFormat` if the root inode is missing or not a directory.
    pub fn mount(device: Arc<dyn BlockDevice>) -> Result<Self> {
        let total_blocks = device.num_blocks();
        let mut cache = BlockCacheManager::new(device);
        let superblock = SuperBlock::load(&mut cache)?;
        let allocator = BlockAllocator::from_superblock(&superblock, total_blocks);
        let inner = Arc::new(FsInner {
            cache: Mutex::new(cache),
            superblock,
            allocator: Mutex::new(allocator),
        });

        let root = match vfs::materialize(&inner, ROOT_INODE_NO) {
            Ok(inode) => Arc::new(inode),
            Err(FsError::NotFound) => {
                return Err(FsError::CorruptFormat(format!(
                    "root inode {ROOT_INODE_NO} is missing from the inode store"
                )))
            }
            Err(e) => return Err(e),
        };
        if !root.is_directory() {
            return Err(FsError::CorruptFormat(format!(
                "root inode {ROOT_INODE_NO} is not a directory"
            )));
        }

        info!(
            "mounted: {} inodes, {} free data blocks",
            inner.superblock.inodes_count,
            inner.superblock.free_block_count()
        );
        let pool = Mutex::new(HashMap::from([(ROOT_INODE_NO, Arc::clone(&root))]));
        Ok(Self { inner, root, pool })
    }

    /// The root directory, materialized once per mount. Sole entry point
    /// for path resolution.
    pub fn root(&self) -> Arc<Inode> {
        Arc::clone(&self.root)
    }

    pub fn superblock(&self) -> &SuperBlock {
        &self.inner.superblock
    }

    /// Materializes the inode with the given number, reusing the pooled
    /// instance if this mount already holds one.
    pub fn materialize(&self, inode_no: u64) -> Result<Arc<Inode>> {
        let mut pool = self.pool.lock().unwrap();
        if let Some(inode) = pool.get(&inode_no) {
            return Ok(Arc::clone(inode));
        }
        let inode = Arc::new(vfs::materialize(&self.inner, inode_no)?);
        pool.insert(inode_no, Arc::clone(&inode));
        Ok(inode)
    }

    /// Walks an absolute path component by component from the root,
    /// resolving each name in its parent directory.
    pub fn resolve_path(&self, path: &str) -> Result<Arc<Inode>> {
        let mut current = self.root();
        for component in path.split('/').filter(|c| !c.is_empty()) {
            let inode_no = current.lookup(component.as_bytes())?;
            current = self.materialize(inode_no)?;
        }
        Ok(current)
    }

    /// Claims a free data block. `OutOfSpace` when the data region is
    /// exhausted.
    pub fn allocate_block(&self) -> Result<u64> {
        let mut allocator = self.inner.allocator.lock().unwrap();
        let mut cache = self.inner.cache.lock().unwrap();
        allocator.allocate(&mut cache)
    }

    /// Returns a data block to the free pool.
    pub fn free_block(&self, block: u64) -> Result<()> {
        let mut allocator = self.inner.allocator.lock().unwrap();
        let mut cache = self.inner.cache.lock().unwrap();
        allocator.free(&mut cache, block)
    }

    /// Flushes dirty cache buffers and the device, then drops the handle.
    pub fn unmount(self) -> Result<()> {
        self.pool.lock().unwrap().clear();
        self.inner.cache.lock().unwrap().flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::BLOCK_SIZE;
    use crate::mkfs::mkfs;

    struct MemDisk {
        data: Mutex<Vec<u8>>,
        num_blocks: u64,
    }

    impl MemDisk {
        fn new(num_blocks: u64) -> Arc<Self> {
            Arc::new(Self {
                data: Mutex::new(vec![0u8; num_blocks as usize * BLOCK_SIZE]),
                num_blocks,
            })
        }
    }

    impl BlockDevice for MemDisk {
        fn num_blocks(&self) -> u64 {
            self.num_blocks
        }

        fn read_block(&self, block_id: u64, buf: &mut [u8]) -> Result<()> {
            let start = block_id as usize * BLOCK_SIZE;
            buf.copy_from_slice(&self.data.lock().unwrap()[start..start + BLOCK_SIZE]);
            Ok(())
        }

        fn write_block(&self, block_id: u64, buf: &[u8]) -> Result<()> {
            let start = block_id as usize * BLOCK_SIZE;
            self.data.lock().unwrap()[start..start + BLOCK_SIZE].copy_from_slice(buf);
            Ok(())
        }

        fn flush(&self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn drop_survives_poisoned_locks() {
        let disk = MemDisk::new(4);
        mkfs(disk.clone(), &[]).unwrap();
        let fs = Monofs::mount(disk).unwrap();

        // Poison the cache lock the way a panicking operation would.
        let inner = Arc::clone(&fs.inner);
        let _ = std::thread::spawn(move || {
            let _guard = inner.cache.lock().unwrap();
            panic!("poisoning the cache lock");
        })
        .join();
        assert!(fs.inner.cache.lock().is_err());

        // Must skip the flush instead of panicking (and aborting) in drop.
        drop(fs);
    }
}

impl Drop for Monofs {
    // Runs during unwinding too, so a poisoned lock must not panic here;
    // a poisoned mount degrades to a skipped flush.
    fn drop(&mut self) {
        if let Ok(mut pool) = self.pool.lock() {
            pool.clear();
        }
        match self.inner.cache.lock() {
            Ok(mut cache) => {
                if cache.flush().is_err() {
                    warn!("failed to flush block cache on unmount");
                }
            }
            Err(_) => warn!("block cache lock poisoned, skipping flush on unmount"),
        }
    }
}

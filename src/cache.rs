//! The block cache gateway.
//!
//! Every on-disk structure is reached through a scoped, reference-counted
//! buffer handed out by [`BlockCacheManager`]. Acquiring a block pins it in
//! the cache; dropping the last reference makes it evictable, and a dirty
//! buffer writes itself back when it leaves the cache. This replaces
//! manual acquire/release pairs, so a buffer is released on every exit
//! path including early error returns.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::device::BlockDevice;
use crate::error::{FsError, Result};
use crate::layout::BLOCK_SIZE;

const CACHE_CAPACITY: usize = 16;

/// One cached block. Obtained only through [`BlockCacheManager::get`],
/// always behind `Arc<Mutex<..>>`.
pub struct BlockCache {
    data: Box<[u8; BLOCK_SIZE]>,
    block_id: u64,
    device: Arc<dyn BlockDevice>,
    modified: bool,
}

impl BlockCache {
    fn load(block_id: u64, device: Arc<dyn BlockDevice>) -> Result<Self> {
        let mut data = Box::new([0u8; BLOCK_SIZE]);
        device.read_block(block_id, data.as_mut_slice())?;
        Ok(Self {
            data,
            block_id,
            device,
            modified: false,
        })
    }

    pub fn block_id(&self) -> u64 {
        self.block_id
    }

    pub fn data(&self) -> &[u8] {
        self.data.as_slice()
    }

    /// Marks the buffer dirty; it will reach the device on sync or drop.
    pub fn data_mut(&mut self) -> &mut [u8] {
        self.modified = true;
        self.data.as_mut_slice()
    }

    pub fn sync(&mut self) -> Result<()> {
        if self.modified {
            self.device.write_block(self.block_id, self.data.as_slice())?;
            self.modified = false;
        }
        Ok(())
    }
}

impl Drop for BlockCache {
    fn drop(&mut self) {
        if self.sync().is_err() {
            log::error!("failed to write back block {} on eviction", self.block_id);
        }
    }
}

/// Per-mount cache of recently touched blocks. Lookups share pinned
/// entries; entries with no outside references are evicted first when the
/// cache is full.
pub struct BlockCacheManager {
    device: Arc<dyn BlockDevice>,
    entries: VecDeque<(u64, Arc<Mutex<BlockCache>>)>,
}

impl BlockCacheManager {
    pub fn new(device: Arc<dyn BlockDevice>) -> Self {
        Self {
            device,
            entries: VecDeque::new(),
        }
    }

    pub fn device(&self) -> Arc<dyn BlockDevice> {
        Arc::clone(&self.device)
    }

    /// Acquires the cached buffer for `block_id`, loading it from the
    /// device on a miss.
    pub fn get(&mut self, block_id: u64) -> Result<Arc<Mutex<BlockCache>>> {
        if block_id >= self.device.num_blocks() {
            return Err(FsError::BadBlock(block_id));
        }
        if let Some((_, entry)) = self.entries.iter().find(|(id, _)| *id == block_id) {
            return Ok(Arc::clone(entry));
        }
        if self.entries.len() >= CACHE_CAPACITY {
            if let Some(idx) = self
                .entries
                .iter()
                .position(|(_, entry)| Arc::strong_count(entry) == 1)
            {
                self.entries.remove(idx);
            }
            // All entries pinned: let the cache grow rather than fail the
            // lookup. It shrinks again as references drop.
        }
        let entry = Arc::new(Mutex::new(BlockCache::load(
            block_id,
            Arc::clone(&self.device),
        )?));
        self.entries.push_back((block_id, Arc::clone(&entry)));
        Ok(entry)
    }

    /// Writes every dirty buffer back and flushes the device.
    pub fn flush(&mut self) -> Result<()> {
        for (_, entry) in self.entries.iter() {
            entry.lock().unwrap().sync()?;
        }
        self.device.flush()
    }
}

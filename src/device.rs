//! Block device abstraction and the mmap-backed image device.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use memmap2::MmapMut;

use crate::error::{FsError, Result};
use crate::layout::BLOCK_SIZE;

/// Block-addressed access to backing storage. Implementations must be
/// safe to call from multiple threads; the filesystem performs no
/// synchronization of its own below the block cache.
pub trait BlockDevice: Send + Sync {
    /// Number of `BLOCK_SIZE` blocks the device holds.
    fn num_blocks(&self) -> u64;

    /// Reads one block. `buf.len()` must equal `BLOCK_SIZE`.
    fn read_block(&self, block_id: u64, buf: &mut [u8]) -> Result<()>;

    /// Writes one block. `buf.len()` must equal `BLOCK_SIZE`.
    fn write_block(&self, block_id: u64, buf: &[u8]) -> Result<()>;

    /// Persists any buffered writes.
    fn flush(&self) -> Result<()>;
}

/// A regular file mapped into memory and exposed as a block device.
/// This is the usual backing for an image produced by [`crate::mkfs`].
pub struct ImageDisk {
    map: Mutex<MmapMut>,
    num_blocks: u64,
}

impl ImageDisk {
    /// Opens an existing image file. The file length must be a whole
    /// number of blocks.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path.as_ref())?;
        let len = file.metadata()?.len();
        if len == 0 || len % BLOCK_SIZE as u64 != 0 {
            return Err(FsError::CorruptFormat(format!(
                "image length {len} is not a multiple of the block size"
            )));
        }
        // Mapping can only fail if the file cannot be mapped read/write,
        // which the OpenOptions above already guarantee we asked for.
        let map = unsafe { MmapMut::map_mut(&file)? };
        Ok(Self {
            map: Mutex::new(map),
            num_blocks: len / BLOCK_SIZE as u64,
        })
    }

    /// Creates (or truncates) an image file of `num_blocks` blocks,
    /// zero-filled.
    pub fn create<P: AsRef<Path>>(path: P, num_blocks: u64) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path.as_ref())?;
        file.set_len(num_blocks * BLOCK_SIZE as u64)?;
        let map = unsafe { MmapMut::map_mut(&file)? };
        Ok(Self {
            map: Mutex::new(map),
            num_blocks,
        })
    }

    fn range(&self, block_id: u64) -> Result<std::ops::Range<usize>> {
        if block_id >= self.num_blocks {
            return Err(FsError::BadBlock(block_id));
        }
        let start = block_id as usize * BLOCK_SIZE;
        Ok(start..start + BLOCK_SIZE)
    }
}

impl BlockDevice for ImageDisk {
    fn num_blocks(&self) -> u64 {
        self.num_blocks
    }

    fn read_block(&self, block_id: u64, buf: &mut [u8]) -> Result<()> {
        let range = self.range(block_id)?;
        let map = self.map.lock().unwrap();
        buf.copy_from_slice(&map[range]);
        Ok(())
    }

    fn write_block(&self, block_id: u64, buf: &[u8]) -> Result<()> {
        let range = self.range(block_id)?;
        let mut map = self.map.lock().unwrap();
        map[range].copy_from_slice(buf);
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.map.lock().unwrap().flush()?;
        Ok(())
    }
}

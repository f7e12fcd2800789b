//! Shared fixtures for the integration tests.

use std::sync::{Arc, Mutex};

use monofs::{mkfs, BlockDevice, FsError, Result, SeedFile, BLOCK_SIZE};

pub const HELLO_CONTENTS: &[u8] = b"hello from a one-block file\n";

/// A volatile block device backed by a plain byte vector.
pub struct RamDisk {
    data: Mutex<Vec<u8>>,
    num_blocks: u64,
}

impl RamDisk {
    pub fn new(num_blocks: u64) -> Arc<Self> {
        Arc::new(Self {
            data: Mutex::new(vec![0u8; num_blocks as usize * BLOCK_SIZE]),
            num_blocks,
        })
    }
}

impl BlockDevice for RamDisk {
    fn num_blocks(&self) -> u64 {
        self.num_blocks
    }

    fn read_block(&self, block_id: u64, buf: &mut [u8]) -> Result<()> {
        if block_id >= self.num_blocks {
            return Err(FsError::BadBlock(block_id));
        }
        let start = block_id as usize * BLOCK_SIZE;
        buf.copy_from_slice(&self.data.lock().unwrap()[start..start + BLOCK_SIZE]);
        Ok(())
    }

    fn write_block(&self, block_id: u64, buf: &[u8]) -> Result<()> {
        if block_id >= self.num_blocks {
            return Err(FsError::BadBlock(block_id));
        }
        let start = block_id as usize * BLOCK_SIZE;
        self.data.lock().unwrap()[start..start + BLOCK_SIZE].copy_from_slice(buf);
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// An 8-block image holding one root directory with a single regular file
/// `hello.txt` at inode 2: the canonical fixture of the format.
pub fn hello_image() -> Arc<RamDisk> {
    let disk = RamDisk::new(8);
    mkfs(
        disk.clone(),
        &[SeedFile {
            name: "hello.txt",
            contents: HELLO_CONTENTS,
        }],
    )
    .unwrap();
    disk
}

/// Reads a block, hands it to `edit`, and writes it back. For corrupting
/// images before mounting them.
pub fn patch_block(disk: &RamDisk, block_id: u64, edit: impl FnOnce(&mut [u8])) {
    let mut buf = vec![0u8; BLOCK_SIZE];
    disk.read_block(block_id, &mut buf).unwrap();
    edit(&mut buf);
    disk.write_block(block_id, &buf).unwrap();
}

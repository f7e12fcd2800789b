//! Runtime inodes: materialized views of persisted records.
//!
//! The materializer turns an inode record into a runtime object whose
//! capability set is fixed at creation from the stored type bits —
//! directories resolve and list names, regular files read and write
//! bytes. A runtime inode owns a private copy of its record, never a
//! reference into the block cache.

use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use crate::directory::{self, DirEntry};
use crate::error::{FsError, Result};
use crate::filekind::FileKind;
use crate::fs::FsInner;
use crate::inode::{self, InodeRecord};
use crate::layout::{is_data_block, BLOCK_SIZE};

/// Timestamps of a runtime inode. The format does not persist timestamps,
/// so these are stamped with the materialization time and reset whenever
/// the inode is materialized again.
#[derive(Debug, Clone, Copy)]
pub struct Timestamps {
    pub created: SystemTime,
    pub accessed: SystemTime,
    pub modified: SystemTime,
}

/// A materialized inode, alive for at most one mount.
pub struct Inode {
    record: Mutex<InodeRecord>,
    kind: FileKind,
    times: Timestamps,
    fs: Arc<FsInner>,
}

/// Looks the record up in the inode store and wires the runtime object
/// for its kind. `NotFound` propagates from the store; unrecognized type
/// bits surface as `CorruptFormat`.
pub(crate) fn materialize(fs: &Arc<FsInner>, inode_no: u64) -> Result<Inode> {
    let record = {
        let mut cache = fs.cache.lock().unwrap();
        inode::find_inode(&mut cache, &fs.superblock, inode_no)?
    };
    let kind = record.kind()?;
    let now = SystemTime::now();
    log::debug!("materialized inode {inode_no} as {kind:?}");
    Ok(Inode {
        record: Mutex::new(record),
        kind,
        times: Timestamps {
            created: now,
            accessed: now,
            modified: now,
        },
        fs: Arc::clone(fs),
    })
}

impl Inode {
    pub fn inode_no(&self) -> u64 {
        self.record.lock().unwrap().inode_no
    }

    pub fn kind(&self) -> FileKind {
        self.kind
    }

    pub fn is_directory(&self) -> bool {
        self.kind == FileKind::Directory
    }

    pub fn is_regular_file(&self) -> bool {
        self.kind == FileKind::RegularFile
    }

    pub fn mode(&self) -> u64 {
        self.record.lock().unwrap().mode
    }

    pub fn size(&self) -> u64 {
        self.record.lock().unwrap().size
    }

    pub fn data_block_number(&self) -> u64 {
        self.record.lock().unwrap().data_block_number
    }

    /// A copy of the persisted record as this inode sees it.
    pub fn record(&self) -> InodeRecord {
        self.record.lock().unwrap().clone()
    }

    pub fn timestamps(&self) -> Timestamps {
        self.times
    }

    /// Directory capability: resolves `name` to an inode number.
    pub fn lookup(&self, name: &[u8]) -> Result<u64> {
        if !self.is_directory() {
            return Err(FsError::NotDirectory);
        }
        let record = self.record.lock().unwrap().clone();
        let mut cache = self.fs.cache.lock().unwrap();
        directory::resolve(&mut cache, &record, name)
    }

    /// Directory capability: lists the valid entries in slot order.
    pub fn entries(&self) -> Result<Vec<DirEntry>> {
        if !self.is_directory() {
            return Err(FsError::NotDirectory);
        }
        let record = self.record.lock().unwrap().clone();
        let mut cache = self.fs.cache.lock().unwrap();
        directory::read_entries(&mut cache, &record)
    }

    /// File capability: reads up to `buf.len()` bytes at `offset`,
    /// returning how many were read. Reads past the end return 0.
    pub fn read_at(&self, offset: usize, buf: &mut [u8]) -> Result<usize> {
        if !self.is_regular_file() {
            return Err(FsError::NotRegularFile);
        }
        let record = self.record.lock().unwrap().clone();
        let size = record.size as usize;
        if size > BLOCK_SIZE {
            return Err(FsError::CorruptFormat(format!(
                "inode {} claims {size} bytes but a file holds at most {BLOCK_SIZE}",
                record.inode_no
            )));
        }
        if offset >= size {
            return Ok(0);
        }
        if !is_data_block(record.data_block_number) {
            return Err(FsError::CorruptFormat(format!(
                "inode {} points at block {} outside the data region",
                record.inode_no, record.data_block_number
            )));
        }
        let n = buf.len().min(size - offset);
        let mut cache = self.fs.cache.lock().unwrap();
        let guard = cache.get(record.data_block_number)?;
        let buffer = guard.lock().unwrap();
        buf[..n].copy_from_slice(&buffer.data()[offset..offset + n]);
        Ok(n)
    }

    /// File capability: writes `data` at `offset` inside the inode's
    /// single data block, growing the stored size if the write extends
    /// the file. Writes that would cross the block boundary fail with
    /// `FileTooLarge`.
    pub fn write_at(&self, offset: usize, data: &[u8]) -> Result<usize> {
        if !self.is_regular_file() {
            return Err(FsError::NotRegularFile);
        }
        let end = offset
            .checked_add(data.len())
            .ok_or(FsError::FileTooLarge)?;
        if end > BLOCK_SIZE {
            return Err(FsError::FileTooLarge);
        }
        let mut record = self.record.lock().unwrap();
        if !is_data_block(record.data_block_number) {
            return Err(FsError::CorruptFormat(format!(
                "inode {} points at block {} outside the data region",
                record.inode_no, record.data_block_number
            )));
        }
        let mut cache = self.fs.cache.lock().unwrap();
        {
            let guard = cache.get(record.data_block_number)?;
            let mut buffer = guard.lock().unwrap();
            buffer.data_mut()[offset..end].copy_from_slice(data);
        }
        if end as u64 > record.size {
            record.size = end as u64;
            inode::update_record(&mut cache, &self.fs.superblock, &record)?;
        }
        Ok(data.len())
    }
}

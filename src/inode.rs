//! The inode store: a flat array of fixed-size records in block 1.

use serde::{Deserialize, Serialize};

use crate::cache::BlockCacheManager;
use crate::codec::DiskRecord;
use crate::error::{FsError, Result};
use crate::filekind::FileKind;
use crate::layout::{inode_slot_offset, INODE_RECORD_SIZE, INODE_STORE_BLOCK, INODE_STORE_CAPACITY};
use crate::superblock::SuperBlock;

/// One persisted inode record. For directories `size` is the byte length
/// of the used entry array and `dir_children_count` the number of valid
/// entries; for regular files `dir_children_count` is zero.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct InodeRecord {
    /// Unique, dense, assigned at creation. 0 is invalid, 1 is the root.
    pub inode_no: u64,
    /// Type bits plus permission bits, `S_IFMT`-style.
    pub mode: u64,
    /// Index of the single block holding this inode's content.
    pub data_block_number: u64,
    pub size: u64,
    pub dir_children_count: u64,
}

impl DiskRecord for InodeRecord {}

impl InodeRecord {
    pub fn new_directory(inode_no: u64, data_block_number: u64, perm: u64) -> Self {
        Self {
            inode_no,
            mode: FileKind::Directory.type_bits() | perm,
            data_block_number,
            size: 0,
            dir_children_count: 0,
        }
    }

    pub fn new_regular_file(inode_no: u64, data_block_number: u64, size: u64, perm: u64) -> Self {
        Self {
            inode_no,
            mode: FileKind::RegularFile.type_bits() | perm,
            data_block_number,
            size,
            dir_children_count: 0,
        }
    }

    pub fn kind(&self) -> Result<FileKind> {
        FileKind::from_mode(self.mode)
    }

    pub fn is_directory(&self) -> bool {
        matches!(self.kind(), Ok(FileKind::Directory))
    }

    pub fn is_regular_file(&self) -> bool {
        matches!(self.kind(), Ok(FileKind::RegularFile))
    }
}

fn store_bounds(sb: &SuperBlock) -> Result<usize> {
    let count = sb.inodes_count as usize;
    if count > INODE_STORE_CAPACITY {
        return Err(FsError::CorruptFormat(format!(
            "superblock claims {count} inodes but the store holds at most {INODE_STORE_CAPACITY}"
        )));
    }
    Ok(count)
}

/// Looks up an inode record by number: a linear scan of the store block,
/// slot order, first match wins. Returns a private copy — the cached
/// buffer's lifetime is independent of the caller's. A missing number is
/// `NotFound`; whether that is an error is the caller's call.
pub fn find_inode(
    cache: &mut BlockCacheManager,
    sb: &SuperBlock,
    inode_no: u64,
) -> Result<InodeRecord> {
    if inode_no == 0 {
        return Err(FsError::NotFound);
    }
    let count = store_bounds(sb)?;
    let guard = cache.get(INODE_STORE_BLOCK)?;
    let buffer = guard.lock().unwrap();
    for slot in 0..count {
        let offset = inode_slot_offset(slot);
        let record = InodeRecord::decode_from(&buffer.data()[offset..offset + INODE_RECORD_SIZE])?;
        if record.inode_no == inode_no {
            return Ok(record);
        }
    }
    Err(FsError::NotFound)
}

/// Writes a record into a specific store slot. Used by the format
/// producer, which assigns slots densely.
pub(crate) fn store_record(
    cache: &mut BlockCacheManager,
    slot: usize,
    record: &InodeRecord,
) -> Result<()> {
    if slot >= INODE_STORE_CAPACITY {
        return Err(FsError::OutOfInodes);
    }
    let guard = cache.get(INODE_STORE_BLOCK)?;
    let mut buffer = guard.lock().unwrap();
    let offset = inode_slot_offset(slot);
    record.encode_into(&mut buffer.data_mut()[offset..offset + INODE_RECORD_SIZE])?;
    Ok(())
}

/// Rewrites the stored record with the same inode number as `record`.
/// `NotFound` if no slot holds that number.
pub(crate) fn update_record(
    cache: &mut BlockCacheManager,
    sb: &SuperBlock,
    record: &InodeRecord,
) -> Result<()> {
    let count = store_bounds(sb)?;
    let guard = cache.get(INODE_STORE_BLOCK)?;
    let mut buffer = guard.lock().unwrap();
    for slot in 0..count {
        let offset = inode_slot_offset(slot);
        let existing =
            InodeRecord::decode_from(&buffer.data()[offset..offset + INODE_RECORD_SIZE])?;
        if existing.inode_no == record.inode_no {
            record.encode_into(&mut buffer.data_mut()[offset..offset + INODE_RECORD_SIZE])?;
            return Ok(());
        }
    }
    Err(FsError::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_size_matches_layout_constant() {
        let record = InodeRecord::new_regular_file(2, 3, 11, 0o644);
        let mut buf = [0u8; 64];
        assert_eq!(record.encode_into(&mut buf).unwrap(), INODE_RECORD_SIZE);
        assert_eq!(
            InodeRecord::decode_from(&buf[..INODE_RECORD_SIZE]).unwrap(),
            record
        );
    }
}

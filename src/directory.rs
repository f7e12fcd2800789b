//! Directory entries and name resolution.
//!
//! A directory's single data block is an array of fixed-size entries.
//! Only the first `dir_children_count` entries are meaningful; whatever
//! follows them in the block is never read.

use bincode::{Decode, Encode};

use crate::cache::BlockCacheManager;
use crate::codec;
use crate::error::{FsError, Result};
use crate::inode::InodeRecord;
use crate::layout::{dir_entry_offset, DIR_ENTRIES_PER_BLOCK, DIR_ENTRY_SIZE, FILENAME_MAXLEN};

/// One (name, inode number) pair inside a directory's data block.
/// The name is zero-padded to its fixed width.
#[derive(Encode, Decode, Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirEntry {
    pub name: [u8; FILENAME_MAXLEN],
    pub inode_no: u64,
}

fn trim_zero(name: &[u8]) -> &[u8] {
    let mut end = name.len();
    while end > 0 && name[end - 1] == 0 {
        end -= 1;
    }
    &name[..end]
}

impl DirEntry {
    pub fn new(name: &[u8], inode_no: u64) -> Result<Self> {
        if name.is_empty() || name.len() > FILENAME_MAXLEN || name.contains(&0) {
            return Err(FsError::InvalidName);
        }
        let mut padded = [0u8; FILENAME_MAXLEN];
        padded[..name.len()].copy_from_slice(name);
        Ok(Self {
            name: padded,
            inode_no,
        })
    }

    /// The stored name without its zero padding.
    pub fn name_bytes(&self) -> &[u8] {
        trim_zero(&self.name)
    }

    pub fn name_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(self.name_bytes())
    }

    /// Exact byte-for-byte comparison; no normalization, no case folding.
    pub fn name_eq(&self, name: &[u8]) -> bool {
        self.name_bytes() == name
    }

    pub(crate) fn encode_into(&self, buf: &mut [u8]) -> Result<usize> {
        Ok(bincode::encode_into_slice(*self, buf, codec::config())?)
    }

    pub(crate) fn decode_from(buf: &[u8]) -> Result<Self> {
        let (entry, _) = bincode::decode_from_slice(buf, codec::config())?;
        Ok(entry)
    }
}

fn checked_children(dir: &InodeRecord) -> Result<usize> {
    if !dir.is_directory() {
        return Err(FsError::NotDirectory);
    }
    let count = dir.dir_children_count as usize;
    if count > DIR_ENTRIES_PER_BLOCK {
        return Err(FsError::CorruptFormat(format!(
            "directory inode {} claims {count} children but one block holds at most {DIR_ENTRIES_PER_BLOCK}",
            dir.inode_no
        )));
    }
    if !crate::layout::is_data_block(dir.data_block_number) {
        return Err(FsError::CorruptFormat(format!(
            "directory inode {} points at block {} outside the data region",
            dir.inode_no, dir.data_block_number
        )));
    }
    Ok(count)
}

/// Scans `dir`'s data block for an entry named `name` and returns its
/// inode number. `dir` must be a directory record. A miss is `NotFound` —
/// an expected outcome, not a malformed filesystem.
pub fn resolve(cache: &mut BlockCacheManager, dir: &InodeRecord, name: &[u8]) -> Result<u64> {
    let count = checked_children(dir)?;
    if name.is_empty() || name.len() > FILENAME_MAXLEN {
        // Such a name can never have been stored.
        return Err(FsError::NotFound);
    }
    let guard = cache.get(dir.data_block_number)?;
    let buffer = guard.lock().unwrap();
    for index in 0..count {
        let offset = dir_entry_offset(index);
        let entry = DirEntry::decode_from(&buffer.data()[offset..offset + DIR_ENTRY_SIZE])?;
        log::debug!(
            "dir {}: entry {} is {:?} -> inode {}",
            dir.inode_no,
            index,
            entry.name_lossy(),
            entry.inode_no
        );
        if entry.name_eq(name) {
            return Ok(entry.inode_no);
        }
    }
    Err(FsError::NotFound)
}

/// Reads the valid entries of a directory, in slot order.
pub fn read_entries(cache: &mut BlockCacheManager, dir: &InodeRecord) -> Result<Vec<DirEntry>> {
    let count = checked_children(dir)?;
    let guard = cache.get(dir.data_block_number)?;
    let buffer = guard.lock().unwrap();
    let mut entries = Vec::with_capacity(count);
    for index in 0..count {
        let offset = dir_entry_offset(index);
        entries.push(DirEntry::decode_from(
            &buffer.data()[offset..offset + DIR_ENTRY_SIZE],
        )?);
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_size_matches_layout_constant() {
        let entry = DirEntry::new(b"hello.txt", 2).unwrap();
        let mut buf = [0u8; 128];
        assert_eq!(entry.encode_into(&mut buf).unwrap(), DIR_ENTRY_SIZE);
        assert_eq!(
            DirEntry::decode_from(&buf[..DIR_ENTRY_SIZE]).unwrap(),
            entry
        );
    }

    #[test]
    fn name_comparison_is_exact() {
        let entry = DirEntry::new(b"File", 7).unwrap();
        assert!(entry.name_eq(b"File"));
        assert!(!entry.name_eq(b"file"));
        assert!(!entry.name_eq(b"Fil"));
        assert!(!entry.name_eq(b"File\0"));
    }

    #[test]
    fn rejects_unstorable_names() {
        assert!(matches!(DirEntry::new(b"", 1), Err(FsError::InvalidName)));
        assert!(matches!(
            DirEntry::new(&[b'a'; FILENAME_MAXLEN + 1], 1),
            Err(FsError::InvalidName)
        ));
        assert!(matches!(
            DirEntry::new(b"nul\0name", 1),
            Err(FsError::InvalidName)
        ));
    }
}

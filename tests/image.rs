//! Integration tests against a real image file on disk.

mod common;

use std::path::Path;
use std::sync::Arc;

use common::{init_logger, HELLO_CONTENTS};
use monofs::{mkfs, FsError, ImageDisk, Monofs, SeedFile, BLOCK_SIZE};

fn fresh_image(path: &Path, num_blocks: u64) -> anyhow::Result<Arc<ImageDisk>> {
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    let disk = Arc::new(ImageDisk::create(path, num_blocks)?);
    mkfs(
        disk.clone(),
        &[SeedFile {
            name: "hello.txt",
            contents: HELLO_CONTENTS,
        }],
    )?;
    Ok(disk)
}

#[test]
fn image_file_round_trip() -> anyhow::Result<()> {
    init_logger();
    let path = Path::new("/tmp/monofs_round_trip.img");
    {
        let disk = fresh_image(path, 8)?;
        let fs = Monofs::mount(disk)?;
        assert_eq!(fs.root().lookup(b"hello.txt")?, 2);
        fs.unmount()?;
    }

    // Reopen the same file: everything written at format time persists.
    let disk = Arc::new(ImageDisk::open(path)?);
    let fs = Monofs::mount(disk)?;
    let file = fs.resolve_path("/hello.txt")?;
    let mut buf = vec![0u8; BLOCK_SIZE];
    let n = file.read_at(0, &mut buf)?;
    assert_eq!(&buf[..n], HELLO_CONTENTS);
    drop(fs);

    std::fs::remove_file(path)?;
    Ok(())
}

#[test]
fn open_rejects_ragged_files() -> anyhow::Result<()> {
    init_logger();
    let path = Path::new("/tmp/monofs_ragged.img");
    std::fs::write(path, vec![0u8; BLOCK_SIZE + 17])?;
    assert!(matches!(
        ImageDisk::open(path),
        Err(FsError::CorruptFormat(_))
    ));
    std::fs::remove_file(path)?;
    Ok(())
}

#[test]
fn too_small_device_cannot_be_formatted() -> anyhow::Result<()> {
    init_logger();
    let path = Path::new("/tmp/monofs_tiny.img");
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    let disk = Arc::new(ImageDisk::create(path, 2)?);
    assert!(matches!(mkfs(disk, &[]), Err(FsError::OutOfSpace)));
    std::fs::remove_file(path)?;
    Ok(())
}

//! Builds an empty octofs disk image and, optionally, seeds it with files
//! copied in from the host file system. Grounded on the teacher's own
//! `mkfs`, rewritten against the `octofs` crate directly instead of
//! hand-rolling the on-disk layout a second time.

use std::env::args;
use std::fs::OpenOptions;

use octofs::{FileDisk, FileSystem, Task};

/// Total sectors in a freshly formatted image. At `SECTOR_SIZE` bytes each
/// this is a 4 MiB image, plenty for a demo file set.
const DEFAULT_SECTOR_COUNT: u32 = 8192;

fn main() {
    env_logger::init();

    let args: Vec<String> = args().collect();
    if args.len() < 2 {
        eprintln!("Usage: mkfs <fs.img> [files...]");
        std::process::exit(1);
    }

    let out_path = &args[1];
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(out_path)
        .unwrap_or_else(|e| panic!("mkfs: failed to open {out_path}: {e}"));

    let device =
        FileDisk::open(file, DEFAULT_SECTOR_COUNT).expect("mkfs: failed to size output image");
    let fs = FileSystem::init(Box::new(device), true);
    let task = Task::new();

    for host_path in &args[2..] {
        copy_in(&fs, &task, host_path);
    }

    fs.done().expect("mkfs: failed to flush free map");
    println!("mkfs: wrote {DEFAULT_SECTOR_COUNT} sectors to {out_path}");
}

/// Copies one host file into the image's root directory under its own
/// basename, the same flattened layout the teacher's `mkfs` uses for its
/// seed files.
fn copy_in(fs: &FileSystem, task: &Task, host_path: &str) {
    let name = host_path.rsplit('/').next().unwrap_or(host_path);
    let contents =
        std::fs::read(host_path).unwrap_or_else(|e| panic!("mkfs: failed to read {host_path}: {e}"));

    let dest = format!("/{name}");
    fs.create(task, &dest, contents.len() as u32)
        .unwrap_or_else(|e| panic!("mkfs: failed to create {dest}: {e}"));

    let mut handle = fs
        .open(task, &dest)
        .expect("mkfs: failed to reopen freshly created file");

    let mut offset = 0usize;
    while offset < contents.len() {
        let n = fs
            .write(&mut handle, &contents[offset..])
            .expect("mkfs: write failed");
        if n == 0 {
            break;
        }
        offset += n as usize;
    }

    fs.close(handle);
    println!("mkfs: wrote {dest} ({} bytes)", contents.len());
}

//! The FS facade (C4) and the process-wide context the rest of the core is
//! built around. `FileSystem` bundles the device, free map, and open-inode
//! table the teacher keeps as separate `static` singletons (`SB`,
//! `INODE_TABLE`, `BCACHE`) into one owned, testable value, per spec.md §9's
//! design note to "pass them through a single context value".

use log::{debug, warn};

use crate::device::{BlockDevice, Sector};
use crate::error::{FsError, FsResult};
use crate::file::File;
use crate::free_map::FreeMap;
use crate::inode::{Inode, InodeTable};
use crate::layout::ROOT_DIR_SECTOR;
use crate::sync::SpinLock;
use crate::task::Task;

pub struct FileSystem {
    pub(crate) device: Box<dyn BlockDevice>,
    pub(crate) free_map: SpinLock<FreeMap>,
    pub(crate) inodes: InodeTable,
    /// `filesys_lock`: a single coarse lock serializing every syscall-level
    /// operation that touches the directory tree or inode table.
    filesys_lock: SpinLock<()>,
}

impl FileSystem {
    /// `filesys_init(format: bool)`. Panics if the device is absent, the
    /// only fatal condition per spec.md §7 ("device absence at init").
    pub fn init(device: Box<dyn BlockDevice>, format: bool) -> Self {
        let total_sectors = device.sector_count();
        assert!(total_sectors > ROOT_DIR_SECTOR, "filesys_init: device too small");

        let free_map = if format {
            debug!("formatting file system, {total_sectors} sectors");
            FreeMap::create(device.as_ref(), total_sectors)
        } else {
            FreeMap::open(device.as_ref(), total_sectors)
        }
        .expect("filesys_init: free map I/O failed");

        let fs = Self {
            device,
            free_map: SpinLock::new(free_map, "free_map"),
            inodes: InodeTable::new(),
            filesys_lock: SpinLock::new((), "filesys_lock"),
        };

        if format {
            fs.dir_create(ROOT_DIR_SECTOR, 0, ROOT_DIR_SECTOR)
                .expect("filesys_init: failed to create root directory");
        }

        fs
    }

    /// `filesys_done()`. Flushes the free map back to the device.
    pub fn done(&self) -> FsResult<()> {
        self.free_map.lock().persist(self.device.as_ref())
    }

    pub(crate) fn root(&self) -> FsResult<Inode> {
        self.inode_open(ROOT_DIR_SECTOR)
    }

    /// Returns a fresh open handle on the task's working directory. The
    /// caller owns this handle and must close it exactly once; the task
    /// separately keeps its own pinned handle alive until the next `chdir`.
    pub(crate) fn working_dir(&self, task: &Task) -> FsResult<Inode> {
        match task.working_dir() {
            Some(cwd) => Ok(self.inode_reopen(cwd)),
            None => {
                let root = self.root()?;
                task.set_working_dir(root);
                Ok(self.inode_reopen(root))
            }
        }
    }

    /// `filesys_create(path, initial_size) → bool`.
    pub fn create(&self, task: &Task, path: &str, initial_size: u32) -> FsResult<()> {
        let _guard = self.filesys_lock.lock();

        if path.is_empty() {
            return Err(FsError::InvalidPath);
        }

        let (prefix, leaf) = split_path(path)?;
        if leaf.is_empty() {
            return Err(FsError::InvalidPath);
        }

        let parent = self.walk_to(task, prefix)?;
        if !self.inode_is_directory(parent) {
            self.inode_close(parent);
            return Err(FsError::NotADirectory);
        }

        let sector = match self.free_map.lock().allocate(1) {
            Ok(s) => s,
            Err(e) => {
                warn!("create {path}: free map exhausted");
                self.inode_close(parent);
                return Err(e);
            }
        };

        if let Err(e) = self.inode_create(sector, initial_size, false) {
            // inode_create already released `sector` and any partial allocations.
            self.inode_close(parent);
            return Err(e);
        }

        if let Err(e) = self.dir_add(parent, leaf, sector) {
            // roll back: release the inode we just created.
            let child = self.inode_open(sector).expect("rollback: reopening the inode just created");
            self.inode_remove(child);
            self.inode_close(child);
            self.inode_close(parent);
            return Err(e);
        }

        debug!("created {path} at sector {sector}");
        self.inode_close(parent);
        Ok(())
    }

    /// `filesys_open(path) → handle?`.
    pub fn open(&self, task: &Task, path: &str) -> FsResult<File> {
        let _guard = self.filesys_lock.lock();

        if path.is_empty() {
            return Err(FsError::InvalidPath);
        }

        let (prefix, leaf) = split_path(path)?;
        let parent = self.walk_to(task, prefix)?;

        let inode = if leaf.is_empty() {
            // path was "/" itself: `parent` already is the opened root.
            parent
        } else {
            let found = self.dir_lookup(parent, leaf);
            self.inode_close(parent);
            found?
        };

        Ok(File::new(inode))
    }

    /// `filesys_remove(path) → bool`.
    pub fn remove(&self, task: &Task, path: &str) -> FsResult<()> {
        let _guard = self.filesys_lock.lock();

        if path.is_empty() {
            return Err(FsError::InvalidPath);
        }

        let (prefix, leaf) = split_path(path)?;
        if leaf.is_empty() {
            return Err(FsError::InvalidPath);
        }

        let parent = self.walk_to(task, prefix)?;
        let result = self.dir_remove(task, parent, leaf);
        self.inode_close(parent);
        result
    }

    /// `mkdir(path) → bool`.
    pub fn mkdir(&self, task: &Task, path: &str) -> FsResult<()> {
        let _guard = self.filesys_lock.lock();

        if path.is_empty() {
            return Err(FsError::InvalidPath);
        }

        let (prefix, leaf) = split_path(path)?;
        if leaf.is_empty() {
            return Err(FsError::InvalidPath);
        }

        let parent = self.walk_to(task, prefix)?;
        if !self.inode_is_directory(parent) {
            self.inode_close(parent);
            return Err(FsError::NotADirectory);
        }

        let sector = match self.free_map.lock().allocate(1) {
            Ok(s) => s,
            Err(e) => {
                self.inode_close(parent);
                return Err(e);
            }
        };

        if let Err(e) = self.dir_create(sector, 0, parent.sector) {
            self.inode_close(parent);
            return Err(e);
        }

        if let Err(e) = self.dir_add(parent, leaf, sector) {
            let child = self.inode_open(sector).expect("rollback: reopening the inode just created");
            self.inode_remove(child);
            self.inode_close(child);
            self.inode_close(parent);
            return Err(e);
        }

        self.inode_close(parent);
        Ok(())
    }

    /// `chdir(path) → bool`.
    pub fn chdir(&self, task: &Task, path: &str) -> FsResult<()> {
        let _guard = self.filesys_lock.lock();

        if path.is_empty() {
            return Err(FsError::InvalidPath);
        }

        let inode = self.resolve(task, path)?;
        if !self.inode_is_directory(inode) {
            self.inode_close(inode);
            return Err(FsError::NotADirectory);
        }

        // `inode` becomes the new pinned handle backing the task's cwd;
        // whatever was pinned before is now the caller's to close.
        if let Some(previous) = task.set_working_dir(inode) {
            self.inode_close(previous);
        }

        Ok(())
    }

    /// `readdir(handle, out_name) → bool`. See [`File::readdir`].
    pub fn readdir(&self, file: &mut File) -> FsResult<Option<String>> {
        let _guard = self.filesys_lock.lock();
        self.dir_readdir(file)
    }

    /// `isdir(handle) → bool`.
    pub fn isdir(&self, file: &File) -> bool {
        self.inode_is_directory(file.inode())
    }

    /// `inumber(handle) → int`.
    pub fn inumber(&self, file: &File) -> Sector {
        file.inode().sector
    }

    /// Number of in-use directory entries, excluding `.` and `..` (P6).
    pub fn entry_count(&self, file: &File) -> u32 {
        self.inode_entry_count(file.inode())
    }

    /// Byte length of the handle's underlying inode.
    pub fn length(&self, file: &File) -> u32 {
        self.inode_length(file.inode())
    }

    pub fn read(&self, file: &mut File, buf: &mut [u8]) -> FsResult<u32> {
        let _guard = self.filesys_lock.lock();
        let n = self.inode_read_at(file.inode(), buf, file.offset())?;
        file.advance(n);
        Ok(n)
    }

    pub fn write(&self, file: &mut File, buf: &[u8]) -> FsResult<u32> {
        let _guard = self.filesys_lock.lock();
        let n = self.inode_write_at(file.inode(), buf, file.offset())?;
        file.advance(n);
        Ok(n)
    }

    pub fn close(&self, file: File) {
        let _guard = self.filesys_lock.lock();
        self.inode_close(file.into_inode());
    }
}

/// `split(path) → (prefix, leaf)` per spec.md §4.4.2.
///
/// `leaf` is the final component; `prefix` is everything up to and
/// including that `/`, or empty if no `/` occurs. `"/"` splits to
/// `("/", "")`. An embedded empty component (`//`) or an ill-formed
/// trailing slash is rejected (spec.md §9's recommended policy).
fn split_path(path: &str) -> FsResult<(&str, &str)> {
    if path.is_empty() {
        return Err(FsError::InvalidPath);
    }

    if path == "/" {
        return Ok(("/", ""));
    }

    if path.ends_with('/') {
        return Err(FsError::InvalidPath);
    }

    match path.rfind('/') {
        Some(i) => {
            let (prefix, leaf) = path.split_at(i + 1);
            if leaf.is_empty() {
                return Err(FsError::InvalidPath);
            }
            Ok((prefix, leaf))
        }
        None => Ok(("", path)),
    }
}

//! Directory layer (C3): entry arrays persisted inside regular inodes.
//! Grounded on the teacher's `Directory` struct and `Directory::{lookup,
//! link}` in `src/fs.rs`, generalized to the full add/remove/readdir surface
//! spec.md names.

use crate::device::Sector;
use crate::error::{FsError, FsResult};
use crate::filesystem::FileSystem;
use crate::file::File;
use crate::inode::Inode;
use crate::layout::{DirEntry, NAME_MAX};
use crate::task::Task;

impl FileSystem {
    /// Slot-scan count of in-use entries, excluding `.` and `..`. Used only
    /// to cross-check `entry_count` in debug builds (spec.md §9: treat
    /// `entry_count` as authoritative but validate against a slot scan).
    fn scan_entry_count(&self, dir: Inode) -> FsResult<u32> {
        let length = self.inode_length(dir);
        let mut offset = DirEntry::SIZE as u32 * 2;
        let mut count = 0;

        while offset < length {
            if self.dir_entry_at(dir, offset)?.is_in_use() {
                count += 1;
            }
            offset += DirEntry::SIZE as u32;
        }

        Ok(count)
    }

    fn dir_entry_at(&self, dir: Inode, offset: u32) -> FsResult<DirEntry> {
        let mut buf = [0u8; DirEntry::SIZE];
        let read = self.inode_read_at(dir, &mut buf, offset)?;
        debug_assert_eq!(read as usize, DirEntry::SIZE, "short directory-entry read");
        Ok(*bytemuck::from_bytes(&buf))
    }

    fn dir_write_entry_at(&self, dir: Inode, offset: u32, entry: &DirEntry) -> FsResult<()> {
        let written = self.inode_write_at(dir, bytemuck::bytes_of(entry), offset)?;
        if written as usize != DirEntry::SIZE {
            return Err(FsError::NoSpace);
        }
        Ok(())
    }

    /// `create(sector, initial_entry_capacity, parent_sector)` (spec.md §4.3).
    pub fn dir_create(
        &self,
        sector: Sector,
        initial_entry_capacity: u32,
        parent_sector: Sector,
    ) -> FsResult<()> {
        let length = (initial_entry_capacity + 2) * DirEntry::SIZE as u32;
        self.inode_create(sector, length, true)?;

        let dir = self.inode_open(sector)?;
        self.dir_link_self(dir);
        self.dir_link_parent(dir, parent_sector);
        self.inode_close(dir);

        Ok(())
    }

    /// Writes slot 0, `.`, pointing at the directory itself.
    pub(crate) fn dir_link_self(&self, dir: Inode) {
        let entry = DirEntry::new(".", dir.sector);
        self.dir_write_entry_at(dir, 0, &entry)
            .expect("dir_link_self: slot 0 must exist");
    }

    /// Writes slot 1, `..`, pointing at `parent_sector`. The root directory
    /// passes its own sector, satisfying I5 ("root's `..` points to root").
    pub(crate) fn dir_link_parent(&self, dir: Inode, parent_sector: Sector) {
        let entry = DirEntry::new("..", parent_sector);
        self.dir_write_entry_at(dir, DirEntry::SIZE as u32, &entry)
            .expect("dir_link_parent: slot 1 must exist");
    }

    /// `lookup(dir, name) → inode?` (spec.md §4.3).
    pub fn dir_lookup(&self, dir: Inode, name: &str) -> FsResult<Inode> {
        if name.len() > NAME_MAX {
            return Err(FsError::NameTooLong);
        }
        if name == "." {
            return Ok(self.inode_reopen(dir));
        }
        if name == ".." {
            return self.dir_parent_inode(dir);
        }

        let length = self.inode_length(dir);
        let mut offset = 0;

        while offset < length {
            let entry = self.dir_entry_at(dir, offset)?;
            if entry.is_in_use() && entry.name_str() == name {
                return self.inode_open(entry.sector);
            }
            offset += DirEntry::SIZE as u32;
        }

        Err(FsError::NotFound)
    }

    /// `add(dir, name, child_sector)` (spec.md §4.3).
    pub fn dir_add(&self, dir: Inode, name: &str, child_sector: Sector) -> FsResult<()> {
        if name.is_empty() {
            return Err(FsError::InvalidPath);
        }
        if name.len() > NAME_MAX {
            return Err(FsError::NameTooLong);
        }
        if name == "." || name == ".." {
            return Err(FsError::InvalidPath);
        }

        if let Ok(existing) = self.dir_lookup(dir, name) {
            self.inode_close(existing);
            return Err(FsError::NameCollision);
        }

        let length = self.inode_length(dir);
        let mut offset = DirEntry::SIZE as u32 * 2; // skip `.` and `..`
        let mut slot = length;

        while offset < length {
            let entry = self.dir_entry_at(dir, offset)?;
            if !entry.is_in_use() {
                slot = offset;
                break;
            }
            offset += DirEntry::SIZE as u32;
        }

        let entry = DirEntry::new(name, child_sector);
        self.dir_write_entry_at(dir, slot, &entry)?;
        self.inode_increment_entries(dir);

        debug_assert_eq!(self.inode_entry_count(dir), self.scan_entry_count(dir)?);
        Ok(())
    }

    /// `remove(dir, name)` (spec.md §4.3). Enforces I3: a directory target
    /// must be empty and not the working directory of the calling task.
    pub fn dir_remove(&self, task: &Task, dir: Inode, name: &str) -> FsResult<()> {
        if name.is_empty() || name == "." || name == ".." {
            return Err(FsError::InvalidPath);
        }

        let length = self.inode_length(dir);
        let mut offset = DirEntry::SIZE as u32 * 2;
        let mut found = None;

        while offset < length {
            let entry = self.dir_entry_at(dir, offset)?;
            if entry.is_in_use() && entry.name_str() == name {
                found = Some((offset, entry));
                break;
            }
            offset += DirEntry::SIZE as u32;
        }

        let (offset, entry) = found.ok_or(FsError::NotFound)?;
        let child = self.inode_open(entry.sector)?;

        if self.inode_is_directory(child) {
            if self.inode_entry_count(child) != 0 {
                self.inode_close(child);
                return Err(FsError::DirectoryNotEmpty);
            }
            if task.working_dir().map(|cwd| cwd.sector) == Some(child.sector) {
                self.inode_close(child);
                return Err(FsError::BusyDirectory);
            }
        }

        self.inode_remove(child);
        self.inode_close(child);

        self.dir_write_entry_at(dir, offset, &DirEntry::empty())?;
        self.inode_decrement_entries(dir);

        debug_assert_eq!(self.inode_entry_count(dir), self.scan_entry_count(dir)?);
        Ok(())
    }

    /// `readdir(dir, cursor) → (name, next_cursor)?`. The cursor is the
    /// caller's open handle's byte position, so interleaved reads do not
    /// lose progress.
    pub(crate) fn dir_readdir(&self, file: &mut File) -> FsResult<Option<String>> {
        let dir = file.inode();
        let length = self.inode_length(dir);
        let mut offset = file.offset();

        while offset < length {
            let entry = self.dir_entry_at(dir, offset)?;
            offset += DirEntry::SIZE as u32;

            if entry.is_in_use() {
                let name = entry.name_str();
                if name != "." && name != ".." {
                    file.set_offset(offset);
                    return Ok(Some(name.to_string()));
                }
            }
        }

        file.set_offset(offset);
        Ok(None)
    }

    /// `empty(dir) → bool`.
    pub fn dir_empty(&self, dir: Inode) -> bool {
        self.inode_entry_count(dir) == 0
    }

    /// `equal(a, b) → bool`.
    pub fn dir_equal(&self, a: Inode, b: Inode) -> bool {
        a.sector == b.sector
    }

    /// `parent_inode(dir) → inode`.
    pub fn dir_parent_inode(&self, dir: Inode) -> FsResult<Inode> {
        let entry = self.dir_entry_at(dir, DirEntry::SIZE as u32)?;
        self.inode_open(entry.sector)
    }
}

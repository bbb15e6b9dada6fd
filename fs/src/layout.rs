//! On-disk byte layout: constants and `#[repr(C)]` + `bytemuck::Pod` structs
//! that are read and written sector-for-sector, the same technique the
//! teacher's `mkfs` tool uses for its own on-disk structures.

use bytemuck::{Pod, Zeroable};

use crate::device::Sector;

/// Bytes per addressable unit on the device.
pub const SECTOR_SIZE: usize = 512;
/// Longest directory-entry name, not counting the NUL terminator.
pub const NAME_MAX: usize = 14;

/// Direct sector pointers held inline in the inode.
pub const D: usize = 122;
/// Pointers per indirection block (`SECTOR_SIZE / size_of::<u32>()`).
pub const S: usize = SECTOR_SIZE / size_of::<u32>();

/// Maximum file size in sectors: direct + single-indirect + double-indirect fan-out.
pub const MAX_SECTORS: u64 = (D + S + S * S) as u64;
/// Maximum file size in bytes.
pub const MAX_FILE_SIZE: u64 = MAX_SECTORS * SECTOR_SIZE as u64;

/// Sentinel meaning "no sector" — the all-ones bit pattern of the sector-number type.
pub const NO_SECTOR: Sector = u32::MAX;

pub const FREE_MAP_SECTOR: Sector = 0;
pub const ROOT_DIR_SECTOR: Sector = 1;

/// Fixed sentinel stored in every on-disk inode to detect corruption.
pub const INODE_MAGIC: u32 = 0xF17E_5057;

/// On-disk inode: exactly one sector.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct DiskInode {
    pub length: u32,
    pub is_directory: u32,
    pub entry_count: u32,
    pub magic: u32,
    pub direct: [Sector; D],
    pub single_indirect: Sector,
    pub double_indirect: Sector,
}

const _: () = assert!(size_of::<DiskInode>() <= SECTOR_SIZE);

impl DiskInode {
    pub fn new(length: u32, is_directory: bool) -> Self {
        Self {
            length,
            is_directory: is_directory as u32,
            entry_count: 0,
            magic: INODE_MAGIC,
            direct: [NO_SECTOR; D],
            single_indirect: NO_SECTOR,
            double_indirect: NO_SECTOR,
        }
    }

    pub fn is_directory(&self) -> bool {
        self.is_directory != 0
    }

    pub fn sectors_in_use(&self) -> u32 {
        self.length.div_ceil(SECTOR_SIZE as u32)
    }
}

/// A single indirection block: `S` sector pointers, exactly one sector.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct IndirectBlock {
    pub entries: [Sector; S],
}

const _: () = assert!(size_of::<IndirectBlock>() == SECTOR_SIZE);

impl IndirectBlock {
    pub fn empty() -> Self {
        Self {
            entries: [NO_SECTOR; S],
        }
    }
}

/// Fixed-width directory entry record.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct DirEntry {
    pub in_use: u8,
    _pad: [u8; 3],
    pub sector: Sector,
    pub name: [u8; NAME_MAX + 1],
    // `name`'s length (15) leaves the struct one byte short of a multiple of
    // four; pad it out explicitly so `Pod` sees a fully accounted-for
    // layout instead of a hidden compiler-inserted byte.
    _tail_pad: [u8; 1],
}

impl DirEntry {
    pub const SIZE: usize = size_of::<Self>();

    pub fn empty() -> Self {
        Self {
            in_use: 0,
            _pad: [0; 3],
            sector: NO_SECTOR,
            name: [0; NAME_MAX + 1],
            _tail_pad: [0; 1],
        }
    }

    pub fn new(name: &str, sector: Sector) -> Self {
        let mut entry = Self::empty();
        entry.set_name(name);
        entry.sector = sector;
        entry.in_use = 1;
        entry
    }

    pub fn name_str(&self) -> &str {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(self.name.len());
        std::str::from_utf8(&self.name[..end]).unwrap_or("")
    }

    pub fn set_name(&mut self, name: &str) {
        self.name.fill(0);
        let bytes = name.as_bytes();
        let len = bytes.len().min(NAME_MAX);
        self.name[..len].copy_from_slice(&bytes[..len]);
    }

    pub fn is_in_use(&self) -> bool {
        self.in_use != 0
    }
}

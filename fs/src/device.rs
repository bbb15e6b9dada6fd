//! The block device driver is an external collaborator; this module only
//! defines the seam the core talks to and two concrete implementations used
//! by tests and by the `mkfs`/shell front-ends.

use std::fs::File;
use std::io;
use std::os::unix::fs::FileExt;

use crate::layout::SECTOR_SIZE;

pub type Sector = u32;

/// Synchronous sector-addressed storage.
///
/// Mirrors the external block-device role the facade acquires at init
/// (`block_get_role(FILESYS)`): `read`/`write` are whole-sector, synchronous,
/// and never partially succeed.
pub trait BlockDevice {
    fn read_sector(&self, sector: Sector, buf: &mut [u8; SECTOR_SIZE]) -> io::Result<()>;
    fn write_sector(&self, sector: Sector, buf: &[u8; SECTOR_SIZE]) -> io::Result<()>;

    /// Total number of addressable sectors.
    fn sector_count(&self) -> u32;
}

/// An in-memory disk, sized at construction. Used by tests and by anything
/// that wants a scratch file system without touching the host file system.
pub struct RamDisk {
    sectors: std::sync::Mutex<Vec<[u8; SECTOR_SIZE]>>,
}

impl RamDisk {
    pub fn new(sector_count: u32) -> Self {
        Self {
            sectors: std::sync::Mutex::new(vec![[0u8; SECTOR_SIZE]; sector_count as usize]),
        }
    }
}

impl BlockDevice for RamDisk {
    fn read_sector(&self, sector: Sector, buf: &mut [u8; SECTOR_SIZE]) -> io::Result<()> {
        let sectors = self.sectors.lock().unwrap();
        buf.copy_from_slice(&sectors[sector as usize]);
        Ok(())
    }

    fn write_sector(&self, sector: Sector, buf: &[u8; SECTOR_SIZE]) -> io::Result<()> {
        let mut sectors = self.sectors.lock().unwrap();
        sectors[sector as usize].copy_from_slice(buf);
        Ok(())
    }

    fn sector_count(&self) -> u32 {
        self.sectors.lock().unwrap().len() as u32
    }
}

/// A disk image backed by a host file, the same way `mkfs` treats its output
/// file: fixed-size, accessed via positional reads/writes so no seek state is
/// shared across callers.
pub struct FileDisk {
    file: File,
    sector_count: u32,
}

impl FileDisk {
    pub fn open(file: File, sector_count: u32) -> io::Result<Self> {
        file.set_len(sector_count as u64 * SECTOR_SIZE as u64)?;
        Ok(Self { file, sector_count })
    }
}

impl BlockDevice for FileDisk {
    fn read_sector(&self, sector: Sector, buf: &mut [u8; SECTOR_SIZE]) -> io::Result<()> {
        self.file.read_exact_at(buf, sector as u64 * SECTOR_SIZE as u64)
    }

    fn write_sector(&self, sector: Sector, buf: &[u8; SECTOR_SIZE]) -> io::Result<()> {
        self.file.write_all_at(buf, sector as u64 * SECTOR_SIZE as u64)
    }

    fn sector_count(&self) -> u32 {
        self.sector_count
    }
}

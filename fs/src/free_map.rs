//! Persistent bitmap allocator over device sectors (C1).
//!
//! One bit per sector: 1 = free, 0 = allocated. The map itself lives at
//! `FREE_MAP_SECTOR` and spans as many sectors as are needed to cover the
//! whole device, mirroring the teacher's `Block::alloc`/`Block::free`
//! first-fit bitmap scan (`src/fs.rs`), generalized from "one bit" to "a
//! contiguous run of `n` bits".

use crate::device::{BlockDevice, Sector};
use crate::error::{FsError, FsResult};
use crate::layout::{FREE_MAP_SECTOR, SECTOR_SIZE};

const BITS_PER_SECTOR: u32 = SECTOR_SIZE as u32 * 8;

pub struct FreeMap {
    total_sectors: u32,
    /// 1 bit per sector, little-endian within each byte, same convention as
    /// the teacher's bitmap sectors.
    bits: Vec<u8>,
}

impl FreeMap {
    fn sector_span(total_sectors: u32) -> u32 {
        total_sectors.div_ceil(BITS_PER_SECTOR)
    }

    /// Creates a blank map with every sector marked free, except the sectors
    /// the map itself and the fixed root directory occupy.
    pub fn create(device: &dyn BlockDevice, total_sectors: u32) -> FsResult<Self> {
        let span = Self::sector_span(total_sectors);
        let mut map = Self {
            total_sectors,
            bits: vec![0xFF; span as usize * SECTOR_SIZE],
        };

        for reserved in 0..=crate::layout::ROOT_DIR_SECTOR {
            map.mark_allocated(reserved);
        }
        for sector in FREE_MAP_SECTOR..FREE_MAP_SECTOR + span {
            map.mark_allocated(sector);
        }

        map.persist(device)?;
        Ok(map)
    }

    /// Reads the persisted bitmap back into memory.
    pub fn open(device: &dyn BlockDevice, total_sectors: u32) -> FsResult<Self> {
        let span = Self::sector_span(total_sectors);
        let mut bits = vec![0u8; span as usize * SECTOR_SIZE];

        for (i, chunk) in bits.chunks_mut(SECTOR_SIZE).enumerate() {
            let mut buf = [0u8; SECTOR_SIZE];
            device.read_sector(FREE_MAP_SECTOR + i as u32, &mut buf)?;
            chunk.copy_from_slice(&buf);
        }

        Ok(Self { total_sectors, bits })
    }

    /// Writes the in-memory bitmap back to disk.
    pub fn persist(&self, device: &dyn BlockDevice) -> FsResult<()> {
        for (i, chunk) in self.bits.chunks(SECTOR_SIZE).enumerate() {
            let mut buf = [0u8; SECTOR_SIZE];
            buf.copy_from_slice(chunk);
            device.write_sector(FREE_MAP_SECTOR + i as u32, &buf)?;
        }
        Ok(())
    }

    fn is_free(&self, sector: Sector) -> bool {
        let byte = sector / 8;
        let bit = sector % 8;
        self.bits[byte as usize] & (1 << bit) != 0
    }

    fn mark_allocated(&mut self, sector: Sector) {
        let byte = sector / 8;
        let bit = sector % 8;
        self.bits[byte as usize] &= !(1 << bit);
    }

    fn mark_free(&mut self, sector: Sector) {
        let byte = sector / 8;
        let bit = sector % 8;
        self.bits[byte as usize] |= 1 << bit;
    }

    /// First-fit search for a run of `n` contiguous free sectors.
    pub fn allocate(&mut self, n: u32) -> FsResult<Sector> {
        if n == 0 {
            return Ok(crate::layout::NO_SECTOR);
        }

        let mut run_start = None;
        let mut run_len = 0u32;

        for sector in 0..self.total_sectors {
            if self.is_free(sector) {
                if run_start.is_none() {
                    run_start = Some(sector);
                }
                run_len += 1;

                if run_len == n {
                    let start = run_start.unwrap();
                    for s in start..start + n {
                        self.mark_allocated(s);
                    }
                    return Ok(start);
                }
            } else {
                run_start = None;
                run_len = 0;
            }
        }

        Err(FsError::NoSpace)
    }

    /// Releases a previously allocated run of `n` sectors starting at `start`.
    pub fn release(&mut self, start: Sector, n: u32) {
        for s in start..start + n {
            self.mark_free(s);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::RamDisk;

    #[test]
    fn allocate_then_release_restores_bitmap() {
        let disk = RamDisk::new(4096);
        let mut map = FreeMap::create(&disk, 4096).unwrap();

        let before = map.bits.clone();
        let s = map.allocate(10).unwrap();
        map.release(s, 10);

        assert_eq!(map.bits, before);
    }

    #[test]
    fn allocate_runs_are_contiguous_and_first_fit() {
        let disk = RamDisk::new(4096);
        let mut map = FreeMap::create(&disk, 4096).unwrap();

        let a = map.allocate(5).unwrap();
        let b = map.allocate(3).unwrap();
        assert_eq!(b, a + 5);
    }

    #[test]
    fn allocate_fails_when_exhausted() {
        let disk = RamDisk::new(64);
        let mut map = FreeMap::create(&disk, 64).unwrap();
        let available = (0..64).filter(|&s| map.is_free(s)).count() as u32;

        assert!(map.allocate(available).is_ok());
        assert_eq!(map.allocate(1), Err(FsError::NoSpace));
    }
}

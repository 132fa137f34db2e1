
use std::fs::File;
use std::io::{Read, Write};
use std::io::{Seek, SeekFrom};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use block_dev::BlockDevice;
use flat_fs::{FreeMap, SectorId, SECTOR_SIZE};

#[derive(Debug)]
pub struct BlockFile(pub Mutex<File>);

impl BlockDevice for BlockFile {
    fn read_block(&self, block_id: usize, buf: &mut [u8]) {
        let mut file = self.0.lock().unwrap();
        file.seek(SeekFrom::Start((block_id * SECTOR_SIZE) as u64))
            .expect("seeking error");
        assert_eq!(file.read(buf).unwrap(), SECTOR_SIZE, "not a complete sector!");
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) {
        let mut file = self.0.lock().unwrap();
        file.seek(SeekFrom::Start((block_id * SECTOR_SIZE) as u64))
            .expect("seeking error");
        assert_eq!(
            file.write(buf).unwrap(),
            SECTOR_SIZE,
            "not a complete sector!"
        );
    }
}

/// In-memory disk with device I/O counters, so tests can observe
/// exactly when the cache touches the device.
#[derive(Debug)]
pub struct MemDisk {
    sectors: Mutex<Vec<u8>>,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl MemDisk {
    pub fn new(sectors: usize) -> Self {
        Self {
            sectors: Mutex::new(vec![0; sectors * SECTOR_SIZE]),
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }

    /// Raw on-device bytes of one sector, bypassing any cache above.
    pub fn raw(&self, sector: usize) -> Vec<u8> {
        let sectors = self.sectors.lock().unwrap();
        sectors[sector * SECTOR_SIZE..(sector + 1) * SECTOR_SIZE].to_vec()
    }
}

impl BlockDevice for MemDisk {
    fn read_block(&self, block_id: usize, buf: &mut [u8]) {
        self.reads.fetch_add(1, Ordering::Relaxed);
        let sectors = self.sectors.lock().unwrap();
        buf.copy_from_slice(&sectors[block_id * SECTOR_SIZE..block_id * SECTOR_SIZE + buf.len()]);
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) {
        self.writes.fetch_add(1, Ordering::Relaxed);
        let mut sectors = self.sectors.lock().unwrap();
        sectors[block_id * SECTOR_SIZE..block_id * SECTOR_SIZE + buf.len()].copy_from_slice(buf);
    }
}

/// Shared first-fit extent allocator over a fixed pool of sectors.
#[derive(Debug, Clone)]
pub struct MemFreeMap(Arc<Mutex<Vec<bool>>>);

impl MemFreeMap {
    pub fn new(total: usize) -> Self {
        Self(Arc::new(Mutex::new(vec![false; total])))
    }

    /// Pin sectors the allocator must never hand out, e.g. inode headers.
    pub fn reserve(&self, first: SectorId, count: usize) {
        let mut used = self.0.lock().unwrap();
        for sector in used[first.block()..first.block() + count].iter_mut() {
            *sector = true;
        }
    }

    pub fn is_free(&self, sector: SectorId) -> bool {
        !self.0.lock().unwrap()[sector.block()]
    }
}

impl FreeMap for MemFreeMap {
    fn allocate(&mut self, count: usize) -> Option<SectorId> {
        let mut used = self.0.lock().unwrap();
        if count > used.len() {
            return None;
        }

        for start in 0..=used.len() - count {
            if used[start..start + count].iter().all(|&taken| !taken) {
                used[start..start + count].iter_mut().for_each(|s| *s = true);
                return Some(SectorId::new(start as u32));
            }
        }

        None
    }

    fn release(&mut self, first: SectorId, count: usize) {
        let mut used = self.0.lock().unwrap();
        for sector in used[first.block()..first.block() + count].iter_mut() {
            // releasing twice would corrupt the pool
            assert!(*sector, "releasing a sector that is not allocated");
            *sector = false;
        }
    }
}

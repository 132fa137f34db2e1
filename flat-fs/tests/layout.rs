use std::mem;

use flat_fs::layout::DiskInode;
use flat_fs::{SectorId, SECTOR_SIZE};

#[test]
fn disk_inode_spans_one_sector() {
    assert_eq!(SECTOR_SIZE, mem::size_of::<DiskInode>());
}

#[test]
fn header_fields() {
    let header = DiskInode::new(SectorId::new(3), 1000);
    assert!(header.is_valid());
    assert_eq!(SectorId::new(3), header.start());
    assert_eq!(1000, header.length());
    assert_eq!(2, header.sectors());
}

#[test]
fn blank_sector_is_not_an_inode() {
    let blank = DiskInode::from_bytes([0; SECTOR_SIZE]);
    assert!(!blank.is_valid());
}

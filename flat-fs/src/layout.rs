//! # 磁盘数据结构层
//!
//! 每个inode在磁盘上恰好占据一个扇区，指向一段**连续**的数据扇区。

use core::mem;
use core::ptr;
use core::slice;

use crate::sector::SectorId;
use crate::MAGIC;
use crate::SECTOR_SIZE;

/// 磁盘上的inode
#[repr(C)]
pub struct DiskInode {
    /// 数据区段的起始扇区
    start: u32,
    /// 文件字节数
    // 不用usize是为了严控布局
    length: u32,
    /// 魔数：校验inode合法性
    magic: u32,
    unused: [u32; 125],
}

impl DiskInode {
    pub fn new(start: SectorId, length: usize) -> Self {
        let length = u32::try_from(length).expect("file length exceeds on-disk representation");
        Self {
            start: start.into(),
            length,
            magic: MAGIC,
            unused: [0; 125],
        }
    }

    #[inline]
    pub fn from_bytes(bytes: [u8; SECTOR_SIZE]) -> Self {
        unsafe { mem::transmute(bytes) }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.magic == MAGIC
    }

    #[inline]
    pub fn start(&self) -> SectorId {
        SectorId::new(self.start)
    }

    #[inline]
    pub fn length(&self) -> usize {
        self.length as usize
    }

    /// 数据区段占据的扇区数
    #[inline]
    pub fn sectors(&self) -> usize {
        sectors_for(self.length())
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        unsafe { slice::from_raw_parts(ptr::from_ref(self).cast(), SECTOR_SIZE) }
    }
}

/// 容纳`len`字节需要的数据扇区数
#[inline]
pub fn sectors_for(len: usize) -> usize {
    len.div_ceil(SECTOR_SIZE)
}

#![no_std]

extern crate alloc;

/* flatfs 的整体架构，自上而下 */

// 索引节点层：打开inode的共享、引用计数与字节读写
mod vfs;

// 磁盘管理层：文件的创建、打开与关闭
mod ffs;

// 磁盘数据结构层：磁盘上的inode
pub mod layout;

// 扇区缓存层：内存上的扇区数据缓存
mod sector;

// 空闲扇区分配接口层
mod free_map;

pub use self::{
    ffs::FlatFileSystem,
    free_map::{FreeMap, OutOfSpace},
    sector::{SectorCache, SectorId},
    vfs::Inode,
};

/// inode 头部的魔数
pub const MAGIC: u32 = 0x494e4f44;
pub const SECTOR_SIZE: usize = 512;
/// 扇区缓存的槽位数
pub const CACHE_SLOTS: usize = 64;

//! # 磁盘管理层
//!
//! 文件的创建、打开与关闭。打开的inode按头部扇区去重，
//! 磁盘空间经由外部空闲扇区分配器取得，全部设备访问经过扇区缓存。

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;

use block_dev::BlockDevice;
use log::debug;
use spin::Mutex;

use crate::free_map::{FreeMap, OutOfSpace};
use crate::layout::{self, DiskInode};
use crate::sector::{SectorCache, SectorId};
use crate::vfs::{Inode, LastClose};
use crate::SECTOR_SIZE;

const ZEROS: [u8; SECTOR_SIZE] = [0; SECTOR_SIZE];

pub struct FlatFileSystem {
    cache: Arc<SectorCache>,
    free_map: Mutex<Box<dyn FreeMap>>,
    /// 当前打开的inode表，按头部扇区唯一
    open_inodes: Mutex<Vec<Arc<Inode>>>,
}

impl FlatFileSystem {
    pub fn new(dev: Arc<dyn BlockDevice>, free_map: Box<dyn FreeMap>) -> Self {
        Self {
            cache: Arc::new(SectorCache::new(dev)),
            free_map: Mutex::new(free_map),
            open_inodes: Mutex::new(Vec::new()),
        }
    }

    /// 在`sector`创建一个`length`字节的文件：
    /// 分配连续数据区段，写入头部，数据扇区全部清零。
    /// 空间不足时失败，空闲扇区表保持原样。
    pub fn create(&self, sector: SectorId, length: usize) -> Result<(), OutOfSpace> {
        let sectors = layout::sectors_for(length);
        let start = self.free_map.lock().allocate(sectors).ok_or(OutOfSpace)?;

        let header = DiskInode::new(start, length);
        self.cache.write(sector, 0, header.as_bytes());
        for i in 0..sectors {
            self.cache.write(start + i as u32, 0, &ZEROS);
        }
        debug!("create header={:?} start={:?} sectors={}", sector, start, sectors);

        Ok(())
    }

    /// 打开`sector`处的inode；已打开则共享同一句柄
    pub fn open(&self, sector: SectorId) -> Arc<Inode> {
        let mut open_inodes = self.open_inodes.lock();

        if let Some(inode) = open_inodes.iter().find(|inode| inode.sector() == sector) {
            return Inode::reopen(inode);
        }

        let inode = Arc::new(Inode::load(sector, self.cache.clone()));
        open_inodes.push(Arc::clone(&inode));
        inode
    }

    /// 关闭一个打开者。最后一个打开者负责移出打开表；
    /// 若inode已被标记删除，还要释放头部扇区与数据区段。
    pub fn close(&self, inode: Arc<Inode>) {
        let mut open_inodes = self.open_inodes.lock();

        let last = inode.drop_opener();
        if matches!(last, LastClose::Retain) {
            return;
        }

        let pos = open_inodes
            .iter()
            .position(|open| Arc::ptr_eq(open, &inode))
            .expect("closing an inode that is not open");
        open_inodes.swap_remove(pos);

        if let LastClose::Release { start, sectors } = last {
            debug!(
                "release header={:?} start={:?} sectors={}",
                inode.sector(),
                start,
                sectors
            );
            let mut free_map = self.free_map.lock();
            free_map.release(inode.sector(), 1);
            free_map.release(start, sectors);
        }
    }

    /// 把缓存中所有脏扇区写回设备
    #[inline]
    pub fn sync_all(&self) {
        self.cache.sync_all();
    }
}

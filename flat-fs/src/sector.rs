//! # 扇区缓存层
//!
//! 固定槽位的扇区缓存：命中时在槽位锁下完成字节拷贝，
//! 未命中时按时钟(二次机会)策略挑选牺牲槽位，整扇区填充后再拷贝。
//! 脏槽位只在被置换或显式[`SectorCache::sync_all`]时写回设备。

use alloc::sync::Arc;
use core::array;

use block_dev::BlockDevice;
use derive_more::{Add, From, Into};
use log::trace;
use spin::{Mutex, MutexGuard};

use crate::CACHE_SLOTS;
use crate::SECTOR_SIZE;

/// 扇区号
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Add, From, Into)]
#[repr(transparent)]
pub struct SectorId(u32);

impl core::ops::Add<u32> for SectorId {
    type Output = Self;

    fn add(self, rhs: u32) -> Self::Output {
        self + Self(rhs)
    }
}

impl SectorId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// 拉伸扇区号至底层块ID
    #[inline]
    pub fn block(self) -> usize {
        self.0 as usize
    }
}

/// 扇区缓存
#[derive(Debug)]
pub struct SectorCache {
    /// 底层块设备的引用
    dev: Arc<dyn BlockDevice>,
    slots: [Mutex<Slot>; CACHE_SLOTS],
    /// 时钟指针；持有此锁即持有全局置换锁
    hand: Mutex<usize>,
}

/// 内存中的扇区槽位
#[derive(Debug)]
struct Slot {
    /// 缓存的数据
    data: [u8; SECTOR_SIZE],
    /// 驻留扇区；空表示槽位从未被填充过
    sector: Option<SectorId>,
    /// 二次机会位
    access: bool,
    /// 是否为脏块
    dirty: bool,
}

impl SectorCache {
    pub fn new(dev: Arc<dyn BlockDevice>) -> Self {
        Self {
            dev,
            slots: array::from_fn(|_| Mutex::new(Slot::new())),
            hand: Mutex::new(0),
        }
    }

    /// 把`sector`自`offset`起的字节拷出到`buf`
    pub fn read(&self, sector: SectorId, offset: usize, buf: &mut [u8]) {
        assert!(offset + buf.len() <= SECTOR_SIZE);

        for slot in &self.slots {
            let mut slot = slot.lock();
            if slot.sector == Some(sector) {
                slot.access = true;
                buf.copy_from_slice(&slot.data[offset..offset + buf.len()]);
                return;
            }
        }

        let mut slot = self.fill(sector);
        slot.access = false;
        slot.dirty = false;
        buf.copy_from_slice(&slot.data[offset..offset + buf.len()]);
    }

    /// 把`buf`拷入`sector`自`offset`起的字节并标脏
    pub fn write(&self, sector: SectorId, offset: usize, buf: &[u8]) {
        assert!(offset + buf.len() <= SECTOR_SIZE);

        for slot in &self.slots {
            let mut slot = slot.lock();
            if slot.sector == Some(sector) {
                slot.access = true;
                slot.dirty = true;
                slot.data[offset..offset + buf.len()].copy_from_slice(buf);
                return;
            }
        }

        // 整扇区填充保证未覆盖的字节维持扇区原有内容
        let mut slot = self.fill(sector);
        slot.access = true;
        slot.dirty = true;
        slot.data[offset..offset + buf.len()].copy_from_slice(buf);
    }

    /// 把所有脏槽位写回设备
    pub fn sync_all(&self) {
        for slot in &self.slots {
            self.write_back(&mut slot.lock());
        }
    }
}

impl SectorCache {
    /// 未命中：时钟选择牺牲槽位，整扇区填充后返回仍上着锁的槽位。
    /// `access`为真的槽位被降级而非置换，至多一整圈后必有进展。
    fn fill(&self, sector: SectorId) -> MutexGuard<'_, Slot> {
        let mut hand = self.hand.lock();
        loop {
            let index = *hand;
            *hand = (index + 1) % CACHE_SLOTS;

            let mut slot = self.slots[index].lock();
            if slot.sector.is_none() || !slot.access {
                self.write_back(&mut slot);
                self.dev.read_block(sector.block(), &mut slot.data);
                slot.sector = Some(sector);
                drop(hand);
                return slot;
            }
            slot.access = false;
        }
    }

    /// 脏槽位写回其驻留扇区
    fn write_back(&self, slot: &mut Slot) {
        if slot.dirty {
            let sector = slot.sector.expect("dirty slot without a resident sector");
            trace!("writeback sector={:?}", sector);
            self.dev.write_block(sector.block(), &slot.data);
            slot.dirty = false;
        }
    }
}

impl Slot {
    fn new() -> Self {
        Self {
            data: [0; SECTOR_SIZE],
            sector: None,
            access: false,
            dirty: false,
        }
    }
}

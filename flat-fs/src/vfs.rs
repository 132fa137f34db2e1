//! # 索引节点层
//!
//! 内存中打开的inode。同一头部扇区的所有打开者共享同一个句柄，
//! 生命周期由打开计数维持；读写以扇区为单位经过扇区缓存，
//! 按文件长度裁剪，不会增长文件。

use alloc::sync::Arc;

use spin::Mutex;

use crate::layout::DiskInode;
use crate::sector::{SectorCache, SectorId};
use crate::SECTOR_SIZE;

pub struct Inode {
    /// 头部所在扇区
    sector: SectorId,
    cache: Arc<SectorCache>,
    state: Mutex<State>,
}

struct State {
    /// 打开者个数
    open_cnt: usize,
    /// 非零时拒绝一切写入
    deny_write_cnt: usize,
    /// 已被标记删除
    removed: bool,
    /// 打开时读入的头部副本
    data: DiskInode,
}

/// 一个打开者离开后的善后动作
pub(crate) enum LastClose {
    /// 仍有其它打开者
    Retain,
    /// 从打开表移除
    Remove,
    /// 从打开表移除，并释放头部扇区与数据区段
    Release { start: SectorId, sectors: usize },
}

impl Inode {
    /// 经缓存读入`sector`处的头部并校验魔数
    pub(crate) fn load(sector: SectorId, cache: Arc<SectorCache>) -> Self {
        let mut bytes = [0; SECTOR_SIZE];
        cache.read(sector, 0, &mut bytes);
        let data = DiskInode::from_bytes(bytes);
        assert!(data.is_valid(), "bad inode magic in sector {:?}", sector);

        Self {
            sector,
            cache,
            state: Mutex::new(State {
                open_cnt: 1,
                deny_write_cnt: 0,
                removed: false,
                data,
            }),
        }
    }

    /// 再次打开：打开计数加一，句柄不变
    pub fn reopen(inode: &Arc<Self>) -> Arc<Self> {
        inode.state.lock().open_cnt += 1;
        Arc::clone(inode)
    }

    /// 自`offset`读出至多`buf.len()`字节，返回实际读出的字节数；
    /// 抵达文件末尾时提前结束
    pub fn read_at(&self, offset: usize, buf: &mut [u8]) -> usize {
        let (start, length) = {
            let state = self.state.lock();
            (state.data.start(), state.data.length())
        };

        let mut read_size = 0;
        while read_size < buf.len() {
            let pos = offset + read_size;
            if pos >= length {
                break;
            }

            let sector = start + (pos / SECTOR_SIZE) as u32;
            let sector_offset = pos % SECTOR_SIZE;
            // 剩余请求量、扇区内剩余、文件内剩余，三者取小
            let chunk = (buf.len() - read_size)
                .min(SECTOR_SIZE - sector_offset)
                .min(length - pos);

            self.cache
                .read(sector, sector_offset, &mut buf[read_size..read_size + chunk]);
            read_size += chunk;
        }

        read_size
    }

    /// 自`offset`写入至多`buf.len()`字节，返回实际写入的字节数。
    /// 写入被禁止时返回0；抵达文件末尾时提前结束，不会增长文件。
    pub fn write_at(&self, offset: usize, buf: &[u8]) -> usize {
        let (start, length) = {
            let state = self.state.lock();
            if state.deny_write_cnt > 0 {
                return 0;
            }
            (state.data.start(), state.data.length())
        };

        let mut written_size = 0;
        while written_size < buf.len() {
            let pos = offset + written_size;
            if pos >= length {
                break;
            }

            let sector = start + (pos / SECTOR_SIZE) as u32;
            let sector_offset = pos % SECTOR_SIZE;
            let chunk = (buf.len() - written_size)
                .min(SECTOR_SIZE - sector_offset)
                .min(length - pos);

            self.cache
                .write(sector, sector_offset, &buf[written_size..written_size + chunk]);
            written_size += chunk;
        }

        written_size
    }

    /// 禁止写入。每个打开者至多调用一次。
    pub fn deny_write(&self) {
        let mut state = self.state.lock();
        state.deny_write_cnt += 1;
        assert!(state.deny_write_cnt <= state.open_cnt);
    }

    /// 恢复写入。与[`Inode::deny_write`]成对，须在关闭前调用。
    pub fn allow_write(&self) {
        let mut state = self.state.lock();
        assert!(state.deny_write_cnt > 0);
        assert!(state.deny_write_cnt <= state.open_cnt);
        state.deny_write_cnt -= 1;
    }

    /// 标记删除。不影响现有打开者；
    /// 磁盘空间由最后一个关闭者释放。
    pub fn remove(&self) {
        self.state.lock().removed = true;
    }

    /// 文件字节数
    #[inline]
    pub fn length(&self) -> usize {
        self.state.lock().data.length()
    }

    /// inode 号，即头部所在扇区
    #[inline]
    pub fn sector(&self) -> SectorId {
        self.sector
    }

    /// 打开计数减一，并裁定随之而来的善后动作
    pub(crate) fn drop_opener(&self) -> LastClose {
        let mut state = self.state.lock();
        state.open_cnt -= 1;

        if state.open_cnt > 0 {
            LastClose::Retain
        } else if state.removed {
            LastClose::Release {
                start: state.data.start(),
                sectors: state.data.sectors(),
            }
        } else {
            LastClose::Remove
        }
    }
}

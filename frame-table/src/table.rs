//! # 帧表
//!
//! 记录每个被占有的内核页与正在映射它的页表项集合。
//! 页帧可被多个虚拟页共享，由最后一个引用者释放。

use alloc::collections::BTreeMap;
use alloc::collections::VecDeque;
use alloc::sync::Arc;
use alloc::vec::Vec;

use enumflags2::BitFlags;
use log::trace;
use spin::Mutex;

use crate::page::{AllocFlag, FrameSource, Kpage, PageDir, PteRef, VirtPage};

pub struct FrameTable {
    frames: Arc<dyn FrameSource>,
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    /// 内核页到帧记录的映射
    entries: BTreeMap<Kpage, FrameEntry>,
    /// 存活页帧的次序，留给将来的置换策略
    queue: VecDeque<Kpage>,
}

/// 一个被占有的页帧
#[derive(Default)]
struct FrameEntry {
    /// 正在映射此页帧的页表项；记录存活期间非空
    referents: Vec<PteRef>,
}

impl FrameTable {
    pub fn new(frames: Arc<dyn FrameSource>) -> Self {
        Self {
            frames,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// 取得一个内核页并映射到`pagedir`的`upage`处。
    /// 分配或映射失败都返回空，已取得的页会归还分配器。
    pub fn get_page(
        &self,
        pagedir: &mut dyn PageDir,
        flags: BitFlags<AllocFlag>,
        upage: VirtPage,
        writable: bool,
    ) -> Option<Kpage> {
        let page = self.frames.alloc(flags)?;

        if !install(pagedir, upage, page, writable) {
            self.frames.dealloc(page);
            return None;
        }
        let pte = pagedir
            .lookup(upage, true)
            .expect("installed page without a pte");

        let mut inner = self.inner.lock();
        let Inner { entries, queue } = &mut *inner;
        let entry = entries.entry(page).or_insert_with(|| {
            queue.push_back(page);
            FrameEntry::default()
        });
        entry.referents.push(pte);

        Some(page)
    }

    /// 撤销`pte`对其页帧的引用。最后一个引用消失时，
    /// 帧记录销毁，内核页归还分配器。
    pub fn free_page(&self, pagedir: &dyn PageDir, pte: PteRef) {
        let page = pagedir.page_of(pte);
        let mut inner = self.inner.lock();

        let Some(entry) = inner.entries.get_mut(&page) else {
            return;
        };
        if let Some(pos) = entry.referents.iter().position(|&referent| referent == pte) {
            entry.referents.remove(pos);
        }

        if entry.referents.is_empty() {
            inner.entries.remove(&page);
            inner.queue.retain(|&live| live != page);
            trace!("free page={:?}", page);
            self.frames.dealloc(page);
        }
    }
}

/// 确认`upage`尚无映射，再建立到`page`的映射
fn install(pagedir: &mut dyn PageDir, upage: VirtPage, page: Kpage, writable: bool) -> bool {
    pagedir.get_page(upage).is_none() && pagedir.set_page(upage, page, writable)
}

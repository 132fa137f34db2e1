use derive_more::{From, Into};
use enumflags2::{bitflags, BitFlags};

/// 内核页地址
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, Into)]
#[repr(transparent)]
pub struct Kpage(usize);

/// 用户虚拟页
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, Into)]
#[repr(transparent)]
pub struct VirtPage(usize);

/// 页表项的不透明标识，取值由[`PageDir`]的实现者约定
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, Into)]
#[repr(transparent)]
pub struct PteRef(usize);

impl Kpage {
    pub const fn new(raw: usize) -> Self {
        Self(raw)
    }
}

impl VirtPage {
    pub const fn new(raw: usize) -> Self {
        Self(raw)
    }
}

impl PteRef {
    pub const fn new(raw: usize) -> Self {
        Self(raw)
    }
}

/// 物理页分配标志
#[bitflags]
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocFlag {
    /// 从用户页池分配
    User = 0b01,
    /// 分配后清零
    Zero = 0b10,
}

/// 物理页帧分配器特质
pub trait FrameSource: Send + Sync {
    fn alloc(&self, flags: BitFlags<AllocFlag>) -> Option<Kpage>;
    fn dealloc(&self, page: Kpage);
}

/// 页表原语特质
pub trait PageDir {
    /// 取`vpage`对应的页表项；`create`时沿途建立缺失的中间页表
    fn lookup(&mut self, vpage: VirtPage, create: bool) -> Option<PteRef>;

    /// `vpage`当前映射到的内核页
    fn get_page(&self, vpage: VirtPage) -> Option<Kpage>;

    /// 为`vpage`建立到`page`的映射；`vpage`已有映射则拒绝
    fn set_page(&mut self, vpage: VirtPage, page: Kpage, writable: bool) -> bool;

    /// 页表项当前指向的内核页
    fn page_of(&self, pte: PteRef) -> Kpage;
}

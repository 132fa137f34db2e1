#![no_std]

extern crate alloc;

// 帧表：内核页与其引用者集合
mod table;

// 协作接口：物理页分配器与页表原语
mod page;

pub use self::{
    page::{AllocFlag, FrameSource, Kpage, PageDir, PteRef, VirtPage},
    table::FrameTable,
};

/// 物理页大小
pub const PAGE_SIZE: usize = 0x1000;

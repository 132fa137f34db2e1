//! # 块设备接口层
//!
//! [`BlockDevice`] 是对底层存储设备的抽象：按块编号同步地
//! 读写整块数据，调用可能阻塞直至设备完成。
//! 上层的缓存与文件系统只通过此特质访问设备。

#![no_std]

use core::any::Any;
use core::fmt::Debug;

/// 块设备驱动特质
pub trait BlockDevice: Send + Sync + Any + Debug {
    fn read_block(&self, block_id: usize, buf: &mut [u8]);
    fn write_block(&self, block_id: usize, buf: &[u8]);
}

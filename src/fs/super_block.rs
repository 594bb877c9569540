use std::sync::Arc;

use crate::disk::{BlockDevice, ByteIo};
use crate::fs::codec;
use crate::fs::config::N_FIELD_OFFSET;
use crate::fs::data_block_bitmap::DataBlockBitmap;
use crate::fs::error::Result;

/// 超级块管理器：空闲块位图 + 描述符总数 N。
///
/// N 字段是位图之后的 4 字节大端整数，mkfs 写入一次，
/// 之后所有层都从这里读它，没有内存缓存。
#[derive(Clone)]
pub struct SuperBlock {
    disk: Arc<dyn BlockDevice>,
    pub bitmap: DataBlockBitmap,
}

impl SuperBlock {
    pub fn new(disk: Arc<dyn BlockDevice>) -> Self {
        let bitmap = DataBlockBitmap::new(disk.clone());
        Self { disk, bitmap }
    }

    pub fn get_n(&self) -> Result<u32> {
        let bytes = self.disk.read_bytes(N_FIELD_OFFSET, 4)?;
        Ok(codec::get_u32(&bytes, 0))
    }

    pub fn set_n(&self, n: u32) -> Result<()> {
        self.disk.write_bytes(N_FIELD_OFFSET, &n.to_be_bytes())?;
        Ok(())
    }

    pub fn alloc_block(&self) -> Result<u32> {
        self.bitmap.alloc()
    }

    pub fn free_block(&self, block_index: u32) -> Result<()> {
        self.bitmap.set_free(block_index)
    }
}

use std::{
    io::{Error, ErrorKind, Result},
    sync::Mutex,
};

use crate::disk::{
    block_device::BlockDevice,
    types::{Block, BLOCK_COUNT, BLOCK_SIZE, DISK_SIZE},
};

/// 内存支撑的块设备，不跨进程持久化。测试套件用它做夹具。
#[derive(Debug)]
pub struct MemDisk {
    bytes: Mutex<Vec<u8>>,
}

impl MemDisk {
    pub fn new() -> Self {
        Self {
            bytes: Mutex::new(vec![0; DISK_SIZE as usize]),
        }
    }
}

impl Default for MemDisk {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockDevice for MemDisk {
    fn read_block(&self, block_id: u64, buf: &mut Block) -> Result<()> {
        if block_id >= BLOCK_COUNT as u64 {
            return Err(Error::new(ErrorKind::InvalidInput, "block id out of range"));
        }
        let bytes = self.bytes.lock().unwrap();
        let start = block_id as usize * BLOCK_SIZE;
        buf.copy_from_slice(&bytes[start..start + BLOCK_SIZE]);
        Ok(())
    }

    fn write_block(&self, block_id: u64, buf: &Block) -> Result<()> {
        if block_id >= BLOCK_COUNT as u64 {
            return Err(Error::new(ErrorKind::InvalidInput, "block id out of range"));
        }
        let mut bytes = self.bytes.lock().unwrap();
        let start = block_id as usize * BLOCK_SIZE;
        bytes[start..start + BLOCK_SIZE].copy_from_slice(buf);
        Ok(())
    }
}

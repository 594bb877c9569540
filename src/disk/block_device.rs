use std::io::Result;

use crate::disk::types::{Block, BLOCK_COUNT, BLOCK_SIZE};

pub trait BlockDevice: Send + Sync {
    fn read_block(&self, block_id: u64, buf: &mut Block) -> Result<()>;
    fn write_block(&self, block_id: u64, buf: &Block) -> Result<()>;

    fn block_size(&self) -> usize {
        BLOCK_SIZE
    }

    fn block_count(&self) -> u64 {
        BLOCK_COUNT as u64
    }
}

/// 按字节粒度访问块设备。
///
/// inode 表不按块对齐，一条记录可能跨越两个块；这里把任意
/// (offset, len) 的访问拆成整块操作，首尾不完整的块做读-改-写。
pub trait ByteIo {
    fn read_bytes(&self, offset: u64, len: usize) -> Result<Vec<u8>>;
    fn write_bytes(&self, offset: u64, data: &[u8]) -> Result<()>;
}

impl<T: BlockDevice + ?Sized> ByteIo for T {
    fn read_bytes(&self, offset: u64, len: usize) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(len);
        let mut buf: Block = [0; BLOCK_SIZE];
        let mut pos = offset;
        let end = offset + len as u64;

        while pos < end {
            let block_id = pos / BLOCK_SIZE as u64;
            let in_block = (pos % BLOCK_SIZE as u64) as usize;
            let take = (BLOCK_SIZE - in_block).min((end - pos) as usize);

            self.read_block(block_id, &mut buf)?;
            out.extend_from_slice(&buf[in_block..in_block + take]);

            pos += take as u64;
        }

        Ok(out)
    }

    fn write_bytes(&self, offset: u64, data: &[u8]) -> Result<()> {
        let mut buf: Block = [0; BLOCK_SIZE];
        let mut pos = offset;
        let mut done = 0usize;

        while done < data.len() {
            let block_id = pos / BLOCK_SIZE as u64;
            let in_block = (pos % BLOCK_SIZE as u64) as usize;
            let take = (BLOCK_SIZE - in_block).min(data.len() - done);

            if take < BLOCK_SIZE {
                self.read_block(block_id, &mut buf)?;
            }
            buf[in_block..in_block + take].copy_from_slice(&data[done..done + take]);
            self.write_block(block_id, &buf)?;

            pos += take as u64;
            done += take;
        }

        Ok(())
    }
}

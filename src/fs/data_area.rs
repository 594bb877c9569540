//! 数据区引擎：逻辑块索引 → 物理块地址的映射，以及建立在
//! 映射之上的 read/write/truncate。
//!
//! 块索引编码：
//! - index < 10：inode 内的直接槽
//! - 10 ≤ index < 10+1024：一级索引块内的槽
//! - 再往上是二级索引，视作 1024×1024 个槽的平坦数组，
//!   外层块和内层一级块都在首次触碰时才分配
//!
//! 槽里除真实块地址外还有两个哨兵：NAN（不指向任何块）和
//! ZERO（空洞，读全零，写时物化）。索引块用 NAN 填充初始化，
//! 数据块物化时清零。

use std::sync::Arc;

use crate::disk::{Block, BlockDevice, BLOCK_SIZE};
use crate::fs::codec;
use crate::fs::config::{DIRECT_PTRS, NAN_BLOCK_ADDRESS, PTRS_PER_BLOCK, ZERO_BLOCK_ADDRESS};
use crate::fs::error::{FsError, Result};
use crate::fs::inode_table::Inode;
use crate::fs::super_block::SuperBlock;

/// 直接索引的编号容量
const DIRECT_CAP: usize = DIRECT_PTRS;
/// 用上一级索引时的编号容量
const INDIRECT1_CAP: usize = DIRECT_CAP + PTRS_PER_BLOCK;
/// 用上二级索引时的编号容量
const INDIRECT2_CAP: usize = INDIRECT1_CAP + PTRS_PER_BLOCK * PTRS_PER_BLOCK;

#[derive(Clone)]
pub struct DataArea {
    disk: Arc<dyn BlockDevice>,
    super_block: SuperBlock,
}

impl DataArea {
    pub fn new(disk: Arc<dyn BlockDevice>, super_block: SuperBlock) -> Self {
        Self { disk, super_block }
    }

    /// 逻辑块 index 当前指向的地址（可能是哨兵）。
    /// 超出二级索引容量的 index 直接报错。
    fn addr_at(&self, inode: &Inode, index: usize) -> Result<u32> {
        if index < DIRECT_CAP {
            Ok(inode.direct_blocks[index])
        } else if index < INDIRECT1_CAP {
            if inode.indirect_block == NAN_BLOCK_ADDRESS {
                return Ok(NAN_BLOCK_ADDRESS);
            }
            self.read_slot(inode.indirect_block, index - DIRECT_CAP)
        } else if index < INDIRECT2_CAP {
            let index = index - INDIRECT1_CAP;
            if inode.double_indirect_block == NAN_BLOCK_ADDRESS {
                return Ok(NAN_BLOCK_ADDRESS);
            }
            let inner =
                self.read_slot(inode.double_indirect_block, index / PTRS_PER_BLOCK)?;
            if inner == NAN_BLOCK_ADDRESS {
                return Ok(NAN_BLOCK_ADDRESS);
            }
            self.read_slot(inner, index % PTRS_PER_BLOCK)
        } else {
            Err(FsError::NotEnoughMemory)
        }
    }

    /// 往逻辑块 index 写入地址，所需的索引块在此懒分配。
    fn set_addr(&self, inode: &mut Inode, index: usize, addr: u32) -> Result<()> {
        if index < DIRECT_CAP {
            inode.direct_blocks[index] = addr;
            Ok(())
        } else if index < INDIRECT1_CAP {
            if inode.indirect_block == NAN_BLOCK_ADDRESS {
                inode.indirect_block = self.alloc_index_block()?;
            }
            self.write_slot(inode.indirect_block, index - DIRECT_CAP, addr)
        } else if index < INDIRECT2_CAP {
            let index = index - INDIRECT1_CAP;
            let fresh_outer = inode.double_indirect_block == NAN_BLOCK_ADDRESS;
            if fresh_outer {
                inode.double_indirect_block = self.alloc_index_block()?;
            }
            let outer_slot = index / PTRS_PER_BLOCK;
            let mut inner = self.read_slot(inode.double_indirect_block, outer_slot)?;
            if inner == NAN_BLOCK_ADDRESS {
                inner = match self.alloc_index_block() {
                    Ok(block) => block,
                    Err(e) => {
                        // 刚分配的外层块还没有任何槽，立即退回
                        if fresh_outer {
                            self.super_block.free_block(inode.double_indirect_block)?;
                            inode.double_indirect_block = NAN_BLOCK_ADDRESS;
                        }
                        return Err(e);
                    }
                };
                self.write_slot(inode.double_indirect_block, outer_slot, inner)?;
            }
            self.write_slot(inner, index % PTRS_PER_BLOCK, addr)
        } else {
            Err(FsError::NotEnoughMemory)
        }
    }

    /// 擦掉末尾的逻辑槽。只会从尾部往前收缩，所以某一层
    /// 变空当且仅当擦的是这一层的第一个槽，此时释放索引块本身。
    fn erase_tail(&self, inode: &mut Inode, index: usize) -> Result<()> {
        if index < DIRECT_CAP {
            inode.direct_blocks[index] = NAN_BLOCK_ADDRESS;
            return Ok(());
        }
        if index < INDIRECT1_CAP {
            let pos = index - DIRECT_CAP;
            if pos == 0 {
                self.super_block.free_block(inode.indirect_block)?;
                inode.indirect_block = NAN_BLOCK_ADDRESS;
            } else {
                self.write_slot(inode.indirect_block, pos, NAN_BLOCK_ADDRESS)?;
            }
            return Ok(());
        }
        let pos = index - INDIRECT1_CAP;
        let outer_slot = pos / PTRS_PER_BLOCK;
        let inner_slot = pos % PTRS_PER_BLOCK;
        let inner = self.read_slot(inode.double_indirect_block, outer_slot)?;
        if inner_slot == 0 {
            self.super_block.free_block(inner)?;
            self.write_slot(inode.double_indirect_block, outer_slot, NAN_BLOCK_ADDRESS)?;
        } else {
            self.write_slot(inner, inner_slot, NAN_BLOCK_ADDRESS)?;
        }
        if pos == 0 {
            self.super_block.free_block(inode.double_indirect_block)?;
            inode.double_indirect_block = NAN_BLOCK_ADDRESS;
        }
        Ok(())
    }

    /// 从指定字节偏移读出 len 字节。越过 inode.size 直接拒绝。
    pub fn read_at(&self, inode: &Inode, offset: u64, len: usize) -> Result<Vec<u8>> {
        let end = offset + len as u64;
        if end > inode.size as u64 {
            return Err(FsError::OutOfBounds(format!(
                "read [{}, {}) crosses file size {}",
                offset, end, inode.size
            )));
        }

        let mut out = Vec::with_capacity(len);
        let mut pos = offset;
        while pos < end {
            let index = (pos / BLOCK_SIZE as u64) as usize;
            let in_block = (pos % BLOCK_SIZE as u64) as usize;
            let take = (BLOCK_SIZE - in_block).min((end - pos) as usize);

            let addr = self.addr_at(inode, index)?;
            if addr == ZERO_BLOCK_ADDRESS || addr == NAN_BLOCK_ADDRESS {
                // 空洞读出全零，不碰设备
                out.resize(out.len() + take, 0);
            } else {
                let buf = self.read_device_block(addr)?;
                out.extend_from_slice(&buf[in_block..in_block + take]);
            }
            pos += take as u64;
        }
        Ok(out)
    }

    /// 写入不扩展文件，越界调用方先 truncate。
    /// 碰到空洞槽时物化一个清零的数据块再覆盖。
    /// 中途失败也可能已经改过扩展映射，调用方无论成败都要把
    /// 这份 inode 落盘，位图才和描述符保持一致。
    pub fn write_at(&self, inode: &mut Inode, offset: u64, data: &[u8]) -> Result<()> {
        let end = offset + data.len() as u64;
        if end > inode.size as u64 {
            return Err(FsError::OutOfBounds(format!(
                "write [{}, {}) crosses file size {}",
                offset, end, inode.size
            )));
        }

        let mut pos = offset;
        let mut done = 0usize;
        while done < data.len() {
            let index = (pos / BLOCK_SIZE as u64) as usize;
            let in_block = (pos % BLOCK_SIZE as u64) as usize;
            let take = (BLOCK_SIZE - in_block).min(data.len() - done);

            let mut addr = self.addr_at(inode, index)?;
            if addr == ZERO_BLOCK_ADDRESS || addr == NAN_BLOCK_ADDRESS {
                let fresh = self.alloc_data_block()?;
                if let Err(e) = self.set_addr(inode, index, fresh) {
                    // 挂不进映射的块立刻还回位图
                    let _ = self.super_block.free_block(fresh);
                    return Err(e);
                }
                addr = fresh;
            }

            let mut buf = self.read_device_block(addr)?;
            buf[in_block..in_block + take].copy_from_slice(&data[done..done + take]);
            self.disk.write_block(addr as u64, &buf)?;

            pos += take as u64;
            done += take;
        }
        Ok(())
    }

    /// 调整文件长度。增长只登记空洞槽，物理块留到写入时分配；
    /// 收缩释放尾部的真实块并把变空的索引层退回 NAN。
    /// 增长中途分配失败时，已追加的槽全部擦掉，size 保持原值；
    /// 收缩中途失败时 size 收到仍然完整的边界。两种情况下
    /// 调用方都要把这份 inode 落盘，位图才和描述符保持一致。
    pub fn truncate(&self, inode: &mut Inode, new_size: u32) -> Result<()> {
        let old_blocks = (inode.size as usize).div_ceil(BLOCK_SIZE);
        let new_blocks = (new_size as usize).div_ceil(BLOCK_SIZE);

        if new_size > inode.size {
            for index in old_blocks..new_blocks {
                if let Err(e) = self.set_addr(inode, index, ZERO_BLOCK_ADDRESS) {
                    for undo in (old_blocks..index).rev() {
                        self.erase_tail(inode, undo)?;
                    }
                    return Err(e);
                }
            }
            inode.size = new_size;
        } else if new_size < inode.size {
            // 逐槽收缩，先擦槽再还块：落盘的描述符绝不引用
            // 已经还回位图的块
            for index in (new_blocks..old_blocks).rev() {
                if let Err(e) = self.shrink_tail_slot(inode, index) {
                    inode.size =
                        (inode.size as u64).min(((index + 1) * BLOCK_SIZE) as u64) as u32;
                    return Err(e);
                }
            }
            inode.size = new_size;
            // 新的最后一块里超出 new_size 的尾部字节清零，
            // 之后再增长暴露出来的区域读到的一定是零
            let tail = new_size as usize % BLOCK_SIZE;
            if tail != 0 {
                let addr = self.addr_at(inode, new_blocks - 1)?;
                if addr != ZERO_BLOCK_ADDRESS && addr != NAN_BLOCK_ADDRESS {
                    let mut buf = self.read_device_block(addr)?;
                    buf[tail..].fill(0);
                    self.disk.write_block(addr as u64, &buf)?;
                }
            }
        }

        Ok(())
    }

    // 收缩一个尾部逻辑槽：读出地址、擦槽、归还真实块
    fn shrink_tail_slot(&self, inode: &mut Inode, index: usize) -> Result<()> {
        let addr = self.addr_at(inode, index)?;
        self.erase_tail(inode, index)?;
        if addr != ZERO_BLOCK_ADDRESS && addr != NAN_BLOCK_ADDRESS {
            self.super_block.free_block(addr)?;
        }
        Ok(())
    }

    fn read_device_block(&self, addr: u32) -> Result<Block> {
        let mut buf: Block = [0; BLOCK_SIZE];
        self.disk.read_block(addr as u64, &mut buf)?;
        Ok(buf)
    }

    fn read_slot(&self, block_addr: u32, slot: usize) -> Result<u32> {
        let buf = self.read_device_block(block_addr)?;
        Ok(codec::get_u32(&buf, slot * 4))
    }

    fn write_slot(&self, block_addr: u32, slot: usize, value: u32) -> Result<()> {
        let mut buf = self.read_device_block(block_addr)?;
        codec::put_u32(&mut buf, slot * 4, value);
        self.disk.write_block(block_addr as u64, &buf)?;
        Ok(())
    }

    // 数据块物化时整块清零
    fn alloc_data_block(&self) -> Result<u32> {
        let addr = self.super_block.alloc_block()?;
        self.disk.write_block(addr as u64, &[0u8; BLOCK_SIZE])?;
        Ok(addr)
    }

    // 索引块用 NAN 填充，即全 0xFF
    fn alloc_index_block(&self) -> Result<u32> {
        let addr = self.super_block.alloc_block()?;
        self.disk.write_block(addr as u64, &[0xFFu8; BLOCK_SIZE])?;
        Ok(addr)
    }
}

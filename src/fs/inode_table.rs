use std::sync::Arc;

use crate::disk::{BlockDevice, ByteIo};
use crate::fs::codec;
use crate::fs::config::{DIRECT_PTRS, INODE_SIZE, INODE_TABLE_OFFSET, NAN_BLOCK_ADDRESS};
use crate::fs::error::{FsError, Result};
use crate::fs::super_block::SuperBlock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Unused,    // 空闲描述符
    Regular,   // 普通文件
    Directory, // 目录
    Symlink,   // 符号链接，正文是一个路径
}

impl FileType {
    pub fn tag(self) -> u16 {
        match self {
            Self::Unused => 0,
            Self::Regular => 1,
            Self::Directory => 2,
            Self::Symlink => 3,
        }
    }

    // 未知 tag 按空闲处理
    pub fn from_tag(tag: u16) -> Self {
        match tag {
            1 => Self::Regular,
            2 => Self::Directory,
            3 => Self::Symlink,
            _ => Self::Unused,
        }
    }
}

/// 一条 inode 记录。
///
/// 记录在其整个生命周期里都存在于磁盘上，`kind` 区分活跃与空闲。
/// 这里的结构体只是磁盘记录的一份解码副本；递归操作之间
/// 必须通过 `InodeTable::get_descriptor` 重新读取，不得长期持有。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inode {
    pub ino: u32,
    pub kind: FileType,
    pub refs: u16,
    pub size: u32,
    pub direct_blocks: [u32; DIRECT_PTRS],
    pub indirect_block: u32,
    pub double_indirect_block: u32,
}

impl Inode {
    /// 新分配的描述符：所有指针槽显式置为 NAN，而不是留零。
    pub fn empty(ino: u32, kind: FileType) -> Self {
        Self {
            ino,
            kind,
            refs: 0,
            size: 0,
            direct_blocks: [NAN_BLOCK_ADDRESS; DIRECT_PTRS],
            indirect_block: NAN_BLOCK_ADDRESS,
            double_indirect_block: NAN_BLOCK_ADDRESS,
        }
    }
}

/// inode 表：位于 N 字段之后的 N × INODE_SIZE 字节，按 inode 号随机访问。
///
/// 没有空闲 inode 位图，空闲描述符靠线性扫描 `kind == Unused` 发现。
#[derive(Clone)]
pub struct InodeTable {
    disk: Arc<dyn BlockDevice>,
    super_block: SuperBlock,
}

impl InodeTable {
    pub fn new(disk: Arc<dyn BlockDevice>, super_block: SuperBlock) -> Self {
        Self { disk, super_block }
    }

    pub fn get_descriptor(&self, ino: u32) -> Result<Inode> {
        self.check_range(ino)?;
        let bytes = self.disk.read_bytes(Self::offset_of(ino), INODE_SIZE)?;
        let mut inode = codec::decode_inode(&bytes);
        // 磁盘上的 ino 字段是冗余的，以参数为准
        inode.ino = ino;
        Ok(inode)
    }

    pub fn update_descriptor(&self, inode: &Inode) -> Result<()> {
        self.check_range(inode.ino)?;
        self.disk
            .write_bytes(Self::offset_of(inode.ino), &codec::encode_inode(inode))?;
        Ok(())
    }

    /// 线性扫描第一个空闲描述符
    pub fn find_unused(&self) -> Result<u32> {
        let n = self.super_block.get_n()?;
        for ino in 0..n {
            if self.get_descriptor(ino)?.kind == FileType::Unused {
                return Ok(ino);
            }
        }
        Err(FsError::NotEnoughMemory)
    }

    fn offset_of(ino: u32) -> u64 {
        INODE_TABLE_OFFSET + ino as u64 * INODE_SIZE as u64
    }

    fn check_range(&self, ino: u32) -> Result<()> {
        if ino >= self.super_block.get_n()? {
            return Err(FsError::DescriptorNotFound(ino));
        }
        Ok(())
    }
}

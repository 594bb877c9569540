//! 磁盘记录的编解码。
//!
//! 所有整数一律大端定长，记录宽度在 `config` 中固定。
//! 这里只处理字节缓冲，不接触设备。

use crate::fs::{
    config::{DENTRY_SIZE, DIRECT_PTRS, FILE_NAME_SIZE, INODE_SIZE},
    directory::DirEntry,
    inode_table::{FileType, Inode},
};

pub fn get_u16(buf: &[u8], pos: usize) -> u16 {
    u16::from_be_bytes([buf[pos], buf[pos + 1]])
}

pub fn put_u16(buf: &mut [u8], pos: usize, value: u16) {
    buf[pos..pos + 2].copy_from_slice(&value.to_be_bytes());
}

pub fn get_u32(buf: &[u8], pos: usize) -> u32 {
    u32::from_be_bytes([buf[pos], buf[pos + 1], buf[pos + 2], buf[pos + 3]])
}

pub fn put_u32(buf: &mut [u8], pos: usize, value: u32) {
    buf[pos..pos + 4].copy_from_slice(&value.to_be_bytes());
}

pub fn encode_inode(inode: &Inode) -> [u8; INODE_SIZE] {
    let mut buf = [0u8; INODE_SIZE];
    put_u32(&mut buf, 0, inode.ino);
    put_u16(&mut buf, 4, inode.kind.tag());
    put_u16(&mut buf, 6, inode.refs);
    put_u32(&mut buf, 8, inode.size);
    for (i, &addr) in inode.direct_blocks.iter().enumerate() {
        put_u32(&mut buf, 12 + i * 4, addr);
    }
    put_u32(&mut buf, 12 + DIRECT_PTRS * 4, inode.indirect_block);
    put_u32(&mut buf, 16 + DIRECT_PTRS * 4, inode.double_indirect_block);
    buf
}

pub fn decode_inode(buf: &[u8]) -> Inode {
    let mut direct_blocks = [0u32; DIRECT_PTRS];
    for (i, slot) in direct_blocks.iter_mut().enumerate() {
        *slot = get_u32(buf, 12 + i * 4);
    }
    Inode {
        ino: get_u32(buf, 0),
        kind: FileType::from_tag(get_u16(buf, 4)),
        refs: get_u16(buf, 6),
        size: get_u32(buf, 8),
        direct_blocks,
        indirect_block: get_u32(buf, 12 + DIRECT_PTRS * 4),
        double_indirect_block: get_u32(buf, 16 + DIRECT_PTRS * 4),
    }
}

/// 文件名截断到字段宽度；不足的部分补 NUL。
pub fn encode_dentry(entry: &DirEntry) -> [u8; DENTRY_SIZE] {
    let mut buf = [0u8; DENTRY_SIZE];
    let name = entry.name.as_bytes();
    let len = name.len().min(FILE_NAME_SIZE);
    buf[..len].copy_from_slice(&name[..len]);
    put_u32(&mut buf, FILE_NAME_SIZE, entry.ino);
    buf
}

/// 文件名读到第一个 NUL 或字段末尾为止。
pub fn decode_dentry(buf: &[u8]) -> DirEntry {
    let name_field = &buf[..FILE_NAME_SIZE];
    let len = name_field
        .iter()
        .position(|&c| c == 0)
        .unwrap_or(FILE_NAME_SIZE);
    DirEntry {
        name: String::from_utf8_lossy(&name_field[..len]).into_owned(),
        ino: get_u32(buf, FILE_NAME_SIZE),
    }
}

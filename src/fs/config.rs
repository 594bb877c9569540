use crate::disk::{BLOCK_COUNT, BLOCK_SIZE};

/// 每条 inode 记录 64 字节（实际占用 60 字节 + 4 字节补零）
pub const INODE_SIZE: usize = 64;

/// 每个 inode 的直接块指针数
pub const DIRECT_PTRS: usize = 10;

/// 磁盘上一个块地址占 4 字节
pub const ADDRESS_SIZE: usize = 4;

/// 一个间接索引块能容纳的块地址数
pub const PTRS_PER_BLOCK: usize = BLOCK_SIZE / ADDRESS_SIZE;

/// 目录项中文件名字段的宽度
pub const FILE_NAME_SIZE: usize = 28;

/// 目录项总宽度 = 文件名字段 + 4 字节 inode 号
pub const DENTRY_SIZE: usize = FILE_NAME_SIZE + 4;

/// 路径解析时符号链接展开的最大层数
pub const MAX_SYMLINK_DEPTH: u32 = 5;

/// 哨兵地址：该槽不指向任何块
pub const NAN_BLOCK_ADDRESS: u32 = 0xFFFF_FFFF;

/// 哨兵地址：逻辑空洞，读到全零，写入时才分配真实块
pub const ZERO_BLOCK_ADDRESS: u32 = 0xFFFF_FFFE;

/// 根目录固定占用 0 号 inode
pub const ROOT_INO: u32 = 0;

/// 空闲块位图的字节数，位图从磁盘地址 0 开始
pub const BITMAP_BYTES: usize = BLOCK_COUNT.div_ceil(8);

/// N 字段（描述符总数，4 字节大端）紧跟在位图之后
pub const N_FIELD_OFFSET: u64 = BITMAP_BYTES as u64;

/// inode 表起始字节偏移
pub const INODE_TABLE_OFFSET: u64 = N_FIELD_OFFSET + 4;

/// shell 的 format 命令默认传给 mkfs 的描述符总数
pub const TOTAL_INODES: u32 = 4096;

/// 每个逻辑块（Block）的大小：4KB
/// 文件系统以“块”为最小读写单位。
pub const BLOCK_SIZE: usize = 4096;

/// 磁盘中包含的块总数：64MB / 4KB = 16384 块
pub const BLOCK_COUNT: usize = 64 * 1024 * 1024 / BLOCK_SIZE;

/// 虚拟磁盘总大小（单位：字节），用于创建固定大小的 disk.img。
pub const DISK_SIZE: u64 = (BLOCK_SIZE * BLOCK_COUNT) as u64;

/// 一个逻辑块的内容，所有设备读写都以它为单位。
pub type Block = [u8; BLOCK_SIZE];

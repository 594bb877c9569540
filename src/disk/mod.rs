pub mod block_device;
pub mod file_disk;
pub mod mem_disk;
pub mod types;

// 对外导出常用类型，便于上层使用
pub use block_device::{BlockDevice, ByteIo};
pub use file_disk::FileDisk;
pub use mem_disk::MemDisk;
pub use types::{Block, BLOCK_COUNT, BLOCK_SIZE, DISK_SIZE};

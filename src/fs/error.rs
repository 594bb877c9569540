use std::fmt;

/// 文件系统错误类型
#[derive(Debug)]
pub enum FsError {
    Io(std::io::Error),        // 底层 I/O 错误
    InvalidArgument(String),   // 数值参数越界、句柄未打开
    InvalidPath(String),       // 路径某一段不存在 / 类型不对 / 符号链接过深
    FileAlreadyExist(String),  // 目标目录中重名
    DescriptorNotFound(u32),   // inode 号超出 [0, N)
    OutOfBounds(String),       // 读写越过文件末尾
    NotEnoughMemory,           // 没有空闲块或空闲描述符
    DirNotEmpty(String),       // 目录非空
}

impl From<std::io::Error> for FsError {
    fn from(e: std::io::Error) -> Self {
        FsError::Io(e)
    }
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "Disk I/O error: {}", e),
            Self::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            Self::InvalidPath(msg) => write!(f, "Invalid path: {}", msg),
            Self::FileAlreadyExist(name) => write!(f, "File already exists: {}", name),
            Self::DescriptorNotFound(ino) => write!(f, "Descriptor not found: {}", ino),
            Self::OutOfBounds(msg) => write!(f, "Out of bounds: {}", msg),
            Self::NotEnoughMemory => write!(f, "No free block or descriptor available"),
            Self::DirNotEmpty(path) => write!(f, "Dir is not empty: {}", path),
        }
    }
}

// 支持链式错误，方便追踪底层原因
impl std::error::Error for FsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

/// 文件系统统一结果类型
pub type Result<T> = std::result::Result<T, FsError>;

use crate::fs::codec;
use crate::fs::config::DENTRY_SIZE;

/// 一个目录项：定宽文件名字段 + inode 号
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub ino: u32,
}

/// 目录正文的内存视图。
///
/// 目录 inode 的正文就是一串 DENTRY_SIZE 对齐的目录项，
/// 顺序有意义：新建目录的前两项固定是 `.` 和 `..`。
/// 这里只做解码后的列表操作，设备读写由驱动层完成。
#[derive(Debug, Clone)]
pub struct Directory {
    pub entries: Vec<DirEntry>,
}

impl Directory {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let entries = bytes
            .chunks_exact(DENTRY_SIZE)
            .map(codec::decode_dentry)
            .collect();
        Self { entries }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.entries.len() * DENTRY_SIZE);
        for entry in &self.entries {
            out.extend_from_slice(&codec::encode_dentry(entry));
        }
        out
    }

    pub fn find(&self, name: &str) -> Option<u32> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.ino)
    }

    /// 按名字移除一项，返回它的 inode 号
    pub fn remove(&mut self, name: &str) -> Option<u32> {
        let index = self.entries.iter().position(|entry| entry.name == name)?;
        Some(self.entries.remove(index).ino)
    }
}

//! 路径解析。
//!
//! 从路径末尾切分：最后一个 `/` 之后是条目名，之前是父路径。
//! 父路径总是带着“展开末段符号链接”的语义递归解析，所以中间
//! 的符号链接一定会被展开；末段是否展开由调用方决定。
//!
//! 绝对路径靠切分自然锚定到根：首段形如 `/x` 的路径切出的
//! 父路径就是 `"/"`。空条目名（如 `/a//b`）一律拒绝。

use crate::fs::config::{MAX_SYMLINK_DEPTH, ROOT_INO};
use crate::fs::error::{FsError, Result};
use crate::fs::inode_table::FileType;
use crate::fs::FileSystem;
use crate::utils::split_path;

impl FileSystem {
    /// 把路径解析成 inode 号。
    ///
    /// `depth` 是一次完整查找中符号链接展开次数的累计计数，
    /// 跨组件累加；超过 MAX_SYMLINK_DEPTH 即判定链接成环。
    pub(crate) fn resolve(
        &self,
        path: &str,
        follow_symlink: bool,
        depth: &mut u32,
        base: u32,
    ) -> Result<u32> {
        if path == "/" {
            return Ok(ROOT_INO);
        }
        if path.is_empty() {
            return Ok(base);
        }

        let (parent_path, name) = split_path(path);
        if name.is_empty() {
            return Err(FsError::InvalidPath(format!(
                "empty component in '{}'",
                path
            )));
        }

        let parent_ino = if parent_path.is_empty() {
            base
        } else {
            self.resolve(parent_path, true, depth, base)?
        };

        let parent = self.inode_table.get_descriptor(parent_ino)?;
        if parent.kind != FileType::Directory {
            return Err(FsError::InvalidPath(format!(
                "'{}' is not a directory",
                parent_path
            )));
        }

        let ino = self
            .load_directory(&parent)?
            .find(name)
            .ok_or_else(|| FsError::InvalidPath(format!("'{}' not found", path)))?;

        let inode = self.inode_table.get_descriptor(ino)?;
        if inode.kind == FileType::Symlink && follow_symlink {
            if *depth >= MAX_SYMLINK_DEPTH {
                return Err(FsError::InvalidPath(
                    "symlink max depth exceeded".to_string(),
                ));
            }
            *depth += 1;
            let body = self.data_area.read_at(&inode, 0, inode.size as usize)?;
            let target = String::from_utf8_lossy(&body).into_owned();
            // 链接正文沿用本次查找的 base 继续解析
            return self.resolve(&target, true, depth, base);
        }
        Ok(ino)
    }
}

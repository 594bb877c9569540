//! 驱动层：把基于路径的操作翻译成对各引擎的调用。
//!
//! 所有状态都在设备上，这里的组件结构体只是对设备的投影；
//! 递归操作之间一律通过 inode 表重新读取描述符，绝不长期
//! 持有某条记录的副本。

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info};

use crate::disk::{BlockDevice, ByteIo, BLOCK_COUNT, BLOCK_SIZE};
use crate::fs::config::{
    BITMAP_BYTES, DENTRY_SIZE, INODE_SIZE, INODE_TABLE_OFFSET, ROOT_INO,
};
use crate::fs::data_area::DataArea;
use crate::fs::directory::{DirEntry, Directory};
use crate::fs::error::{FsError, Result};
use crate::fs::inode_table::{FileType, Inode, InodeTable};
use crate::fs::super_block::SuperBlock;
use crate::utils::{generate_uuid, split_path};

pub mod codec;
pub mod config;
pub mod data_area;
pub mod data_block_bitmap;
pub mod directory;
pub mod error;
pub mod inode_table;
pub mod path;
pub mod super_block;

pub struct FileSystem {
    disk: Arc<dyn BlockDevice>,
    super_block: SuperBlock,
    inode_table: InodeTable,
    data_area: DataArea,
    cwd: u32,
    open_files: HashMap<String, u32>, // 句柄 -> inode 号，不跨重启
}

impl FileSystem {
    pub fn new(disk: Arc<dyn BlockDevice>) -> Self {
        let super_block = SuperBlock::new(disk.clone());
        let inode_table = InodeTable::new(disk.clone(), super_block.clone());
        let data_area = DataArea::new(disk.clone(), super_block.clone());
        Self {
            disk,
            super_block,
            inode_table,
            data_area,
            cwd: ROOT_INO,
            open_files: HashMap::new(),
        }
    }

    /// 格式化设备：清空位图和 inode 表，写入描述符总数 N，
    /// 预标记元数据块，然后在 0 号描述符上建根目录。
    pub fn mkfs(&mut self, n: u32) -> Result<()> {
        if n < 2 {
            return Err(FsError::InvalidArgument(format!(
                "descriptor count {} too small",
                n
            )));
        }
        let meta_bytes = INODE_TABLE_OFFSET + n as u64 * INODE_SIZE as u64;
        let meta_blocks = meta_bytes.div_ceil(BLOCK_SIZE as u64);
        if meta_blocks >= BLOCK_COUNT as u64 {
            return Err(FsError::InvalidArgument(format!(
                "descriptor count {} does not fit the device",
                n
            )));
        }

        self.disk.write_bytes(0, &vec![0u8; BITMAP_BYTES])?;
        self.super_block.set_n(n)?;
        // 全零记录解码出来就是 Unused
        self.disk
            .write_bytes(INODE_TABLE_OFFSET, &vec![0u8; n as usize * INODE_SIZE])?;

        for block in 0..meta_blocks {
            self.super_block.bitmap.set_used(block as u32)?;
        }

        // 根目录的 `.` 和 `..` 都指向自己，refs 由两次挂链接凑成 2
        let root = Inode::empty(ROOT_INO, FileType::Directory);
        self.inode_table.update_descriptor(&root)?;
        self.add_link(ROOT_INO, ROOT_INO, ".")?;
        self.add_link(ROOT_INO, ROOT_INO, "..")?;

        self.cwd = ROOT_INO;
        self.open_files.clear();
        info!("mkfs: {} descriptors, {} metadata blocks", n, meta_blocks);
        Ok(())
    }

    pub fn create(&mut self, path: &str) -> Result<u32> {
        let (parent_ino, name) = self.resolve_parent(path)?;
        let ino = self.inode_table.find_unused()?;
        self.inode_table
            .update_descriptor(&Inode::empty(ino, FileType::Regular))?;
        if let Err(e) = self.add_link(parent_ino, ino, name) {
            self.release_inode(ino)?;
            return Err(e);
        }
        debug!("create {} -> inode {}", path, ino);
        Ok(ino)
    }

    /// 硬链接只允许指向普通文件
    pub fn link(&mut self, src: &str, dst: &str) -> Result<()> {
        let src_ino = self.lookup(src, false)?;
        if self.inode_table.get_descriptor(src_ino)?.kind != FileType::Regular {
            return Err(FsError::InvalidPath(format!(
                "'{}' is not a regular file",
                src
            )));
        }
        let (parent_ino, name) = self.resolve_parent(dst)?;
        self.add_link(parent_ino, src_ino, name)?;
        debug!("link {} -> {}", dst, src);
        Ok(())
    }

    pub fn unlink(&mut self, path: &str) -> Result<()> {
        let (parent_ino, name) = self.resolve_parent(path)?;
        let parent = self.inode_table.get_descriptor(parent_ino)?;
        let ino = self
            .load_directory(&parent)?
            .find(name)
            .ok_or_else(|| FsError::InvalidPath(format!("'{}' not found", path)))?;
        if self.inode_table.get_descriptor(ino)?.kind == FileType::Directory {
            return Err(FsError::InvalidPath(format!("'{}' is a directory", path)));
        }
        debug!("unlink {}", path);
        self.remove_link(parent_ino, name)
    }

    pub fn mkdir(&mut self, path: &str) -> Result<u32> {
        let (parent_ino, name) = self.resolve_parent(path)?;
        if name == "." || name == ".." {
            return Err(FsError::InvalidPath(format!("cannot create '{}'", name)));
        }
        let ino = self.inode_table.find_unused()?;
        self.inode_table
            .update_descriptor(&Inode::empty(ino, FileType::Directory))?;
        if let Err(e) = self.add_link(parent_ino, ino, name) {
            self.release_inode(ino)?;
            return Err(e);
        }
        let linked = self
            .add_link(ino, ino, ".")
            .and_then(|_| self.add_link(ino, parent_ino, ".."));
        if let Err(e) = linked {
            // 把父目录里的项退掉，再整个释放
            let _ = self.remove_dentry(parent_ino, name);
            self.release_inode(ino)?;
            return Err(e);
        }
        debug!("mkdir {} -> inode {}", path, ino);
        Ok(ino)
    }

    pub fn rmdir(&mut self, path: &str) -> Result<()> {
        let (parent_ino, name) = self.resolve_parent(path)?;
        if name == "." || name == ".." {
            return Err(FsError::InvalidPath(format!("cannot remove '{}'", name)));
        }
        let parent = self.inode_table.get_descriptor(parent_ino)?;
        let ino = self
            .load_directory(&parent)?
            .find(name)
            .ok_or_else(|| FsError::InvalidPath(format!("'{}' not found", path)))?;
        let inode = self.inode_table.get_descriptor(ino)?;
        if inode.kind != FileType::Directory {
            return Err(FsError::InvalidPath(format!(
                "'{}' is not a directory",
                path
            )));
        }
        if self.load_directory(&inode)?.entries.len() > 2 || inode.refs > 2 {
            return Err(FsError::DirNotEmpty(path.to_string()));
        }
        // 先拆掉自己的两个固定项，最后摘父目录的项触发回收
        self.remove_link(ino, ".")?;
        self.remove_link(ino, "..")?;
        self.remove_link(parent_ino, name)?;
        debug!("rmdir {}", path);
        Ok(())
    }

    pub fn symlink(&mut self, link_path: &str, target_body: &str) -> Result<u32> {
        let (parent_ino, name) = self.resolve_parent(link_path)?;
        let ino = self.inode_table.find_unused()?;
        let mut inode = Inode::empty(ino, FileType::Symlink);
        if let Err(e) = self.build_symlink(&mut inode, parent_ino, name, target_body) {
            // 中途失败时先落盘已分配的块，release 才能把它们还回位图
            let _ = self.inode_table.update_descriptor(&inode);
            self.release_inode(ino)?;
            return Err(e);
        }
        debug!("symlink {} -> {}", link_path, target_body);
        Ok(ino)
    }

    fn build_symlink(
        &self,
        inode: &mut Inode,
        parent_ino: u32,
        name: &str,
        target_body: &str,
    ) -> Result<()> {
        self.data_area.truncate(inode, target_body.len() as u32)?;
        self.data_area.write_at(inode, 0, target_body.as_bytes())?;
        self.inode_table.update_descriptor(inode)?;
        self.add_link(parent_ino, inode.ino, name)
    }

    /// 打开普通文件，返回一个不透明句柄。句柄没有读写游标，
    /// 每次 I/O 都带显式偏移。
    pub fn open(&mut self, path: &str) -> Result<String> {
        let ino = self.lookup(path, false)?;
        if self.inode_table.get_descriptor(ino)?.kind != FileType::Regular {
            return Err(FsError::InvalidPath(format!(
                "'{}' is not a regular file",
                path
            )));
        }
        let handle = generate_uuid();
        self.open_files.insert(handle.clone(), ino);
        Ok(handle)
    }

    pub fn close(&mut self, handle: &str) {
        self.open_files.remove(handle);
    }

    pub fn read(&self, handle: &str, offset: u64, len: usize) -> Result<Vec<u8>> {
        let inode = self.handle_inode(handle)?;
        self.data_area.read_at(&inode, offset, len)
    }

    pub fn write(&mut self, handle: &str, offset: u64, data: &[u8]) -> Result<()> {
        let mut inode = self.handle_inode(handle)?;
        // 失败的写入也可能已经物化过空洞，这份副本必须落盘，
        // 位图里新占用的块才仍然可达
        let result = self.data_area.write_at(&mut inode, offset, data);
        self.inode_table.update_descriptor(&inode)?;
        result
    }

    pub fn truncate(&mut self, path: &str, new_size: u32) -> Result<()> {
        let ino = self.lookup(path, false)?;
        let mut inode = self.inode_table.get_descriptor(ino)?;
        if inode.kind != FileType::Regular {
            return Err(FsError::InvalidPath(format!(
                "'{}' is not a regular file",
                path
            )));
        }
        // 引擎失败时把回滚/收缩到一半的映射也落盘，
        // 已释放的块才不会还被旧描述符引用
        let result = self.data_area.truncate(&mut inode, new_size);
        self.inode_table.update_descriptor(&inode)?;
        result
    }

    pub fn readdir(&self, path: &str) -> Result<Vec<DirEntry>> {
        let ino = self.lookup(path, true)?;
        let inode = self.inode_table.get_descriptor(ino)?;
        if inode.kind != FileType::Directory {
            return Err(FsError::InvalidPath(format!(
                "'{}' is not a directory",
                path
            )));
        }
        Ok(self.load_directory(&inode)?.entries)
    }

    /// 切换工作目录，末段符号链接会被展开
    pub fn cd(&mut self, path: &str) -> Result<()> {
        let ino = self.lookup(path, true)?;
        if self.inode_table.get_descriptor(ino)?.kind != FileType::Directory {
            return Err(FsError::InvalidPath(format!(
                "'{}' is not a directory",
                path
            )));
        }
        self.cwd = ino;
        Ok(())
    }

    /// 从 cwd 沿 `..` 上行拼出绝对路径。
    /// `.` 与 `..` 指向同一个 inode 的目录就是根。
    pub fn pwd(&self) -> Result<String> {
        let mut names: Vec<String> = Vec::new();
        let mut cur = self.cwd;
        loop {
            let dir = self.load_directory(&self.inode_table.get_descriptor(cur)?)?;
            let dot = dir
                .find(".")
                .ok_or_else(|| FsError::InvalidPath("directory missing '.'".into()))?;
            let dotdot = dir
                .find("..")
                .ok_or_else(|| FsError::InvalidPath("directory missing '..'".into()))?;
            if dot == dotdot {
                break;
            }
            let parent = self.inode_table.get_descriptor(dotdot)?;
            let name = self
                .load_directory(&parent)?
                .entries
                .into_iter()
                .find(|e| e.ino == cur && e.name != "." && e.name != "..")
                .map(|e| e.name)
                .ok_or_else(|| FsError::InvalidPath("orphaned directory".into()))?;
            names.push(name);
            cur = dotdot;
        }
        names.reverse();
        Ok(format!("/{}", names.join("/")))
    }

    /// 路径 -> inode 号。`follow_symlink` 只控制末段；
    /// 中间组件的符号链接总是被展开。
    pub fn lookup(&self, path: &str, follow_symlink: bool) -> Result<u32> {
        let mut depth = 0;
        self.resolve(path, follow_symlink, &mut depth, self.cwd)
    }

    /// 某个路径的描述符副本（末段符号链接不展开）
    pub fn stat(&self, path: &str) -> Result<Inode> {
        let ino = self.lookup(path, false)?;
        self.inode_table.get_descriptor(ino)
    }

    /// 按 inode 号取描述符副本
    pub fn descriptor(&self, ino: u32) -> Result<Inode> {
        self.inode_table.get_descriptor(ino)
    }

    /// 设备上是否已有一个可挂载的文件系统
    pub fn is_formatted(&self) -> bool {
        match self.super_block.get_n() {
            Ok(n) if n >= 2 => matches!(
                self.inode_table.get_descriptor(ROOT_INO).map(|inode| inode.kind),
                Ok(FileType::Directory)
            ),
            _ => false,
        }
    }

    /// 符号链接的正文路径
    pub fn read_link(&self, path: &str) -> Result<String> {
        let inode = self.stat(path)?;
        if inode.kind != FileType::Symlink {
            return Err(FsError::InvalidPath(format!(
                "'{}' is not a symlink",
                path
            )));
        }
        let body = self.data_area.read_at(&inode, 0, inode.size as usize)?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    // ---- 内部工具 ----

    fn resolve_parent<'a>(&self, path: &'a str) -> Result<(u32, &'a str)> {
        if path == "/" || path.is_empty() {
            return Err(FsError::InvalidPath(format!(
                "'{}' has no parent component",
                path
            )));
        }
        let (parent_path, name) = split_path(path);
        if name.is_empty() {
            return Err(FsError::InvalidPath(format!(
                "empty component in '{}'",
                path
            )));
        }
        let parent_ino = if parent_path.is_empty() {
            self.cwd
        } else {
            let mut depth = 0;
            self.resolve(parent_path, true, &mut depth, self.cwd)?
        };
        if self.inode_table.get_descriptor(parent_ino)?.kind != FileType::Directory {
            return Err(FsError::InvalidPath(format!(
                "'{}' is not a directory",
                parent_path
            )));
        }
        Ok((parent_ino, name))
    }

    pub(crate) fn load_directory(&self, inode: &Inode) -> Result<Directory> {
        let bytes = self.data_area.read_at(inode, 0, inode.size as usize)?;
        Ok(Directory::from_bytes(&bytes))
    }

    /// 在目录尾部追加一项并给目标 inode 的 refs 加一。
    /// 目录先落盘再重读目标，目录自指（`.`）时两份副本才不会互相覆盖。
    fn add_link(&self, dir_ino: u32, target_ino: u32, name: &str) -> Result<()> {
        let mut dir_inode = self.inode_table.get_descriptor(dir_ino)?;
        if self.load_directory(&dir_inode)?.find(name).is_some() {
            return Err(FsError::FileAlreadyExist(name.to_string()));
        }
        let offset = dir_inode.size as u64;
        let new_size = dir_inode.size + DENTRY_SIZE as u32;
        self.data_area
            .truncate(&mut dir_inode, new_size)?;
        let entry = codec::encode_dentry(&DirEntry {
            name: name.to_string(),
            ino: target_ino,
        });
        if let Err(e) = self.data_area.write_at(&mut dir_inode, offset, &entry) {
            let _ = self.data_area.truncate(&mut dir_inode, offset as u32);
            self.inode_table.update_descriptor(&dir_inode)?;
            return Err(e);
        }
        self.inode_table.update_descriptor(&dir_inode)?;

        let mut target = self.inode_table.get_descriptor(target_ino)?;
        target.refs += 1;
        self.inode_table.update_descriptor(&target)
    }

    /// 摘掉目录里的一项并维护目标 refs；归零即回收
    fn remove_link(&self, dir_ino: u32, name: &str) -> Result<()> {
        let target_ino = self.remove_dentry(dir_ino, name)?;
        let mut target = self.inode_table.get_descriptor(target_ino)?;
        target.refs = target.refs.saturating_sub(1);
        if target.refs == 0 {
            if let Err(e) = self.data_area.truncate(&mut target, 0) {
                self.inode_table.update_descriptor(&target)?;
                return Err(e);
            }
            target.kind = FileType::Unused;
            self.inode_table.update_descriptor(&target)?;
            debug!("inode {} reclaimed", target_ino);
        } else {
            self.inode_table.update_descriptor(&target)?;
        }
        Ok(())
    }

    /// 只做目录正文的手术：重写剩余列表，再精确截掉一项的长度
    fn remove_dentry(&self, dir_ino: u32, name: &str) -> Result<u32> {
        let mut dir_inode = self.inode_table.get_descriptor(dir_ino)?;
        let mut dir = self.load_directory(&dir_inode)?;
        let target_ino = dir
            .remove(name)
            .ok_or_else(|| FsError::InvalidPath(format!("'{}' not found", name)))?;
        let bytes = dir.to_bytes();
        if !bytes.is_empty() {
            if let Err(e) = self.data_area.write_at(&mut dir_inode, 0, &bytes) {
                self.inode_table.update_descriptor(&dir_inode)?;
                return Err(e);
            }
        }
        if let Err(e) = self.data_area.truncate(&mut dir_inode, bytes.len() as u32) {
            self.inode_table.update_descriptor(&dir_inode)?;
            return Err(e);
        }
        self.inode_table.update_descriptor(&dir_inode)?;
        Ok(target_ino)
    }

    /// 无条件回收：正文清空、描述符退回 Unused。
    /// 用在建链失败的回滚路径上。
    fn release_inode(&self, ino: u32) -> Result<()> {
        let mut inode = self.inode_table.get_descriptor(ino)?;
        if let Err(e) = self.data_area.truncate(&mut inode, 0) {
            self.inode_table.update_descriptor(&inode)?;
            return Err(e);
        }
        self.inode_table
            .update_descriptor(&Inode::empty(ino, FileType::Unused))
    }

    fn handle_inode(&self, handle: &str) -> Result<Inode> {
        let ino = *self
            .open_files
            .get(handle)
            .ok_or_else(|| FsError::InvalidArgument(format!("unknown handle {}", handle)))?;
        let inode = self.inode_table.get_descriptor(ino)?;
        // 文件可能在句柄仍打开时被删掉，句柄就悬空了
        if inode.kind != FileType::Regular {
            return Err(FsError::InvalidArgument(format!(
                "stale handle {}",
                handle
            )));
        }
        Ok(inode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::MemDisk;
    use crate::fs::config::{DIRECT_PTRS, NAN_BLOCK_ADDRESS, ZERO_BLOCK_ADDRESS};

    fn fresh_fs(n: u32) -> FileSystem {
        let mut fs = FileSystem::new(Arc::new(MemDisk::new()));
        fs.mkfs(n).unwrap();
        fs
    }

    fn names(entries: &[DirEntry]) -> Vec<(&str, u32)> {
        entries.iter().map(|e| (e.name.as_str(), e.ino)).collect()
    }

    #[test]
    fn test_mkfs_root_descriptor() {
        let fs = fresh_fs(10);
        let root = fs.inode_table.get_descriptor(0).unwrap();

        assert_eq!(root.kind, FileType::Directory);
        assert_eq!(root.refs, 2);
        assert_eq!(root.size, 2 * DENTRY_SIZE as u32);
        // 两条目录项躺在一个真实的数据块里
        assert_ne!(root.direct_blocks[0], NAN_BLOCK_ADDRESS);
        assert!(fs.super_block.bitmap.is_used(root.direct_blocks[0]).unwrap());
        for i in 1..DIRECT_PTRS {
            assert_eq!(root.direct_blocks[i], NAN_BLOCK_ADDRESS);
        }
        assert_eq!(root.indirect_block, NAN_BLOCK_ADDRESS);
        assert_eq!(root.double_indirect_block, NAN_BLOCK_ADDRESS);

        assert_eq!(
            names(&fs.readdir("/").unwrap()),
            vec![(".", 0), ("..", 0)]
        );
    }

    #[test]
    fn test_mkfs_rejects_bad_n() {
        let mut fs = FileSystem::new(Arc::new(MemDisk::new()));
        assert!(matches!(fs.mkfs(1), Err(FsError::InvalidArgument(_))));
        assert!(matches!(
            fs.mkfs(u32::MAX / 2),
            Err(FsError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_mkfs_is_idempotent() {
        let disk: Arc<dyn BlockDevice> = Arc::new(MemDisk::new());
        let mut fs = FileSystem::new(disk.clone());

        fs.mkfs(10).unwrap();
        let before = disk.read_bytes(0, 4 * BLOCK_SIZE).unwrap();
        fs.mkfs(10).unwrap();
        let after = disk.read_bytes(0, 4 * BLOCK_SIZE).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_create_file() {
        let mut fs = fresh_fs(10);
        fs.create("/file").unwrap();

        assert_eq!(
            names(&fs.readdir("/").unwrap()),
            vec![(".", 0), ("..", 0), ("file", 1)]
        );
        let inode = fs.stat("/file").unwrap();
        assert_eq!(inode.kind, FileType::Regular);
        assert_eq!(inode.refs, 1);
        assert_eq!(inode.size, 0);
    }

    #[test]
    fn test_create_duplicate_rolls_back_inode() {
        let mut fs = fresh_fs(10);
        fs.create("/a").unwrap();
        assert!(matches!(
            fs.create("/a"),
            Err(FsError::FileAlreadyExist(_))
        ));
        // 回滚后的描述符立刻可以再分配
        assert_eq!(fs.create("/b").unwrap(), 2);
    }

    #[test]
    fn test_link_and_unlink() {
        let mut fs = fresh_fs(10);
        fs.create("/file").unwrap();
        fs.link("/file", "/link").unwrap();
        assert_eq!(fs.stat("/file").unwrap().refs, 2);

        fs.unlink("/link").unwrap();
        assert_eq!(
            names(&fs.readdir("/").unwrap()),
            vec![(".", 0), ("..", 0), ("file", 1)]
        );
        assert_eq!(fs.stat("/file").unwrap().refs, 1);
    }

    #[test]
    fn test_link_rejects_directory_and_symlink() {
        let mut fs = fresh_fs(10);
        fs.mkdir("/d").unwrap();
        fs.symlink("/s", "/d").unwrap();
        assert!(matches!(fs.link("/d", "/l"), Err(FsError::InvalidPath(_))));
        assert!(matches!(fs.link("/s", "/l"), Err(FsError::InvalidPath(_))));
    }

    #[test]
    fn test_unlink_last_name_reclaims_everything() {
        let mut fs = fresh_fs(10);
        fs.create("/f").unwrap();
        fs.truncate("/f", 100).unwrap();
        let fh = fs.open("/f").unwrap();
        fs.write(&fh, 0, &[9; 100]).unwrap();

        let data_block = fs.stat("/f").unwrap().direct_blocks[0];
        assert!(fs.super_block.bitmap.is_used(data_block).unwrap());

        fs.unlink("/f").unwrap();
        assert_eq!(
            fs.inode_table.get_descriptor(1).unwrap().kind,
            FileType::Unused
        );
        assert!(!fs.super_block.bitmap.is_used(data_block).unwrap());

        // 句柄悬空
        assert!(matches!(
            fs.read(&fh, 0, 1),
            Err(FsError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_write_shrink_grow_exposes_zeros() {
        let mut fs = fresh_fs(10);
        fs.create("/f").unwrap();
        let fh = fs.open("/f").unwrap();

        fs.truncate("/f", 20).unwrap();
        fs.write(&fh, 10, &[1, 2, 3, 4, 5, 6, 7]).unwrap();
        fs.truncate("/f", 15).unwrap();
        fs.truncate("/f", 30).unwrap();

        let mut expect = vec![0u8; 30];
        expect[10..15].copy_from_slice(&[1, 2, 3, 4, 5]);
        assert_eq!(fs.read(&fh, 0, 30).unwrap(), expect);
    }

    #[test]
    fn test_read_write_bounds_and_handles() {
        let mut fs = fresh_fs(10);
        fs.create("/f").unwrap();
        fs.truncate("/f", 10).unwrap();
        let fh = fs.open("/f").unwrap();

        assert!(matches!(
            fs.read(&fh, 5, 6),
            Err(FsError::OutOfBounds(_))
        ));
        assert!(matches!(
            fs.write(&fh, 5, &[0; 6]),
            Err(FsError::OutOfBounds(_))
        ));
        assert!(matches!(
            fs.read("no-such-handle", 0, 1),
            Err(FsError::InvalidArgument(_))
        ));

        fs.close(&fh);
        assert!(matches!(
            fs.read(&fh, 0, 1),
            Err(FsError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_failed_write_persists_materialized_blocks() {
        let disk: Arc<dyn BlockDevice> = Arc::new(MemDisk::new());
        let mut fs = FileSystem::new(disk.clone());
        fs.mkfs(10).unwrap();
        fs.create("/f").unwrap();
        fs.truncate("/f", 2 * BLOCK_SIZE as u32).unwrap();
        let fh = fs.open("/f").unwrap();

        // 只留一个空闲块：第一个空洞物化成功，第二个分配失败
        disk.write_bytes(0, &vec![0xFF; BITMAP_BYTES]).unwrap();
        fs.super_block.bitmap.set_free(100).unwrap();

        let err = fs.write(&fh, 0, &vec![1u8; 2 * BLOCK_SIZE]);
        assert!(matches!(err, Err(FsError::NotEnoughMemory)));

        // 物化出的块必须已经记进落盘的描述符，占用的位图位才仍然可达
        let inode = fs.descriptor(1).unwrap();
        assert_eq!(inode.direct_blocks[0], 100);
        assert!(fs.super_block.bitmap.is_used(100).unwrap());
        assert_eq!(inode.direct_blocks[1], ZERO_BLOCK_ADDRESS);
        assert_eq!(fs.read(&fh, 0, BLOCK_SIZE).unwrap(), vec![1u8; BLOCK_SIZE]);
    }

    #[test]
    fn test_mkdir_and_refs_accounting() {
        let mut fs = fresh_fs(10);
        let a = fs.mkdir("/a").unwrap();
        let b = fs.mkdir("/a/b").unwrap();

        // 父目录多了一条来自子目录 `..` 的引用
        assert_eq!(fs.inode_table.get_descriptor(a).unwrap().refs, 3);
        assert_eq!(fs.inode_table.get_descriptor(b).unwrap().refs, 2);
        assert_eq!(fs.stat("/").unwrap().refs, 3);

        assert_eq!(
            names(&fs.readdir("/a/b").unwrap()),
            vec![(".", b), ("..", a)]
        );
    }

    #[test]
    fn test_rmdir() {
        let mut fs = fresh_fs(10);
        fs.mkdir("/a").unwrap();
        fs.mkdir("/a/b").unwrap();

        assert!(matches!(fs.rmdir("/a"), Err(FsError::DirNotEmpty(_))));

        fs.rmdir("/a/b").unwrap();
        assert_eq!(fs.stat("/a").unwrap().refs, 2);
        fs.rmdir("/a").unwrap();

        assert_eq!(names(&fs.readdir("/").unwrap()), vec![(".", 0), ("..", 0)]);
        assert_eq!(fs.stat("/").unwrap().refs, 2);
        assert_eq!(
            fs.inode_table.get_descriptor(1).unwrap().kind,
            FileType::Unused
        );
    }

    #[test]
    fn test_cd_and_pwd() {
        let mut fs = fresh_fs(10);
        fs.mkdir("/a").unwrap();
        fs.mkdir("/a/b").unwrap();

        assert_eq!(fs.pwd().unwrap(), "/");
        fs.cd("/a/b").unwrap();
        assert_eq!(fs.pwd().unwrap(), "/a/b");

        // 相对路径从 cwd 出发
        fs.create("c").unwrap();
        assert!(fs.lookup("/a/b/c", false).is_ok());

        fs.cd("..").unwrap();
        assert_eq!(fs.pwd().unwrap(), "/a");
        fs.cd("/").unwrap();
        assert_eq!(fs.pwd().unwrap(), "/");
    }

    #[test]
    fn test_symlink_traversal() {
        let mut fs = fresh_fs(10);
        let a = fs.mkdir("/a").unwrap();
        let b = fs.mkdir("/a/b").unwrap();
        let c = fs.mkdir("/a/b/c").unwrap();
        fs.symlink("/a/b/c/up", "../..").unwrap();

        assert_eq!(
            names(&fs.readdir("/a/b/c/up/a/b").unwrap()),
            vec![(".", b), ("..", a), ("c", c)]
        );
    }

    #[test]
    fn test_symlink_body_and_stat() {
        let mut fs = fresh_fs(10);
        fs.mkdir("/d").unwrap();
        fs.symlink("/s", "/d").unwrap();

        assert_eq!(fs.read_link("/s").unwrap(), "/d");
        assert_eq!(fs.stat("/s").unwrap().kind, FileType::Symlink);
        // cd 展开末段符号链接
        fs.cd("/s").unwrap();
        assert_eq!(fs.pwd().unwrap(), "/d");
    }

    #[test]
    fn test_symlink_max_depth() {
        let mut fs = fresh_fs(10);
        fs.symlink("/s", ".").unwrap();

        let err = fs.lookup("/s/s/s/s/s/s", true).unwrap_err();
        match err {
            FsError::InvalidPath(msg) => assert!(msg.contains("symlink max depth exceeded")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_empty_component_rejected() {
        let mut fs = fresh_fs(10);
        fs.mkdir("/a").unwrap();
        fs.mkdir("/a/b").unwrap();
        assert!(matches!(
            fs.lookup("/a//b", false),
            Err(FsError::InvalidPath(_))
        ));
        assert!(matches!(fs.create("/a/"), Err(FsError::InvalidPath(_))));
    }

    #[test]
    fn test_refs_match_dentry_census() {
        let mut fs = fresh_fs(16);
        fs.mkdir("/a").unwrap();
        fs.create("/a/f").unwrap();
        fs.link("/a/f", "/f1").unwrap();
        fs.link("/a/f", "/a/f2").unwrap();

        // 全树统计每个 inode 被多少目录项引用
        let mut census: HashMap<u32, u16> = HashMap::new();
        let mut stack = vec!["/".to_string()];
        while let Some(dir) = stack.pop() {
            for entry in fs.readdir(&dir).unwrap() {
                *census.entry(entry.ino).or_default() += 1;
                if entry.name != "." && entry.name != ".." {
                    let child = format!("{}/{}", dir.trim_end_matches('/'), entry.name);
                    if fs.stat(&child).unwrap().kind == FileType::Directory {
                        stack.push(child);
                    }
                }
            }
        }
        for (ino, count) in census {
            assert_eq!(
                fs.inode_table.get_descriptor(ino).unwrap().refs,
                count,
                "inode {}",
                ino
            );
        }
    }

    #[test]
    fn test_directory_grows_past_one_block() {
        let mut fs = fresh_fs(256);
        // 一个块装 128 条目录项，写满后目录正文跨进第二个块
        for i in 0..130 {
            fs.create(&format!("/f{}", i)).unwrap();
        }
        let entries = fs.readdir("/").unwrap();
        assert_eq!(entries.len(), 132);
        assert_eq!(fs.stat("/").unwrap().size, 132 * DENTRY_SIZE as u32);
        assert_eq!(entries[131].name, "f129");

        fs.unlink("/f0").unwrap();
        let entries = fs.readdir("/").unwrap();
        assert_eq!(entries.len(), 131);
        assert!(entries.iter().all(|e| e.name != "f0"));
    }
}

use uuid::Uuid;

/// 生成一个随机唯一 ID，用作打开文件表的句柄
pub fn generate_uuid() -> String {
    Uuid::new_v4().to_string()
}

/// 从路径末尾切出 (父路径, 条目名)。
///
/// 首段形如 `/x` 的路径保留 `"/"` 作父路径，这样递归解析时
/// 绝对路径会锚定到根；没有 `/` 的路径父路径为空串，表示
/// 相对当前基准目录解析。
pub fn split_path(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        None => ("", path),
        Some(0) => ("/", &path[1..]),
        Some(pos) => (&path[..pos], &path[pos + 1..]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_path() {
        assert_eq!(split_path("file"), ("", "file"));
        assert_eq!(split_path("/file"), ("/", "file"));
        assert_eq!(split_path("/a/b/file"), ("/a/b", "file"));
        assert_eq!(split_path("a/b"), ("a", "b"));
        // 空条目名留给解析层拒绝
        assert_eq!(split_path("/a/"), ("/a", ""));
        assert_eq!(split_path("/a//b"), ("/a/", "b"));
    }

    #[test]
    fn test_generate_uuid_unique() {
        assert_ne!(generate_uuid(), generate_uuid());
    }
}

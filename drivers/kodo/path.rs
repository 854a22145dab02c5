//! Work directory path resolution / 工作目录路径解析

/// Maps caller-relative paths onto absolute bucket keys / 相对路径与绝对键互转
///
/// Keys are opaque strings in a flat namespace, so nothing is cleaned:
/// `..` and repeated slashes pass through untouched.
#[derive(Debug, Clone)]
pub struct PathResolver {
    work_dir: String,
    prefix: String,
}

impl PathResolver {
    pub fn new(work_dir: &str) -> Self {
        let work_dir = if work_dir.is_empty() { "/" } else { work_dir };
        let prefix = work_dir.strip_prefix('/').unwrap_or(work_dir).to_string();
        Self {
            work_dir: work_dir.to_string(),
            prefix,
        }
    }

    /// Configured work directory / 工作目录
    pub fn work_dir(&self) -> &str {
        &self.work_dir
    }

    /// Relative path -> absolute key / 相对路径转绝对键
    pub fn to_absolute(&self, path: &str) -> String {
        format!("{}{}", self.prefix, path)
    }

    /// Absolute key -> relative path; keys outside the work dir are returned as is
    /// 绝对键转相对路径
    pub fn to_relative(&self, key: &str) -> String {
        key.strip_prefix(self.prefix.as_str()).unwrap_or(key).to_string()
    }
}

impl Default for PathResolver {
    fn default() -> Self {
        Self::new("/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_work_dir() {
        let r = PathResolver::new("/");
        assert_eq!(r.to_absolute("a/b.txt"), "a/b.txt");
        assert_eq!(r.to_relative("a/b.txt"), "a/b.txt");
        assert_eq!(r.to_absolute(""), "");
    }

    #[test]
    fn test_nested_work_dir() {
        let r = PathResolver::new("/backup/2024/");
        assert_eq!(r.work_dir(), "/backup/2024/");
        assert_eq!(r.to_absolute("x.bin"), "backup/2024/x.bin");
        assert_eq!(r.to_relative("backup/2024/x.bin"), "x.bin");
        assert_eq!(r.to_absolute(""), "backup/2024/");
    }

    #[test]
    fn test_no_normalization() {
        let r = PathResolver::new("/w/");
        assert_eq!(r.to_absolute("../a//b"), "w/../a//b");
    }

    #[test]
    fn test_foreign_key_returned_unmodified() {
        let r = PathResolver::new("/w/");
        assert_eq!(r.to_relative("other/x"), "other/x");
    }

    #[test]
    fn test_round_trip() {
        for wd in ["/", "/w/", "/deep/er/", "/no-slash"] {
            let r = PathResolver::new(wd);
            for p in ["", "a", "a/b/c.txt", "dir/", "中文/文件.txt", "x//y"] {
                assert_eq!(r.to_relative(&r.to_absolute(p)), p, "wd={} p={}", wd, p);
            }
        }
    }
}

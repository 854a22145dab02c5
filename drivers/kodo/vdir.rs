//! Virtual directory emulation / 虚拟目录模拟
//!
//! Kodo has no directories. A directory is emulated as a zero-length
//! object whose key ends with `/`, and only when the connector enables it.

use crate::storage::{Entry, EntryMode, ServiceError};

/// Content type reported for directory entries / 目录条目的内容类型
pub const DIRECTORY_CONTENT_TYPE: &str = "application/x-directory";

/// Directory pseudo-entry: no backend metadata beyond the zero-length marker
/// 目录伪条目
pub fn dir_entry(id: impl Into<String>, path: impl Into<String>) -> Entry {
    let mut entry = Entry::new(id, path, EntryMode::DIR);
    entry.content_type = Some(DIRECTORY_CONTENT_TYPE.to_string());
    entry
}

/// Capability-gated directory key resolution / 虚拟目录键解析
#[derive(Debug, Clone, Copy)]
pub struct VirtualDirs {
    enabled: bool,
}

impl VirtualDirs {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Marker key of a directory; fails when virtual dirs are off / 目录标记键
    pub fn dir_key(&self, key: &str) -> Result<String, ServiceError> {
        if !self.enabled {
            return Err(ServiceError::OperationNotSupported(
                "virtual directory is not enabled".to_string(),
            ));
        }
        if key.ends_with('/') {
            Ok(key.to_string())
        } else {
            Ok(format!("{}/", key))
        }
    }

    /// Key for stat/delete honoring the caller's directory hint / 按目录提示解析键
    pub fn resolve(&self, key: &str, is_dir: bool) -> Result<String, ServiceError> {
        if is_dir {
            self.dir_key(key)
        } else {
            Ok(key.to_string())
        }
    }
}

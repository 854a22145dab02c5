use std::collections::BTreeMap;
use std::fmt;
use std::ops::BitOr;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncWrite};

pub mod context;
pub mod error;
pub mod iowrap;
pub mod manager;

pub use context::OpContext;
pub use error::{ErrorKind, ServiceError, StorageError, StorageResult};
pub use manager::{DriverBox, DriverFactory, StorageManager};

/// I/O callback type / IO回调类型
/// 参数: 本次传输的字节数 / Parameter: bytes moved by this chunk
pub type IoCallback = Arc<dyn Fn(usize) + Send + Sync>;

/// Owned upload/download body / 上传下载数据流
pub type BoxRead = Box<dyn AsyncRead + Unpin + Send + Sync>;

/// Lazy listing sequence / 惰性列举序列
pub type EntryStream = Pin<Box<dyn Stream<Item = StorageResult<Entry>> + Send>>;

/// Metadata key carrying the normalized storage class / 存储类型元数据键
pub const METADATA_STORAGE_CLASS: &str = "storage-class";

/// Configuration item definition / 配置项定义
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigItem {
    pub name: String,
    /// Display title (friendly name) / 显示标题
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub item_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
}

impl ConfigItem {
    pub fn new(name: &str, item_type: &str) -> Self {
        Self {
            name: name.to_string(),
            title: None,
            item_type: item_type.to_string(),
            default: None,
            required: false,
            help: None,
        }
    }

    pub fn title(mut self, val: &str) -> Self {
        self.title = Some(val.to_string());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default(mut self, val: &str) -> Self {
        self.default = Some(val.to_string());
        self
    }

    pub fn help(mut self, val: &str) -> Self {
        self.help = Some(val.to_string());
        self
    }
}

/// Driver configuration information / 驱动配置信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverConfig {
    pub name: String,
    #[serde(default)]
    pub no_upload: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_root: Option<String>,
}

/// Complete driver information / 驱动完整信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverInfo {
    /// Common configuration items / 通用配置项
    pub common: Vec<ConfigItem>,
    /// Driver-specific configuration items / 驱动特有配置项
    pub additional: Vec<ConfigItem>,
    /// Basic driver configuration / 驱动基本配置
    pub config: DriverConfig,
}

/// Generate common configuration items (shared by all drivers) / 生成通用配置项
pub fn get_common_items(config: &DriverConfig) -> Vec<ConfigItem> {
    let mut work_dir = ConfigItem::new("work_dir", "string")
        .title("Work directory")
        .help("Root prefix all relative paths are resolved against");
    if let Some(root) = &config.default_root {
        work_dir = work_dir.default(root);
    }

    vec![
        ConfigItem::new("mount_path", "string")
            .required()
            .help("Mount path, must be unique"),
        work_dir,
        ConfigItem::new("remark", "text")
            .help("Remark/Notes"),
    ]
}

/// Entry mode bitset / 条目模式位集合
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EntryMode(u8);

impl EntryMode {
    pub const READ: EntryMode = EntryMode(1);
    pub const DIR: EntryMode = EntryMode(1 << 1);

    pub fn empty() -> Self {
        EntryMode(0)
    }

    pub fn contains(self, other: EntryMode) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    pub fn is_dir(self) -> bool {
        self.contains(Self::DIR)
    }

    pub fn is_read(self) -> bool {
        self.contains(Self::READ)
    }
}

impl BitOr for EntryMode {
    type Output = EntryMode;

    fn bitor(self, rhs: EntryMode) -> EntryMode {
        EntryMode(self.0 | rhs.0)
    }
}

/// File entry information / 文件条目信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Backend-absolute key / 后端绝对键
    pub id: String,
    /// Caller-relative path / 相对路径
    pub path: String,
    pub mode: EntryMode,
    pub content_length: u64,
    /// `None` when the backend does not know / 未知时为None
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Backend-specific attributes / 服务特有元数据
    #[serde(default)]
    pub service_metadata: BTreeMap<String, String>,
}

impl Entry {
    pub fn new(id: impl Into<String>, path: impl Into<String>, mode: EntryMode) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            mode,
            content_length: 0,
            last_modified: None,
            etag: None,
            content_type: None,
            service_metadata: BTreeMap::new(),
        }
    }

    pub fn is_dir(&self) -> bool {
        self.mode.is_dir()
    }

    pub fn storage_class(&self) -> Option<&str> {
        self.service_metadata
            .get(METADATA_STORAGE_CLASS)
            .map(String::as_str)
    }
}

/// List traversal mode bitset / 列举模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListMode(u8);

impl ListMode {
    /// Single level, folding common prefixes into directories / 单层目录列举
    pub const DIR: ListMode = ListMode(1);
    /// Recursive listing of every key under the prefix / 前缀递归列举
    pub const PREFIX: ListMode = ListMode(1 << 1);

    pub fn empty() -> Self {
        ListMode(0)
    }

    pub fn is_dir(self) -> bool {
        self.0 & Self::DIR.0 != 0
    }

    pub fn is_prefix(self) -> bool {
        self.0 & Self::PREFIX.0 != 0
    }
}

impl BitOr for ListMode {
    type Output = ListMode;

    fn bitor(self, rhs: ListMode) -> ListMode {
        ListMode(self.0 | rhs.0)
    }
}

impl From<&str> for ListMode {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "dir" | "directory" => ListMode::DIR,
            "prefix" => ListMode::PREFIX,
            _ => ListMode::empty(),
        }
    }
}

impl fmt::Display for ListMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ListMode({:#04b})", self.0)
    }
}

/// Storage metadata / 存储元信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageMeta {
    pub name: String,
    pub work_dir: String,
}

/// Driver capability declaration / 驱动能力声明
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Capability {
    pub can_read: bool,
    pub can_write: bool,
    pub can_stat: bool,
    pub can_delete: bool,
    /// Single-level directory listing / 支持目录列举
    pub can_list_dir: bool,
    /// Recursive prefix listing / 支持前缀列举
    pub can_list_prefix: bool,
    /// Emulated directories via zero-length `/`-suffixed keys / 虚拟目录
    pub virtual_dir: bool,
    /// Signed direct link download / 支持直链下载
    pub can_direct_link: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CreateOptions {
    /// Create a directory placeholder entry / 创建目录条目
    pub dir: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CreateDirOptions {
    pub ctx: OpContext,
}

#[derive(Debug, Clone, Default)]
pub struct DeleteOptions {
    pub ctx: OpContext,
    /// Target is a virtual directory / 目标为虚拟目录
    pub dir: bool,
}

#[derive(Debug, Clone, Default)]
pub struct StatOptions {
    pub ctx: OpContext,
    /// Target is a virtual directory / 目标为虚拟目录
    pub dir: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub ctx: OpContext,
    pub mode: ListMode,
}

impl ListOptions {
    pub fn new(mode: ListMode) -> Self {
        Self {
            ctx: OpContext::default(),
            mode,
        }
    }
}

#[derive(Clone, Default)]
pub struct ReadOptions {
    pub ctx: OpContext,
    pub io_callback: Option<IoCallback>,
}

#[derive(Clone, Default)]
pub struct WriteOptions {
    pub ctx: OpContext,
    pub io_callback: Option<IoCallback>,
}

/// Storage driver interface / 存储驱动接口
#[async_trait]
pub trait StorageDriver: Send + Sync {
    /// Driver name / 驱动名称
    fn name(&self) -> &str;

    /// Driver version / 驱动版本
    fn version(&self) -> &str;

    /// Driver capabilities / 驱动能力
    fn capabilities(&self) -> Capability;

    /// Storage name and work directory / 存储名与工作目录
    fn metadata(&self) -> StorageMeta;

    /// Build a placeholder entry without touching the backend / 创建本地占位条目
    fn create(&self, path: &str, opt: &CreateOptions) -> StorageResult<Entry>;

    /// Create directory / 创建目录
    async fn create_dir(&self, path: &str, opt: &CreateDirOptions) -> StorageResult<Entry>;

    /// Delete object; deleting an absent object succeeds / 删除对象（幂等）
    async fn delete(&self, path: &str, opt: &DeleteOptions) -> StorageResult<()>;

    /// List entries lazily / 惰性列举
    fn list(&self, path: &str, opt: &ListOptions) -> StorageResult<EntryStream>;

    /// Get object metadata / 获取对象信息
    async fn stat(&self, path: &str, opt: &StatOptions) -> StorageResult<Entry>;

    /// Copy object content into `w` / 读取对象内容
    async fn read(
        &self,
        path: &str,
        w: &mut (dyn AsyncWrite + Unpin + Send),
        opt: &ReadOptions,
    ) -> StorageResult<u64>;

    /// Upload exactly `size` bytes from `r` / 上传对象
    async fn write(
        &self,
        path: &str,
        r: BoxRead,
        size: u64,
        opt: &WriteOptions,
    ) -> StorageResult<u64>;

    /// Get direct link URL (if supported) / 获取直链 URL
    async fn get_direct_link(&self, _path: &str) -> StorageResult<Option<String>> {
        Ok(None)
    }
}

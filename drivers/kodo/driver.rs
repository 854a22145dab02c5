//! Kodo驱动核心实现
//!
//! 设计原则：
//! - 路径统一经工作目录解析为存储空间内的绝对键
//! - 后端错误码在调用返回后立即转换，删除不存在的对象视为成功
//! - 读取走私有下载链接，上传走表单上传，均为流式，不缓存整个文件

use std::fmt;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWrite};

use crate::storage::iowrap::{CallbackReader, CallbackWriter};
use crate::storage::{
    BoxRead, Capability, CreateDirOptions, CreateOptions, DeleteOptions, Entry, EntryMode,
    EntryStream, ListOptions, ReadOptions, ServiceError, StatOptions, StorageDriver, StorageError,
    StorageMeta, StorageResult, WriteOptions,
};
use super::client::{KodoBackend, KodoClient};
use super::config::KodoConfig;
use super::error::{ignore_not_found, translate};
use super::lister::{ObjectLister, PageSource};
use super::normalize::stat_entry;
use super::path::PathResolver;
use super::vdir::{dir_entry, VirtualDirs};

/// Kodo驱动
pub struct KodoDriver {
    config: KodoConfig,
    backend: Arc<dyn KodoBackend>,
    resolver: PathResolver,
    vdirs: VirtualDirs,
}

fn wrap<'a>(op: &'static str, path: &'a str) -> impl FnOnce(ServiceError) -> StorageError + 'a {
    move |e| StorageError::new(op, path, e)
}

impl KodoDriver {
    /// 创建新的Kodo驱动实例
    pub fn new(config: KodoConfig) -> Result<Self> {
        if config.bucket.is_empty() {
            return Err(anyhow!("bucket is required"));
        }
        let client = KodoClient::new(&config)?;
        Ok(Self::with_backend(config, Arc::new(client)))
    }

    /// 使用指定后端创建驱动
    pub fn with_backend(config: KodoConfig, backend: Arc<dyn KodoBackend>) -> Self {
        let resolver = PathResolver::new(&config.work_dir);
        let vdirs = VirtualDirs::new(config.virtual_dir);
        Self {
            config,
            backend,
            resolver,
            vdirs,
        }
    }

    fn page_source(&self) -> PageSource {
        PageSource {
            backend: self.backend.clone(),
            bucket: self.config.bucket.clone(),
            resolver: self.resolver.clone(),
            virtual_dir: self.vdirs.enabled(),
        }
    }

    /// 创建列举器（不会请求后端）
    pub fn lister(&self, path: &str, opt: &ListOptions) -> StorageResult<ObjectLister> {
        ObjectLister::new(self.page_source(), path, opt.mode, opt.ctx.clone())
            .map_err(wrap("list", path))
    }
}

impl fmt::Display for KodoDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Storager kodo {{Name: {}, WorkDir: {}}}",
            self.config.bucket,
            self.resolver.work_dir()
        )
    }
}

#[async_trait]
impl StorageDriver for KodoDriver {
    fn name(&self) -> &str {
        "Kodo"
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn capabilities(&self) -> Capability {
        Capability {
            can_read: true,
            can_write: true,
            can_stat: true,
            can_delete: true,
            can_list_dir: true,
            can_list_prefix: true,
            virtual_dir: self.vdirs.enabled(),
            can_direct_link: true,
        }
    }

    fn metadata(&self) -> StorageMeta {
        StorageMeta {
            name: self.config.bucket.clone(),
            work_dir: self.resolver.work_dir().to_string(),
        }
    }

    fn create(&self, path: &str, opt: &CreateOptions) -> StorageResult<Entry> {
        let key = self.resolver.to_absolute(path);
        if opt.dir {
            let key = self.vdirs.dir_key(&key).map_err(wrap("create", path))?;
            let rel = self.resolver.to_relative(&key);
            return Ok(dir_entry(key, rel));
        }
        Ok(Entry::new(key, path, EntryMode::READ))
    }

    async fn create_dir(&self, path: &str, opt: &CreateDirOptions) -> StorageResult<Entry> {
        let key = self
            .vdirs
            .dir_key(&self.resolver.to_absolute(path))
            .map_err(wrap("create_dir", path))?;

        tracing::debug!("Kodo创建目录: key={}", key);

        let body: BoxRead = Box::new(tokio::io::empty());
        opt.ctx
            .run(async {
                self.backend
                    .put(&self.config.bucket, &key, body, 0)
                    .await
                    .map_err(translate)
            })
            .await
            .map_err(wrap("create_dir", path))?;

        let rel = self.resolver.to_relative(&key);
        Ok(dir_entry(key, rel))
    }

    async fn delete(&self, path: &str, opt: &DeleteOptions) -> StorageResult<()> {
        let key = self
            .vdirs
            .resolve(&self.resolver.to_absolute(path), opt.dir)
            .map_err(wrap("delete", path))?;

        tracing::debug!("Kodo删除: key={}", key);

        let res = opt
            .ctx
            .run(async {
                self.backend
                    .delete(&self.config.bucket, &key)
                    .await
                    .map_err(translate)
            })
            .await;
        ignore_not_found(res).map_err(wrap("delete", path))
    }

    fn list(&self, path: &str, opt: &ListOptions) -> StorageResult<EntryStream> {
        Ok(self.lister(path, opt)?.into_stream())
    }

    async fn stat(&self, path: &str, opt: &StatOptions) -> StorageResult<Entry> {
        let key = self
            .vdirs
            .resolve(&self.resolver.to_absolute(path), opt.dir)
            .map_err(wrap("stat", path))?;

        let info = opt
            .ctx
            .run(async {
                self.backend
                    .stat(&self.config.bucket, &key)
                    .await
                    .map_err(translate)
            })
            .await
            .map_err(wrap("stat", path))?;

        if opt.dir {
            let rel = self.resolver.to_relative(&key);
            return Ok(dir_entry(key, rel));
        }
        Ok(stat_entry(&key, path, &info))
    }

    async fn read(
        &self,
        path: &str,
        w: &mut (dyn AsyncWrite + Unpin + Send),
        opt: &ReadOptions,
    ) -> StorageResult<u64> {
        let key = self.resolver.to_absolute(path);
        let expires = self.config.sign_expire_secs();

        opt.ctx
            .run(async {
                // Body is dropped on every exit path / 响应体在任何返回路径上都会释放
                let mut body = self.backend.get(&key, expires).await.map_err(translate)?;
                let copied = match &opt.io_callback {
                    Some(cb) => {
                        let mut w = CallbackWriter::new(w, cb.clone());
                        tokio::io::copy(&mut body, &mut w).await
                    }
                    None => tokio::io::copy(&mut body, w).await,
                };
                copied.map_err(|e| ServiceError::Backend {
                    code: None,
                    message: format!("copy object body: {}", e),
                })
            })
            .await
            .map_err(wrap("read", path))
    }

    async fn write(
        &self,
        path: &str,
        r: BoxRead,
        size: u64,
        opt: &WriteOptions,
    ) -> StorageResult<u64> {
        let key = self.resolver.to_absolute(path);

        let reader: BoxRead = match &opt.io_callback {
            Some(cb) => Box::new(CallbackReader::new(r, cb.clone())),
            None => r,
        };
        let body: BoxRead = Box::new(reader.take(size));

        tracing::debug!("Kodo上传: key={}, size={}", key, size);

        opt.ctx
            .run(async {
                self.backend
                    .put(&self.config.bucket, &key, body, size)
                    .await
                    .map_err(translate)
            })
            .await
            .map_err(wrap("write", path))?;

        Ok(size)
    }

    async fn get_direct_link(&self, path: &str) -> StorageResult<Option<String>> {
        let key = self.resolver.to_absolute(path);
        Ok(Some(
            self.backend.private_url(&key, self.config.sign_expire_secs()),
        ))
    }
}

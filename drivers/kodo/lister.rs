//! Marker-based listing engine / 基于marker的分页列举
//!
//! A listing owns its cursor and pages forward only when the consumer asks
//! for an entry the current page cannot provide. Directory mode asks the
//! backend to fold keys on `/` and turns each common prefix into a `Dir`
//! entry; prefix mode walks every key under the root.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;

use crate::storage::{Entry, EntryStream, ListMode, OpContext, ServiceError, StorageError, StorageResult};
use super::client::KodoBackend;
use super::error::translate;
use super::normalize::list_item_entry;
use super::path::PathResolver;
use super::types::ListFilesResult;
use super::vdir::dir_entry;

/// Entries requested per round-trip / 每次请求的条目数
pub const PAGE_LIMIT: usize = 1000;

/// Traversal selected once per listing / 遍历方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Traversal {
    Directory,
    Prefix,
}

impl Traversal {
    /// Directory wins when both bits are set / 同时指定时按目录处理
    pub fn from_mode(mode: ListMode) -> Result<Self, ServiceError> {
        if mode.is_dir() {
            Ok(Traversal::Directory)
        } else if mode.is_prefix() {
            Ok(Traversal::Prefix)
        } else {
            Err(ServiceError::InvalidArgument(format!("invalid list mode: {}", mode)))
        }
    }

    pub fn delimiter(self) -> &'static str {
        match self {
            Traversal::Directory => "/",
            Traversal::Prefix => "",
        }
    }
}

/// Pagination state of one listing / 分页游标
#[derive(Debug, Clone)]
pub struct ListingCursor {
    traversal: Traversal,
    prefix: String,
    marker: String,
    limit: usize,
    seen: HashSet<String>,
}

impl ListingCursor {
    pub fn new(traversal: Traversal, prefix: String) -> Self {
        Self {
            traversal,
            prefix,
            marker: String::new(),
            limit: PAGE_LIMIT,
            seen: HashSet::new(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn delimiter(&self) -> &'static str {
        self.traversal.delimiter()
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Move to `next`; `Ok(false)` once the backend reports no more pages.
    /// A marker seen before in this listing would loop forever and fails.
    fn advance(&mut self, next: String) -> Result<bool, ServiceError> {
        if next.is_empty() {
            self.marker.clear();
            return Ok(false);
        }
        if next == self.marker || !self.seen.insert(next.clone()) {
            return Err(ServiceError::Backend {
                code: None,
                message: format!("listing marker did not advance: {}", next),
            });
        }
        self.marker = next;
        Ok(true)
    }
}

/// One round-trip worth of entries / 单页结果
#[derive(Debug, Default)]
pub struct ListingPage {
    pub entries: Vec<Entry>,
    pub next_marker: String,
}

/// Everything a pager needs to reach the backend / 分页数据源
#[derive(Clone)]
pub struct PageSource {
    pub backend: Arc<dyn KodoBackend>,
    pub bucket: String,
    pub resolver: PathResolver,
    pub virtual_dir: bool,
}

impl PageSource {
    async fn fetch(&self, cursor: &ListingCursor) -> Result<ListFilesResult, ServiceError> {
        self.backend
            .list_files(
                &self.bucket,
                cursor.prefix(),
                cursor.delimiter(),
                cursor.marker(),
                cursor.limit,
            )
            .await
            .map_err(translate)
    }
}

/// The listed directory's own `/`-terminated marker object
fn is_self_marker(cursor: &ListingCursor, key: &str) -> bool {
    let prefix = cursor.prefix();
    prefix.ends_with('/') && key == prefix
}

#[async_trait]
trait Pager: Send + Sync {
    async fn next_page(&self, src: &PageSource, cursor: &ListingCursor) -> Result<ListingPage, ServiceError>;
}

/// Single level: common prefixes first, then direct objects / 目录分页
struct DirectoryPager;

#[async_trait]
impl Pager for DirectoryPager {
    async fn next_page(&self, src: &PageSource, cursor: &ListingCursor) -> Result<ListingPage, ServiceError> {
        let res = src.fetch(cursor).await?;
        let mut entries = Vec::with_capacity(res.common_prefixes.len() + res.items.len());

        for cp in &res.common_prefixes {
            entries.push(dir_entry(cp.as_str(), src.resolver.to_relative(cp)));
        }

        for item in &res.items {
            // 过滤掉目录本身的标记对象
            if is_self_marker(cursor, &item.key) {
                continue;
            }
            entries.push(list_item_entry(&src.resolver, item, src.virtual_dir));
        }

        Ok(ListingPage {
            entries,
            next_marker: res.marker,
        })
    }
}

/// Recursive: every key under the prefix, common prefixes ignored / 前缀分页
struct PrefixPager;

#[async_trait]
impl Pager for PrefixPager {
    async fn next_page(&self, src: &PageSource, cursor: &ListingCursor) -> Result<ListingPage, ServiceError> {
        let res = src.fetch(cursor).await?;
        let entries = res
            .items
            .iter()
            .filter(|item| !is_self_marker(cursor, &item.key))
            .map(|item| list_item_entry(&src.resolver, item, src.virtual_dir))
            .collect();

        Ok(ListingPage {
            entries,
            next_marker: res.marker,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListerState {
    /// More pages may follow / 还有后续页
    Active,
    /// Last page fetched / 已取得最后一页
    Exhausted,
    /// A round-trip failed / 请求失败
    Failed,
}

/// One-shot lazy listing / 一次性惰性列举
pub struct ObjectLister {
    source: PageSource,
    pager: Box<dyn Pager>,
    cursor: ListingCursor,
    ctx: OpContext,
    root: String,
    buffer: VecDeque<Entry>,
    state: ListerState,
}

impl ObjectLister {
    /// Validates the mode; no backend call happens here / 仅校验参数，不请求后端
    pub fn new(source: PageSource, path: &str, mode: ListMode, ctx: OpContext) -> Result<Self, ServiceError> {
        let traversal = Traversal::from_mode(mode)?;
        let pager: Box<dyn Pager> = match traversal {
            Traversal::Directory => Box::new(DirectoryPager),
            Traversal::Prefix => Box::new(PrefixPager),
        };
        let prefix = source.resolver.to_absolute(path);

        Ok(Self {
            source,
            pager,
            cursor: ListingCursor::new(traversal, prefix),
            ctx,
            root: path.to_string(),
            buffer: VecDeque::new(),
            state: ListerState::Active,
        })
    }

    pub fn traversal(&self) -> Traversal {
        self.cursor.traversal
    }

    /// Next entry, `None` once exhausted or after an error / 下一个条目
    pub async fn next(&mut self) -> Option<StorageResult<Entry>> {
        loop {
            if let Some(entry) = self.buffer.pop_front() {
                return Some(Ok(entry));
            }
            if self.state != ListerState::Active {
                return None;
            }
            if let Err(e) = self.fetch_page().await {
                self.state = ListerState::Failed;
                return Some(Err(StorageError::new("list", self.root.clone(), e)));
            }
        }
    }

    async fn fetch_page(&mut self) -> Result<(), ServiceError> {
        tracing::debug!(
            "Kodo list page: prefix={}, delimiter={:?}, marker={}",
            self.cursor.prefix(),
            self.cursor.delimiter(),
            self.cursor.marker()
        );

        let page = self
            .ctx
            .run(self.pager.next_page(&self.source, &self.cursor))
            .await?;

        if !self.cursor.advance(page.next_marker)? {
            self.state = ListerState::Exhausted;
        }
        self.buffer.extend(page.entries);
        Ok(())
    }

    pub fn into_stream(self) -> EntryStream {
        Box::pin(futures::stream::unfold(self, |mut lister| async move {
            lister.next().await.map(|item| (item, lister))
        }))
    }
}

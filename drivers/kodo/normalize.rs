//! Backend record normalization / 后端记录规范化

use chrono::{DateTime, TimeZone, Utc};

use crate::storage::{Entry, EntryMode, METADATA_STORAGE_CLASS};
use super::path::PathResolver;
use super::types::{FileInfo, ListItem};

/// Kodo storage class / 存储类型
/// ref: https://developer.qiniu.com/kodo/api/3710/chtype
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageClass {
    Standard,
    StandardInfrequentAccess,
    Archive,
    /// Unrecognized code, passed through / 未识别的类型码
    Other(i64),
}

impl StorageClass {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => StorageClass::Standard,
            1 => StorageClass::StandardInfrequentAccess,
            2 => StorageClass::Archive,
            other => StorageClass::Other(other),
        }
    }

    pub fn as_metadata(&self) -> String {
        match self {
            StorageClass::Standard => "STANDARD".to_string(),
            StorageClass::StandardInfrequentAccess => "STANDARD_IA".to_string(),
            StorageClass::Archive => "ARCHIVE".to_string(),
            StorageClass::Other(code) => code.to_string(),
        }
    }
}

/// Epoch seconds -> timestamp, 0 means unknown / 时间戳转换，0表示未知
pub fn convert_unix_timestamp(secs: i64) -> Option<DateTime<Utc>> {
    if secs == 0 {
        return None;
    }
    Utc.timestamp_opt(secs, 0).single()
}

/// Fields shared by listing and stat records
struct Record<'a> {
    fsize: i64,
    hash: &'a str,
    mime_type: &'a str,
    put_time: i64,
    kind: i64,
}

fn fill(entry: &mut Entry, r: Record<'_>) {
    entry.content_length = r.fsize.max(0) as u64;
    entry.last_modified = convert_unix_timestamp(r.put_time);
    if !r.mime_type.is_empty() {
        entry.content_type = Some(r.mime_type.to_string());
    }
    if !r.hash.is_empty() {
        entry.etag = Some(r.hash.to_string());
    }
    entry.service_metadata.insert(
        METADATA_STORAGE_CLASS.to_string(),
        StorageClass::from_code(r.kind).as_metadata(),
    );
}

/// Listed object -> entry / 列举条目转换
///
/// With virtual directories on, a zero-length `/`-suffixed key is the
/// marker of a directory and becomes a `Dir` entry.
pub fn list_item_entry(resolver: &PathResolver, item: &ListItem, virtual_dir: bool) -> Entry {
    if virtual_dir && item.key.ends_with('/') && item.fsize == 0 {
        return super::vdir::dir_entry(&item.key, resolver.to_relative(&item.key));
    }

    let mut entry = Entry::new(&item.key, resolver.to_relative(&item.key), EntryMode::READ);
    fill(
        &mut entry,
        Record {
            fsize: item.fsize,
            hash: &item.hash,
            mime_type: &item.mime_type,
            put_time: item.put_time,
            kind: item.kind,
        },
    );
    entry
}

/// Stat result -> entry / 文件信息转换
pub fn stat_entry(key: &str, path: &str, info: &FileInfo) -> Entry {
    let mut entry = Entry::new(key, path, EntryMode::READ);
    fill(
        &mut entry,
        Record {
            fsize: info.fsize,
            hash: &info.hash,
            mime_type: &info.mime_type,
            put_time: info.put_time,
            kind: info.kind,
        },
    );
    entry
}

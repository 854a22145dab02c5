//! Kodo data type definitions / Kodo数据类型定义

use serde::{Deserialize, Deserializer};

/// `putTime` on the wire is in 100ns ticks / 上传时间单位为100纳秒
const TICKS_PER_SECOND: i64 = 10_000_000;

fn ticks_to_secs<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let ticks = i64::deserialize(deserializer)?;
    // 0 means unknown, a non-zero time must not collapse onto it
    Ok(match ticks / TICKS_PER_SECOND {
        0 => ticks.signum(),
        secs => secs,
    })
}

/// API error response / API错误响应
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ErrResp {
    #[serde(default)]
    pub error: String,
}

/// One listed object / 列举结果中的单个对象
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ListItem {
    pub key: String,
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub fsize: i64,
    #[serde(default)]
    pub mime_type: String,
    /// Epoch seconds, 0 when unknown / 上传时间（秒）
    #[serde(default, deserialize_with = "ticks_to_secs")]
    pub put_time: i64,
    /// Storage class code / 存储类型
    #[serde(default, rename = "type")]
    pub kind: i64,
}

/// Listing response / 列举响应
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ListFilesResult {
    #[serde(default)]
    pub items: Vec<ListItem>,
    #[serde(default)]
    pub common_prefixes: Vec<String>,
    /// Continuation marker, empty on the last page / 续列标记，最后一页为空
    #[serde(default)]
    pub marker: String,
}

/// Stat response / 文件信息响应
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    #[serde(default)]
    pub fsize: i64,
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default, deserialize_with = "ticks_to_secs")]
    pub put_time: i64,
    #[serde(default, rename = "type")]
    pub kind: i64,
}

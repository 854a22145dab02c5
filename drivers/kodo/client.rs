//! Kodo HTTP client / Kodo HTTP客户端
//!
//! Thin transport over the Kodo REST API. Codes and messages of failed
//! responses are handed back untouched as [`ApiError`]; translation is the
//! driver's job. No retries here.

use std::io;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, Response};
use serde::de::DeserializeOwned;
use tokio::io::AsyncRead;
use tokio_util::io::{ReaderStream, StreamReader};
use url::Url;

use crate::storage::BoxRead;
use super::auth::{encoded_entry, Mac, PutPolicy};
use super::config::KodoConfig;
use super::error::ApiError;
use super::types::{ErrResp, FileInfo, ListFilesResult};

/// Streamed response body, released on drop / 响应体读取器
pub type BodyReader = Box<dyn AsyncRead + Unpin + Send>;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const REQID_HEADER: &str = "X-Reqid";
/// Upload token validity / 上传凭证有效期
const UPLOAD_TOKEN_TTL_SECS: i64 = 3600;

/// Kodo backend operations / Kodo后端接口
#[async_trait]
pub trait KodoBackend: Send + Sync {
    /// Marker-based listing / 基于marker的分页列举
    async fn list_files(
        &self,
        bucket: &str,
        prefix: &str,
        delimiter: &str,
        marker: &str,
        limit: usize,
    ) -> Result<ListFilesResult, ApiError>;

    async fn stat(&self, bucket: &str, key: &str) -> Result<FileInfo, ApiError>;

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), ApiError>;

    /// GET through a private URL valid for `expires` seconds / 通过私有链接下载
    async fn get(&self, key: &str, expires: u64) -> Result<BodyReader, ApiError>;

    /// Form upload of exactly `size` bytes / 表单上传
    async fn put(&self, bucket: &str, key: &str, body: BoxRead, size: u64) -> Result<(), ApiError>;

    /// Private download URL / 私有下载链接
    fn private_url(&self, key: &str, expires: u64) -> String;
}

/// Kodo HTTP client / Kodo HTTP客户端
pub struct KodoClient {
    client: Client,
    upload_client: Client,
    mac: Mac,
    domain: String,
    rs_host: String,
    rsf_host: String,
    upload_host: String,
}

impl KodoClient {
    pub fn new(config: &KodoConfig) -> Result<Self> {
        if config.access_key.is_empty() || config.secret_key.is_empty() {
            return Err(anyhow!("access_key and secret_key are required"));
        }

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()
            .context("创建HTTP客户端失败")?;

        // Uploads may run long, only connect is bounded / 上传客户端仅限制连接超时
        let upload_client = Client::builder()
            .connect_timeout(Duration::from_secs(60))
            .tcp_nodelay(true)
            .build()
            .context("创建上传客户端失败")?;

        Ok(Self {
            client,
            upload_client,
            mac: Mac::new(&config.access_key, &config.secret_key),
            domain: normalize_host(&config.domain).context("invalid domain")?,
            rs_host: normalize_host(&config.rs_host).context("invalid rs_host")?,
            rsf_host: normalize_host(&config.rsf_host).context("invalid rsf_host")?,
            upload_host: normalize_host(&config.upload_host).context("invalid upload_host")?,
        })
    }

    /// Signed management POST (stat/delete) / 签名的管理请求
    async fn rs_post(&self, op: &str, bucket: &str, key: &str) -> Result<Response, ApiError> {
        let path = format!("/{}/{}", op, encoded_entry(bucket, key));
        let url = format!("{}{}", self.rs_host, path);
        let auth = self.mac.qbox_authorization(&path, None, b"");

        let resp = self
            .client
            .post(url)
            .header(AUTHORIZATION, auth)
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .send()
            .await?;
        check_response(resp).await
    }

    fn object_url(&self, key: &str) -> String {
        let encoded: Vec<String> = key
            .split('/')
            .map(|seg| urlencoding::encode(seg).into_owned())
            .collect();
        format!("{}/{}", self.domain, encoded.join("/"))
    }
}

/// Accept `host`, `http://host` or `https://host` / 规范化主机地址
fn normalize_host(raw: &str) -> Result<String> {
    let raw = raw.trim().trim_end_matches('/');
    if raw.is_empty() {
        return Err(anyhow!("empty host"));
    }
    let with_scheme = if raw.starts_with("http://") || raw.starts_with("https://") {
        raw.to_string()
    } else {
        format!("https://{}", raw)
    };
    let url = Url::parse(&with_scheme)?;
    if url.host_str().is_none() {
        return Err(anyhow!("missing host in {}", raw));
    }
    Ok(with_scheme)
}

/// Turn non-success responses into `ApiError::Response` / 检查响应状态
async fn check_response(resp: Response) -> Result<Response, ApiError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let reqid = resp
        .headers()
        .get(REQID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let body = resp.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrResp>(&body) {
        Ok(e) if !e.error.is_empty() => e.error,
        _ if !body.is_empty() => body,
        _ => status.canonical_reason().unwrap_or("unknown error").to_string(),
    };

    Err(ApiError::Response {
        code: status.as_u16() as i32,
        message,
        reqid,
    })
}

async fn parse_json<T: DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
    resp.json::<T>()
        .await
        .map_err(|e| ApiError::Transport(format!("decode response: {}", e)))
}

#[async_trait]
impl KodoBackend for KodoClient {
    async fn list_files(
        &self,
        bucket: &str,
        prefix: &str,
        delimiter: &str,
        marker: &str,
        limit: usize,
    ) -> Result<ListFilesResult, ApiError> {
        let mut url = Url::parse(&format!("{}/list", self.rsf_host))
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("bucket", bucket);
            query.append_pair("limit", &limit.to_string());
            if !prefix.is_empty() {
                query.append_pair("prefix", prefix);
            }
            if !delimiter.is_empty() {
                query.append_pair("delimiter", delimiter);
            }
            if !marker.is_empty() {
                query.append_pair("marker", marker);
            }
        }
        let auth = self.mac.qbox_authorization(url.path(), url.query(), b"");

        tracing::debug!("Kodo list: bucket={}, prefix={}, marker={}", bucket, prefix, marker);

        let resp = self
            .client
            .post(url)
            .header(AUTHORIZATION, auth)
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .send()
            .await?;
        parse_json(check_response(resp).await?).await
    }

    async fn stat(&self, bucket: &str, key: &str) -> Result<FileInfo, ApiError> {
        tracing::debug!("Kodo stat: bucket={}, key={}", bucket, key);
        let resp = self.rs_post("stat", bucket, key).await?;
        parse_json(resp).await
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), ApiError> {
        tracing::debug!("Kodo delete: bucket={}, key={}", bucket, key);
        self.rs_post("delete", bucket, key).await?;
        Ok(())
    }

    async fn get(&self, key: &str, expires: u64) -> Result<BodyReader, ApiError> {
        let url = self.private_url(key, expires);
        tracing::debug!("Kodo GET: key={}", key);

        let resp = check_response(self.client.get(url).send().await?).await?;
        let stream = resp
            .bytes_stream()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e));
        Ok(Box::new(StreamReader::new(Box::pin(stream))))
    }

    async fn put(&self, bucket: &str, key: &str, body: BoxRead, size: u64) -> Result<(), ApiError> {
        // Scope `bucket:key` allows overwriting an existing object / 允许覆盖上传
        let policy = PutPolicy {
            scope: format!("{}:{}", bucket, key),
            deadline: chrono::Utc::now().timestamp() + UPLOAD_TOKEN_TTL_SECS,
        };
        let token = self.mac.upload_token(&policy);

        let file_name = key.rsplit('/').next().filter(|n| !n.is_empty()).unwrap_or("file");
        let part = Part::stream_with_length(Body::wrap_stream(ReaderStream::new(body)), size)
            .file_name(file_name.to_string());
        let form = Form::new()
            .text("token", token)
            .text("key", key.to_string())
            .part("file", part);

        tracing::debug!("Kodo upload: key={}, size={}", key, size);

        let resp = self
            .upload_client
            .post(&self.upload_host)
            .multipart(form)
            .send()
            .await?;
        check_response(resp).await?;
        Ok(())
    }

    fn private_url(&self, key: &str, expires: u64) -> String {
        let deadline = chrono::Utc::now().timestamp() + expires as i64;
        self.mac.private_url(&self.object_url(key), deadline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> KodoConfig {
        KodoConfig {
            bucket: "photos".to_string(),
            access_key: "ak".to_string(),
            secret_key: "sk".to_string(),
            domain: "cdn.example.com/".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_normalize_host() {
        assert_eq!(normalize_host("cdn.example.com/").unwrap(), "https://cdn.example.com");
        assert_eq!(normalize_host("http://127.0.0.1:9000").unwrap(), "http://127.0.0.1:9000");
        assert!(normalize_host("").is_err());
    }

    #[test]
    fn test_new_requires_keys() {
        let mut c = config();
        c.secret_key.clear();
        assert!(KodoClient::new(&c).is_err());

        let mut c = config();
        c.domain.clear();
        assert!(KodoClient::new(&c).is_err());
    }

    #[test]
    fn test_private_url_escapes_key() {
        let client = KodoClient::new(&config()).unwrap();
        let url = client.private_url("dir/a b.txt", 3600);
        assert!(url.starts_with("https://cdn.example.com/dir/a%20b.txt?e="));
        assert!(url.contains("&token=ak:"));
    }
}

//! Kodo request signing / Kodo请求签名
//!
//! QBox management tokens, put-policy upload tokens and private download
//! URLs all share one HMAC-SHA1 + URL-safe base64 scheme.

use base64::{engine::general_purpose::URL_SAFE as BASE64_URL, Engine as _};
use hmac::{Hmac, Mac as _};
use serde::Serialize;
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// Upload put policy / 上传策略
#[derive(Debug, Clone, Serialize)]
pub struct PutPolicy {
    /// `bucket` or `bucket:key`
    pub scope: String,
    /// Unix seconds / 过期时间
    pub deadline: i64,
}

/// Access/secret key pair / 密钥对
#[derive(Clone)]
pub struct Mac {
    access_key: String,
    secret_key: String,
}

impl std::fmt::Debug for Mac {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mac")
            .field("access_key", &self.access_key)
            .finish_non_exhaustive()
    }
}

impl Mac {
    pub fn new(access_key: &str, secret_key: &str) -> Self {
        Self {
            access_key: access_key.to_string(),
            secret_key: secret_key.to_string(),
        }
    }

    fn sign(&self, data: &[u8]) -> String {
        let mut mac = HmacSha1::new_from_slice(self.secret_key.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(data);
        BASE64_URL.encode(mac.finalize().into_bytes())
    }

    /// `ak:sign`
    pub fn token(&self, data: &[u8]) -> String {
        format!("{}:{}", self.access_key, self.sign(data))
    }

    /// `ak:sign:encodedData`
    pub fn token_with_data(&self, data: &[u8]) -> String {
        let encoded = BASE64_URL.encode(data);
        format!("{}:{}:{}", self.access_key, self.sign(encoded.as_bytes()), encoded)
    }

    /// QBox authorization for management requests / 管理请求签名
    ///
    /// Signs `path[?query]\n` plus the body when it is form-urlencoded.
    pub fn qbox_authorization(&self, path: &str, query: Option<&str>, form_body: &[u8]) -> String {
        let mut data = path.as_bytes().to_vec();
        if let Some(q) = query.filter(|q| !q.is_empty()) {
            data.push(b'?');
            data.extend_from_slice(q.as_bytes());
        }
        data.push(b'\n');
        data.extend_from_slice(form_body);
        format!("QBox {}", self.token(&data))
    }

    /// Upload token for a put policy / 生成上传凭证
    pub fn upload_token(&self, policy: &PutPolicy) -> String {
        // PutPolicy only holds a string and an integer
        let json = serde_json::to_vec(policy).unwrap_or_default();
        self.token_with_data(&json)
    }

    /// Append `e` and `token` to a download URL / 生成私有下载链接
    pub fn private_url(&self, base_url: &str, deadline: i64) -> String {
        let sep = if base_url.contains('?') { '&' } else { '?' };
        let url = format!("{}{}e={}", base_url, sep, deadline);
        let token = self.token(url.as_bytes());
        format!("{}&token={}", url, token)
    }
}

/// URL-safe base64 of `bucket:key` / 编码资源标识
pub fn encoded_entry(bucket: &str, key: &str) -> String {
    BASE64_URL.encode(format!("{}:{}", bucket, key))
}

//! Kodo驱动配置

use serde::{Deserialize, Serialize};

/// Kodo配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KodoConfig {
    /// 存储空间名称
    pub bucket: String,
    /// Access Key
    pub access_key: String,
    /// Secret Key
    pub secret_key: String,
    /// 下载域名（绑定到存储空间的域名）
    /// 如: https://cdn.example.com
    pub domain: String,
    /// 工作目录，所有相对路径基于此解析
    #[serde(default = "default_work_dir")]
    pub work_dir: String,
    /// 是否启用虚拟目录（以`/`结尾的零字节对象）
    #[serde(default)]
    pub virtual_dir: bool,
    /// 私有下载链接有效期（小时）
    #[serde(default = "default_sign_expire")]
    pub sign_url_expire: u32,
    /// 资源管理域名
    #[serde(default = "default_rs_host")]
    pub rs_host: String,
    /// 资源列举域名
    #[serde(default = "default_rsf_host")]
    pub rsf_host: String,
    /// 上传域名
    #[serde(default = "default_upload_host")]
    pub upload_host: String,
}

fn default_work_dir() -> String {
    "/".to_string()
}

fn default_sign_expire() -> u32 {
    1
}

fn default_rs_host() -> String {
    "https://rs.qbox.me".to_string()
}

fn default_rsf_host() -> String {
    "https://rsf.qbox.me".to_string()
}

fn default_upload_host() -> String {
    "https://upload.qiniup.com".to_string()
}

impl Default for KodoConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            access_key: String::new(),
            secret_key: String::new(),
            domain: String::new(),
            work_dir: default_work_dir(),
            virtual_dir: false,
            sign_url_expire: default_sign_expire(),
            rs_host: default_rs_host(),
            rsf_host: default_rsf_host(),
            upload_host: default_upload_host(),
        }
    }
}

impl KodoConfig {
    /// 私有链接有效期（秒），至少一小时
    pub fn sign_expire_secs(&self) -> u64 {
        self.sign_url_expire.max(1) as u64 * 3600
    }
}

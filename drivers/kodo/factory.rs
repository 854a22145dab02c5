//! Kodo驱动工厂

use anyhow::{anyhow, Result};
use serde_json::Value;

use crate::storage::{ConfigItem, DriverConfig, DriverFactory, StorageDriver};
use super::config::KodoConfig;
use super::driver::KodoDriver;

/// Kodo驱动工厂
pub struct KodoDriverFactory;

impl DriverFactory for KodoDriverFactory {
    fn driver_type(&self) -> &'static str {
        "kodo"
    }

    fn driver_config(&self) -> DriverConfig {
        DriverConfig {
            name: "Kodo".to_string(),
            no_upload: false,
            default_root: Some("/".to_string()),
        }
    }

    fn additional_items(&self) -> Vec<ConfigItem> {
        vec![
            ConfigItem::new("bucket", "string")
                .title("存储空间名称")
                .required(),
            ConfigItem::new("access_key", "string")
                .title("Access Key")
                .required(),
            ConfigItem::new("secret_key", "password")
                .title("Secret Key")
                .required(),
            ConfigItem::new("domain", "string")
                .title("下载域名")
                .help("绑定到存储空间的域名，如 https://cdn.example.com")
                .required(),
            ConfigItem::new("virtual_dir", "bool")
                .title("虚拟目录")
                .help("以`/`结尾的零字节对象视为目录")
                .default("false"),
            ConfigItem::new("sign_url_expire", "number")
                .title("签名URL过期时间")
                .help("私有下载链接有效期（小时）")
                .default("1"),
            ConfigItem::new("rs_host", "string")
                .title("资源管理域名")
                .default("https://rs.qbox.me"),
            ConfigItem::new("rsf_host", "string")
                .title("资源列举域名")
                .default("https://rsf.qbox.me"),
            ConfigItem::new("upload_host", "string")
                .title("上传域名")
                .help("按存储空间所在区域填写")
                .default("https://upload.qiniup.com"),
        ]
    }

    fn create_driver(&self, config: Value) -> Result<Box<dyn StorageDriver>> {
        let config: KodoConfig = serde_json::from_value(config)
            .map_err(|e| anyhow!("配置解析失败: {}", e))?;
        Ok(Box::new(KodoDriver::new(config)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_driver_info() {
        let info = KodoDriverFactory.driver_info();
        assert_eq!(info.config.name, "Kodo");
        assert!(info.common.iter().any(|i| i.name == "work_dir"));
        let required: Vec<&str> = info
            .additional
            .iter()
            .filter(|i| i.required)
            .map(|i| i.name.as_str())
            .collect();
        assert_eq!(required, vec!["bucket", "access_key", "secret_key", "domain"]);
    }

    #[test]
    fn test_create_driver() {
        let driver = KodoDriverFactory
            .create_driver(json!({
                "bucket": "photos",
                "access_key": "ak",
                "secret_key": "sk",
                "domain": "cdn.example.com",
                "work_dir": "/backup/",
                "virtual_dir": true,
            }))
            .unwrap();
        assert_eq!(driver.name(), "Kodo");
        assert_eq!(driver.metadata().work_dir, "/backup/");
        assert!(driver.capabilities().virtual_dir);
    }

    #[test]
    fn test_create_driver_rejects_bad_config() {
        let err = KodoDriverFactory
            .create_driver(json!({ "bucket": "photos" }))
            .err()
            .unwrap();
        assert!(err.to_string().contains("配置解析失败"));

        // empty secret key
        assert!(KodoDriverFactory
            .create_driver(json!({
                "bucket": "photos",
                "access_key": "ak",
                "secret_key": "",
                "domain": "cdn.example.com",
            }))
            .is_err());
    }
}

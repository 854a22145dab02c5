use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use futures::StreamExt;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{get_common_items, ConfigItem, DriverConfig, DriverInfo, ListMode, ListOptions, StorageDriver};

pub type DriverBox = Arc<Box<dyn StorageDriver>>;

/// Driver factory trait / 驱动工厂 trait
pub trait DriverFactory: Send + Sync {
    /// Driver type name / 驱动类型名称
    fn driver_type(&self) -> &'static str;

    /// 创建驱动实例
    fn create_driver(&self, config: Value) -> Result<Box<dyn StorageDriver>>;

    /// Return driver basic config / 返回驱动基本配置
    fn driver_config(&self) -> DriverConfig;

    /// Return driver specific config items / 返回驱动特有配置项
    fn additional_items(&self) -> Vec<ConfigItem>;

    /// Generate complete driver info (auto merge common + additional) / 生成完整的驱动信息
    fn driver_info(&self) -> DriverInfo {
        let config = self.driver_config();
        let common = get_common_items(&config);
        let additional = self.additional_items();
        DriverInfo { common, additional, config }
    }
}

/// Storage manager (manages all driver instances) / 存储管理器
#[derive(Clone)]
pub struct StorageManager {
    drivers: Arc<RwLock<HashMap<String, DriverBox>>>,
    factories: Arc<RwLock<HashMap<String, Arc<Box<dyn DriverFactory>>>>>,
    /// Driver error status (id -> error message) / 驱动错误状态
    driver_errors: Arc<RwLock<HashMap<String, String>>>,
}

impl Default for StorageManager {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageManager {
    pub fn new() -> Self {
        Self {
            drivers: Arc::new(RwLock::new(HashMap::new())),
            factories: Arc::new(RwLock::new(HashMap::new())),
            driver_errors: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register driver factory / 注册驱动工厂
    pub async fn register_factory(&self, factory: Box<dyn DriverFactory>) -> Result<()> {
        let driver_type = factory.driver_type().to_string();
        let factory_box = Arc::new(factory);

        let mut factories = self.factories.write().await;
        factories.insert(driver_type.clone(), factory_box);

        tracing::info!("Driver factory registered: {}", driver_type);
        Ok(())
    }

    /// Create driver instance (verify on success, record error on failure) / 创建驱动实例
    pub async fn create_driver(&self, id: String, driver_type: &str, config: Value) -> Result<String> {
        let factories = self.factories.read().await;
        let factory = factories
            .get(driver_type)
            .ok_or_else(|| anyhow!("Driver type not found: {}", driver_type))?;

        match factory.create_driver(config) {
            Ok(driver) => {
                let driver_box: DriverBox = Arc::new(driver);

                drop(factories);

                // Verify driver validity: pull one entry of the root / 验证驱动有效性
                let validation_result = Self::probe(&driver_box).await;

                let mut drivers = self.drivers.write().await;
                drivers.insert(id.clone(), driver_box);
                drop(drivers);

                match validation_result {
                    Ok(()) => {
                        let mut errors = self.driver_errors.write().await;
                        errors.remove(&id);
                        tracing::info!("Driver created and verified: {} ({})", id, driver_type);
                    }
                    Err(e) => {
                        // Driver is still kept, only the error is recorded / 验证失败仅记录错误
                        let error_msg = e.to_string();
                        let mut errors = self.driver_errors.write().await;
                        errors.insert(id.clone(), error_msg.clone());
                        tracing::warn!(
                            "Driver created but verification failed: {} ({}) - {}",
                            id,
                            driver_type,
                            error_msg
                        );
                    }
                }

                Ok(id)
            }
            Err(e) => {
                drop(factories);
                let error_msg = e.to_string();
                let mut errors = self.driver_errors.write().await;
                errors.insert(id.clone(), error_msg.clone());

                tracing::error!("Driver creation failed: {} ({}) - {}", id, driver_type, error_msg);
                Err(e)
            }
        }
    }

    async fn probe(driver: &DriverBox) -> Result<()> {
        let mut entries = driver.list("", &ListOptions::new(ListMode::DIR))?;
        match entries.next().await {
            Some(Err(e)) => Err(e.into()),
            _ => Ok(()),
        }
    }

    /// Get driver error status / 获取驱动错误状态
    pub async fn get_driver_error(&self, id: &str) -> Option<String> {
        let errors = self.driver_errors.read().await;
        errors.get(id).cloned()
    }

    /// Get driver instance / 获取驱动实例
    pub async fn get_driver(&self, id: &str) -> Option<DriverBox> {
        let drivers = self.drivers.read().await;
        drivers.get(id).cloned()
    }

    /// Remove driver instance / 移除驱动实例
    pub async fn remove_driver(&self, id: &str) -> Result<()> {
        let mut drivers = self.drivers.write().await;
        drivers
            .remove(id)
            .ok_or_else(|| anyhow!("Driver not found: {}", id))?;
        drop(drivers);

        self.driver_errors.write().await.remove(id);
        tracing::info!("Driver removed: {}", id);
        Ok(())
    }

    /// List all drivers / 列出所有驱动
    pub async fn list_drivers(&self) -> Vec<String> {
        let drivers = self.drivers.read().await;
        drivers.keys().cloned().collect()
    }

    /// List all available driver types / 列出所有可用的驱动类型
    pub async fn list_driver_types(&self) -> Vec<String> {
        let factories = self.factories.read().await;
        factories.keys().cloned().collect()
    }

    /// Get driver info of a registered type / 获取驱动类型信息
    pub async fn driver_info(&self, driver_type: &str) -> Option<DriverInfo> {
        let factories = self.factories.read().await;
        factories.get(driver_type).map(|f| f.driver_info())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::kodo::mock::{MockBackend, MockFailure};
    use crate::drivers::kodo::{KodoConfig, KodoDriver, KodoDriverFactory};
    use serde_json::json;

    /// Factory serving drivers backed by a shared in-memory bucket
    struct MockKodoFactory {
        backend: Arc<MockBackend>,
    }

    impl DriverFactory for MockKodoFactory {
        fn driver_type(&self) -> &'static str {
            "kodo-mock"
        }

        fn create_driver(&self, config: Value) -> Result<Box<dyn StorageDriver>> {
            let config: KodoConfig = serde_json::from_value(config)?;
            Ok(Box::new(KodoDriver::with_backend(config, self.backend.clone())))
        }

        fn driver_config(&self) -> DriverConfig {
            KodoDriverFactory.driver_config()
        }

        fn additional_items(&self) -> Vec<ConfigItem> {
            Vec::new()
        }
    }

    fn mock_config() -> Value {
        json!({
            "bucket": "photos",
            "access_key": "ak",
            "secret_key": "sk",
            "domain": "https://cdn.example.com",
        })
    }

    #[tokio::test]
    async fn test_create_driver_verified() {
        let backend = Arc::new(MockBackend::with_keys(&["a.txt"]));
        let manager = StorageManager::new();
        manager
            .register_factory(Box::new(MockKodoFactory { backend }))
            .await
            .unwrap();

        let id = manager
            .create_driver("main".to_string(), "kodo-mock", mock_config())
            .await
            .unwrap();
        assert_eq!(id, "main");
        assert!(manager.get_driver("main").await.is_some());
        assert!(manager.get_driver_error("main").await.is_none());
    }

    #[tokio::test]
    async fn test_probe_failure_is_recorded() {
        let backend = Arc::new(MockBackend::with_keys(&["a.txt"]));
        backend.fail_list(MockFailure::Code(403));
        let manager = StorageManager::new();
        manager
            .register_factory(Box::new(MockKodoFactory { backend }))
            .await
            .unwrap();

        manager
            .create_driver("main".to_string(), "kodo-mock", mock_config())
            .await
            .unwrap();
        assert!(manager.get_driver("main").await.is_some());
        let err = manager.get_driver_error("main").await.unwrap();
        assert!(err.contains("permission denied"));

        manager.remove_driver("main").await.unwrap();
        assert!(manager.get_driver_error("main").await.is_none());
        assert!(manager.remove_driver("main").await.is_err());
    }

    #[tokio::test]
    async fn test_unknown_type_and_bad_config() {
        let manager = StorageManager::new();
        crate::drivers::register_all(&manager).await.unwrap();
        assert_eq!(manager.list_driver_types().await, vec!["kodo".to_string()]);

        let info = manager.driver_info("kodo").await.unwrap();
        assert!(info.additional.iter().any(|i| i.name == "bucket"));

        assert!(manager
            .create_driver("x".to_string(), "nope", mock_config())
            .await
            .is_err());

        // missing required bucket
        let res = manager
            .create_driver("x".to_string(), "kodo", json!({ "access_key": "ak" }))
            .await;
        assert!(res.is_err());
        assert!(manager.get_driver_error("x").await.is_some());
        assert!(manager.list_drivers().await.is_empty());
    }
}

// Driver package / 驱动包
pub mod kodo;

use crate::storage::StorageManager;

/// Register all drivers to StorageManager / 注册所有驱动
pub async fn register_all(manager: &StorageManager) -> anyhow::Result<()> {
    // Register Qiniu Kodo driver / 注册七牛云Kodo对象存储驱动
    manager.register_factory(Box::new(kodo::KodoDriverFactory)).await?;
    Ok(())
}

//! 非 Android 平台（桌面端、iOS）的更新服务
//!
//! 商店始终不可用，所有更新操作直接失败。

use async_trait::async_trait;

use crate::models::{ActivityHandle, AppUpdateInfo, AppUpdateType};
use crate::service::{
    InstallStateListener, ListenerId, ListenerRegistry, PlatformError, UpdateService,
};

#[derive(Default)]
pub struct UnsupportedUpdateService {
    listeners: ListenerRegistry,
}

#[async_trait]
impl UpdateService for UnsupportedUpdateService {
    async fn is_store_installed(&self) -> Result<bool, PlatformError> {
        Ok(false)
    }

    async fn is_services_available(&self) -> Result<bool, PlatformError> {
        Ok(false)
    }

    async fn app_update_info(&self) -> Result<AppUpdateInfo, PlatformError> {
        Err(PlatformError::unsupported())
    }

    async fn start_update_flow(
        &self,
        _info: &AppUpdateInfo,
        _update_type: AppUpdateType,
        _activity: &ActivityHandle,
        _request_code: i32,
    ) -> Result<(), PlatformError> {
        Err(PlatformError::unsupported())
    }

    async fn complete_update(&self) -> Result<(), PlatformError> {
        Err(PlatformError::unsupported())
    }

    async fn register_listener(
        &self,
        listener: InstallStateListener,
    ) -> Result<ListenerId, PlatformError> {
        Ok(self.listeners.insert(listener))
    }

    async fn unregister_listener(&self, id: ListenerId) -> Result<(), PlatformError> {
        self.listeners.remove(id);
        Ok(())
    }
}

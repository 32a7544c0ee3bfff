//! Android 移动端插件桥接
//!
//! 通过 Tauri Plugin API 注册 Kotlin 插件，Play Core 的实际调用在
//! `InAppUpdatePlugin.kt` 中完成。安装状态与 Activity 生命周期事件
//! 经由 [`Channel`] 回传到 Rust。

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tauri::{
    ipc::{Channel, InvokeResponseBody},
    plugin::{mobile::PluginInvokeError, PluginApi, PluginHandle},
    Runtime,
};
use tracing::warn;

use crate::models::{ActivityHandle, AppUpdateInfo, AppUpdateType, InstallState};
use crate::relay::{HostEvent, HostEventSender};
use crate::service::{
    InstallStateListener, ListenerId, ListenerRegistry, PlatformError, PlatformSubscription,
    UpdateService,
};

const PLUGIN_IDENTIFIER: &str = "app.tauri.inappupdate";

/// 构建 Android 更新服务
pub fn init<R: Runtime, C: DeserializeOwned>(
    api: &PluginApi<R, C>,
) -> Result<AndroidUpdateService<R>, PluginInvokeError> {
    let handle = api.register_android_plugin(PLUGIN_IDENTIFIER, "InAppUpdatePlugin")?;
    Ok(AndroidUpdateService {
        handle,
        listeners: Arc::new(ListenerRegistry::default()),
        subscription: PlatformSubscription::default(),
    })
}

#[derive(Deserialize)]
struct BoolResponse {
    value: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StartUpdateFlowPayload {
    update_type: AppUpdateType,
    request_code: i32,
    available_version_code: i32,
}

/// Play Core `AppUpdateManager` 的 Rust 侧句柄
pub struct AndroidUpdateService<R: Runtime> {
    handle: PluginHandle<R>,
    listeners: Arc<ListenerRegistry>,
    /// Kotlin 侧是否已注册 `InstallStateUpdatedListener`
    subscription: PlatformSubscription,
}

impl<R: Runtime> AndroidUpdateService<R> {
    /// 在阻塞线程中调用 Kotlin 方法
    async fn invoke<T>(&self, command: &'static str, payload: Value) -> Result<T, PlatformError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let handle = self.handle.clone();
        tauri::async_runtime::spawn_blocking(move || handle.run_mobile_plugin::<T>(command, payload))
            .await
            .map_err(|e| PlatformError::new(e.to_string()))?
            .map_err(platform_error)
    }

    /// 订阅 Activity 生命周期与 Activity 结果
    pub fn subscribe_host_events(&self, events: HostEventSender) -> Result<(), PlatformError> {
        let channel: Channel<Value> = Channel::new(move |body: InvokeResponseBody| {
            match body.deserialize::<HostEvent>() {
                Ok(event) => {
                    if events.send(event).is_err() {
                        warn!("Host event loop stopped, dropping event");
                    }
                }
                Err(e) => warn!("Invalid host event: {}", e),
            }
            Ok(())
        });

        self.handle
            .run_mobile_plugin::<Value>("registerHostChannel", json!({ "channel": channel }))
            .map(|_| ())
            .map_err(platform_error)
    }
}

/// 平台拒绝时保留原始消息
fn platform_error(err: PluginInvokeError) -> PlatformError {
    match err {
        PluginInvokeError::Rejected(response) => {
            PlatformError::new(response.message.unwrap_or_default())
        }
        other => PlatformError::new(other.to_string()),
    }
}

#[async_trait]
impl<R: Runtime> UpdateService for AndroidUpdateService<R> {
    async fn is_store_installed(&self) -> Result<bool, PlatformError> {
        let response: BoolResponse = self.invoke("isStoreInstalled", json!({})).await?;
        Ok(response.value)
    }

    async fn is_services_available(&self) -> Result<bool, PlatformError> {
        let response: BoolResponse = self.invoke("isServicesAvailable", json!({})).await?;
        Ok(response.value)
    }

    async fn app_update_info(&self) -> Result<AppUpdateInfo, PlatformError> {
        self.invoke("getAppUpdateInfo", json!({})).await
    }

    async fn start_update_flow(
        &self,
        info: &AppUpdateInfo,
        update_type: AppUpdateType,
        _activity: &ActivityHandle,
        request_code: i32,
    ) -> Result<(), PlatformError> {
        let payload = StartUpdateFlowPayload {
            update_type,
            request_code,
            available_version_code: info.available_version_code,
        };
        let payload =
            serde_json::to_value(payload).map_err(|e| PlatformError::new(e.to_string()))?;
        self.invoke::<Value>("startUpdateFlow", payload).await?;
        Ok(())
    }

    async fn complete_update(&self) -> Result<(), PlatformError> {
        self.invoke::<Value>("completeUpdate", json!({})).await?;
        Ok(())
    }

    async fn register_listener(
        &self,
        listener: InstallStateListener,
    ) -> Result<ListenerId, PlatformError> {
        let id = self.listeners.insert(listener);
        let subscribed = self
            .subscription
            .subscribe(|| async {
                let listeners = self.listeners.clone();
                let channel: Channel<Value> = Channel::new(move |body: InvokeResponseBody| {
                    match body.deserialize::<InstallState>() {
                        Ok(state) => listeners.dispatch(state),
                        Err(e) => warn!("Invalid install state: {}", e),
                    }
                    Ok(())
                });
                self.invoke::<Value>("registerListener", json!({ "channel": channel }))
                    .await
                    .map(|_| ())
            })
            .await;

        if let Err(e) = subscribed {
            self.listeners.remove(id);
            return Err(e);
        }
        Ok(id)
    }

    async fn unregister_listener(&self, id: ListenerId) -> Result<(), PlatformError> {
        self.listeners.remove(id);
        self.subscription
            .unsubscribe_if(
                || self.listeners.is_empty(),
                || async {
                    self.invoke::<Value>("unregisterListener", json!({}))
                        .await
                        .map(|_| ())
                },
            )
            .await
    }
}

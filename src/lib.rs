//! Google Play 应用内更新的 Tauri 插件
//!
//! 前端通过 Tauri 命令调用 `is_play_store_available`、`check_for_update`、
//! `complete_update`，安装状态变化通过 `onUpdateDownloaded`、
//! `onUpdateInstalled`、`onUpdateFailure` 事件推送。
//!
//! Android 端转发给 Kotlin 插件中的 Play Core `AppUpdateManager`，
//! 其他平台上商店始终不可用。

pub mod bridge;
mod commands;
pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod relay;
pub mod service;
pub mod session;
pub mod unsupported;

#[cfg(target_os = "android")]
pub mod android;

#[cfg(test)]
mod fake;

pub use bridge::UpdateBridge;
pub use config::Config;
pub use error::{Error, Result};

use std::sync::Arc;

use tauri::{
    plugin::{Builder, TauriPlugin},
    Manager, Runtime,
};
use tracing::info;

use crate::events::AppEventSink;

/// 访问更新桥接的扩展 trait
pub trait InAppUpdateExt<R: Runtime> {
    fn in_app_update(&self) -> &UpdateBridge;
}

impl<R: Runtime, T: Manager<R>> InAppUpdateExt<R> for T {
    fn in_app_update(&self) -> &UpdateBridge {
        self.state::<UpdateBridge>().inner()
    }
}

/// 构建插件
pub fn init<R: Runtime>() -> TauriPlugin<R, Option<Config>> {
    Builder::<R, Option<Config>>::new("in-app-update")
        .invoke_handler(tauri::generate_handler![
            commands::is_play_store_available,
            commands::check_for_update,
            commands::complete_update,
            commands::get_update_status,
        ])
        .setup(|app, api| {
            let config = api.config().clone().unwrap_or_default();
            let sink = Arc::new(AppEventSink::new(app.clone()));

            #[cfg(target_os = "android")]
            {
                let service = Arc::new(android::init(&api)?);
                let bridge = UpdateBridge::new(service.clone(), sink, config);
                service.subscribe_host_events(relay::spawn_host_event_loop(bridge.clone()))?;
                app.manage(bridge);
            }

            #[cfg(not(target_os = "android"))]
            {
                let service = Arc::new(unsupported::UnsupportedUpdateService::default());
                app.manage(UpdateBridge::new(service, sink, config));
            }

            info!("In-app update plugin initialized");
            Ok(())
        })
        .on_drop(|app| {
            if let Some(bridge) = app.try_state::<UpdateBridge>() {
                let bridge = bridge.inner().clone();
                tauri::async_runtime::spawn(async move { bridge.teardown().await });
            }
        })
        .build()
}

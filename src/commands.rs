//! Tauri IPC 命令入口
//!
//! 薄层命令入口，仅负责参数解析，所有逻辑委托给 [`UpdateBridge`](crate::UpdateBridge)。

use tauri::{command, AppHandle, Runtime};

use crate::models::{UpdateCheckRequest, UpdateCheckResult, UpdateStatus};
use crate::{InAppUpdateExt, Result};

#[command]
pub(crate) async fn is_play_store_available<R: Runtime>(app: AppHandle<R>) -> bool {
    app.in_app_update().is_play_store_available().await
}

#[command]
pub(crate) async fn check_for_update<R: Runtime>(
    app: AppHandle<R>,
    immediate_update: Option<bool>,
    language: Option<String>,
) -> Result<UpdateCheckResult> {
    let request = UpdateCheckRequest::new(immediate_update.unwrap_or(false), language);
    app.in_app_update().check_for_update(request).await
}

#[command]
pub(crate) async fn complete_update<R: Runtime>(app: AppHandle<R>) -> Result<bool> {
    app.in_app_update().complete_update().await
}

#[command]
pub(crate) fn get_update_status<R: Runtime>(app: AppHandle<R>) -> UpdateStatus {
    app.in_app_update().status()
}

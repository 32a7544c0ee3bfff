//! Tauri 事件名常量与推送
//!
//! 所有后端 → 前端的事件名集中定义，避免硬编码字符串散落各模块。
//! 事件与请求/响应解耦，在发起调用返回之后仍可能到达。

use serde::Serialize;
use tauri::{AppHandle, Emitter, Runtime};
use tracing::warn;

use crate::models::{InstallState, InstallStatus};

// === 安装状态 ===
pub const UPDATE_DOWNLOADED: &str = "onUpdateDownloaded";
pub const UPDATE_INSTALLED: &str = "onUpdateInstalled";
pub const UPDATE_FAILURE: &str = "onUpdateFailure";

/// 推送给前端的更新状态事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStateEvent {
    Downloaded,
    Installed,
    /// 错误码原样透传平台值
    Failed { error_code: i32 },
}

impl UpdateStateEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Downloaded => UPDATE_DOWNLOADED,
            Self::Installed => UPDATE_INSTALLED,
            Self::Failed { .. } => UPDATE_FAILURE,
        }
    }

    /// 从平台安装状态映射，非终态（下载中、排队等）不产生事件
    pub fn from_install_state(state: &InstallState) -> Option<Self> {
        match state.install_status {
            InstallStatus::Downloaded => Some(Self::Downloaded),
            InstallStatus::Installed => Some(Self::Installed),
            InstallStatus::Failed => Some(Self::Failed {
                error_code: state.install_error_code,
            }),
            _ => None,
        }
    }
}

/// `onUpdateFailure` 事件 payload
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFailurePayload {
    pub error_code: i32,
}

/// 事件出口
///
/// 桥接层只依赖该 trait，测试中替换为记录型实现。
pub trait UpdateEventSink: Send + Sync {
    fn notify(&self, event: UpdateStateEvent);
}

/// 通过 Tauri Event 推送到前端
pub struct AppEventSink<R: Runtime>(AppHandle<R>);

impl<R: Runtime> AppEventSink<R> {
    pub fn new(app: AppHandle<R>) -> Self {
        Self(app)
    }
}

impl<R: Runtime> UpdateEventSink for AppEventSink<R> {
    fn notify(&self, event: UpdateStateEvent) {
        let result = match event {
            UpdateStateEvent::Failed { error_code } => self
                .0
                .emit(event.name(), UpdateFailurePayload { error_code }),
            _ => self.0.emit(event.name(), ()),
        };
        if let Err(e) = result {
            warn!("Failed to emit {}: {}", event.name(), e);
        }
    }
}

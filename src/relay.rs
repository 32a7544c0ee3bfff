//! 生命周期/Activity 结果中继
//!
//! 宿主平台的 Activity 生命周期和 Activity 结果以 [`HostEvent`] 的形式送入，
//! 由单个消费者按到达顺序交给 [`UpdateBridge`] 处理。

use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::debug;

use crate::bridge::UpdateBridge;
use crate::models::ActivityHandle;

/// 宿主平台推送的事件
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum HostEvent {
    ActivityAttached { activity: String },
    /// 配置变更后 Activity 重建
    ActivityReattached { activity: String },
    ActivityDetached { for_config_change: bool },
    ActivityResumed,
    ActivityResult { request_code: i32, result_code: i32 },
    /// 插件与引擎分离，桥接随之拆除
    EngineDetached,
}

pub type HostEventSender = mpsc::UnboundedSender<HostEvent>;

/// 把单个宿主事件交给桥接
pub async fn relay_host_event(bridge: &UpdateBridge, event: HostEvent) {
    debug!(?event, "Host event");
    match event {
        HostEvent::ActivityAttached { activity } => {
            bridge.attach_activity(ActivityHandle::new(activity));
        }
        HostEvent::ActivityReattached { activity } => {
            bridge.reattach_activity(ActivityHandle::new(activity));
        }
        HostEvent::ActivityDetached { for_config_change } => {
            bridge.detach_activity(for_config_change);
        }
        HostEvent::ActivityResumed => bridge.on_activity_resumed().await,
        HostEvent::ActivityResult {
            request_code,
            result_code,
        } => {
            bridge.on_activity_result(request_code, result_code);
        }
        HostEvent::EngineDetached => bridge.teardown().await,
    }
}

/// 启动事件循环，返回投递端
///
/// 所有发送端释放后循环结束。
pub fn spawn_host_event_loop(bridge: UpdateBridge) -> HostEventSender {
    let (tx, mut rx) = mpsc::unbounded_channel();
    tauri::async_runtime::spawn(async move {
        while let Some(event) = rx.recv().await {
            relay_host_event(&bridge, event).await;
        }
        debug!("Host event loop stopped");
    });
    tx
}

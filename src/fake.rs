//! 测试用的可编排平台服务与事件记录器

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::events::{UpdateEventSink, UpdateStateEvent};
use crate::models::{
    ActivityHandle, AppUpdateInfo, AppUpdateType, InstallState, InstallStatus, UpdateAvailability,
};
use crate::service::{
    InstallStateListener, ListenerId, ListenerRegistry, PlatformError, UpdateService,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    StoreInstalled,
    ServicesAvailable,
    AppUpdateInfo,
    StartUpdateFlow {
        update_type: AppUpdateType,
        request_code: i32,
    },
    CompleteUpdate,
    RegisterListener,
    UnregisterListener,
}

pub struct FakeUpdateService {
    pub store_installed: Mutex<Result<bool, PlatformError>>,
    pub services_available: Mutex<Result<bool, PlatformError>>,
    pub info: Mutex<Result<AppUpdateInfo, PlatformError>>,
    pub start_result: Mutex<Result<(), PlatformError>>,
    pub complete_result: Mutex<Result<(), PlatformError>>,
    /// 设置后 `app_update_info` 会等待通知再返回
    pub info_gate: Mutex<Option<Arc<Notify>>>,
    pub listeners: ListenerRegistry,
    calls: Mutex<Vec<Call>>,
}

impl Default for FakeUpdateService {
    fn default() -> Self {
        Self {
            store_installed: Mutex::new(Ok(true)),
            services_available: Mutex::new(Ok(true)),
            info: Mutex::new(Ok(update_info(
                UpdateAvailability::UpdateNotAvailable,
                0,
                false,
                false,
            ))),
            start_result: Mutex::new(Ok(())),
            complete_result: Mutex::new(Ok(())),
            info_gate: Mutex::new(None),
            listeners: ListenerRegistry::default(),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl FakeUpdateService {
    pub fn with_info(info: AppUpdateInfo) -> Self {
        let service = Self::default();
        *service.info.lock().unwrap() = Ok(info);
        service
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn started_flows(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::StartUpdateFlow { .. }))
            .collect()
    }

    /// 模拟平台推送安装状态
    pub fn push_state(&self, state: InstallState) {
        self.listeners.dispatch(state);
    }

    pub fn push_status(&self, status: InstallStatus) {
        self.push_state(InstallState::new(status));
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl UpdateService for FakeUpdateService {
    async fn is_store_installed(&self) -> Result<bool, PlatformError> {
        self.record(Call::StoreInstalled);
        self.store_installed.lock().unwrap().clone()
    }

    async fn is_services_available(&self) -> Result<bool, PlatformError> {
        self.record(Call::ServicesAvailable);
        self.services_available.lock().unwrap().clone()
    }

    async fn app_update_info(&self) -> Result<AppUpdateInfo, PlatformError> {
        self.record(Call::AppUpdateInfo);
        let gate = self.info_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.info.lock().unwrap().clone()
    }

    async fn start_update_flow(
        &self,
        _info: &AppUpdateInfo,
        update_type: AppUpdateType,
        _activity: &ActivityHandle,
        request_code: i32,
    ) -> Result<(), PlatformError> {
        self.record(Call::StartUpdateFlow {
            update_type,
            request_code,
        });
        self.start_result.lock().unwrap().clone()
    }

    async fn complete_update(&self) -> Result<(), PlatformError> {
        self.record(Call::CompleteUpdate);
        self.complete_result.lock().unwrap().clone()
    }

    async fn register_listener(
        &self,
        listener: InstallStateListener,
    ) -> Result<ListenerId, PlatformError> {
        self.record(Call::RegisterListener);
        Ok(self.listeners.insert(listener))
    }

    async fn unregister_listener(&self, id: ListenerId) -> Result<(), PlatformError> {
        self.record(Call::UnregisterListener);
        self.listeners.remove(id);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<UpdateStateEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<UpdateStateEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl UpdateEventSink for RecordingSink {
    fn notify(&self, event: UpdateStateEvent) {
        self.events.lock().unwrap().push(event);
    }
}

pub fn update_info(
    availability: UpdateAvailability,
    version_code: i32,
    immediate_allowed: bool,
    flexible_allowed: bool,
) -> AppUpdateInfo {
    AppUpdateInfo {
        update_availability: availability,
        available_version_code: version_code,
        install_status: InstallStatus::Unknown,
        immediate_allowed,
        flexible_allowed,
        client_version_staleness_days: None,
        update_priority: 0,
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(
            "tauri_plugin_in_app_update=debug",
        ))
        .with_test_writer()
        .try_init();
}

//! 更新桥接处理器
//!
//! 接收前端的方法调用，校验前台 Activity，转发给平台更新服务，
//! 并把异步结果转换为结构化的响应或错误。
//!
//! 所有共享状态（Activity 引用、安装状态监听器、待回传会话）都由
//! [`UpdateBridge`] 实例持有，拆除时统一失效，过期回调直接丢弃。

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::events::{UpdateEventSink, UpdateStateEvent};
use crate::models::{
    ActivityHandle, AppUpdateInfo, AppUpdateType, InstallState, UpdateAvailability,
    UpdateCheckRequest, UpdateCheckResult, UpdatePhase, UpdateStatus, RESULT_OK,
};
use crate::service::{InstallStateListener, ListenerId, PlatformError, UpdateService};
use crate::session::{PendingUpdateSession, SessionSlot};
use crate::{Error, Result};

/// 方法通道支持的方法名
pub mod methods {
    pub const IS_PLAY_STORE_AVAILABLE: &str = "isPlayStoreAvailable";
    pub const CHECK_FOR_UPDATE: &str = "checkForUpdate";
    pub const COMPLETE_UPDATE: &str = "completeUpdate";
}

const BRIDGE_TORN_DOWN: &str = "In-app update bridge has been torn down";

/// 更新桥接
///
/// 克隆开销很小，所有克隆共享同一份状态。
#[derive(Clone)]
pub struct UpdateBridge {
    inner: Arc<Inner>,
}

struct Inner {
    service: Arc<dyn UpdateService>,
    sink: Arc<dyn UpdateEventSink>,
    config: Config,
    state: Mutex<BridgeState>,
}

#[derive(Default)]
struct BridgeState {
    activity: Option<ActivityHandle>,
    /// 每次 Activity 分离时递增，异步回调据此判断是否过期
    detach_epoch: u64,
    torn_down: bool,
    phase: UpdatePhase,
    listener: Option<ListenerId>,
    session: SessionSlot,
}

impl Inner {
    /// 获取状态锁，中毒时继续使用内部数据
    fn lock(&self) -> MutexGuard<'_, BridgeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn relay_install_state(&self, state: InstallState) {
        let Some(event) = UpdateStateEvent::from_install_state(&state) else {
            debug!(
                status = ?state.install_status,
                downloaded = state.bytes_downloaded,
                total = state.total_bytes_to_download,
                "Install state not relayed"
            );
            return;
        };

        {
            let mut guard = self.lock();
            if guard.torn_down {
                debug!("Bridge torn down, dropping {}", event.name());
                return;
            }
            if matches!(
                guard.phase,
                UpdatePhase::FlowStarted | UpdatePhase::Downloaded
            ) {
                guard.phase = match event {
                    UpdateStateEvent::Downloaded => UpdatePhase::Downloaded,
                    _ => UpdatePhase::Idle,
                };
            }
        }

        info!("Install state changed: {}", event.name());
        self.sink.notify(event);
    }
}

impl UpdateBridge {
    pub fn new(
        service: Arc<dyn UpdateService>,
        sink: Arc<dyn UpdateEventSink>,
        config: Config,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                service,
                sink,
                config,
                state: Mutex::new(BridgeState::default()),
            }),
        }
    }

    /// 当前状态快照
    pub fn status(&self) -> UpdateStatus {
        let state = self.inner.lock();
        UpdateStatus {
            phase: state.phase,
            activity_attached: state.activity.is_some(),
            listener_registered: state.listener.is_some(),
            session: state.session.current().map(PendingUpdateSession::info),
        }
    }

    // ============ 方法通道 ============

    /// 按方法名分发调用，未知方法返回 [`Error::NotImplemented`]
    pub async fn dispatch(&self, method: &str, arguments: Value) -> Result<Value> {
        match method {
            methods::IS_PLAY_STORE_AVAILABLE => {
                Ok(Value::Bool(self.is_play_store_available().await))
            }
            methods::CHECK_FOR_UPDATE => {
                let request = if arguments.is_null() {
                    UpdateCheckRequest::default()
                } else {
                    serde_json::from_value(arguments)
                        .map_err(|e| Error::InvalidArguments(e.to_string()))?
                };
                let result = self.check_for_update(request).await?;
                Ok(serde_json::to_value(result)?)
            }
            methods::COMPLETE_UPDATE => Ok(Value::Bool(self.complete_update().await?)),
            other => Err(Error::NotImplemented(other.to_string())),
        }
    }

    /// 商店应用已安装且系统服务可用
    ///
    /// 任一查询失败都按不可用处理，从不返回错误。
    pub async fn is_play_store_available(&self) -> bool {
        let torn_down = self.inner.lock().torn_down;
        if torn_down {
            return false;
        }

        let store = match self.inner.service.is_store_installed().await {
            Ok(installed) => installed,
            Err(e) => {
                debug!("Play Store not found: {}", e);
                false
            }
        };
        let services = match self.inner.service.is_services_available().await {
            Ok(available) => available,
            Err(e) => {
                debug!("Google Play Services check failed: {}", e);
                false
            }
        };

        debug!(store, services, "Play Store availability");
        store && services
    }

    /// 检查更新，请求的更新类型被允许时拉起更新流程
    pub async fn check_for_update(&self, request: UpdateCheckRequest) -> Result<UpdateCheckResult> {
        debug!(
            immediate_update = request.immediate_update,
            language = ?request.language,
            "checkForUpdate called"
        );

        let (activity, epoch) = {
            let mut state = self.inner.lock();
            let Some(activity) = state.activity.clone() else {
                warn!("No activity available");
                return Err(Error::NoActivity);
            };
            if state.phase == UpdatePhase::Checking || state.session.is_pending() {
                return Err(Error::UpdateInProgress);
            }
            state.phase = UpdatePhase::Checking;
            (activity, state.detach_epoch)
        };

        let result = self.run_check(&request, &activity, epoch).await;
        if result.is_err() {
            let mut state = self.inner.lock();
            if state.phase == UpdatePhase::Checking {
                state.phase = UpdatePhase::Idle;
            }
        }
        result
    }

    async fn run_check(
        &self,
        request: &UpdateCheckRequest,
        activity: &ActivityHandle,
        epoch: u64,
    ) -> Result<UpdateCheckResult> {
        self.register_listener().await.map_err(|e| {
            warn!("Failed to register install state listener: {}", e);
            Error::UpdateCheckFailed(e.message)
        })?;

        let info = self.inner.service.app_update_info().await.map_err(|e| {
            warn!("Update check failed: {}", e);
            Error::UpdateCheckFailed(e.message)
        })?;
        debug!(
            availability = ?info.update_availability,
            version_code = info.available_version_code,
            install_status = ?info.install_status,
            staleness_days = ?info.client_version_staleness_days,
            priority = info.update_priority,
            "appUpdateInfo received"
        );

        let update_type = request.update_type();
        let allowed = info.is_update_type_allowed(update_type);
        let available = info.is_update_available();
        let result = UpdateCheckResult {
            update_available: available,
            immediate_update_allowed: update_type == AppUpdateType::Immediate && allowed,
            flexible_update_allowed: update_type == AppUpdateType::Flexible && allowed,
            version_code: available.then_some(info.available_version_code),
        };
        let should_start =
            allowed && (available || self.inner.config.start_flow_when_unavailable);

        let token = {
            let mut state = self.inner.lock();
            if state.torn_down || state.detach_epoch != epoch || state.activity.is_none() {
                debug!("Activity detached during update check, discarding result");
                return Err(Error::NoActivity);
            }
            if !should_start {
                state.phase = UpdatePhase::Idle;
                info!(?update_type, allowed, available, "Update flow not started");
                return Ok(result);
            }
            state.phase = UpdatePhase::FlowStarted;
            state
                .session
                .begin(update_type, self.inner.config.request_code)
        };

        match token {
            Some(token) => self.launch_flow(&info, update_type, activity, token).await,
            None => debug!("Another update flow is already pending"),
        }
        Ok(result)
    }

    /// 拉起更新流程，失败只记录日志并撤销会话
    async fn launch_flow(
        &self,
        info: &AppUpdateInfo,
        update_type: AppUpdateType,
        activity: &ActivityHandle,
        token: Uuid,
    ) {
        info!(
            ?update_type,
            activity = activity.name(),
            %token,
            "Starting update flow"
        );
        let started = self
            .inner
            .service
            .start_update_flow(info, update_type, activity, self.inner.config.request_code)
            .await;

        match started {
            Ok(()) => info!("Update flow started successfully"),
            Err(e) => {
                warn!("Error starting update flow: {}", e);
                let mut state = self.inner.lock();
                if state.session.clear_if(token) {
                    state.phase = UpdatePhase::Idle;
                }
            }
        }
    }

    /// 注册安装状态监听器，先注销旧监听器，保证同一时刻只有一个
    async fn register_listener(&self) -> std::result::Result<(), PlatformError> {
        let previous = self.inner.lock().listener.take();
        if let Some(id) = previous {
            if let Err(e) = self.inner.service.unregister_listener(id).await {
                warn!("Failed to unregister install state listener: {}", e);
            }
        }

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let listener: InstallStateListener = Arc::new(move |state| {
            if let Some(inner) = weak.upgrade() {
                inner.relay_install_state(state);
            }
        });
        let id = self.inner.service.register_listener(listener).await?;

        let stale = {
            let mut state = self.inner.lock();
            if state.torn_down {
                Some(id)
            } else {
                state.listener = Some(id);
                None
            }
        };
        if let Some(id) = stale {
            if let Err(e) = self.inner.service.unregister_listener(id).await {
                warn!("Failed to unregister install state listener: {}", e);
            }
        }
        Ok(())
    }

    /// 安装已下载的更新
    pub async fn complete_update(&self) -> Result<bool> {
        debug!("completeUpdate called");
        let torn_down = self.inner.lock().torn_down;
        if torn_down {
            return Err(Error::CompleteUpdateFailed(BRIDGE_TORN_DOWN.to_string()));
        }

        match self.inner.service.complete_update().await {
            Ok(()) => {
                info!("completeUpdate successful");
                Ok(true)
            }
            Err(e) => {
                warn!("completeUpdate failed: {}", e);
                Err(Error::CompleteUpdateFailed(e.message))
            }
        }
    }

    // ============ 生命周期 ============

    pub fn attach_activity(&self, activity: ActivityHandle) {
        let mut state = self.inner.lock();
        if state.torn_down {
            warn!(activity = activity.name(), "Bridge torn down, ignoring activity");
            return;
        }
        info!(activity = activity.name(), "Activity attached");
        state.activity = Some(activity);
    }

    /// 配置变更后恢复 Activity 引用，不会重新发起检查
    pub fn reattach_activity(&self, activity: ActivityHandle) {
        debug!("Activity reattached after config change");
        self.attach_activity(activity);
    }

    /// 清除 Activity 引用
    ///
    /// 配置变更导致的分离保留待回传会话，Activity 重建后仍能收到结果；
    /// 彻底分离时会话一并销毁。
    pub fn detach_activity(&self, for_config_change: bool) {
        let mut state = self.inner.lock();
        state.activity = None;
        state.detach_epoch += 1;
        if !for_config_change {
            if let Some(session) = state.session.clear() {
                debug!(token = %session.token(), "Pending update session discarded");
            }
            state.phase = UpdatePhase::Idle;
        }
        info!(for_config_change, "Activity detached");
    }

    /// 处理 Activity 结果，请求码匹配时返回 true
    pub fn on_activity_result(&self, request_code: i32, result_code: i32) -> bool {
        if request_code != self.inner.config.request_code {
            return false;
        }

        let session = {
            let mut state = self.inner.lock();
            if state.torn_down {
                debug!(result_code, "Bridge torn down, dropping activity result");
                return true;
            }
            let session = state.session.take_matching(request_code);
            if result_code != RESULT_OK && state.phase == UpdatePhase::FlowStarted {
                state.phase = UpdatePhase::Idle;
            }
            session
        };

        match &session {
            Some(session) => debug!(token = %session.token(), result_code, "Update flow result"),
            None => debug!(result_code, "Update flow result without pending session"),
        }

        if result_code != RESULT_OK {
            warn!(result_code, "Update flow was not accepted");
            self.inner.sink.notify(UpdateStateEvent::Failed {
                error_code: result_code,
            });
        }
        true
    }

    /// Activity 恢复时重新拉起被中断的立即更新
    pub async fn on_activity_resumed(&self) {
        if !self.inner.config.resume_stalled_updates {
            return;
        }

        let (activity, epoch) = {
            let state = self.inner.lock();
            if state.torn_down
                || state.session.is_pending()
                || state.phase == UpdatePhase::Checking
            {
                return;
            }
            let Some(activity) = state.activity.clone() else {
                return;
            };
            (activity, state.detach_epoch)
        };

        let info = match self.inner.service.app_update_info().await {
            Ok(info) => info,
            Err(e) => {
                debug!("Update info unavailable on resume: {}", e);
                return;
            }
        };
        if info.update_availability != UpdateAvailability::DeveloperTriggeredUpdateInProgress {
            return;
        }

        let token = {
            let mut state = self.inner.lock();
            if state.torn_down || state.detach_epoch != epoch || state.activity.is_none() {
                return;
            }
            let Some(token) = state
                .session
                .begin(AppUpdateType::Immediate, self.inner.config.request_code)
            else {
                return;
            };
            state.phase = UpdatePhase::FlowStarted;
            token
        };

        info!("Resuming interrupted immediate update");
        self.launch_flow(&info, AppUpdateType::Immediate, &activity, token)
            .await;
    }

    /// 拆除桥接：注销监听器、丢弃会话与 Activity 引用
    ///
    /// 之后到达的回调全部丢弃。
    pub async fn teardown(&self) {
        let listener = {
            let mut state = self.inner.lock();
            if state.torn_down {
                return;
            }
            state.torn_down = true;
            state.activity = None;
            state.detach_epoch += 1;
            state.phase = UpdatePhase::Idle;
            if let Some(session) = state.session.clear() {
                debug!(token = %session.token(), "Pending update session discarded");
            }
            state.listener.take()
        };

        if let Some(id) = listener {
            if let Err(e) = self.inner.service.unregister_listener(id).await {
                warn!("Failed to unregister install state listener: {}", e);
            }
        }
        info!("In-app update bridge torn down");
    }
}

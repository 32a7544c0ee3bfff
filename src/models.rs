//! 更新桥接的数据模型
//!
//! 包含前端请求/响应结构，以及 Google Play Core 枚举（整数码）的 Rust 映射。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Activity 返回成功的 resultCode（`Activity.RESULT_OK`）
pub const RESULT_OK: i32 = -1;

/// `checkForUpdate` 的参数
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateCheckRequest {
    /// true 请求立即更新，false 请求灵活更新
    pub immediate_update: bool,
    /// 界面语言，仅用于日志
    pub language: Option<String>,
}

impl UpdateCheckRequest {
    pub fn new(immediate_update: bool, language: Option<String>) -> Self {
        Self {
            immediate_update,
            language,
        }
    }

    /// 请求对应的更新类型
    pub fn update_type(&self) -> AppUpdateType {
        if self.immediate_update {
            AppUpdateType::Immediate
        } else {
            AppUpdateType::Flexible
        }
    }
}

/// `checkForUpdate` 的返回值
///
/// 没有可用更新时，除 `update_available` 外的字段没有意义。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCheckResult {
    pub update_available: bool,
    pub immediate_update_allowed: bool,
    pub flexible_update_allowed: bool,
    pub version_code: Option<i32>,
}

/// 更新可用性（`UpdateAvailability`）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum UpdateAvailability {
    Unknown,
    UpdateNotAvailable,
    UpdateAvailable,
    /// 开发者触发的立即更新在后台中断，需要重新拉起
    DeveloperTriggeredUpdateInProgress,
}

impl From<i32> for UpdateAvailability {
    fn from(code: i32) -> Self {
        match code {
            1 => Self::UpdateNotAvailable,
            2 => Self::UpdateAvailable,
            3 => Self::DeveloperTriggeredUpdateInProgress,
            _ => Self::Unknown,
        }
    }
}

impl From<UpdateAvailability> for i32 {
    fn from(value: UpdateAvailability) -> Self {
        match value {
            UpdateAvailability::Unknown => 0,
            UpdateAvailability::UpdateNotAvailable => 1,
            UpdateAvailability::UpdateAvailable => 2,
            UpdateAvailability::DeveloperTriggeredUpdateInProgress => 3,
        }
    }
}

/// 安装状态（`InstallStatus`）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum InstallStatus {
    Unknown,
    Pending,
    RequiresUiIntent,
    Downloading,
    Downloaded,
    Installing,
    Installed,
    Failed,
    Canceled,
}

impl From<i32> for InstallStatus {
    fn from(code: i32) -> Self {
        match code {
            1 => Self::Pending,
            10 => Self::RequiresUiIntent,
            2 => Self::Downloading,
            11 => Self::Downloaded,
            3 => Self::Installing,
            4 => Self::Installed,
            5 => Self::Failed,
            6 => Self::Canceled,
            _ => Self::Unknown,
        }
    }
}

impl From<InstallStatus> for i32 {
    fn from(value: InstallStatus) -> Self {
        match value {
            InstallStatus::Unknown => 0,
            InstallStatus::Pending => 1,
            InstallStatus::RequiresUiIntent => 10,
            InstallStatus::Downloading => 2,
            InstallStatus::Downloaded => 11,
            InstallStatus::Installing => 3,
            InstallStatus::Installed => 4,
            InstallStatus::Failed => 5,
            InstallStatus::Canceled => 6,
        }
    }
}

/// 更新类型（`AppUpdateType`）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum AppUpdateType {
    Flexible,
    Immediate,
}

impl From<i32> for AppUpdateType {
    fn from(code: i32) -> Self {
        match code {
            1 => Self::Immediate,
            _ => Self::Flexible,
        }
    }
}

impl From<AppUpdateType> for i32 {
    fn from(value: AppUpdateType) -> Self {
        match value {
            AppUpdateType::Flexible => 0,
            AppUpdateType::Immediate => 1,
        }
    }
}

/// 平台返回的更新信息快照（`AppUpdateInfo`）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppUpdateInfo {
    pub update_availability: UpdateAvailability,
    pub available_version_code: i32,
    #[serde(default = "unknown_install_status")]
    pub install_status: InstallStatus,
    pub immediate_allowed: bool,
    pub flexible_allowed: bool,
    #[serde(default)]
    pub client_version_staleness_days: Option<i32>,
    #[serde(default)]
    pub update_priority: i32,
}

fn unknown_install_status() -> InstallStatus {
    InstallStatus::Unknown
}

impl AppUpdateInfo {
    pub fn is_update_available(&self) -> bool {
        self.update_availability == UpdateAvailability::UpdateAvailable
    }

    /// 平台是否允许指定类型的更新
    pub fn is_update_type_allowed(&self, update_type: AppUpdateType) -> bool {
        match update_type {
            AppUpdateType::Immediate => self.immediate_allowed,
            AppUpdateType::Flexible => self.flexible_allowed,
        }
    }
}

/// 安装状态回调的 payload（`InstallState`）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallState {
    pub install_status: InstallStatus,
    #[serde(default)]
    pub install_error_code: i32,
    #[serde(default)]
    pub bytes_downloaded: i64,
    #[serde(default)]
    pub total_bytes_to_download: i64,
}

impl InstallState {
    pub fn new(install_status: InstallStatus) -> Self {
        Self {
            install_status,
            install_error_code: 0,
            bytes_downloaded: 0,
            total_bytes_to_download: 0,
        }
    }

    pub fn failed(install_error_code: i32) -> Self {
        Self {
            install_error_code,
            ..Self::new(InstallStatus::Failed)
        }
    }
}

/// 前台 Activity 的不透明引用
///
/// Rust 侧只需要区分"有/无"以及日志展示，实际对象由宿主平台持有。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityHandle(String);

impl ActivityHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

/// 更新状态机所处阶段
///
/// `Idle → Checking → (Idle | FlowStarted) → Downloaded → Idle`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum UpdatePhase {
    #[default]
    Idle,
    Checking,
    FlowStarted,
    Downloaded,
}

/// 待回传的更新流程信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub token: Uuid,
    pub update_type: AppUpdateType,
    pub request_code: i32,
    pub started_at: DateTime<Utc>,
}

/// 桥接状态快照
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatus {
    pub phase: UpdatePhase,
    pub activity_attached: bool,
    pub listener_registered: bool,
    pub session: Option<SessionInfo>,
}

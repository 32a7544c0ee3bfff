//! 插件错误处理模块
//!
//! Tauri 命令的错误必须实现 Serialize 才能传递给前端，
//! 统一转为 `{ code, message }` 格式，`code` 为稳定的错误码。

use serde::Serialize;
use thiserror::Error;

/// 插件统一错误类型
///
/// 平台侧的异常在 [`UpdateBridge`](crate::UpdateBridge) 边界处全部转换为本类型，
/// 平台返回的错误消息原样保留在 `message` 中。
#[derive(Debug, Error)]
pub enum Error {
    /// 没有可承载更新界面的前台 Activity
    #[error("No activity available")]
    NoActivity,

    /// 查询更新信息失败
    #[error("{0}")]
    UpdateCheckFailed(String),

    /// 完成（安装）已下载的更新失败
    #[error("{0}")]
    CompleteUpdateFailed(String),

    /// 未知的方法名
    #[error("Method not implemented: {0}")]
    NotImplemented(String),

    /// 已有检查或更新流程正在进行
    #[error("An update check or update flow is already in progress")]
    UpdateInProgress,

    /// 方法参数格式错误
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// 序列化/反序列化错误
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// 传递给前端的稳定错误码
    pub fn code(&self) -> &'static str {
        match self {
            Error::NoActivity => "NO_ACTIVITY",
            Error::UpdateCheckFailed(_) => "UPDATE_CHECK_FAILED",
            Error::CompleteUpdateFailed(_) => "COMPLETE_UPDATE_FAILED",
            Error::NotImplemented(_) => "NOT_IMPLEMENTED",
            Error::UpdateInProgress => "UPDATE_IN_PROGRESS",
            Error::InvalidArguments(_) => "INVALID_ARGUMENTS",
            Error::Serialization(_) => "SERIALIZATION",
        }
    }
}

/// 传递给前端的序列化错误格式
impl Serialize for Error {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("Error", 2)?;
        state.serialize_field("code", self.code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

// ============ 便捷类型别名 ============

/// Result 类型别名
pub type Result<T> = std::result::Result<T, Error>;

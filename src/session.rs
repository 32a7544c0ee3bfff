//! 待回传的更新流程会话
//!
//! 每个桥接实例最多持有一个会话，仅用于把 Activity 结果路由回发起方，
//! 在收到 Activity 结果或桥接拆除时销毁。

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{AppUpdateType, SessionInfo};

#[derive(Debug, Clone)]
pub struct PendingUpdateSession {
    token: Uuid,
    update_type: AppUpdateType,
    request_code: i32,
    started_at: DateTime<Utc>,
}

impl PendingUpdateSession {
    pub fn new(update_type: AppUpdateType, request_code: i32) -> Self {
        Self {
            token: Uuid::new_v4(),
            update_type,
            request_code,
            started_at: Utc::now(),
        }
    }

    pub fn token(&self) -> Uuid {
        self.token
    }

    pub fn update_type(&self) -> AppUpdateType {
        self.update_type
    }

    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            token: self.token,
            update_type: self.update_type,
            request_code: self.request_code,
            started_at: self.started_at,
        }
    }
}

/// 单槽会话容器
#[derive(Debug, Default)]
pub struct SessionSlot(Option<PendingUpdateSession>);

impl SessionSlot {
    pub fn is_pending(&self) -> bool {
        self.0.is_some()
    }

    pub fn current(&self) -> Option<&PendingUpdateSession> {
        self.0.as_ref()
    }

    /// 开启新会话，已有会话时返回 `None` 且不覆盖
    pub fn begin(&mut self, update_type: AppUpdateType, request_code: i32) -> Option<Uuid> {
        if self.0.is_some() {
            return None;
        }
        let session = PendingUpdateSession::new(update_type, request_code);
        let token = session.token();
        self.0 = Some(session);
        Some(token)
    }

    /// 取出与请求码匹配的会话
    pub fn take_matching(&mut self, request_code: i32) -> Option<PendingUpdateSession> {
        if self.0.as_ref()?.request_code == request_code {
            self.0.take()
        } else {
            None
        }
    }

    /// 仅在 token 仍是当前会话时清除
    pub fn clear_if(&mut self, token: Uuid) -> bool {
        if self.0.as_ref().is_some_and(|s| s.token == token) {
            self.0 = None;
            true
        } else {
            false
        }
    }

    pub fn clear(&mut self) -> Option<PendingUpdateSession> {
        self.0.take()
    }
}

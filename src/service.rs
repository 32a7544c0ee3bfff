//! 平台更新服务抽象
//!
//! 对应 Play Core `AppUpdateManager` 的四项能力：查询更新信息、拉起更新流程、
//! 完成更新、订阅安装状态。桥接层只通过 [`UpdateService`] 访问平台，
//! Android 端由 [`AndroidUpdateService`](crate::android) 实现。

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::models::{ActivityHandle, AppUpdateInfo, AppUpdateType, InstallState};

/// 平台调用失败，消息原样保留
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct PlatformError {
    pub message: String,
}

impl PlatformError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn unsupported() -> Self {
        Self::new("In-app updates are only available on Android")
    }
}

/// 安装状态监听器
pub type InstallStateListener = Arc<dyn Fn(InstallState) + Send + Sync>;

/// 监听器注册句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[async_trait]
pub trait UpdateService: Send + Sync {
    /// 商店应用是否已安装
    async fn is_store_installed(&self) -> Result<bool, PlatformError>;

    /// 商店依赖的系统服务是否可用
    async fn is_services_available(&self) -> Result<bool, PlatformError>;

    async fn app_update_info(&self) -> Result<AppUpdateInfo, PlatformError>;

    /// 拉起更新流程，结果通过 `request_code` 对应的 Activity 结果回传
    async fn start_update_flow(
        &self,
        info: &AppUpdateInfo,
        update_type: AppUpdateType,
        activity: &ActivityHandle,
        request_code: i32,
    ) -> Result<(), PlatformError>;

    /// 安装已下载的更新并重启应用
    async fn complete_update(&self) -> Result<(), PlatformError>;

    async fn register_listener(
        &self,
        listener: InstallStateListener,
    ) -> Result<ListenerId, PlatformError>;

    async fn unregister_listener(&self, id: ListenerId) -> Result<(), PlatformError>;
}

/// 安装状态监听器注册表
#[derive(Default)]
pub struct ListenerRegistry {
    next_id: AtomicU64,
    listeners: DashMap<ListenerId, InstallStateListener>,
}

impl ListenerRegistry {
    pub fn insert(&self, listener: InstallStateListener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.insert(id, listener);
        id
    }

    pub fn remove(&self, id: ListenerId) -> bool {
        self.listeners.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// 向所有监听器分发
    ///
    /// 先拷贝出监听器再调用，监听器内部可以安全地增删注册。
    pub fn dispatch(&self, state: InstallState) {
        let listeners: Vec<InstallStateListener> =
            self.listeners.iter().map(|e| e.value().clone()).collect();
        for listener in listeners {
            listener(state);
        }
    }
}

/// 平台侧的单一订阅
///
/// 订阅与退订串行执行，状态只在平台调用成功后改变。
#[derive(Default)]
pub struct PlatformSubscription {
    active: Mutex<bool>,
}

impl PlatformSubscription {
    /// 未订阅时执行 `call`，已订阅直接返回
    pub async fn subscribe<F, Fut>(&self, call: F) -> Result<(), PlatformError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), PlatformError>>,
    {
        let mut active = self.active.lock().await;
        if *active {
            return Ok(());
        }
        call().await?;
        *active = true;
        Ok(())
    }

    /// 已订阅且 `idle` 成立时执行 `call`
    ///
    /// `idle` 在锁内求值，与并发的订阅不会交错。
    pub async fn unsubscribe_if<P, F, Fut>(&self, idle: P, call: F) -> Result<(), PlatformError>
    where
        P: FnOnce() -> bool,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), PlatformError>>,
    {
        let mut active = self.active.lock().await;
        if !*active || !idle() {
            return Ok(());
        }
        call().await?;
        *active = false;
        Ok(())
    }

    pub async fn is_active(&self) -> bool {
        *self.active.lock().await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::models::InstallStatus;

    #[test]
    fn test_registry_dispatch_and_remove() {
        let registry = ListenerRegistry::default();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = hits.clone();
        let id = registry.insert(Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(registry.len(), 1);

        registry.dispatch(InstallState::new(InstallStatus::Downloaded));
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        assert!(registry.remove(id));
        assert!(!registry.remove(id));
        assert!(registry.is_empty());

        registry.dispatch(InstallState::new(InstallStatus::Installed));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_registry_ids_unique() {
        let registry = ListenerRegistry::default();
        let a = registry.insert(Arc::new(|_| {}));
        let b = registry.insert(Arc::new(|_| {}));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_subscription_stays_inactive_when_call_fails() {
        let subscription = PlatformSubscription::default();
        let err = subscription
            .subscribe(|| async { Err(PlatformError::new("binder died")) })
            .await
            .unwrap_err();
        assert_eq!(err.message, "binder died");
        assert!(!subscription.is_active().await);

        let calls = AtomicUsize::new(0);
        for _ in 0..2 {
            subscription
                .subscribe(|| async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
                .await
                .unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(subscription.is_active().await);
    }

    #[tokio::test]
    async fn test_unsubscribe_failure_keeps_subscription() {
        let subscription = PlatformSubscription::default();
        subscription.subscribe(|| async { Ok(()) }).await.unwrap();

        let err = subscription
            .unsubscribe_if(|| true, || async { Err(PlatformError::new("gone")) })
            .await
            .unwrap_err();
        assert_eq!(err.message, "gone");
        assert!(subscription.is_active().await);

        subscription
            .unsubscribe_if(|| false, || async { Ok(()) })
            .await
            .unwrap();
        assert!(subscription.is_active().await);

        subscription
            .unsubscribe_if(|| true, || async { Ok(()) })
            .await
            .unwrap();
        assert!(!subscription.is_active().await);
    }

    #[tokio::test]
    async fn test_concurrent_subscribe_calls_platform_once() {
        let subscription = Arc::new(PlatformSubscription::default());
        let calls = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let subscription = subscription.clone();
                let calls = calls.clone();
                tokio::spawn(async move {
                    subscription
                        .subscribe(|| async {
                            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                            calls.fetch_add(1, Ordering::SeqCst);
                            Ok(())
                        })
                        .await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

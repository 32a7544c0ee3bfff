use serde::Deserialize;

/// 默认保留的 Activity 请求码
pub const DEFAULT_REQUEST_CODE: i32 = 1001;

/// 插件配置，来自 `tauri.conf.json` 的 `plugins.in-app-update`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// 更新流程的 Activity 请求码
    pub request_code: i32,
    /// 平台未报告可用更新时，只要请求的更新类型被允许仍然拉起更新流程
    ///
    /// 打开后可能出现没有更新却弹出更新界面的情况。
    pub start_flow_when_unavailable: bool,
    /// Activity 恢复时重新拉起被中断的立即更新
    pub resume_stalled_updates: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            request_code: DEFAULT_REQUEST_CODE,
            start_flow_when_unavailable: false,
            resume_stalled_updates: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config() {
        let config: Config =
            serde_json::from_value(serde_json::json!({ "startFlowWhenUnavailable": true }))
                .unwrap();
        assert_eq!(config.request_code, DEFAULT_REQUEST_CODE);
        assert!(config.start_flow_when_unavailable);
        assert!(config.resume_stalled_updates);
    }
}

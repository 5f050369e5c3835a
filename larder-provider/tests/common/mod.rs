//! 共享测试工具和辅助函数

#![allow(dead_code)]

use std::sync::Arc;

use larder_provider::{BackendConfig, BackendService, BackendType, ClientOptions, create_backend};
use serde_json::Value;
use wiremock::MockServer;

pub const TEST_KEY: &str = "test-key";
pub const TEST_PROJECT: &str = "test-project";

/// 断言 `Option` 为 `Some`，并解包返回内部值（失败则直接让测试失败）。
#[macro_export]
macro_rules! require_some {
    ($expr:expr $(,)?) => {{
        let opt = $expr;
        assert!(opt.is_some(), "expected Some(..), got None");
        let Some(val) = opt else {
            return;
        };
        val
    }};
    ($expr:expr, $($msg:tt)+) => {{
        let opt = $expr;
        assert!(opt.is_some(), "{}", format_args!($($msg)+));
        let Some(val) = opt else {
            return;
        };
        val
    }};
}

/// 断言 `Result` 为 `Ok`，并解包返回内部值（失败则直接让测试失败）。
#[macro_export]
macro_rules! require_ok {
    ($expr:expr $(,)?) => {{
        let res = $expr;
        assert!(res.is_ok(), "expected Ok(..), got {res:?}");
        let Ok(val) = res else {
            return;
        };
        val
    }};
    ($expr:expr, $($msg:tt)+) => {{
        let res = $expr;
        assert!(
            res.is_ok(),
            "{}: {res:?}",
            format_args!($($msg)+)
        );
        let Ok(val) = res else {
            return;
        };
        val
    }};
}

/// No retries and a short timeout so failing cases finish quickly.
pub fn test_options() -> ClientOptions {
    ClientOptions {
        request_timeout_secs: 5,
        max_retries: 0,
    }
}

/// Configuration pointing `backend` at a mock server.
pub fn config_for(backend: BackendType, base_url: &str) -> BackendConfig {
    let mut config = BackendConfig::defaults_for(backend);
    config.base_url = base_url.to_string();
    config.api_key = TEST_KEY.to_string();
    if backend == BackendType::Firestore {
        config.project_id = TEST_PROJECT.to_string();
    }
    config
}

pub fn backend_with(config: BackendConfig, options: ClientOptions) -> Arc<dyn BackendService> {
    create_backend(config, options).expect("创建 backend 失败")
}

pub fn backend(config: BackendConfig) -> Arc<dyn BackendService> {
    backend_with(config, test_options())
}

/// 生成唯一的测试记录名称
pub fn unique_name(prefix: &str) -> String {
    let uuid = uuid::Uuid::new_v4();
    format!("{prefix}-{}", &uuid.to_string()[..8])
}

/// Bodies of every request the server saw for `method`, as JSON.
pub async fn request_bodies(server: &MockServer, method: &str) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|req| req.method.as_str() == method)
        .filter_map(|req| serde_json::from_slice(&req.body).ok())
        .collect()
}

use async_trait::async_trait;

use crate::error::{ProviderError, Result};
use crate::types::{
    BackendMetadata, BackendType, BatchCreateFailure, BatchCreateResult, ConnectionCheck, Food,
    Subscription,
};

/// 原始 API 错误（内部使用）
#[derive(Debug, Clone)]
pub(crate) struct RawApiError {
    /// HTTP 状态码
    pub status: u16,
    /// 错误码（各 backend 格式不同）
    pub code: Option<String>,
    /// 原始错误消息
    pub message: String,
}

impl RawApiError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: Some(code.into()),
            message: message.into(),
        }
    }
}

/// 错误上下文信息（内部使用）
#[derive(Debug, Clone, Default)]
pub(crate) struct ErrorContext {
    /// 记录 ID（用于 `RecordNotFound`）
    pub record_id: Option<String>,
}

impl ErrorContext {
    pub fn record(id: &str) -> Self {
        Self {
            record_id: Some(id.to_string()),
        }
    }
}

/// Backend 错误映射 Trait（内部使用）
/// 各 adapter 实现此 trait，把原始 API 错误映射到统一错误类型
pub(crate) trait ProviderErrorMapper {
    /// 返回 backend 标识符
    fn provider_name(&self) -> &'static str;

    /// 将原始 API 错误映射到统一错误类型
    fn map_error(&self, raw: RawApiError, context: ErrorContext) -> ProviderError;

    /// Status-based mapping shared by the REST backends.
    fn map_status(&self, raw: RawApiError, context: ErrorContext) -> ProviderError {
        let provider = self.provider_name().to_string();
        match raw.status {
            401 => ProviderError::InvalidCredentials {
                provider,
                raw_message: Some(raw.message),
            },
            403 => ProviderError::PermissionDenied {
                provider,
                raw_message: Some(raw.message),
            },
            404 => ProviderError::RecordNotFound {
                provider,
                record_id: context
                    .record_id
                    .unwrap_or_else(|| "<unknown>".to_string()),
                raw_message: Some(raw.message),
            },
            status if status >= 400 => ProviderError::HttpStatus {
                provider,
                status,
                raw_message: raw.message,
            },
            _ => self.unknown_error(raw),
        }
    }

    fn parse_error(&self, detail: impl ToString) -> ProviderError {
        ProviderError::ParseError {
            provider: self.provider_name().to_string(),
            detail: detail.to_string(),
        }
    }

    fn serialization_error(&self, detail: impl ToString) -> ProviderError {
        ProviderError::SerializationError {
            provider: self.provider_name().to_string(),
            detail: detail.to_string(),
        }
    }

    /// 未知错误（fallback）
    fn unknown_error(&self, raw: RawApiError) -> ProviderError {
        ProviderError::Unknown {
            provider: self.provider_name().to_string(),
            raw_code: raw.code,
            raw_message: raw.message,
        }
    }
}

/// The capability contract every backend adapter satisfies.
///
/// Every fallible operation returns [`Result`]; transport and mapping failures
/// come back as `Err(ProviderError)` and never as panics.
#[async_trait]
pub trait BackendService: Send + Sync {
    /// Display name (e.g. `"Supabase"`).
    fn service_name(&self) -> &'static str;

    fn service_type(&self) -> BackendType;

    /// Type-level metadata, available before any instance exists.
    fn metadata() -> BackendMetadata
    where
        Self: Sized;

    /// Backend handshake. Idempotent: later calls reuse the first success.
    async fn initialize(&self) -> Result<()>;

    /// Read-only reachability and credential probe.
    ///
    /// Never fails; errors are captured in the returned [`ConnectionCheck`].
    async fn test_connection(&self) -> ConnectionCheck;

    async fn get_foods(&self) -> Result<Vec<Food>>;

    /// Creates a food and returns it with the backend-assigned id.
    async fn create_food(&self, food: &Food) -> Result<Food>;

    /// Updates the food identified by `food.id`.
    async fn update_food(&self, food: &Food) -> Result<Food>;

    async fn delete_food(&self, id: &str) -> Result<()>;

    /// Subscriptions ordered by next payment (unset last), then by id.
    async fn get_subscriptions(&self) -> Result<Vec<Subscription>>;

    async fn create_subscription(&self, subscription: &Subscription) -> Result<Subscription>;

    async fn update_subscription(&self, subscription: &Subscription) -> Result<Subscription>;

    async fn delete_subscription(&self, id: &str) -> Result<()>;

    /// 批量创建食品
    ///
    /// 默认实现并发调用 `create_food()`，收集成功/失败结果。
    async fn batch_create_foods(&self, foods: &[Food]) -> Result<BatchCreateResult<Food>> {
        let futures: Vec<_> = foods.iter().map(|food| self.create_food(food)).collect();
        let results = futures::future::join_all(futures).await;
        Ok(collect_batch(results, |i| foods[i].name.clone()))
    }

    /// 批量创建订阅，语义同 [`batch_create_foods`](Self::batch_create_foods)。
    async fn batch_create_subscriptions(
        &self,
        subscriptions: &[Subscription],
    ) -> Result<BatchCreateResult<Subscription>> {
        let futures: Vec<_> = subscriptions
            .iter()
            .map(|sub| self.create_subscription(sub))
            .collect();
        let results = futures::future::join_all(futures).await;
        Ok(collect_batch(results, |i| subscriptions[i].name.clone()))
    }
}

fn collect_batch<T>(
    results: Vec<Result<T>>,
    name_of: impl Fn(usize) -> String,
) -> BatchCreateResult<T> {
    let mut created = Vec::new();
    let mut failures = Vec::new();

    for (i, result) in results.into_iter().enumerate() {
        match result {
            Ok(item) => created.push(item),
            Err(e) => failures.push(BatchCreateFailure {
                request_index: i,
                name: name_of(i),
                reason: e.to_string(),
            }),
        }
    }

    BatchCreateResult {
        success_count: created.len(),
        failed_count: failures.len(),
        created,
        failures,
    }
}

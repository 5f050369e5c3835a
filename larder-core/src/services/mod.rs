//! 业务逻辑服务层

mod backend_factory;
mod profile_service;

pub use backend_factory::BackendServiceFactory;
pub use profile_service::{SettingsProfileService, DEFAULT_PROFILE_NAME};

use std::sync::Arc;

use crate::settings::SettingsManager;
use crate::traits::ProfileRepository;

/// 服务上下文 - 持有所有依赖
///
/// 平台层需要创建此上下文，并注入平台特定的存储实现。
pub struct ServiceContext {
    /// 进程级设置
    pub settings: Arc<SettingsManager>,
    /// Profile 持久化仓库
    pub profile_repository: Arc<dyn ProfileRepository>,
}

impl ServiceContext {
    /// 创建服务上下文
    #[must_use]
    pub fn new(
        settings: Arc<SettingsManager>,
        profile_repository: Arc<dyn ProfileRepository>,
    ) -> Self {
        Self {
            settings,
            profile_repository,
        }
    }

    pub fn settings(&self) -> &Arc<SettingsManager> {
        &self.settings
    }

    pub fn profile_repository(&self) -> &dyn ProfileRepository {
        self.profile_repository.as_ref()
    }
}

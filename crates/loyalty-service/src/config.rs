//! 服务配置
//!
//! 在公共 `AppConfig` 之上叠加积分规则表和到期 Worker 配置，
//! 与其它配置项共用同一套分层加载（文件 + LOYALTY_ 环境变量）

use loyalty_engine::LoyaltyRules;
use loyalty_engine::worker::WorkerConfig;
use loyalty_shared::config::{AppConfig, load_layered};
use serde::Deserialize;

pub const SERVICE_NAME: &str = "loyalty-service";

/// loyalty-service 完整配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceConfig {
    #[serde(flatten)]
    pub app: AppConfig,
    /// 积分规则表：等级门槛、倍率、里程碑、推荐奖励等
    #[serde(default)]
    pub loyalty: LoyaltyRules,
    #[serde(default)]
    pub worker: WorkerConfig,
}

impl ServiceConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        load_layered(SERVICE_NAME)
    }
}

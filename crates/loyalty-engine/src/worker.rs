//! 到期处理 Worker
//!
//! 定期将已到期的 Pending 推荐标记为过期，并清理已过有效期的奖励

use std::sync::Arc;
use std::time::Duration;

use loyalty_shared::observability::metrics;
use serde::Deserialize;
use tracing::{error, info};

use crate::error::Result;
use crate::service::{LoyaltyService, SweepReport};

/// Worker 配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub enabled: bool,
    /// 轮询间隔（秒）
    pub poll_interval_secs: u64,
    /// 每批处理的最大推荐记录数
    pub batch_size: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_secs: 300,
            batch_size: 500,
        }
    }
}

/// 到期处理 Worker
pub struct ExpiryWorker {
    service: Arc<LoyaltyService>,
    poll_interval: Duration,
    batch_size: usize,
}

impl ExpiryWorker {
    pub fn new(service: Arc<LoyaltyService>, poll_interval_secs: u64, batch_size: usize) -> Self {
        Self {
            service,
            poll_interval: Duration::from_secs(poll_interval_secs),
            batch_size,
        }
    }

    pub fn from_config(service: Arc<LoyaltyService>, config: &WorkerConfig) -> Self {
        Self::new(service, config.poll_interval_secs, config.batch_size)
    }

    /// 主循环：持续处理直到任务被取消
    pub async fn run(&self) {
        info!(
            poll_interval = ?self.poll_interval,
            batch_size = self.batch_size,
            "ExpiryWorker 已启动"
        );

        loop {
            if let Err(e) = self.run_once().await {
                error!(error = %e, "到期处理出错");
            }
            metrics::set_worker_last_run("expiry_worker");
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// 执行一轮清理
    pub async fn run_once(&self) -> Result<SweepReport> {
        let report = self.service.run_expiry_sweep(self.batch_size).await?;
        if report != SweepReport::default() {
            info!(
                referrals_expired = report.referrals_expired,
                rewards_expired = report.rewards_expired,
                "到期处理完成"
            );
        }
        Ok(report)
    }
}

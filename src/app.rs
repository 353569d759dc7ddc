//! 命令行应用
//!
//! 读取批量请求文件 → 检查可生成性 → 选中 → 生成 → 轮询到结束 → 导出

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

use crate::clients::{ReportApi, ReportClient};
use crate::config::Config;
use crate::infrastructure::{ArtifactCache, ExportDirHandoff};
use crate::models::{load_batch_request, BatchRequest, JobStatus, TargetRef};
use crate::orchestrator::{BatchGenerator, JobPoller, ReportDesk};
use crate::services::{ArtifactManager, EligibilityProber, GenerationDispatcher};
use crate::store::JobLedger;
use crate::utils::logging;

/// 应用主结构
pub struct App {
    config: Config,
    desk: ReportDesk,
    poller: Arc<JobPoller>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        config.validate()?;
        logging::log_startup(&config);

        let api: Arc<dyn ReportApi> = Arc::new(ReportClient::new(&config)?);
        Ok(Self::with_api(config, api))
    }

    /// 使用给定的 API 实现组装各层
    pub fn with_api(config: Config, api: Arc<dyn ReportApi>) -> Self {
        let ledger = Arc::new(JobLedger::new());
        let cache = ArtifactCache::new(&config.cache_dir);
        let max_concurrent = config.max_concurrent_requests;

        let desk = ReportDesk::new(
            EligibilityProber::new(api.clone(), max_concurrent),
            BatchGenerator::new(
                GenerationDispatcher::new(api.clone(), cache.clone()),
                ledger.clone(),
                max_concurrent,
            ),
            ArtifactManager::new(
                api.clone(),
                cache,
                ledger.clone(),
                Arc::new(ExportDirHandoff::new(&config.export_dir)),
            ),
            ledger.clone(),
        );

        let poller = Arc::new(JobPoller::new(
            api,
            ledger,
            config.poll_interval(),
            max_concurrent,
        ));

        Self {
            config,
            desk,
            poller,
        }
    }

    pub fn desk(&self) -> &ReportDesk {
        &self.desk
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<()> {
        info!(
            "\n📁 正在读取批量请求: {}",
            self.config.batch_request_file.display()
        );
        let request = load_batch_request(&self.config.batch_request_file).await?;
        let params = request.params();

        self.desk
            .select_and_check_eligibility(request.mode, request.targets(), params)
            .await?;

        let selected = self.apply_selection(&request);
        if selected == 0 {
            warn!("⚠️ 没有可生成的对象，程序结束");
            return Ok(());
        }

        let outcome = self.desk.generate_for_selection().await?;
        if outcome.nothing_started() {
            return Ok(());
        }

        self.wait_for_jobs().await;
        let exported = self.export_completed().await;

        logging::print_final_stats(&self.desk.ledger().stats(), exported);
        Ok(())
    }

    /// 按请求文件选中对象，返回选中数量
    fn apply_selection(&self, request: &BatchRequest) -> usize {
        let mut catalogue = self.desk.catalogue();
        match &request.select {
            Some(ids) => {
                for &id in ids {
                    if let Err(e) = catalogue.select(TargetRef::new(request.mode, id)) {
                        warn!("⚠️ 跳过: {}", e);
                    }
                }
            }
            None => {
                catalogue.select_all_selectable();
            }
        }
        info!("✓ 已选中 {} 个对象", catalogue.selected_count());
        catalogue.selected_count()
    }

    /// 后台轮询直到没有可查询的任务，或达到最大轮询次数
    async fn wait_for_jobs(&self) {
        let ledger = self.desk.ledger();
        let waiting = || {
            ledger
                .non_terminal()
                .iter()
                .filter(|job| !job.is_placeholder())
                .count()
        };

        if waiting() == 0 {
            return;
        }

        let handle = Arc::clone(&self.poller).start();
        for _ in 0..self.config.max_poll_sweeps {
            tokio::time::sleep(self.poller.interval()).await;
            if waiting() == 0 {
                break;
            }
        }
        handle.stop().await;

        let remaining = waiting();
        if remaining > 0 {
            warn!(
                "⚠️ 达到最大轮询次数 ({}), 仍有 {} 个任务未完成",
                self.config.max_poll_sweeps, remaining
            );
        }
    }

    /// 导出所有已完成的任务，返回成功导出的数量
    async fn export_completed(&self) -> usize {
        let mut exported = 0;
        for job in self.desk.ledger().snapshot() {
            if job.status != JobStatus::Completed {
                continue;
            }
            match self.desk.download_or_share(&job.id).await {
                Ok(_) => exported += 1,
                Err(e) => warn!("[{}] ⚠️ 导出失败: {}", job.id, e),
            }
        }
        exported
    }
}

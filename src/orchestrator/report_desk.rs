//! 成绩单工作台 - 编排层
//!
//! 对上层界面暴露的入口：检查可生成性并刷新目录、为选中对象生成、
//! 下载或分享、重试失败的任务。目录和账本都由这里持有。

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, warn};

use crate::error::{AppResult, BusinessError};
use crate::models::{CatalogueEntry, GenerationMode, GenerationParams, Job, JobStatus, Target};
use crate::orchestrator::batch_generator::{BatchGenerator, BatchOutcome};
use crate::services::{ArtifactManager, EligibilityProber};
use crate::store::{Catalogue, JobLedger};
use crate::utils::logging;

pub struct ReportDesk {
    prober: EligibilityProber,
    generator: BatchGenerator,
    artifacts: ArtifactManager,
    ledger: Arc<JobLedger>,
    catalogue: Mutex<Catalogue>,
    /// 最近一次发起的检查编号，只有最新的检查能替换目录
    refresh_seq: AtomicU64,
}

impl ReportDesk {
    pub fn new(
        prober: EligibilityProber,
        generator: BatchGenerator,
        artifacts: ArtifactManager,
        ledger: Arc<JobLedger>,
    ) -> Self {
        Self {
            prober,
            generator,
            artifacts,
            ledger,
            catalogue: Mutex::new(Catalogue::new()),
            refresh_seq: AtomicU64::new(0),
        }
    }

    /// 锁住目录进行读写
    pub fn catalogue(&self) -> MutexGuard<'_, Catalogue> {
        match self.catalogue.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("目录锁已中毒，继续使用");
                poisoned.into_inner()
            }
        }
    }

    pub fn ledger(&self) -> &Arc<JobLedger> {
        &self.ledger
    }

    /// 检查一组对象的可生成性，并用结果整体替换目录
    ///
    /// 多次检查重叠时以最后发起的为准，较早的检查返回 `RefreshSuperseded`
    pub async fn select_and_check_eligibility(
        &self,
        mode: GenerationMode,
        targets: Vec<Target>,
        params: GenerationParams,
    ) -> AppResult<Vec<CatalogueEntry>> {
        params.validate()?;

        let stamp = self.refresh_seq.fetch_add(1, Ordering::AcqRel) + 1;
        let targets: Vec<Target> = targets.into_iter().filter(|t| t.kind() == mode).collect();
        let entries = self.prober.aggregate(targets, params).await;

        // 比较和替换都在目录锁内
        let mut catalogue = self.catalogue();
        if self.refresh_seq.load(Ordering::Acquire) != stamp {
            warn!("⚠️ {} 检查结果已过期，丢弃", mode);
            return Err(BusinessError::RefreshSuperseded.into());
        }
        catalogue.replace(params, mode, entries.clone());
        logging::log_catalogue_summary(mode, &catalogue.summary());
        Ok(entries)
    }

    /// 为目录中选中的对象生成
    pub async fn generate_for_selection(&self) -> AppResult<BatchOutcome> {
        let (targets, params) = {
            let catalogue = self.catalogue();
            let params = catalogue.params().ok_or(BusinessError::NoTargetsSelected)?;
            (catalogue.selected_targets(), params)
        };

        let outcome = self.generator.generate(targets, params).await?;
        if outcome.nothing_started() {
            warn!("⚠️ 没有启动任何生成任务");
        } else {
            // 已提交的对象不再保持选中
            let mut catalogue = self.catalogue();
            for job in &outcome.created {
                catalogue.deselect(job.target);
            }
        }
        Ok(outcome)
    }

    /// 取得成绩单并交给用户，返回用户可见的位置
    pub async fn download_or_share(&self, job_id: &str) -> AppResult<PathBuf> {
        self.artifacts.download_or_share(job_id).await
    }

    /// 重新生成失败的任务，总是创建新任务，原任务保留
    pub async fn retry(&self, job_id: &str) -> AppResult<Job> {
        let failed = self
            .ledger
            .get(job_id)
            .ok_or_else(|| BusinessError::JobNotFound {
                job_id: job_id.to_string(),
            })?;

        if failed.status != JobStatus::Failed {
            return Err(BusinessError::JobNotRetryable {
                job_id: failed.id,
                status: failed.status.to_string(),
            }
            .into());
        }

        let target = {
            let catalogue = self.catalogue();
            let entry = catalogue
                .get(failed.target)
                .ok_or(BusinessError::TargetNotInCatalogue {
                    target: failed.target,
                })?;
            if !entry.is_selectable() {
                return Err(BusinessError::TargetNotSelectable {
                    target: failed.target,
                    status: entry.verdict.status.to_string(),
                }
                .into());
            }
            entry.target.clone()
        };

        info!("[{}] 🔁 重新生成 {}", failed.id, failed.display_name);
        let mut outcome = self.generator.generate(vec![target], failed.params()).await?;

        match outcome.failures.pop() {
            Some((_, e)) => Err(e),
            None => outcome
                .created
                .pop()
                .ok_or_else(|| BusinessError::NoTargetsSelected.into()),
        }
    }
}

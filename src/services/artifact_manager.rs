//! 成绩单文件管理 - 业务能力层
//!
//! 优先级：
//! 1. 已有本地文件 (`file_uri`)：直接交付，不发网络请求
//! 2. 只有下载地址：标记 DOWNLOADING，下载到缓存，写回 `file_uri`，恢复 COMPLETED
//! 3. 两者都没有：报错，不做猜测
//!
//! 下载失败时任务同样恢复为 COMPLETED，错误只上报一次。

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::clients::ReportApi;
use crate::error::{AppResult, BusinessError};
use crate::infrastructure::artifact_cache::slugify;
use crate::infrastructure::{ArtifactCache, ArtifactHandle, ArtifactHandoff};
use crate::models::{Job, JobPatch, JobStatus};
use crate::store::JobLedger;

pub struct ArtifactManager {
    api: Arc<dyn ReportApi>,
    cache: ArtifactCache,
    ledger: Arc<JobLedger>,
    handoff: Arc<dyn ArtifactHandoff>,
}

impl ArtifactManager {
    pub fn new(
        api: Arc<dyn ReportApi>,
        cache: ArtifactCache,
        ledger: Arc<JobLedger>,
        handoff: Arc<dyn ArtifactHandoff>,
    ) -> Self {
        Self {
            api,
            cache,
            ledger,
            handoff,
        }
    }

    /// 确保任务的成绩单已在本地缓存中
    pub async fn materialize(&self, job_id: &str) -> AppResult<ArtifactHandle> {
        let job = self
            .ledger
            .get(job_id)
            .ok_or_else(|| BusinessError::JobNotFound {
                job_id: job_id.to_string(),
            })?;

        match job.status {
            JobStatus::Completed => {}
            JobStatus::Downloading => {
                return Err(BusinessError::DownloadInProgress {
                    job_id: job.id.clone(),
                }
                .into())
            }
            other => {
                return Err(BusinessError::JobNotCompleted {
                    job_id: job.id.clone(),
                    status: other.to_string(),
                }
                .into())
            }
        }

        if let Some(path) = job.file_uri.clone() {
            return Ok(ArtifactHandle { job_id: job.id, path });
        }

        let url = match job.download_url.clone() {
            Some(url) => url,
            None => {
                return Err(BusinessError::MissingArtifactLocation { job_id: job.id }.into());
            }
        };

        // 判断与标记在同一把锁内，避免同一任务被重复下载
        let claimed = self.ledger.merge_job_if(
            &job.id,
            JobPatch::status(JobStatus::Downloading),
            |current| current.status == JobStatus::Completed && current.file_uri.is_none(),
        );
        if claimed.is_none() {
            return Err(BusinessError::DownloadInProgress { job_id: job.id }.into());
        }
        // 下载失败或调用方放弃等待时都恢复为 COMPLETED
        let claim = DownloadClaim::new(&self.ledger, &job.id);

        info!("[{}] ⏳ 正在下载成绩单: {}", job.id, url);
        match self.fetch_into_cache(&job, &url).await {
            Ok(path) => {
                self.ledger.merge_job(
                    &job.id,
                    JobPatch {
                        status: Some(JobStatus::Completed),
                        file_uri: Some(path.clone()),
                        ..Default::default()
                    },
                );
                claim.disarm();
                info!("[{}] ✓ 已缓存: {}", job.id, path.display());
                Ok(ArtifactHandle { job_id: job.id, path })
            }
            Err(e) => {
                drop(claim);
                error!("[{}] ❌ 下载失败: {}", job.id, e);
                Err(e)
            }
        }
    }

    async fn fetch_into_cache(&self, job: &Job, url: &str) -> AppResult<PathBuf> {
        let bytes = self.api.download(url).await?;
        let file_name = format!("report-{}-{}.pdf", slugify(&job.display_name), job.id);
        self.cache.store(&file_name, &bytes).await
    }

    /// 交给用户（保存 / 导出）
    pub async fn handoff(&self, handle: &ArtifactHandle) -> AppResult<PathBuf> {
        self.handoff.hand_off(handle).await
    }

    /// `materialize` + `handoff`
    pub async fn download_or_share(&self, job_id: &str) -> AppResult<PathBuf> {
        let handle = self.materialize(job_id).await?;
        self.handoff(&handle).await
    }
}

/// DOWNLOADING 标记，离开作用域时若未解除则恢复为 COMPLETED
struct DownloadClaim<'a> {
    ledger: &'a JobLedger,
    job_id: &'a str,
    armed: bool,
}

impl<'a> DownloadClaim<'a> {
    fn new(ledger: &'a JobLedger, job_id: &'a str) -> Self {
        Self {
            ledger,
            job_id,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for DownloadClaim<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let reverted = self.ledger.merge_job_if(
            self.job_id,
            JobPatch::status(JobStatus::Completed),
            |current| current.status == JobStatus::Downloading,
        );
        if reverted.is_some() {
            warn!("[{}] 下载未完成，已恢复为 COMPLETED", self.job_id);
        }
    }
}

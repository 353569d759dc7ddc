//! 可生成性检查服务 - 业务能力层
//!
//! 单个对象的探测从不向外抛错：失败会降级成 `FETCH_FAILED` / `NOT_FOUND`，
//! 这样一个坏对象不会拖垮整批检查。

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::clients::ReportApi;
use crate::error::ApiError;
use crate::models::{
    AvailabilityStatus, AvailabilityVerdict, CatalogueEntry, GenerationParams, Target, TargetRef,
};
use crate::services::fanout::settle_all;

/// 可生成性检查服务
pub struct EligibilityProber {
    api: Arc<dyn ReportApi>,
    max_concurrent: usize,
}

impl EligibilityProber {
    pub fn new(api: Arc<dyn ReportApi>, max_concurrent: usize) -> Self {
        Self {
            api,
            max_concurrent,
        }
    }

    /// 探测单个对象
    pub async fn probe(&self, target: TargetRef, params: GenerationParams) -> AvailabilityVerdict {
        match self.api.availability(target, params).await {
            Ok(verdict) => {
                debug!("[{}] 可生成性: {}", target, verdict.status);
                verdict
            }
            Err(e) => {
                warn!("[{}] ⚠️ 可生成性检查失败: {}", target, e);
                degrade(&e)
            }
        }
    }

    /// 并发探测所有对象，返回与输入等长、同序的目录
    pub async fn aggregate(
        &self,
        targets: Vec<Target>,
        params: GenerationParams,
    ) -> Vec<CatalogueEntry> {
        let total = targets.len();
        let settled = settle_all(targets, self.max_concurrent, |target| async move {
            Ok::<_, std::convert::Infallible>(self.probe(target.target_ref(), params).await)
        })
        .await;

        let entries: Vec<CatalogueEntry> = settled
            .into_iter()
            .map(|s| {
                let verdict = s.outcome.unwrap_or_else(|never| match never {});
                CatalogueEntry::new(s.item, verdict)
            })
            .collect();

        let degraded = entries
            .iter()
            .filter(|e| e.verdict.status == AvailabilityStatus::FetchFailed)
            .count();
        info!(
            "✓ 可生成性检查完成: {} 个对象, {} 个检查失败",
            total, degraded
        );

        entries
    }
}

/// 把探测错误转换成降级结果
fn degrade(error: &ApiError) -> AvailabilityVerdict {
    match error.status() {
        Some(404) => AvailabilityVerdict::degraded(AvailabilityStatus::NotFound, "API Error 404"),
        Some(code) => {
            AvailabilityVerdict::degraded(AvailabilityStatus::FetchFailed, format!("API Error {}", code))
        }
        None => AvailabilityVerdict::degraded(
            AvailabilityStatus::FetchFailed,
            format!("API Error: {}", error),
        ),
    }
}

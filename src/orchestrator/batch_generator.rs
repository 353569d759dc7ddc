//! 批量生成协调器 - 编排层
//!
//! 对每个选中对象并发调用一次分发服务，单个对象被拒绝只计入 `failures`，
//! 不影响其他对象。全部结束后把新任务按创建时间倒序并入账本。
//!
//! 同一时间只允许一个批次在进行，第二次调用直接返回 `BatchInFlight`。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::error;

use crate::error::{AppError, AppResult, BusinessError};
use crate::models::{GenerationParams, Job, Target};
use crate::services::{partition, settle_all, GenerationDispatcher};
use crate::store::JobLedger;
use crate::utils::logging;

/// 一个批次的结果
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// 新创建的任务（最新的在前）
    pub created: Vec<Job>,
    /// 被拒绝的对象及原因
    pub failures: Vec<(Target, AppError)>,
}

impl BatchOutcome {
    pub fn succeeded(&self) -> usize {
        self.created.len()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// 一个任务都没有启动
    pub fn nothing_started(&self) -> bool {
        self.created.is_empty()
    }
}

pub struct BatchGenerator {
    dispatcher: GenerationDispatcher,
    ledger: Arc<JobLedger>,
    max_concurrent: usize,
    in_flight: AtomicBool,
}

impl BatchGenerator {
    pub fn new(dispatcher: GenerationDispatcher, ledger: Arc<JobLedger>, max_concurrent: usize) -> Self {
        Self {
            dispatcher,
            ledger,
            max_concurrent,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// 为一组对象发起生成
    ///
    /// 参数和对象列表在发出任何请求之前校验
    pub async fn generate(
        &self,
        targets: Vec<Target>,
        params: GenerationParams,
    ) -> AppResult<BatchOutcome> {
        params.validate()?;
        if targets.is_empty() {
            return Err(BusinessError::NoTargetsSelected.into());
        }

        let _guard = InFlightGuard::acquire(&self.in_flight)?;
        let total = targets.len();
        logging::log_batch_start(total, self.max_concurrent);

        let settled = settle_all(targets, self.max_concurrent, |target| async move {
            self.dispatcher.dispatch(&target, params).await
        })
        .await;

        let (mut created, failures) = partition(settled);
        for (target, e) in &failures {
            error!("[{}] ❌ 生成请求被拒绝: {}", target.target_ref(), e);
        }

        created.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        self.ledger.insert_all(created.clone());

        let outcome = BatchOutcome { created, failures };
        logging::log_batch_summary(outcome.succeeded(), outcome.failed());
        Ok(outcome)
    }
}

/// 批次进行中标记，离开作用域时自动清除
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> AppResult<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| BusinessError::BatchInFlight)?;
        Ok(Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::fake::FakeReportApi;
    use crate::clients::RawResponse;
    use crate::infrastructure::ArtifactCache;
    use crate::models::{JobStatus, StudentTarget, TargetKind, TargetRef};

    fn student(id: i64) -> Target {
        Target::Student(StudentTarget {
            id,
            name: format!("Student {}", id),
            matricule: format!("M{}", id),
            class_name: String::new(),
            sub_class_name: String::new(),
        })
    }

    fn queued_body(job_id: &str) -> RawResponse {
        RawResponse {
            status: 202,
            content_type: Some("application/json".to_string()),
            content_disposition: None,
            body: format!(r#"{{"data":{{"id":"{}","status":"PENDING"}}}}"#, job_id).into_bytes(),
        }
    }

    fn generator(api: Arc<FakeReportApi>, dir: &std::path::Path) -> (BatchGenerator, Arc<JobLedger>) {
        let ledger = Arc::new(JobLedger::new());
        let dispatcher = GenerationDispatcher::new(api, ArtifactCache::new(dir));
        (BatchGenerator::new(dispatcher, ledger.clone(), 4), ledger)
    }

    #[tokio::test]
    async fn test_partial_failure_is_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let sref = |id| TargetRef::new(TargetKind::Student, id);
        let api = Arc::new(
            FakeReportApi::new()
                .with_generate(sref(1), Ok(queued_body("job-1")))
                .with_generate(sref(2), Err(500))
                .with_generate(sref(3), Ok(queued_body("job-3"))),
        );
        let (generator, ledger) = generator(api.clone(), dir.path());

        let outcome = generator
            .generate(
                vec![student(1), student(2), student(3)],
                GenerationParams::new(2024, 1),
            )
            .await
            .unwrap();

        assert_eq!(outcome.succeeded(), 2);
        assert_eq!(outcome.failed(), 1);
        assert_eq!(outcome.failures[0].0.id(), 2);
        assert_eq!(ledger.len(), 2);
        assert!(ledger
            .snapshot()
            .iter()
            .all(|job| job.status == JobStatus::Pending));
        assert!(!generator.is_in_flight());
    }

    #[tokio::test]
    async fn test_validation_happens_before_any_request() {
        let dir = tempfile::tempdir().unwrap();
        let api = Arc::new(FakeReportApi::new());
        let (generator, _ledger) = generator(api.clone(), dir.path());

        let err = generator
            .generate(Vec::new(), GenerationParams::new(2024, 1))
            .await
            .unwrap_err();
        assert_eq!(err.as_business(), Some(&BusinessError::NoTargetsSelected));

        let err = generator
            .generate(vec![student(1)], GenerationParams::new(0, 1))
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_business(),
            Some(BusinessError::InvalidParameter { .. })
        ));

        assert_eq!(api.generate_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_second_batch_rejected_while_in_flight() {
        let dir = tempfile::tempdir().unwrap();
        let api = Arc::new(FakeReportApi::new());
        let (generator, _ledger) = generator(api, dir.path());

        let held = InFlightGuard::acquire(&generator.in_flight).unwrap();
        let err = generator
            .generate(vec![student(1)], GenerationParams::new(2024, 1))
            .await
            .unwrap_err();
        assert_eq!(err.as_business(), Some(&BusinessError::BatchInFlight));

        drop(held);
        assert!(!generator.is_in_flight());
    }
}

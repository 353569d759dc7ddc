//! 任务轮询器 - 编排层
//!
//! 每次轮询（sweep）只查询 PENDING / PROCESSING 的任务，没有就不发请求。
//! 单个任务查询失败不影响其他任务，也不改动该任务已有状态。
//! 后台循环由 [`PollerHandle`] 持有，`stop()` 或丢弃句柄都会结束循环；
//! 丢弃句柄时进行中的轮询会被取消。

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::clients::ReportApi;
use crate::models::{Job, JobPatch, JobStatus};
use crate::services::settle_all;
use crate::store::JobLedger;
use crate::utils::logging;

/// 一次轮询的结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// 发出的状态查询数
    pub checked: usize,
    /// 状态发生变化的任务数
    pub updated: usize,
    /// 查询失败的任务数
    pub failed: usize,
}

pub struct JobPoller {
    api: Arc<dyn ReportApi>,
    ledger: Arc<JobLedger>,
    interval: Duration,
    max_concurrent: usize,
}

impl JobPoller {
    pub fn new(
        api: Arc<dyn ReportApi>,
        ledger: Arc<JobLedger>,
        interval: Duration,
        max_concurrent: usize,
    ) -> Self {
        Self {
            api,
            ledger,
            interval,
            max_concurrent,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// 执行一次轮询
    pub async fn sweep(&self) -> SweepReport {
        // 占位任务没有服务端 ID，查询不到
        let pollable: Vec<Job> = self
            .ledger
            .non_terminal()
            .into_iter()
            .filter(|job| !job.is_placeholder())
            .collect();

        if pollable.is_empty() {
            debug!("没有进行中的任务，跳过本次轮询");
            return SweepReport::default();
        }

        let mut report = SweepReport {
            checked: pollable.len(),
            ..Default::default()
        };

        let settled = settle_all(pollable, self.max_concurrent, |job| async move {
            self.api.job_status(&job.id).await
        })
        .await;

        for settled in settled {
            let job = settled.item;
            match settled.outcome {
                Ok(descriptor) => {
                    // 在等待期间已被其他路径改为终态的任务不再覆盖
                    let merged = self.ledger.merge_job_if(
                        &job.id,
                        JobPatch::from_descriptor(&descriptor),
                        |current| current.status.is_pollable(),
                    );
                    if let Some(updated) = merged {
                        if updated.status != job.status {
                            info!(
                                "[{}] 状态变化: {} -> {}",
                                job.id, job.status, updated.status
                            );
                            report.updated += 1;
                        }
                        if updated.status == JobStatus::Failed {
                            warn!(
                                "[{}] ❌ 生成失败: {}",
                                job.id,
                                logging::truncate_text(updated.message.as_deref().unwrap_or("-"), 80)
                            );
                        }
                    }
                }
                Err(e) => {
                    warn!("[{}] ⚠️ 状态查询失败，保留原状态: {}", job.id, e);
                    report.failed += 1;
                }
            }
        }

        logging::log_sweep_summary(&report);
        report
    }

    /// 启动后台轮询，第一次轮询在一个间隔之后
    pub fn start(self: Arc<Self>) -> PollerHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let trigger = Arc::new(Notify::new());
        let trigger_rx = Arc::clone(&trigger);
        let poller = self;

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poller.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker.tick().await; // 跳过立即触发的第一次

            info!("⏳ 任务轮询已启动，间隔 {:?}", poller.interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = trigger_rx.notified() => {
                        debug!("手动触发轮询");
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                        continue;
                    }
                }

                if *shutdown_rx.borrow() {
                    break;
                }
                poller.sweep().await;
            }
            info!("任务轮询已停止");
        });

        PollerHandle {
            shutdown: shutdown_tx,
            trigger,
            task: Some(task),
        }
    }
}

/// 后台轮询的句柄
pub struct PollerHandle {
    shutdown: watch::Sender<bool>,
    trigger: Arc<Notify>,
    task: Option<JoinHandle<()>>,
}

impl PollerHandle {
    /// 不等间隔，立刻轮询一次
    pub fn trigger(&self) {
        self.trigger.notify_one();
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// 停止并等待后台循环退出
    pub async fn stop(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("轮询任务异常退出: {}", e);
            }
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
        // 正在进行的轮询也一并取消，句柄释放后不再写入账本
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::fake::FakeReportApi;
    use crate::models::{GenerationParams, JobDescriptor, TargetKind, TargetRef};
    use std::sync::atomic::Ordering;

    fn descriptor(id: &str, status: JobStatus) -> JobDescriptor {
        JobDescriptor {
            id: id.to_string(),
            status,
            message: None,
            download_url: None,
        }
    }

    fn job(id: &str, status: JobStatus) -> Job {
        Job::from_descriptor(
            descriptor(id, status),
            TargetRef::new(TargetKind::Subclass, 3),
            "Form 2 2B",
            GenerationParams::new(2024, 1),
        )
    }

    fn poller(api: Arc<FakeReportApi>, ledger: Arc<JobLedger>) -> JobPoller {
        JobPoller::new(api, ledger, Duration::from_millis(20), 4)
    }

    #[tokio::test]
    async fn test_sweep_without_pending_jobs_makes_no_calls() {
        let api = Arc::new(FakeReportApi::new());
        let ledger = Arc::new(JobLedger::new());
        ledger.insert_all(vec![
            job("done", JobStatus::Completed),
            job("dead", JobStatus::Failed),
            Job::placeholder(
                TargetRef::new(TargetKind::Student, 1),
                "Awa",
                GenerationParams::new(1, 1),
            ),
        ]);
        let poller = poller(api.clone(), ledger.clone());

        for _ in 0..3 {
            assert_eq!(poller.sweep().await, SweepReport::default());
        }
        assert_eq!(api.status_calls.load(Ordering::SeqCst), 0);
        assert_eq!(ledger.get("done").unwrap().status, JobStatus::Completed);
        assert_eq!(ledger.get("dead").unwrap().status, JobStatus::Failed);
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_state() {
        let api = Arc::new(
            FakeReportApi::new()
                .with_statuses("a", vec![Err(502)])
                .with_statuses("b", vec![Ok(descriptor("b", JobStatus::Processing))]),
        );
        let ledger = Arc::new(JobLedger::new());
        ledger.insert_all(vec![job("a", JobStatus::Pending), job("b", JobStatus::Pending)]);

        let report = poller(api, ledger.clone()).sweep().await;

        assert_eq!(
            report,
            SweepReport {
                checked: 2,
                updated: 1,
                failed: 1
            }
        );
        assert_eq!(ledger.get("a").unwrap().status, JobStatus::Pending);
        assert_eq!(ledger.get("b").unwrap().status, JobStatus::Processing);
    }

    #[tokio::test]
    async fn test_background_loop_stops() {
        let api = Arc::new(FakeReportApi::new().with_statuses(
            "a",
            vec![
                Ok(descriptor("a", JobStatus::Processing)),
                Ok(descriptor("a", JobStatus::Completed)),
            ],
        ));
        let ledger = Arc::new(JobLedger::new());
        ledger.insert_all(vec![job("a", JobStatus::Pending)]);

        let handle = Arc::new(poller(api.clone(), ledger.clone())).start();
        assert!(handle.is_running());

        let mut waited = 0;
        while ledger.get("a").unwrap().status != JobStatus::Completed && waited < 100 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            waited += 1;
        }
        handle.stop().await;

        assert_eq!(ledger.get("a").unwrap().status, JobStatus::Completed);
        let calls = api.status_calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(api.status_calls.load(Ordering::SeqCst), calls);
    }

    #[tokio::test]
    async fn test_trigger_sweeps_immediately() {
        let api = Arc::new(
            FakeReportApi::new().with_statuses("a", vec![Ok(descriptor("a", JobStatus::Failed))]),
        );
        let ledger = Arc::new(JobLedger::new());
        ledger.insert_all(vec![job("a", JobStatus::Processing)]);

        let poller = JobPoller::new(api, ledger.clone(), Duration::from_secs(3600), 1);
        let handle = Arc::new(poller).start();
        handle.trigger();

        let mut waited = 0;
        while ledger.get("a").unwrap().status != JobStatus::Failed && waited < 100 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            waited += 1;
        }
        assert_eq!(ledger.get("a").unwrap().status, JobStatus::Failed);
        drop(handle);
    }

    #[tokio::test]
    async fn test_dropping_handle_cancels_running_sweep() {
        let api = Arc::new(
            FakeReportApi::new()
                .with_statuses("a", vec![Ok(descriptor("a", JobStatus::Completed))])
                .with_latency(Duration::from_millis(200)),
        );
        let ledger = Arc::new(JobLedger::new());
        ledger.insert_all(vec![job("a", JobStatus::Processing)]);

        let poller = JobPoller::new(api.clone(), ledger.clone(), Duration::from_secs(3600), 1);
        let handle = Arc::new(poller).start();
        handle.trigger();

        let mut waited = 0;
        while api.status_calls.load(Ordering::SeqCst) == 0 && waited < 100 {
            tokio::time::sleep(Duration::from_millis(5)).await;
            waited += 1;
        }
        assert_eq!(api.status_calls.load(Ordering::SeqCst), 1);
        drop(handle);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(ledger.get("a").unwrap().status, JobStatus::Processing);
    }
}

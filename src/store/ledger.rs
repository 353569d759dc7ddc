//! 任务账本
//!
//! 所有任务的内存记录：创建时追加，轮询时按 ID 原地更新，从不删除。
//! 同一对象可以有多条任务（重试会新建任务，保留历史）。

use std::fmt;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::warn;

use crate::models::{Job, JobPatch, JobStatus, TargetRef};

/// 各状态的任务数量
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerStats {
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
    pub downloading: usize,
}

impl LedgerStats {
    pub fn total(&self) -> usize {
        self.pending + self.processing + self.completed + self.failed + self.downloading
    }

    /// 轮询器还需要关心的任务
    pub fn in_progress(&self) -> usize {
        self.pending + self.processing
    }
}

impl fmt::Display for LedgerStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "排队 {}, 处理中 {}, 已完成 {}, 失败 {}, 下载中 {}",
            self.pending, self.processing, self.completed, self.failed, self.downloading
        )
    }
}

/// 任务账本（按创建时间倒序）
#[derive(Debug, Default)]
pub struct JobLedger {
    jobs: RwLock<Vec<Job>>,
}

impl JobLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Job>> {
        match self.jobs.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("任务账本锁已中毒，继续使用");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Job>> {
        match self.jobs.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("任务账本锁已中毒，继续使用");
                poisoned.into_inner()
            }
        }
    }

    /// 追加新任务，已存在的 ID 会被跳过；返回实际追加的数量
    pub fn insert_all(&self, new_jobs: Vec<Job>) -> usize {
        let mut jobs = self.write();
        let mut inserted = 0;
        for job in new_jobs {
            if jobs.iter().any(|existing| existing.id == job.id) {
                warn!("任务 {} 已在账本中，跳过", job.id);
                continue;
            }
            jobs.push(job);
            inserted += 1;
        }
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        inserted
    }

    /// 按 ID 合并修改，返回更新后的任务
    pub fn merge_job(&self, id: &str, patch: JobPatch) -> Option<Job> {
        self.merge_job_if(id, patch, |_| true)
    }

    /// 仅当 `guard` 对当前记录成立时合并（判断与写入在同一把锁内）
    pub fn merge_job_if<P>(&self, id: &str, patch: JobPatch, guard: P) -> Option<Job>
    where
        P: FnOnce(&Job) -> bool,
    {
        let mut jobs = self.write();
        let job = jobs.iter_mut().find(|job| job.id == id)?;
        if !guard(job) {
            return None;
        }
        job.apply(patch);
        Some(job.clone())
    }

    pub fn get(&self, id: &str) -> Option<Job> {
        self.read().iter().find(|job| job.id == id).cloned()
    }

    /// 所有任务，最新的在前
    pub fn snapshot(&self) -> Vec<Job> {
        self.read().clone()
    }

    /// PENDING / PROCESSING 的任务
    pub fn non_terminal(&self) -> Vec<Job> {
        self.read()
            .iter()
            .filter(|job| job.status.is_pollable())
            .cloned()
            .collect()
    }

    pub fn jobs_for_target(&self, target: TargetRef) -> Vec<Job> {
        self.read()
            .iter()
            .filter(|job| job.target == target)
            .cloned()
            .collect()
    }

    pub fn stats(&self) -> LedgerStats {
        let mut stats = LedgerStats::default();
        for job in self.read().iter() {
            match job.status {
                JobStatus::Pending => stats.pending += 1,
                JobStatus::Processing => stats.processing += 1,
                JobStatus::Completed => stats.completed += 1,
                JobStatus::Failed => stats.failed += 1,
                JobStatus::Downloading => stats.downloading += 1,
            }
        }
        stats
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

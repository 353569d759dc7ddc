//! 生成任务及其状态机

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, Ordering};

use crate::models::target::{GenerationParams, TargetRef};

/// 任务状态
///
/// `PENDING -> PROCESSING -> COMPLETED`，`PENDING|PROCESSING -> FAILED`，
/// `COMPLETED -> DOWNLOADING -> COMPLETED`（下载期间的临时状态）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    #[serde(alias = "pending", alias = "queued", alias = "QUEUED")]
    Pending,
    #[serde(alias = "processing", alias = "running", alias = "RUNNING")]
    Processing,
    #[serde(alias = "completed", alias = "done", alias = "DONE")]
    Completed,
    #[serde(alias = "failed", alias = "error", alias = "ERROR")]
    Failed,
    #[serde(alias = "downloading")]
    Downloading,
}

impl JobStatus {
    /// 轮询器只处理 PENDING / PROCESSING
    pub fn is_pollable(&self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Processing)
    }

    /// 相对轮询器的终态
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Processing => "PROCESSING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
            JobStatus::Downloading => "DOWNLOADING",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 服务端返回的任务描述（生成接口和状态查询接口共用）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDescriptor {
    #[serde(alias = "jobId", alias = "job_id", deserialize_with = "deserialize_job_id")]
    pub id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, alias = "download_url", alias = "fileUrl", alias = "url")]
    pub download_url: Option<String>,
}

// 任务 ID 可能是字符串也可能是数字
fn deserialize_job_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Visitor;

    struct JobIdVisitor;

    impl<'de> Visitor<'de> for JobIdVisitor {
        type Value = String;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or integer job id")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            if value.is_empty() {
                return Err(E::custom("empty job id"));
            }
            Ok(value.to_string())
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }
    }

    deserializer.deserialize_any(JobIdVisitor)
}

/// 对任务可变字段的修改；`None` 表示保持原值
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobPatch {
    pub status: Option<JobStatus>,
    pub message: Option<String>,
    pub download_url: Option<String>,
    pub file_uri: Option<PathBuf>,
}

impl JobPatch {
    pub fn status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// 轮询结果只携带 status / message / downloadUrl
    pub fn from_descriptor(descriptor: &JobDescriptor) -> Self {
        Self {
            status: Some(descriptor.status),
            message: descriptor.message.clone(),
            download_url: descriptor.download_url.clone(),
            file_uri: None,
        }
    }
}

/// 一次生成尝试的本地记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub target: TargetRef,
    /// 创建时对象的显示名称
    pub display_name: String,
    pub academic_year_id: i64,
    pub exam_sequence_id: i64,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_uri: Option<PathBuf>,
}

pub const LOCAL_ID_PREFIX: &str = "local-";
pub const PLACEHOLDER_ID_PREFIX: &str = "pending-";

impl Job {
    /// 由服务端任务描述创建
    pub fn from_descriptor(
        descriptor: JobDescriptor,
        target: TargetRef,
        display_name: impl Into<String>,
        params: GenerationParams,
    ) -> Self {
        Self {
            id: descriptor.id,
            target,
            display_name: display_name.into(),
            academic_year_id: params.academic_year_id,
            exam_sequence_id: params.exam_sequence_id,
            status: descriptor.status,
            message: descriptor.message,
            created_at: next_stamp(),
            download_url: descriptor.download_url,
            file_uri: None,
        }
    }

    /// 二进制直出：本地已有文件，直接完成
    pub fn completed_local(
        target: TargetRef,
        display_name: impl Into<String>,
        params: GenerationParams,
        file_uri: PathBuf,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: local_id(LOCAL_ID_PREFIX, target, created_at),
            target,
            display_name: display_name.into(),
            academic_year_id: params.academic_year_id,
            exam_sequence_id: params.exam_sequence_id,
            status: JobStatus::Completed,
            message: None,
            created_at,
            download_url: None,
            file_uri: Some(file_uri),
        }
    }

    /// 空响应体的成功确认：占位任务
    pub fn placeholder(
        target: TargetRef,
        display_name: impl Into<String>,
        params: GenerationParams,
    ) -> Self {
        let created_at = next_stamp();
        Self {
            id: local_id(PLACEHOLDER_ID_PREFIX, target, created_at),
            target,
            display_name: display_name.into(),
            academic_year_id: params.academic_year_id,
            exam_sequence_id: params.exam_sequence_id,
            status: JobStatus::Pending,
            message: None,
            created_at,
            download_url: None,
            file_uri: None,
        }
    }

    pub fn params(&self) -> GenerationParams {
        GenerationParams::new(self.academic_year_id, self.exam_sequence_id)
    }

    /// 占位任务没有服务端 ID，无法按 ID 查询
    pub fn is_placeholder(&self) -> bool {
        self.id.starts_with(PLACEHOLDER_ID_PREFIX)
    }

    /// 应用修改，只触碰可变字段
    pub fn apply(&mut self, patch: JobPatch) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if patch.message.is_some() {
            self.message = patch.message;
        }
        if patch.download_url.is_some() {
            self.download_url = patch.download_url;
        }
        if patch.file_uri.is_some() {
            self.file_uri = patch.file_uri;
        }
    }
}

fn local_id(prefix: &str, target: TargetRef, created_at: DateTime<Utc>) -> String {
    format!("{}{}-{}", prefix, target.id, created_at.timestamp_millis())
}

static LAST_STAMP_MILLIS: AtomicI64 = AtomicI64::new(0);

/// 当前时间（毫秒精度），保证严格递增，本地 ID 不会重复
pub fn next_stamp() -> DateTime<Utc> {
    let now = Utc::now().timestamp_millis();
    let mut last = LAST_STAMP_MILLIS.load(Ordering::Relaxed);
    loop {
        let candidate = now.max(last + 1);
        match LAST_STAMP_MILLIS.compare_exchange_weak(
            last,
            candidate,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => {
                return Utc
                    .timestamp_millis_opt(candidate)
                    .single()
                    .unwrap_or_else(Utc::now)
            }
            Err(actual) => last = actual,
        }
    }
}

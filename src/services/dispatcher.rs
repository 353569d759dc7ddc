//! 生成分发服务 - 业务能力层
//!
//! 同一个生成接口有两种回应：
//! - 小文件直接返回二进制内容（同步完成）
//! - 大任务返回 JSON 任务描述（异步，需要轮询），甚至可能是空响应体
//!
//! 这里把响应一次性分类为 [`DispatchResponse`]，然后统一转换成 [`Job`]。

use regex::Regex;
use std::sync::{Arc, LazyLock};
use tracing::{debug, info};

use crate::clients::{RawResponse, ReportApi};
use crate::error::{ApiError, AppError, AppResult};
use crate::infrastructure::ArtifactCache;
use crate::models::job::next_stamp;
use crate::models::{GenerationParams, Job, JobDescriptor, Target, TargetRef};

static FILENAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)filename\s*=\s*"?([^";]+)"?"#).unwrap_or_else(|e| panic!("invalid regex: {e}"))
});

/// 生成接口响应的三种形态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchResponse {
    /// 二进制文件，附带服务端建议的文件名
    BinaryArtifact {
        file_name: Option<String>,
        bytes: Vec<u8>,
    },
    /// 排队中的任务
    JobDescriptor(JobDescriptor),
    /// 2xx 但没有内容
    EmptyAck,
}

/// 对生成接口的响应分类；非 2xx 返回带对象 ID 的错误
pub fn classify_response(target: TargetRef, raw: RawResponse) -> AppResult<DispatchResponse> {
    if !raw.is_success() {
        return Err(AppError::Dispatch {
            target,
            source: ApiError::BadStatus {
                endpoint: "generate".to_string(),
                status: raw.status,
            },
        });
    }

    if raw.body.iter().all(u8::is_ascii_whitespace) {
        return Ok(DispatchResponse::EmptyAck);
    }

    let content_type = raw
        .content_type
        .as_deref()
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let looks_textual =
        content_type.is_empty() || content_type.contains("json") || content_type.starts_with("text/");
    if !looks_textual {
        return Ok(DispatchResponse::BinaryArtifact {
            file_name: raw
                .content_disposition
                .as_deref()
                .and_then(filename_from_disposition),
            bytes: raw.body,
        });
    }

    parse_job_body(&raw.body).map_err(|reason| AppError::Dispatch {
        target,
        source: ApiError::Malformed {
            endpoint: "generate".to_string(),
            reason,
        },
    })
}

/// 解析 `{data: JobDescriptor}`，也接受不带外层 `data` 的描述
fn parse_job_body(body: &[u8]) -> Result<DispatchResponse, String> {
    let value: serde_json::Value = serde_json::from_slice(body).map_err(|e| e.to_string())?;

    let inner = match value {
        serde_json::Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or_default()
        }
        other => other,
    };

    match &inner {
        serde_json::Value::Null => return Ok(DispatchResponse::EmptyAck),
        serde_json::Value::Object(map) if map.is_empty() => return Ok(DispatchResponse::EmptyAck),
        _ => {}
    }

    let descriptor: JobDescriptor = serde_json::from_value(inner).map_err(|e| e.to_string())?;
    Ok(DispatchResponse::JobDescriptor(descriptor))
}

/// 从 `Content-Disposition` 中取出文件名
pub fn filename_from_disposition(header: &str) -> Option<String> {
    FILENAME_RE
        .captures(header)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|name| !name.is_empty())
}

/// 生成分发服务
pub struct GenerationDispatcher {
    api: Arc<dyn ReportApi>,
    cache: ArtifactCache,
}

impl GenerationDispatcher {
    pub fn new(api: Arc<dyn ReportApi>, cache: ArtifactCache) -> Self {
        Self { api, cache }
    }

    /// 为单个对象发起生成，返回本地任务记录
    pub async fn dispatch(&self, target: &Target, params: GenerationParams) -> AppResult<Job> {
        let target_ref = target.target_ref();

        let raw = self
            .api
            .generate(target_ref, params)
            .await
            .map_err(|source| AppError::Dispatch {
                target: target_ref,
                source,
            })?;

        match classify_response(target_ref, raw)? {
            DispatchResponse::BinaryArtifact { file_name, bytes } => {
                let created_at = next_stamp();
                let file_name = file_name.unwrap_or_else(|| {
                    format!(
                        "report-{}-{}-{}.pdf",
                        target_ref.kind,
                        target_ref.id,
                        created_at.timestamp_millis()
                    )
                });
                let path = self.cache.store(&file_name, &bytes).await?;
                info!(
                    "[{}] ✓ 成绩单已直接生成 ({} 字节): {}",
                    target_ref,
                    bytes.len(),
                    path.display()
                );
                Ok(Job::completed_local(
                    target_ref,
                    target.label(),
                    params,
                    path,
                    created_at,
                ))
            }
            DispatchResponse::JobDescriptor(descriptor) => {
                info!(
                    "[{}] ⏳ 生成任务已排队: {} ({})",
                    target_ref, descriptor.id, descriptor.status
                );
                Ok(Job::from_descriptor(
                    descriptor,
                    target_ref,
                    target.label(),
                    params,
                ))
            }
            DispatchResponse::EmptyAck => {
                debug!("[{}] 生成接口返回空响应，创建占位任务", target_ref);
                Ok(Job::placeholder(target_ref, target.label(), params))
            }
        }
    }
}

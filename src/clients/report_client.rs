//! 成绩单 API 客户端
//!
//! 封装所有与成绩单生成接口相关的 HTTP 调用

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::config::Config;
use crate::error::{ApiError, AppError, AppResult};
use crate::models::{AvailabilityVerdict, GenerationParams, JobDescriptor, TargetRef};

/// 生成接口的原始响应，交给分发器统一分类
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub content_disposition: Option<String>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// 远端成绩单服务
#[async_trait]
pub trait ReportApi: Send + Sync {
    /// 查询对象在 (学年, 考试序列) 下能否生成；非 2xx 返回 `BadStatus`
    async fn availability(
        &self,
        target: TargetRef,
        params: GenerationParams,
    ) -> Result<AvailabilityVerdict, ApiError>;

    /// 发起生成，非 2xx 也原样返回
    async fn generate(
        &self,
        target: TargetRef,
        params: GenerationParams,
    ) -> Result<RawResponse, ApiError>;

    /// 查询任务状态
    async fn job_status(&self, job_id: &str) -> Result<JobDescriptor, ApiError>;

    /// 下载文件内容
    async fn download(&self, url: &str) -> Result<Vec<u8>, ApiError>;
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

/// 基于 reqwest 的实现
pub struct ReportClient {
    client: Client,
    base_url: String,
    token: String,
}

impl ReportClient {
    /// 创建新的客户端，每个请求都带超时
    pub fn new(config: &Config) -> AppResult<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| AppError::api_request_failed("client", e))?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            token: config.api_token.clone(),
        })
    }

    fn target_endpoint(&self, target: TargetRef, action: &str) -> String {
        format!(
            "{}/report-cards/{}/{}/{}",
            self.base_url,
            target.kind.as_path(),
            target.id,
            action
        )
    }

    /// 相对地址拼接到 base_url 上
    fn resolve_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("{}/{}", self.base_url, url.trim_start_matches('/'))
        }
    }

    /// 令牌只发给本服务的地址，外部下载地址（CDN、预签名链接）不带
    fn is_own_endpoint(&self, url: &str) -> bool {
        url == self.base_url
            || url
                .strip_prefix(self.base_url.as_str())
                .is_some_and(|rest| rest.starts_with('/') || rest.starts_with('?'))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.token.is_empty() {
            request
        } else {
            request.bearer_auth(&self.token)
        }
    }

    async fn get_data<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        endpoint: &str,
    ) -> Result<T, ApiError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| request_failed(endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::BadStatus {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }

        let envelope: Envelope<T> = response.json().await.map_err(|e| ApiError::Malformed {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;
        Ok(envelope.data)
    }
}

fn request_failed(endpoint: &str, e: reqwest::Error) -> ApiError {
    ApiError::RequestFailed {
        endpoint: endpoint.to_string(),
        source: Box::new(e),
    }
}

fn header_value(headers: &HeaderMap, name: HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

#[async_trait]
impl ReportApi for ReportClient {
    async fn availability(
        &self,
        target: TargetRef,
        params: GenerationParams,
    ) -> Result<AvailabilityVerdict, ApiError> {
        let endpoint = self.target_endpoint(target, "availability");
        debug!("查询可生成性: {}", endpoint);

        let request = self.client.get(&endpoint).query(&[
            ("academicYearId", params.academic_year_id),
            ("examSequenceId", params.exam_sequence_id),
        ]);
        self.get_data(request, &endpoint).await
    }

    async fn generate(
        &self,
        target: TargetRef,
        params: GenerationParams,
    ) -> Result<RawResponse, ApiError> {
        let endpoint = self.target_endpoint(target, "generate");
        let payload = json!({
            "academicYearId": params.academic_year_id,
            "examSequenceId": params.exam_sequence_id,
        });
        debug!("发起生成: {} Payload: {}", endpoint, payload);

        let response = self
            .authorize(self.client.post(&endpoint).json(&payload))
            .send()
            .await
            .map_err(|e| request_failed(&endpoint, e))?;

        let status = response.status().as_u16();
        let content_type = header_value(response.headers(), CONTENT_TYPE);
        let content_disposition = header_value(response.headers(), CONTENT_DISPOSITION);

        let body = response
            .bytes()
            .await
            .map_err(|e| request_failed(&endpoint, e))?
            .to_vec();

        debug!(
            "生成响应: HTTP {} content-type={:?} {} 字节",
            status,
            content_type,
            body.len()
        );

        Ok(RawResponse {
            status,
            content_type,
            content_disposition,
            body,
        })
    }

    async fn job_status(&self, job_id: &str) -> Result<JobDescriptor, ApiError> {
        let endpoint = format!("{}/report-cards/jobs/{}", self.base_url, job_id);
        let request = self.client.get(&endpoint);
        self.get_data(request, &endpoint).await
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, ApiError> {
        let endpoint = self.resolve_url(url);
        debug!("下载文件: {}", endpoint);

        let request = self.client.get(&endpoint);
        let request = if self.is_own_endpoint(&endpoint) {
            self.authorize(request)
        } else {
            request
        };
        let response = request
            .send()
            .await
            .map_err(|e| request_failed(&endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::BadStatus {
                endpoint,
                status: status.as_u16(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| request_failed(&endpoint, e))?;
        Ok(bytes.to_vec())
    }
}

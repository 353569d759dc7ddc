//! 单元测试用的脚本化 `ReportApi`

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::clients::{RawResponse, ReportApi};
use crate::error::ApiError;
use crate::models::{AvailabilityVerdict, GenerationParams, JobDescriptor, TargetRef};

/// 脚本化失败：`0` 表示网络错误，其他为 HTTP 状态码
pub type Scripted<T> = Result<T, u16>;

fn to_api_error(endpoint: &str, code: u16) -> ApiError {
    if code == 0 {
        ApiError::RequestFailed {
            endpoint: endpoint.to_string(),
            source: Box::new(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            )),
        }
    } else {
        ApiError::BadStatus {
            endpoint: endpoint.to_string(),
            status: code,
        }
    }
}

#[derive(Default)]
pub struct FakeReportApi {
    availability: Mutex<HashMap<TargetRef, Scripted<AvailabilityVerdict>>>,
    generate: Mutex<HashMap<TargetRef, Scripted<RawResponse>>>,
    statuses: Mutex<HashMap<String, VecDeque<Scripted<JobDescriptor>>>>,
    downloads: Mutex<HashMap<String, Scripted<Vec<u8>>>>,
    latency: Option<Duration>,
    availability_latency: HashMap<TargetRef, Duration>,
    pub availability_calls: AtomicUsize,
    pub generate_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    pub download_calls: AtomicUsize,
}

impl FakeReportApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// 每次调用前先等待
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// 只对某个对象的可生成性查询等待
    pub fn with_availability_latency(mut self, target: TargetRef, latency: Duration) -> Self {
        self.availability_latency.insert(target, latency);
        self
    }

    async fn wait(&self, extra: Option<Duration>) {
        if let Some(latency) = extra.or(self.latency) {
            tokio::time::sleep(latency).await;
        }
    }

    pub fn with_availability(self, target: TargetRef, verdict: Scripted<AvailabilityVerdict>) -> Self {
        self.availability.lock().unwrap().insert(target, verdict);
        self
    }

    pub fn with_generate(self, target: TargetRef, response: Scripted<RawResponse>) -> Self {
        self.generate.lock().unwrap().insert(target, response);
        self
    }

    /// 依次返回；最后一个会一直重复
    pub fn with_statuses(self, job_id: &str, responses: Vec<Scripted<JobDescriptor>>) -> Self {
        self.statuses
            .lock()
            .unwrap()
            .insert(job_id.to_string(), responses.into());
        self
    }

    pub fn with_download(self, url: &str, response: Scripted<Vec<u8>>) -> Self {
        self.downloads
            .lock()
            .unwrap()
            .insert(url.to_string(), response);
        self
    }
}

#[async_trait]
impl ReportApi for FakeReportApi {
    async fn availability(
        &self,
        target: TargetRef,
        _params: GenerationParams,
    ) -> Result<AvailabilityVerdict, ApiError> {
        self.availability_calls.fetch_add(1, Ordering::SeqCst);
        self.wait(self.availability_latency.get(&target).copied()).await;
        let scripted = self.availability.lock().unwrap().get(&target).cloned();
        match scripted {
            Some(Ok(verdict)) => Ok(verdict),
            Some(Err(code)) => Err(to_api_error("availability", code)),
            None => Err(to_api_error("availability", 404)),
        }
    }

    async fn generate(
        &self,
        target: TargetRef,
        _params: GenerationParams,
    ) -> Result<RawResponse, ApiError> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        self.wait(None).await;
        let scripted = self.generate.lock().unwrap().get(&target).cloned();
        match scripted {
            Some(Ok(raw)) => Ok(raw),
            Some(Err(code)) => Err(to_api_error("generate", code)),
            None => Err(to_api_error("generate", 0)),
        }
    }

    async fn job_status(&self, job_id: &str) -> Result<JobDescriptor, ApiError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.wait(None).await;
        let mut statuses = self.statuses.lock().unwrap();
        let scripted = match statuses.get_mut(job_id) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };
        match scripted {
            Some(Ok(descriptor)) => Ok(descriptor),
            Some(Err(code)) => Err(to_api_error("jobs", code)),
            None => Err(to_api_error("jobs", 404)),
        }
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, ApiError> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        self.wait(None).await;
        let scripted = self.downloads.lock().unwrap().get(url).cloned();
        match scripted {
            Some(Ok(bytes)) => Ok(bytes),
            Some(Err(code)) => Err(to_api_error(url, code)),
            None => Err(to_api_error(url, 404)),
        }
    }
}

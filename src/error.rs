use thiserror::Error;

use crate::models::TargetRef;

/// 应用程序错误类型
#[derive(Error, Debug)]
pub enum AppError {
    /// API 调用错误
    #[error("API错误: {0}")]
    Api(#[from] ApiError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 业务逻辑错误
    #[error("业务错误: {0}")]
    Business(#[from] BusinessError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 单个对象的生成请求被拒绝
    #[error("生成失败 ({target}): {source}")]
    Dispatch {
        target: TargetRef,
        #[source]
        source: ApiError,
    },
}

/// API 调用错误
#[derive(Error, Debug)]
pub enum ApiError {
    /// 网络请求失败（连接、超时等）
    #[error("API请求失败 ({endpoint}): {source}")]
    RequestFailed {
        endpoint: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// API 返回非 2xx 状态码
    #[error("API返回错误状态 ({endpoint}): HTTP {status}")]
    BadStatus { endpoint: String, status: u16 },
    /// 响应体无法解析
    #[error("响应解析失败 ({endpoint}): {reason}")]
    Malformed { endpoint: String, reason: String },
}

impl ApiError {
    /// HTTP 状态码（仅 `BadStatus` 有）
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::BadStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// 文件操作错误
#[derive(Error, Debug)]
pub enum FileError {
    /// 文件不存在
    #[error("文件不存在: {path}")]
    NotFound { path: String },
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 创建目录失败
    #[error("创建目录失败 ({path}): {source}")]
    CreateDirFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// 业务逻辑错误（在发出任何网络请求前拒绝）
#[derive(Error, Debug, PartialEq, Eq)]
pub enum BusinessError {
    /// 没有选中任何对象
    #[error("没有选中可生成的对象")]
    NoTargetsSelected,
    /// 学年或考试序列 ID 缺失
    #[error("参数无效: {name} 必须为正整数 (当前 {value})")]
    InvalidParameter { name: &'static str, value: i64 },
    /// 对象当前状态不允许生成
    #[error("对象 {target} 当前不可生成 (状态: {status})")]
    TargetNotSelectable { target: TargetRef, status: String },
    /// 对象不在当前目录中
    #[error("对象 {target} 不在当前目录中")]
    TargetNotInCatalogue { target: TargetRef },
    /// 检查结果返回前已有更新的检查开始，结果被丢弃
    #[error("可生成性检查已被更新的检查取代")]
    RefreshSuperseded,
    /// 已有批量生成在进行
    #[error("已有批量生成任务在进行中")]
    BatchInFlight,
    /// 任务不存在
    #[error("任务不存在: {job_id}")]
    JobNotFound { job_id: String },
    /// 任务尚未完成
    #[error("任务 {job_id} 尚未完成 (状态: {status})")]
    JobNotCompleted { job_id: String, status: String },
    /// 任务不是失败状态，不能重试
    #[error("任务 {job_id} 不是失败状态，不能重试 (状态: {status})")]
    JobNotRetryable { job_id: String, status: String },
    /// 已完成的任务既没有本地文件也没有下载地址
    #[error("任务 {job_id} 已完成但没有可用的文件位置")]
    MissingArtifactLocation { job_id: String },
    /// 任务正在下载
    #[error("任务 {job_id} 正在下载中")]
    DownloadInProgress { job_id: String },
}

/// 配置错误
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// 必填项为空
    #[error("配置项 {var_name} 不能为空")]
    Missing { var_name: String },
    /// 数值必须为正
    #[error("配置项 {var_name} 必须大于 0")]
    NotPositive { var_name: String },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建API请求失败错误
    pub fn api_request_failed(
        endpoint: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Api(ApiError::RequestFailed {
            endpoint: endpoint.into(),
            source: Box::new(source),
        })
    }

    /// 创建文件读取错误
    pub fn file_read_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source,
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source,
        })
    }

    /// 业务错误的引用（用于测试和上层判断）
    pub fn as_business(&self) -> Option<&BusinessError> {
        match self {
            AppError::Business(e) => Some(e),
            _ => None,
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{AppResult, ConfigError};

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    // --- 成绩单 API 配置 ---
    pub api_base_url: String,
    /// Bearer token，原样附加到每个请求
    pub api_token: String,
    /// 单个请求超时（秒）
    pub request_timeout_secs: u64,
    /// 建立连接超时（秒）
    pub connect_timeout_secs: u64,
    // --- 调度配置 ---
    /// 轮询间隔（秒）
    pub poll_interval_secs: u64,
    /// 同时进行的请求数量
    pub max_concurrent_requests: usize,
    /// CLI 最多等待的轮询次数
    pub max_poll_sweeps: usize,
    // --- 文件配置 ---
    /// 本地缓存目录
    pub cache_dir: PathBuf,
    /// 导出目录
    pub export_dir: PathBuf,
    /// 批量请求 TOML 文件
    pub batch_request_file: PathBuf,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080/api/v1".to_string(),
            api_token: String::new(),
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
            poll_interval_secs: 15,
            max_concurrent_requests: 8,
            max_poll_sweeps: 40,
            cache_dir: std::env::temp_dir().join("report-cards"),
            export_dir: PathBuf::from("exported_reports"),
            batch_request_file: PathBuf::from("batch.toml"),
            verbose_logging: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            api_base_url: std::env::var("REPORT_API_BASE_URL").unwrap_or(default.api_base_url),
            api_token: std::env::var("REPORT_API_TOKEN").unwrap_or(default.api_token),
            request_timeout_secs: std::env::var("REQUEST_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.request_timeout_secs),
            connect_timeout_secs: std::env::var("CONNECT_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.connect_timeout_secs),
            poll_interval_secs: std::env::var("POLL_INTERVAL_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.poll_interval_secs),
            max_concurrent_requests: std::env::var("MAX_CONCURRENT_REQUESTS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_concurrent_requests),
            max_poll_sweeps: std::env::var("MAX_POLL_SWEEPS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_poll_sweeps),
            cache_dir: std::env::var("CACHE_DIR").map(PathBuf::from).unwrap_or(default.cache_dir),
            export_dir: std::env::var("EXPORT_DIR").map(PathBuf::from).unwrap_or(default.export_dir),
            batch_request_file: std::env::var("BATCH_REQUEST_FILE").map(PathBuf::from).unwrap_or(default.batch_request_file),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
        }
    }

    /// 检查配置是否可用
    pub fn validate(&self) -> AppResult<()> {
        if self.api_base_url.trim().is_empty() {
            return Err(ConfigError::Missing {
                var_name: "REPORT_API_BASE_URL".to_string(),
            }
            .into());
        }

        let positives = [
            ("REQUEST_TIMEOUT_SECS", self.request_timeout_secs),
            ("CONNECT_TIMEOUT_SECS", self.connect_timeout_secs),
            ("POLL_INTERVAL_SECS", self.poll_interval_secs),
            ("MAX_CONCURRENT_REQUESTS", self.max_concurrent_requests as u64),
        ];
        for (var_name, value) in positives {
            if value == 0 {
                return Err(ConfigError::NotPositive {
                    var_name: var_name.to_string(),
                }
                .into());
            }
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.poll_interval(), Duration::from_secs(15));
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let config = Config {
            poll_interval_secs: 0,
            ..Config::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            AppError::Config(ConfigError::NotPositive { ref var_name }) if var_name == "POLL_INTERVAL_SECS"
        ));

        let config = Config {
            api_base_url: "  ".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}

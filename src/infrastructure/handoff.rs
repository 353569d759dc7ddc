//! 把文件交给用户（保存 / 分享 / 导出）

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;
use tracing::info;

use crate::error::{AppError, AppResult, FileError};

/// 已落地到本地缓存的成绩单
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactHandle {
    pub job_id: String,
    pub path: PathBuf,
}

impl ArtifactHandle {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string()
    }
}

/// 平台的"交给用户"能力
#[async_trait]
pub trait ArtifactHandoff: Send + Sync {
    /// 返回用户可见的位置
    async fn hand_off(&self, handle: &ArtifactHandle) -> AppResult<PathBuf>;
}

/// 复制到导出目录
pub struct ExportDirHandoff {
    export_dir: PathBuf,
}

impl ExportDirHandoff {
    pub fn new(export_dir: impl Into<PathBuf>) -> Self {
        Self {
            export_dir: export_dir.into(),
        }
    }
}

#[async_trait]
impl ArtifactHandoff for ExportDirHandoff {
    async fn hand_off(&self, handle: &ArtifactHandle) -> AppResult<PathBuf> {
        if !handle.path.exists() {
            return Err(FileError::NotFound {
                path: handle.path.display().to_string(),
            }
            .into());
        }

        fs::create_dir_all(&self.export_dir)
            .await
            .map_err(|source| FileError::CreateDirFailed {
                path: self.export_dir.display().to_string(),
                source,
            })?;

        let destination = self.export_dir.join(handle.file_name());
        fs::copy(&handle.path, &destination)
            .await
            .map_err(|e| AppError::file_write_failed(destination.display().to_string(), e))?;

        info!("📤 已导出: {}", destination.display());
        Ok(destination)
    }
}

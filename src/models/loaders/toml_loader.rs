use crate::error::{AppError, AppResult, FileError};
use crate::models::request::BatchRequest;
use std::path::Path;
use tokio::fs;

/// 从 TOML 文件加载批量生成请求
pub async fn load_batch_request(toml_file_path: &Path) -> AppResult<BatchRequest> {
    let path_display = toml_file_path.display().to_string();

    if !toml_file_path.exists() {
        return Err(FileError::NotFound { path: path_display }.into());
    }

    let content = fs::read_to_string(toml_file_path)
        .await
        .map_err(|e| AppError::file_read_failed(&path_display, e))?;

    let mut request: BatchRequest =
        toml::from_str(&content).map_err(|source| FileError::TomlParseFailed {
            path: path_display.clone(),
            source,
        })?;

    // 设置文件路径
    request.file_path = Some(path_display);

    tracing::info!(
        "已加载批量请求: {} 个学生, {} 个子班级 (模式: {})",
        request.students.len(),
        request.subclasses.len(),
        request.mode
    );

    Ok(request)
}

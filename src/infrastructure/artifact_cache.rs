//! 本地缓存目录 - 基础设施层
//!
//! 持有缓存目录，只暴露"写入一个文件"的能力，从不覆盖已有文件

use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult, FileError};

const FALLBACK_FILE_NAME: &str = "report.pdf";

/// 单个文件名的最大长度
const MAX_FILE_NAME_LEN: usize = 120;

/// 成绩单本地缓存
#[derive(Debug, Clone)]
pub struct ArtifactCache {
    dir: PathBuf,
}

impl ArtifactCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 写入文件并返回实际路径
    ///
    /// 同名文件已存在时追加 `-1`、`-2` 后缀
    pub async fn store(&self, suggested_name: &str, bytes: &[u8]) -> AppResult<PathBuf> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| FileError::CreateDirFailed {
                path: self.dir.display().to_string(),
                source,
            })?;

        let file_name = sanitize_file_name(suggested_name);
        let (stem, ext) = split_extension(&file_name);

        let mut attempt = 0usize;
        loop {
            let candidate = if attempt == 0 {
                file_name.clone()
            } else {
                format!("{}-{}{}", stem, attempt, ext)
            };
            let path = self.dir.join(&candidate);

            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => {
                    write_or_discard(file, &path, bytes).await?;
                    debug!("已缓存 {} 字节: {}", bytes.len(), path.display());
                    return Ok(path);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    attempt += 1;
                }
                Err(e) => {
                    return Err(AppError::file_write_failed(path.display().to_string(), e));
                }
            }
        }
    }
}

/// 写入新建的文件，失败时删除写了一半的文件
async fn write_or_discard(mut file: fs::File, path: &Path, bytes: &[u8]) -> AppResult<()> {
    let written = match file.write_all(bytes).await {
        Ok(()) => file.flush().await,
        Err(e) => Err(e),
    };
    drop(file);

    if let Err(e) = written {
        if let Err(remove_err) = fs::remove_file(path).await {
            warn!("无法删除不完整的文件 {}: {}", path.display(), remove_err);
        }
        return Err(AppError::file_write_failed(path.display().to_string(), e));
    }
    Ok(())
}

/// 把服务端建议的文件名变成安全的单层文件名
pub fn sanitize_file_name(name: &str) -> String {
    let last = name
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or_default()
        .trim();

    let mut cleaned = String::with_capacity(last.len());
    for c in last.chars() {
        if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') {
            cleaned.push(c);
        } else if !cleaned.ends_with('-') {
            cleaned.push('-');
        }
    }

    let cleaned = cleaned.trim_start_matches('.').trim_matches('-');
    if cleaned.is_empty() {
        return FALLBACK_FILE_NAME.to_string();
    }

    cleaned.chars().take(MAX_FILE_NAME_LEN).collect()
}

/// 文件名的小写短横线形式，用于从显示名称派生文件名
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

fn split_extension(file_name: &str) -> (&str, &str) {
    match file_name.rfind('.') {
        Some(idx) if idx > 0 => (&file_name[..idx], &file_name[idx..]),
        _ => (file_name, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("r.pdf"), "r.pdf");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\tmp\\bulletin 1.pdf"), "bulletin-1.pdf");
        assert_eq!(sanitize_file_name(".hidden"), "hidden");
        assert_eq!(sanitize_file_name(""), "report.pdf");
        assert_eq!(sanitize_file_name("///"), "report.pdf");
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Awa Ndiaye (MAT-003)"), "awa-ndiaye-mat-003");
        assert_eq!(slugify("  Form 2  2B "), "form-2-2b");
    }

    #[tokio::test]
    async fn test_failed_write_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r.pdf");
        std::fs::write(&path, b"").unwrap();

        // 只读句柄，写入必然失败
        let file = fs::File::open(&path).await.unwrap();
        let err = write_or_discard(file, &path, b"%PDF").await.unwrap_err();

        assert!(matches!(err, AppError::File(FileError::WriteFailed { .. })));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_store_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ArtifactCache::new(dir.path().join("cache"));

        let first = cache.store("r.pdf", b"one").await.unwrap();
        let second = cache.store("r.pdf", b"two").await.unwrap();

        assert_eq!(first.file_name().unwrap(), "r.pdf");
        assert_eq!(second.file_name().unwrap(), "r-1.pdf");
        assert_eq!(std::fs::read(&first).unwrap(), b"one");
        assert_eq!(std::fs::read(&second).unwrap(), b"two");
    }
}

//! 基础设施层
//!
//! 持有稀缺资源（缓存目录、导出目标），只暴露能力

pub mod artifact_cache;
pub mod handoff;

pub use artifact_cache::ArtifactCache;
pub use handoff::{ArtifactHandle, ArtifactHandoff, ExportDirHandoff};

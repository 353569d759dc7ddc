//! 可生成性判定

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::target::{Target, TargetRef};

/// 远端给出的可生成状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AvailabilityStatus {
    NotGenerated,
    Generated,
    Failed,
    FetchFailed,
    NotFound,
}

impl AvailabilityStatus {
    /// 只有未生成或生成失败的对象可以被选中
    pub fn is_selectable(&self) -> bool {
        matches!(
            self,
            AvailabilityStatus::NotGenerated | AvailabilityStatus::Failed
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AvailabilityStatus::NotGenerated => "NOT_GENERATED",
            AvailabilityStatus::Generated => "GENERATED",
            AvailabilityStatus::Failed => "FAILED",
            AvailabilityStatus::FetchFailed => "FETCH_FAILED",
            AvailabilityStatus::NotFound => "NOT_FOUND",
        }
    }
}

impl fmt::Display for AvailabilityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 可生成性判定结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityVerdict {
    pub available: bool,
    pub status: AvailabilityStatus,
    #[serde(default)]
    pub message: String,
}

impl AvailabilityVerdict {
    /// 探测失败时的降级结果
    pub fn degraded(status: AvailabilityStatus, message: impl Into<String>) -> Self {
        Self {
            available: false,
            status,
            message: message.into(),
        }
    }
}

/// 目录条目：对象 + 判定
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogueEntry {
    pub target: Target,
    pub verdict: AvailabilityVerdict,
}

impl CatalogueEntry {
    pub fn new(target: Target, verdict: AvailabilityVerdict) -> Self {
        Self { target, verdict }
    }

    pub fn target_ref(&self) -> TargetRef {
        self.target.target_ref()
    }

    pub fn is_selectable(&self) -> bool {
        self.verdict.status.is_selectable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selectable_statuses() {
        assert!(AvailabilityStatus::NotGenerated.is_selectable());
        assert!(AvailabilityStatus::Failed.is_selectable());
        assert!(!AvailabilityStatus::Generated.is_selectable());
        assert!(!AvailabilityStatus::FetchFailed.is_selectable());
        assert!(!AvailabilityStatus::NotFound.is_selectable());
    }

    #[test]
    fn test_verdict_wire_format() {
        let verdict: AvailabilityVerdict = serde_json::from_str(
            r#"{"available":true,"status":"NOT_GENERATED","message":"ready"}"#,
        )
        .unwrap();
        assert!(verdict.available);
        assert_eq!(verdict.status, AvailabilityStatus::NotGenerated);

        // message 可省略
        let verdict: AvailabilityVerdict =
            serde_json::from_str(r#"{"available":false,"status":"GENERATED"}"#).unwrap();
        assert_eq!(verdict.message, "");
    }
}

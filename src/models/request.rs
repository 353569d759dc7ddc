use serde::{Deserialize, Serialize};

use crate::models::target::{
    GenerationParams, StudentTarget, SubclassTarget, Target, TargetKind,
};

/// 一次批量生成请求（CLI 从 TOML 文件读取）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRequest {
    pub academic_year_id: i64,
    pub exam_sequence_id: i64,
    pub mode: TargetKind,
    #[serde(default)]
    pub students: Vec<StudentTarget>,
    #[serde(default)]
    pub subclasses: Vec<SubclassTarget>,
    /// 要生成的对象 ID；省略时选中所有可生成的对象
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub select: Option<Vec<i64>>,
    #[serde(skip_serializing, skip_deserializing)]
    pub file_path: Option<String>,
}

impl BatchRequest {
    pub fn params(&self) -> GenerationParams {
        GenerationParams::new(self.academic_year_id, self.exam_sequence_id)
    }

    /// 当前模式下的对象全集
    pub fn targets(&self) -> Vec<Target> {
        match self.mode {
            TargetKind::Student => self.students.iter().cloned().map(Target::Student).collect(),
            TargetKind::Subclass => self
                .subclasses
                .iter()
                .cloned()
                .map(Target::Subclass)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_targets_follow_mode() {
        let request: BatchRequest = toml::from_str(
            r#"
            academic_year_id = 2024
            exam_sequence_id = 2
            mode = "subclass"

            [[students]]
            id = 1
            name = "Awa"

            [[subclasses]]
            id = 7
            name = "2B"
            class_name = "Form 2"
            student_count = 30
            "#,
        )
        .unwrap();

        let targets = request.targets();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].kind(), TargetKind::Subclass);
        assert_eq!(targets[0].label(), "Form 2 2B");
        assert_eq!(request.params(), GenerationParams::new(2024, 2));
        assert!(request.select.is_none());
    }
}

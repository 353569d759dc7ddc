//! 生成对象（学生 / 子班级）

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{AppResult, BusinessError};

/// 对象类型，同时也是生成模式（按学生 / 按子班级）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Student,
    Subclass,
}

impl TargetKind {
    /// URL 路径段
    pub fn as_path(&self) -> &'static str {
        match self {
            TargetKind::Student => "student",
            TargetKind::Subclass => "subclass",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_path())
    }
}

/// 生成模式：按学生或按子班级
pub type GenerationMode = TargetKind;

/// 对象的身份 `(kind, id)`，任务只持有这个弱引用
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetRef {
    pub kind: TargetKind,
    pub id: i64,
}

impl TargetRef {
    pub fn new(kind: TargetKind, id: i64) -> Self {
        Self { kind, id }
    }
}

impl fmt::Display for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind, self.id)
    }
}

/// 学生
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentTarget {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub matricule: String,
    #[serde(default, alias = "class_name")]
    pub class_name: String,
    #[serde(default, alias = "sub_class_name")]
    pub sub_class_name: String,
}

/// 子班级
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubclassTarget {
    pub id: i64,
    pub name: String,
    #[serde(default, alias = "class_name")]
    pub class_name: String,
    #[serde(default, alias = "student_count")]
    pub student_count: u32,
}

/// 可生成成绩单的对象
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Target {
    Student(StudentTarget),
    Subclass(SubclassTarget),
}

impl Target {
    pub fn kind(&self) -> TargetKind {
        match self {
            Target::Student(_) => TargetKind::Student,
            Target::Subclass(_) => TargetKind::Subclass,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            Target::Student(s) => s.id,
            Target::Subclass(s) => s.id,
        }
    }

    pub fn target_ref(&self) -> TargetRef {
        TargetRef::new(self.kind(), self.id())
    }

    /// 显示名称，用于日志和文件名
    pub fn label(&self) -> String {
        match self {
            Target::Student(s) if s.matricule.is_empty() => s.name.clone(),
            Target::Student(s) => format!("{} ({})", s.name, s.matricule),
            Target::Subclass(s) if s.class_name.is_empty() => s.name.clone(),
            Target::Subclass(s) => format!("{} {}", s.class_name, s.name),
        }
    }
}

/// 生成参数：学年 + 考试序列
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationParams {
    pub academic_year_id: i64,
    pub exam_sequence_id: i64,
}

impl GenerationParams {
    pub fn new(academic_year_id: i64, exam_sequence_id: i64) -> Self {
        Self {
            academic_year_id,
            exam_sequence_id,
        }
    }

    /// 两个 ID 都必须为正整数
    pub fn validate(&self) -> AppResult<()> {
        if self.academic_year_id <= 0 {
            return Err(BusinessError::InvalidParameter {
                name: "academicYearId",
                value: self.academic_year_id,
            }
            .into());
        }
        if self.exam_sequence_id <= 0 {
            return Err(BusinessError::InvalidParameter {
                name: "examSequenceId",
                value: self.exam_sequence_id,
            }
            .into());
        }
        Ok(())
    }
}

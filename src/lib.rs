//! # Report Card Jobs
//!
//! 成绩单批量生成任务编排
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 基础设施层（Infrastructure / Clients）
//! - `clients/` - `ReportApi` 远程接口及其 reqwest 实现 `ReportClient`
//! - `infrastructure/` - 本地缓存 `ArtifactCache`，交付能力 `ArtifactHandoff`
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个对象或单个任务
//! - `EligibilityProber` - 可生成性检查（失败降级，不抛错）
//! - `GenerationDispatcher` - 发起生成，按响应形态归一化为任务
//! - `ArtifactManager` - 取得成绩单文件并交给用户
//!
//! ### ③ 状态层（Store）
//! - `JobLedger` - 任务账本，唯一的修改入口 `merge_job`
//! - `Catalogue` - 可选对象目录和选中状态
//!
//! ### ④ 编排层（Orchestration）
//! - `BatchGenerator` - 批量生成，单个失败不影响整体
//! - `JobPoller` - 定时轮询进行中的任务
//! - `ReportDesk` - 对上层暴露的操作
//!
//! ## 模块结构

pub mod app;
pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod store;
pub mod utils;

// 重新导出常用类型
pub use app::App;
pub use clients::{ReportApi, ReportClient};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{Job, JobStatus, Target, TargetKind, TargetRef};
pub use orchestrator::{BatchGenerator, JobPoller, PollerHandle, ReportDesk};
pub use store::{Catalogue, JobLedger};

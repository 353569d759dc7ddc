//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 批量调度和生命周期管理，不做具体的协议判断。
//!
//! ## 模块划分
//!
//! ### `batch_generator` - 批量生成协调器
//! - 对选中对象并发分发，单个失败只计入 `failures`
//! - 新任务按创建时间倒序并入账本
//! - 同一时间只允许一个批次
//!
//! ### `job_poller` - 任务轮询器
//! - 定时查询进行中的任务，按 ID 原地更新账本
//! - 后台循环由 `PollerHandle` 持有，可显式停止
//!
//! ### `report_desk` - 工作台
//! - 对上层暴露的操作：检查可生成性、生成、下载/分享、重试
//!
//! ## 层次关系
//!
//! ```text
//! report_desk
//!     ↓
//! batch_generator / job_poller
//!     ↓
//! services (eligibility / dispatcher / artifact_manager)
//!     ↓
//! clients + infrastructure
//! ```

pub mod batch_generator;
pub mod job_poller;
pub mod report_desk;

pub use batch_generator::{BatchGenerator, BatchOutcome};
pub use job_poller::{JobPoller, PollerHandle, SweepReport};
pub use report_desk::ReportDesk;

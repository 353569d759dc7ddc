//! 业务能力层（Services）
//!
//! 每个服务只描述"我能做什么"，处理单个对象或单个任务；
//! 批量调度交给编排层。

pub mod artifact_manager;
pub mod dispatcher;
pub mod eligibility;
pub mod fanout;

pub use artifact_manager::ArtifactManager;
pub use dispatcher::{classify_response, DispatchResponse, GenerationDispatcher};
pub use eligibility::EligibilityProber;
pub use fanout::{partition, settle_all, Settled};

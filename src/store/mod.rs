//! 状态层
//!
//! 持有界面需要展示的两份状态：任务账本和可选对象目录

pub mod catalogue;
pub mod ledger;

pub use catalogue::{Catalogue, CatalogueSummary};
pub use ledger::{JobLedger, LedgerStats};

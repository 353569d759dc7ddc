#[cfg(test)]
pub mod fake;
pub mod report_client;

pub use report_client::{RawResponse, ReportApi, ReportClient};

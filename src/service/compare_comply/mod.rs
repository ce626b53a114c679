//! Compare & Comply V1.

mod endpoints;
pub mod models;
mod options;
mod service;

pub use models::*;
pub use options::{
    sort_expression, BatchAction, BatchFunction, CreateBatchRequest, ListFeedbackOptions,
    SortField,
};
pub use service::CompareComplyService;

pub const SERVICE_ID: &str = "compare-comply";
pub const DEFAULT_URL: &str = "https://gateway.watsonplatform.net/compare-comply/api";

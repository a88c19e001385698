//! Run orchestration: fetch, analyse, report

pub mod context;
pub mod pipeline;
pub mod report;

pub use context::RunContext;
pub use pipeline::{Dashboard, FetchOutcome};
pub use report::{RunReport, TickerReport};

//! Calculation record lifecycle and the service that persists it.

pub mod lifecycle;
pub mod report;
pub mod service;

pub use lifecycle::{Authority, CalculationLifecycle};
pub use report::{AuditReport, UserTaxSummary, summarize};
pub use service::CalculationService;

//! Repository layer: entity-scoped database operations.
//!
//! One sub-module per table; all public functions are re-exported here.
//! Functions borrow a `Connection` and run parameterized single statements.

mod assessment;
mod audit;
mod dashboard;
mod diagnostic_report;
mod doctor;
mod health_event;
mod patient;

pub use assessment::*;
pub use audit::*;
pub use dashboard::*;
pub use diagnostic_report::*;
pub use doctor::*;
pub use health_event::*;
pub use patient::*;

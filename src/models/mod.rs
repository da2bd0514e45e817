pub mod assessment;
pub mod audit;
pub mod diagnostic_report;
pub mod doctor;
pub mod enums;
pub mod health_event;
pub mod patient;
pub mod questionnaire;

pub use assessment::*;
pub use audit::*;
pub use diagnostic_report::*;
pub use doctor::*;
pub use health_event::*;
pub use patient::*;
pub use questionnaire::*;

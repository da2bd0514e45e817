//! API middleware.
//!
//! Execution order (outermost → innermost):
//! 1. Access log: every request, with the resolved actor
//! 2. Session guard: per role, injects the identity for handlers

pub mod audit;
pub mod session;

//! Infrastructure layer - External service implementations

pub mod generation;
pub mod logging;
pub mod observability;
pub mod status;
pub mod workflow;

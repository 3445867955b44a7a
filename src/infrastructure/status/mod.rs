//! Status reporter implementations

mod channel;
mod composite;
mod in_memory;
mod tracing_reporter;

pub use channel::ChannelStatusReporter;
pub use composite::CompositeStatusReporter;
pub use in_memory::{InMemoryStatusStore, StepRecord};
pub use tracing_reporter::TracingStatusReporter;

//! Throttled sampling loop and its sinks

pub mod pipeline;
pub mod sink;
pub mod throttled;

pub use pipeline::Pipeline;
pub use sink::{Control, FrameSink};
pub use throttled::{Sampler, StateHandle};

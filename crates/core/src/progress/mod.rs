//! Progress events and their in-process fan-out.

mod bus;
mod types;

pub use bus::ProgressBus;
pub use types::ProgressEvent;

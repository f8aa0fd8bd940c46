pub mod bus;
pub mod error;

pub use bus::{Broadcaster, EventBus, MONITOR_TOPIC};
pub use error::{MonitorError, Result};

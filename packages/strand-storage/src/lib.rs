pub mod event_log;
pub mod memory;
pub mod models;

mod error;

pub use error::Error;
pub use event_log::{EventLog, EventQuery};
pub use memory::MemoryEventLog;
pub use models::{MessageEvent, ThreadSummary};

pub type Result<T, E = Error> = std::result::Result<T, E>;

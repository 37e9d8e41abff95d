pub mod event;
pub mod fluent;
pub mod render;
pub mod sink;
pub mod timestamp;

pub use event::{AccessLogEntry, EventRecord, TIMESTAMP_KEY, Timestamp};
pub use fluent::FluentForwarder;
pub use sink::{EventLog, MemoryHandle};
pub use timestamp::{Clock, TimeStamper};

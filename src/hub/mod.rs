//! Connection hub: the registry of live subscribers and their per-client
//! delivery pipeline.

pub mod connection;
pub mod registry;

pub use connection::{ClientHandle, CloseReason, ConnectionState, FrameStream};
pub use registry::{ClientSummary, ConnectionRegistry, DEFAULT_QUEUE_CAPACITY};

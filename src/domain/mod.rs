//! Domain layer: subscriber identity, event values, and the wire encoder.
//!
//! Everything here is pure and synchronous. The stateful connection
//! registry lives in [`crate::hub`].

pub mod client_id;
pub mod encoder;
pub mod event;

pub use client_id::ClientId;
pub use encoder::{EncodeError, encode};
pub use event::Event;

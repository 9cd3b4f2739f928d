//! # event-hub
//!
//! Server-Sent Events broadcast hub. Long-lived HTTP clients register as
//! addressable subscribers and receive typed events, either individually or
//! by broadcast, over a one-way `text/event-stream`.
//!
//! ## Architecture
//!
//! ```text
//! Clients (EventSource)        Producers (REST, heartbeat)
//!     │                               │
//!     ├── GET /sse (api/)             ├── POST /api/v1/... (api/)
//!     │                               ├── Heartbeat (heartbeat.rs)
//!     │                               │
//!     └────────── ConnectionRegistry (hub/) ──────────┘
//!                     │
//!                     ├── per-client bounded queue
//!                     ├── per-client writer task
//!                     └── EventEncoder (domain/)
//! ```
//!
//! The registry never performs socket I/O while holding its lock. Each
//! client's writer drains its own queue, so a stalled client only affects
//! itself.

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod heartbeat;
pub mod hub;

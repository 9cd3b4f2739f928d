//! Data Transfer Objects for REST request/response serialization.

pub mod client_dto;
pub mod event_dto;

pub use client_dto::*;
pub use event_dto::*;

//! Shared application state injected into all Axum handlers.

use crate::hub::ConnectionRegistry;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Registry of connected stream clients.
    pub registry: ConnectionRegistry,
}

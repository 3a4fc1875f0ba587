use std::sync::Arc;

use crate::config::ServerConfig;
use crate::storage::ObjectStorage;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: the pool is reference-counted and the rest is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub pool: crewline_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Destination for uploaded files.
    pub storage: Arc<dyn ObjectStorage>,
}

//! Crewline API server library.
//!
//! Exposes configuration, state, error handling, handlers and the router
//! builder so the binary and the integration tests share them.

pub mod audit_trail;
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod query;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
pub mod storage;
pub mod upload;

//! HTTP API server for the depot artifact store.
//!
//! This crate provides the HTTP transport:
//! - Whole-file and chunked uploads
//! - Chunk merge triggers
//! - Whole-file and byte-range downloads
//! - Size and content metadata queries
//! - Health and Prometheus metrics endpoints

pub mod error;
pub mod handlers;
pub mod metrics;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;

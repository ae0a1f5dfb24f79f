//! molstore - record stores and REST backend for a macromolecular structure database
//!
//! - Generic record store: read, search, create, update and delete over any
//!   allow-listed table, with query building from [`molstore_query`]
//! - Relationship resolution for single-record reads
//! - One entity store per table with its aggregate and filter queries
//! - A thin axum HTTP adapter, configuration, logging and Prometheus metrics

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod state;

pub use config::Config;
pub use error::{Error, Result};
pub use state::AppState;

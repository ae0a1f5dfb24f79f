//! Request handlers for API endpoints
//!
//! Handlers parse request input, call one store operation and format the
//! response. Errors propagate as [`crate::Error`] and render themselves.

pub mod metrics;
pub mod queries;
pub mod records;

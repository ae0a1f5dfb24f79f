//! Route tables

pub mod entities;
pub mod metrics;

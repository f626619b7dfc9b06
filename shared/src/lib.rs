//! Shared types and models for the Crag Weather Platform
//!
//! This crate contains types shared between the backend server, the
//! distance fetcher tool, and the integration tests.

pub mod models;
pub mod validation;

pub use models::*;
pub use validation::*;

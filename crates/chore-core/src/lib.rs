//! # chore-core
//!
//! Core types, traits, configuration, and error handling for ChoreHub.

pub mod config;
pub mod error;
pub mod model;
pub mod traits;

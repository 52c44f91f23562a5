//! Shared configuration types for apiweave.
//!
//! This crate contains the service list, spec source parsing and dotenv
//! loading used by both the pipeline library and the `apiweave` binary.

pub mod dotenv;
mod error;
pub mod naming;
mod service;

pub use error::ConfigError;
pub use service::{ServiceSource, SpecSource, env_var_for, resolve_services};

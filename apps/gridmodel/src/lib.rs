//! # gridmodel
//!
//! Host process for the gridmodel network model store - THE BINARY.
//!
//! - `config` → store configuration from TOML, environment and flags
//! - `cli` → operator commands over a `GdaSession`
//! - `error` → the binary's error type

pub mod cli;
pub mod config;
pub mod error;

pub use config::StoreConfig;
pub use error::AppError;

//! Layered configuration store library.
//!
//! Merges a global config file, a project-local config file and `AIO_*`
//! environment variables into one key space addressed by dot paths.

pub mod cli;
pub mod config;
pub mod dotenv;
pub mod env;
pub mod error;
pub mod logging;
pub mod pipe;

pub use config::{ConfigStore, Format, Source};
pub use error::{ConfigError, Result};

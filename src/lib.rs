pub mod config;
pub mod counts;
pub mod error;
pub mod infra;
pub mod ingest;
pub mod model;
pub mod output;
pub mod services;
pub mod summary;
pub mod window;

pub use error::{Error, Result};

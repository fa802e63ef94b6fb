pub mod bootstrap;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod service;
pub mod transport;

pub use config::Config;
pub use error::{Error, Result};

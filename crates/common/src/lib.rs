pub mod config;
pub mod logging;
pub mod time;

pub use crate::config::AppConfig;

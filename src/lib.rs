pub mod cli;
pub mod config;
pub mod http;
pub mod logging;

pub use crate::config::ClientConfig;
pub use crate::http::{TeslaClient, VehicleError};

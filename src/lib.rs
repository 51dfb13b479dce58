pub mod browser;
pub mod cache;
pub mod channel;
pub mod config;
pub mod error;
pub mod logger;
pub mod services;
pub mod utils;

pub use config::*;
pub use error::{AppResult, Error};
pub use logger::*;
pub use services::{AppServices, RunOutcome};

pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod services;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use error::{AppError, Result};
pub use services::*;

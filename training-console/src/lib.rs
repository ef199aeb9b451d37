pub mod api;
pub mod commands;
pub mod config;
pub mod error;
pub mod monitor;
pub mod notify;
pub mod scheduler;
pub mod view;

pub use error::{ConsoleError, Result};
pub use monitor::{MonitorPhase, MonitorSettings, SessionOutcome, TrainingMonitor};

// Library root - exports for the server binary, the CLI and tests

pub mod app_state;
pub mod background;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod notifier;
pub mod services;
pub mod utils;

pub use app_state::AppState;
pub use config::Config;
pub use error::{AdapterError, EventError};

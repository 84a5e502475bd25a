//! Lending Library
//!
//! Book inventory and lending workflow: adding copies, searching the
//! catalog, and checking books out to patrons and back, with a REST JSON
//! API in front of the lending engine.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;
pub mod validation;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}

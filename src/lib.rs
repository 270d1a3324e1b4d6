//! Biblio Library Lending Server
//!
//! REST JSON backend for a lending library: books, physical stock copies,
//! customers, borrow/return transactions and late-fee charges.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod filter;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}

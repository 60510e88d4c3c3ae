// src/lib.rs

//! Storefront: order lookup, payment orchestration and session-gated routing
//! for a direct-to-consumer shop, backed by PostgreSQL and a Razorpay-style
//! payment gateway.

pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod services;
pub mod state;
pub mod web;

pub use crate::config::AppConfig;
pub use crate::errors::{AppError, Result};
pub use crate::state::AppState;

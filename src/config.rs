// src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;

/// Minimum length for the session-signing secret. Anything shorter is a
/// deployment mistake, rejected at startup rather than per request.
pub const MIN_SESSION_SECRET_LEN: usize = 32;

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub database_url: String,

  // Razorpay-style gateway credentials.
  pub gateway_key_id: String,
  pub gateway_key_secret: String,
  pub gateway_webhook_secret: String,
  pub gateway_base_url: String,
  pub currency: String,

  pub session_secret: String,
  /// Marks cookies `Secure` and tightens logging when true.
  pub production: bool,
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok(); // Load .env file if present

    let get_env = |var_name: &str| {
      env::var(var_name).map_err(|e| AppError::Config(format!("Missing environment variable '{}': {}", var_name, e)))
    };

    let server_host = get_env("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let server_port = get_env("SERVER_PORT")
      .unwrap_or_else(|_| "8080".to_string())
      .parse::<u16>()
      .map_err(|e| AppError::Config(format!("Invalid SERVER_PORT: {}", e)))?;
    let database_url = get_env("DATABASE_URL")?;

    let gateway_key_id = get_env("RAZORPAY_KEY_ID")?;
    let gateway_key_secret = get_env("RAZORPAY_KEY_SECRET")?;
    let gateway_webhook_secret = get_env("RAZORPAY_WEBHOOK_SECRET").unwrap_or_else(|_| gateway_key_secret.clone());
    let gateway_base_url = get_env("RAZORPAY_BASE_URL").unwrap_or_else(|_| "https://api.razorpay.com/v1".to_string());
    let currency = get_env("STORE_CURRENCY").unwrap_or_else(|_| "INR".to_string());

    let session_secret = get_env("SESSION_SECRET")?;
    if session_secret.len() < MIN_SESSION_SECRET_LEN {
      return Err(AppError::Config(format!(
        "SESSION_SECRET must be at least {} bytes, got {}",
        MIN_SESSION_SECRET_LEN,
        session_secret.len()
      )));
    }

    let production = get_env("APP_ENV").map(|v| v == "production").unwrap_or(false);

    tracing::info!("Application configuration loaded successfully.");

    Ok(Self {
      server_host,
      server_port,
      database_url,
      gateway_key_id,
      gateway_key_secret,
      gateway_webhook_secret,
      gateway_base_url,
      currency,
      session_secret,
      production,
    })
  }
}

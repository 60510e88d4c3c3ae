// src/state.rs

use crate::config::AppConfig;
use crate::db::OrderStore;
use crate::services::gateway::PaymentGateway;
use std::sync::Arc;

/// Shared per-process state: one store, one gateway client, one config, all
/// constructed at startup and injected explicitly (tests swap in fakes).
#[derive(Clone)]
pub struct AppState {
  pub store: Arc<dyn OrderStore>,
  pub gateway: Arc<dyn PaymentGateway>,
  pub config: Arc<AppConfig>,
}

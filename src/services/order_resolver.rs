// src/services/order_resolver.rs

//! Maps one opaque user-supplied identifier to exactly one order.
//!
//! Customers arrive with whatever identifier they have on hand: the full
//! primary key from an account page, the short 8-character code printed on a
//! packing slip, or the gateway order reference from a payment receipt. The
//! resolver tries a fixed list of strategies in priority order and takes the
//! first hit. A strategy that errors (e.g. a lookup fed an input that is not
//! actually key-shaped) is logged and skipped, never failing the whole
//! resolution.

use crate::db::{load_with_items, OrderStore};
use crate::errors::{AppError, Result};
use crate::models::{Order, OrderWithItems, ORDER_ID_LEN};
use tracing::{debug, instrument, warn};

/// Length of the short order code printed on packing slips and confirmation
/// emails: the last 8 characters of the primary key.
pub const SHORT_CODE_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveStrategy {
  /// Exact primary-key lookup, applicable when the input is a full
  /// 24-character hex key.
  PrimaryKey,
  /// Case-insensitive scan of all order ids comparing the trailing 8
  /// characters. A full table scan, tolerated by callers as the price of
  /// supporting short printed codes.
  IdSuffixScan,
  /// Exact lookup by the gateway order reference.
  GatewayReference,
}

/// Strategy priority order. First non-empty result wins.
pub const STRATEGIES: &[ResolveStrategy] = &[
  ResolveStrategy::PrimaryKey,
  ResolveStrategy::IdSuffixScan,
  ResolveStrategy::GatewayReference,
];

pub fn is_primary_key_shaped(input: &str) -> bool {
  input.len() == ORDER_ID_LEN && input.chars().all(|c| c.is_ascii_hexdigit())
}

async fn apply_strategy(store: &dyn OrderStore, strategy: ResolveStrategy, input: &str) -> Result<Option<Order>> {
  match strategy {
    ResolveStrategy::PrimaryKey => {
      if !is_primary_key_shaped(input) {
        return Ok(None);
      }
      // Primary keys are stored lowercase.
      store.find_by_id(&input.to_ascii_lowercase()).await
    }
    ResolveStrategy::IdSuffixScan => {
      if input.len() != SHORT_CODE_LEN {
        return Ok(None);
      }
      let needle = input.to_ascii_lowercase();
      for id in store.all_ids().await? {
        if id.len() >= SHORT_CODE_LEN && id[id.len() - SHORT_CODE_LEN..].eq_ignore_ascii_case(&needle) {
          return store.find_by_id(&id).await;
        }
      }
      Ok(None)
    }
    ResolveStrategy::GatewayReference => store.find_by_gateway_order_id(input).await,
  }
}

/// Resolves `input` to an order with its line items.
///
/// Empty input is invalid input, not "not found"; it is rejected before any
/// strategy runs. `NotFound` means every strategy was tried and missed.
#[instrument(name = "resolver::resolve", skip(store))]
pub async fn resolve(store: &dyn OrderStore, input: &str) -> Result<OrderWithItems> {
  let input = input.trim();
  if input.is_empty() {
    return Err(AppError::Validation("Order identifier must not be empty".to_string()));
  }

  for strategy in STRATEGIES {
    match apply_strategy(store, *strategy, input).await {
      Ok(Some(order)) => {
        debug!(?strategy, order_id = %order.id, "Order resolved");
        return load_with_items(store, order).await;
      }
      Ok(None) => {}
      // Fall through to the next strategy rather than failing the whole
      // resolution; the input may simply not fit this strategy's key shape.
      Err(err) => warn!(?strategy, error = %err, "Lookup strategy failed; trying next"),
    }
  }

  Err(AppError::NotFound(format!(
    "No order matches '{}'; check your order ID",
    input
  )))
}

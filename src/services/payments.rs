// src/services/payments.rs

//! Payment order orchestration: gateway intent creation paired with a local
//! order row, and verification of the gateway's asynchronous confirmations.

use crate::db::OrderStore;
use crate::errors::{AppError, Result};
use crate::models::{new_order_id, FulfillmentStatus, NewOrderItem, Order, PaymentStatus, ShippingAddress};
use crate::services::gateway::{GatewayNotes, PaymentGateway, MAX_AMOUNT_MINOR, MIN_AMOUNT_MINOR};
use chrono::Utc;
use hmac::{Hmac, Mac};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{error, info, instrument, warn};

type HmacSha256 = Hmac<Sha256>;

/// Conversion factor from display currency to the gateway's minor units.
const MINOR_UNIT_MULTIPLIER: i64 = 100;

/// Gateway payment states accepted as a confirmed payment.
const ACCEPTED_PAYMENT_STATES: &[&str] = &["captured", "authorized"];

// --- Request / response types ---

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
  pub amount: Decimal,
  pub items: Vec<NewOrderItem>,
  #[serde(default)]
  pub customer_name: Option<String>,
  #[serde(default)]
  pub customer_email: Option<String>,
  #[serde(default)]
  pub customer_phone: Option<String>,
  #[serde(default)]
  pub shipping: Option<ShippingAddress>,
}

/// Exactly what the client-side payment widget needs, nothing more.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
  pub order_id: String,
  pub gateway_order_id: String,
  pub amount_minor: i64,
  pub currency: String,
  pub key_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentRequest {
  pub gateway_order_id: String,
  pub gateway_payment_id: String,
  pub signature: String,
  pub order_id: String,
}

// --- Signatures ---

/// Hex HMAC-SHA256 over `{gateway_order_id}|{gateway_payment_id}`, the
/// gateway's checkout-callback signature scheme.
pub fn payment_signature(secret: &str, gateway_order_id: &str, gateway_payment_id: &str) -> String {
  let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any size");
  mac.update(format!("{}|{}", gateway_order_id, gateway_payment_id).as_bytes());
  hex::encode(mac.finalize().into_bytes())
}

/// Constant-time check of a hex-encoded HMAC-SHA256 signature over `message`.
/// Undecodable hex is a mismatch, not an error.
pub fn verify_hex_signature(secret: &str, message: &[u8], signature_hex: &str) -> bool {
  let Ok(signature) = hex::decode(signature_hex.trim()) else {
    return false;
  };
  let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any size");
  mac.update(message);
  mac.verify_slice(&signature).is_ok()
}

// --- Amount validation ---

/// Converts a display-currency amount to gateway minor units, enforcing the
/// gateway's published bounds before any external call is made.
pub fn to_minor_units(amount: Decimal) -> Result<i64> {
  if amount <= Decimal::ZERO {
    return Err(AppError::Validation("Amount must be positive".to_string()));
  }
  let minor = (amount * Decimal::from(MINOR_UNIT_MULTIPLIER))
    .round()
    .to_i64()
    .ok_or_else(|| AppError::Validation("Amount is not representable in minor units".to_string()))?;
  if !(MIN_AMOUNT_MINOR..=MAX_AMOUNT_MINOR).contains(&minor) {
    return Err(AppError::Validation(format!(
      "Amount in minor units must be between {} and {}, got {}",
      MIN_AMOUNT_MINOR, MAX_AMOUNT_MINOR, minor
    )));
  }
  Ok(minor)
}

fn validate_items(items: &[NewOrderItem]) -> Result<()> {
  if items.is_empty() {
    return Err(AppError::Validation("Order must contain at least one item".to_string()));
  }
  for item in items {
    if item.quantity < 1 {
      return Err(AppError::Validation(format!(
        "Item '{}' has quantity {}, must be at least 1",
        item.product_id, item.quantity
      )));
    }
  }
  Ok(())
}

// --- Operations ---

/// Creates a gateway payment intent and the matching local order row.
///
/// Validation and the gateway call both precede the local write, so a failure
/// in either leaves no orphaned PENDING order. The reverse gap (gateway
/// intent created, local write fails) is accepted and logged for manual
/// reconciliation; no compensating call is made to the gateway.
#[instrument(name = "payments::create_order", skip_all, fields(amount = %req.amount, item_count = req.items.len()))]
pub async fn create_order(
  store: &dyn OrderStore,
  gateway: &dyn PaymentGateway,
  currency: &str,
  req: CreateOrderRequest,
) -> Result<CheckoutSession> {
  let amount_minor = to_minor_units(req.amount)?;
  validate_items(&req.items)?;

  let receipt = format!("rcpt_{}", Utc::now().timestamp_millis());
  let notes = GatewayNotes {
    customer_name: req.customer_name.clone(),
    customer_email: req.customer_email.clone(),
    customer_phone: req.customer_phone.clone(),
  };
  let gateway_order = gateway.create_order(amount_minor, currency, &receipt, &notes).await?;

  let now = Utc::now();
  let order = Order {
    id: new_order_id(),
    gateway_order_id: gateway_order.id.clone(),
    gateway_payment_id: None,
    amount: req.amount,
    amount_minor,
    currency: currency.to_string(),
    payment_status: PaymentStatus::Pending,
    fulfillment_status: FulfillmentStatus::Pending,
    customer_name: req.customer_name,
    customer_email: req.customer_email,
    customer_phone: req.customer_phone,
    shipping_address: req.shipping.map(sqlx::types::Json),
    created_at: now,
    updated_at: now,
  };

  if let Err(db_err) = store.insert_order(&order, &req.items).await {
    // Known gap: the gateway intent now has no local counterpart. Surface
    // both ids so the stranded intent can be reconciled by hand.
    error!(
      gateway_order_id = %gateway_order.id,
      order_id = %order.id,
      error = %db_err,
      "Local order write failed after gateway intent was created"
    );
    return Err(db_err);
  }

  info!(order_id = %order.id, gateway_order_id = %gateway_order.id, "Payment order created");
  Ok(CheckoutSession {
    order_id: order.id,
    gateway_order_id: gateway_order.id,
    amount_minor,
    currency: currency.to_string(),
    key_id: gateway.key_id().to_string(),
  })
}

/// Verifies a gateway checkout callback against the local order.
///
/// The callback must be bound to the order it claims to confirm: the
/// caller-supplied gateway order reference has to be the one stored on the
/// local order, otherwise a valid triple for order A could mark an unrelated
/// unpaid order B as COMPLETED. Then two checks, strictly in order: the
/// callback signature, then the live payment status from the gateway. A
/// signature mismatch never reaches the status query. Failure leaves the
/// order PENDING; callbacks can race or arrive out of order, so an
/// unconfirmed payment is "not yet confirmed", never "confirmed negative".
#[instrument(name = "payments::verify_payment", skip(store, gateway, key_secret, req), fields(order_id = %req.order_id))]
pub async fn verify_payment(
  store: &dyn OrderStore,
  gateway: &dyn PaymentGateway,
  key_secret: &str,
  req: &VerifyPaymentRequest,
) -> Result<()> {
  let order = store
    .find_by_id(&req.order_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("No order with id '{}'", req.order_id)))?;

  if order.gateway_order_id != req.gateway_order_id {
    warn!(
      order_id = %order.id,
      supplied_gateway_order_id = %req.gateway_order_id,
      "Callback gateway order reference does not belong to this order"
    );
    return Err(AppError::Verification(
      "Gateway order reference does not match this order".to_string(),
    ));
  }

  if order.payment_status == PaymentStatus::Failed {
    return Err(AppError::Verification(
      "Payment for this order was already reported as failed".to_string(),
    ));
  }

  let message = format!("{}|{}", req.gateway_order_id, req.gateway_payment_id);
  if !verify_hex_signature(key_secret, message.as_bytes(), &req.signature) {
    warn!(order_id = %order.id, "Payment signature mismatch");
    return Err(AppError::Verification("Signature mismatch".to_string()));
  }

  let payment = gateway.fetch_payment(&req.gateway_payment_id).await?;
  if !ACCEPTED_PAYMENT_STATES.contains(&payment.status.as_str()) {
    return Err(AppError::Verification(format!(
      "Payment is in state '{}', expected one of {:?}",
      payment.status, ACCEPTED_PAYMENT_STATES
    )));
  }
  if let Some(ref gateway_order_id) = payment.order_id {
    if gateway_order_id != &req.gateway_order_id {
      warn!(order_id = %order.id, payment_id = %payment.id, "Gateway reports the payment belongs to a different order");
      return Err(AppError::Verification(
        "Payment belongs to a different gateway order".to_string(),
      ));
    }
  }

  // Idempotent: re-verifying a COMPLETED order is a no-op in the store.
  store.mark_payment_completed(&order.id, &req.gateway_payment_id).await?;
  info!(order_id = %order.id, gateway_payment_id = %req.gateway_payment_id, "Payment confirmed");
  Ok(())
}

// --- Gateway webhook events ---

#[derive(Debug, Deserialize)]
pub struct GatewayEvent {
  pub event: String,
  #[serde(default)]
  pub payload: GatewayEventPayload,
}

#[derive(Debug, Default, Deserialize)]
pub struct GatewayEventPayload {
  #[serde(default)]
  pub payment: Option<GatewayEventEntity>,
}

#[derive(Debug, Deserialize)]
pub struct GatewayEventEntity {
  pub entity: GatewayPaymentEntity,
}

#[derive(Debug, Deserialize)]
pub struct GatewayPaymentEntity {
  pub id: String,
  #[serde(default)]
  pub order_id: Option<String>,
  #[serde(default)]
  pub status: Option<String>,
}

/// Handles an asynchronous gateway webhook delivery.
///
/// The body signature is checked first (constant-time, against the dedicated
/// webhook secret). `payment.failed` is the one event that moves an order
/// PENDING→FAILED; `payment.captured` completes it like a successful
/// verification. Anything else is acknowledged and ignored.
#[instrument(name = "payments::handle_gateway_event", skip_all)]
pub async fn handle_gateway_event(
  store: &dyn OrderStore,
  webhook_secret: &str,
  body: &[u8],
  signature_header: Option<&str>,
) -> Result<()> {
  let signature = signature_header.ok_or_else(|| AppError::Verification("Missing webhook signature".to_string()))?;
  if !verify_hex_signature(webhook_secret, body, signature) {
    return Err(AppError::Verification("Webhook signature mismatch".to_string()));
  }

  let event: GatewayEvent = serde_json::from_slice(body)
    .map_err(|e| AppError::Validation(format!("Malformed webhook payload: {}", e)))?;

  let payment = match event.payload.payment {
    Some(p) => p.entity,
    None => {
      info!(event = %event.event, "Webhook event carries no payment entity; ignoring");
      return Ok(());
    }
  };
  let Some(gateway_order_id) = payment.order_id else {
    info!(event = %event.event, payment_id = %payment.id, "Webhook payment has no order reference; ignoring");
    return Ok(());
  };

  match event.event.as_str() {
    "payment.failed" => {
      warn!(%gateway_order_id, payment_id = %payment.id, "Gateway reported payment failure");
      store.mark_payment_failed(&gateway_order_id).await
    }
    "payment.captured" => {
      if let Some(order) = store.find_by_gateway_order_id(&gateway_order_id).await? {
        store.mark_payment_completed(&order.id, &payment.id).await?;
        info!(order_id = %order.id, payment_id = %payment.id, "Payment captured via webhook");
      } else {
        warn!(%gateway_order_id, "Captured payment references an unknown order");
      }
      Ok(())
    }
    other => {
      info!(event = %other, "Unhandled webhook event; acknowledged");
      Ok(())
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use rust_decimal_macros::dec;

  #[test]
  fn minor_units_scales_by_hundred() {
    assert_eq!(to_minor_units(dec!(100.00)).unwrap(), 10_000);
    assert_eq!(to_minor_units(dec!(0.01)).unwrap(), 1);
    assert_eq!(to_minor_units(dec!(999999.99)).unwrap(), 99_999_999);
  }

  #[test]
  fn minor_units_rejects_non_positive() {
    assert!(matches!(to_minor_units(Decimal::ZERO), Err(AppError::Validation(_))));
    assert!(matches!(to_minor_units(dec!(-5)), Err(AppError::Validation(_))));
  }

  #[test]
  fn minor_units_rejects_above_gateway_maximum() {
    assert!(matches!(to_minor_units(dec!(1000000.00)), Err(AppError::Validation(_))));
  }

  #[test]
  fn signature_roundtrip_verifies() {
    let sig = payment_signature("secret-key", "order_abc", "pay_xyz");
    assert!(verify_hex_signature("secret-key", b"order_abc|pay_xyz", &sig));
  }

  #[test]
  fn tampered_signature_fails_any_bit_flip() {
    let sig = payment_signature("secret-key", "order_abc", "pay_xyz");
    let mut bytes = hex::decode(&sig).unwrap();
    for i in 0..bytes.len() {
      bytes[i] ^= 0x01;
      let tampered = hex::encode(&bytes);
      assert!(!verify_hex_signature("secret-key", b"order_abc|pay_xyz", &tampered));
      bytes[i] ^= 0x01;
    }
  }

  #[test]
  fn undecodable_signature_is_a_mismatch() {
    assert!(!verify_hex_signature("secret-key", b"msg", "not-hex-at-all"));
    assert!(!verify_hex_signature("secret-key", b"msg", ""));
  }
}

// src/models/order.rs

use chrono::{DateTime, Utc};
use rand::RngCore;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};

/// Length of an order primary key: 12 bytes hex-encoded.
pub const ORDER_ID_LEN: usize = 24;

/// Generates a new 24-character lowercase hex order id: a 4-byte unix
/// timestamp followed by 8 random bytes, so ids sort roughly by creation time.
pub fn new_order_id() -> String {
  let mut bytes = [0u8; 12];
  let ts = Utc::now().timestamp() as u32;
  bytes[..4].copy_from_slice(&ts.to_be_bytes());
  rand::thread_rng().fill_bytes(&mut bytes[4..]);
  hex::encode(bytes)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "payment_status_enum", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
  Pending,
  Completed,
  Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "fulfillment_status_enum", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FulfillmentStatus {
  Pending,
  Processing,
  Shipped,
  Delivered,
  Cancelled,
}

/// Shipping address stored as a JSONB sub-document on the order row.
///
/// The fixed fields are written once at checkout. The extension fields
/// (tracking number, shipped date, notes) are filled in later by back-office
/// updates and must merge non-destructively: an update carrying `None` for an
/// extension field leaves the stored value alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub line1: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub line2: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub city: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub state: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub zip: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub country: Option<String>,

  // Extension fields, append-only/merge-on-update.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub tracking_number: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub shipped_date: Option<DateTime<Utc>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
}

impl ShippingAddress {
  /// Merges `patch` into `self`, field by field. Only `Some` values in the
  /// patch overwrite; the stored sub-document is never replaced wholesale.
  pub fn merge(&mut self, patch: &ShippingAddress) {
    fn take<T: Clone>(dst: &mut Option<T>, src: &Option<T>) {
      if src.is_some() {
        *dst = src.clone();
      }
    }
    take(&mut self.line1, &patch.line1);
    take(&mut self.line2, &patch.line2);
    take(&mut self.city, &patch.city);
    take(&mut self.state, &patch.state);
    take(&mut self.zip, &patch.zip);
    take(&mut self.country, &patch.country);
    take(&mut self.tracking_number, &patch.tracking_number);
    take(&mut self.shipped_date, &patch.shipped_date);
    take(&mut self.notes, &patch.notes);
  }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Order {
  /// 24-character lowercase hex primary key.
  pub id: String,
  /// Gateway order reference, unique across all orders.
  pub gateway_order_id: String,
  /// Set once the gateway payment is confirmed.
  pub gateway_payment_id: Option<String>,
  pub amount: Decimal,
  pub amount_minor: i64,
  pub currency: String,
  pub payment_status: PaymentStatus,
  pub fulfillment_status: FulfillmentStatus,
  pub customer_name: Option<String>,
  pub customer_email: Option<String>,
  pub customer_phone: Option<String>,
  pub shipping_address: Option<sqlx::types::Json<ShippingAddress>>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// An order together with its line items, the unit returned by lookups.
#[derive(Debug, Clone, Serialize)]
pub struct OrderWithItems {
  #[serde(flatten)]
  pub order: Order,
  pub items: Vec<super::OrderItem>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn order_ids_are_24_hex_chars() {
    let id = new_order_id();
    assert_eq!(id.len(), ORDER_ID_LEN);
    assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
  }

  #[test]
  fn shipping_merge_keeps_unpatched_fields() {
    let mut stored = ShippingAddress {
      line1: Some("12 MG Road".into()),
      city: Some("Bengaluru".into()),
      notes: Some("leave at door".into()),
      ..Default::default()
    };
    let patch = ShippingAddress {
      tracking_number: Some("TRK-991".into()),
      ..Default::default()
    };
    stored.merge(&patch);
    assert_eq!(stored.line1.as_deref(), Some("12 MG Road"));
    assert_eq!(stored.notes.as_deref(), Some("leave at door"));
    assert_eq!(stored.tracking_number.as_deref(), Some("TRK-991"));
  }

  #[test]
  fn shipping_merge_overwrites_patched_fields() {
    let mut stored = ShippingAddress {
      notes: Some("old note".into()),
      ..Default::default()
    };
    let patch = ShippingAddress {
      notes: Some("new note".into()),
      ..Default::default()
    };
    stored.merge(&patch);
    assert_eq!(stored.notes.as_deref(), Some("new note"));
  }
}

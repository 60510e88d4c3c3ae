// src/models/order_item.rs

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

/// A line item owned by exactly one order, cascade-deleted with it.
///
/// `product_name` and `unit_price` are snapshots taken at purchase time and
/// are never updated afterwards, even if the catalog entry changes.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderItem {
  pub id: i64,
  pub order_id: String,
  pub product_id: String,
  pub product_name: String,
  pub unit_price: Decimal,
  pub quantity: i32,
}

/// A line item as submitted at checkout, before it has an order to belong to.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderItem {
  pub product_id: String,
  pub product_name: String,
  pub unit_price: Decimal,
  pub quantity: i32,
}

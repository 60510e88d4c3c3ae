// src/db.rs

//! Order persistence behind the [`OrderStore`] trait.
//!
//! The Postgres implementation is the only one shipped; tests substitute an
//! in-memory fake. The trait surface is deliberately shaped after what the
//! resolver and the payment orchestrator need, nothing more.

use crate::errors::{AppError, Result};
use crate::models::{
  FulfillmentStatus, NewOrderItem, Order, OrderItem, OrderWithItems, PaymentStatus, ShippingAddress,
};
use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::instrument;

/// Back-office patch applied to an order. `payment_status` is the
/// administrative correction path, the only way payment status may move
/// backwards.
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderAdminPatch {
  pub fulfillment_status: Option<FulfillmentStatus>,
  pub payment_status: Option<PaymentStatus>,
  pub shipping: Option<ShippingAddress>,
}

#[async_trait]
pub trait OrderStore: Send + Sync {
  async fn find_by_id(&self, id: &str) -> Result<Option<Order>>;

  /// Every order primary key in the table. Feeds the resolver's suffix-scan
  /// strategy, which is a documented O(n) fallback.
  async fn all_ids(&self) -> Result<Vec<String>>;

  async fn find_by_gateway_order_id(&self, gateway_order_id: &str) -> Result<Option<Order>>;

  async fn items_for(&self, order_id: &str) -> Result<Vec<OrderItem>>;

  /// Inserts the order and its line items in one transaction.
  async fn insert_order(&self, order: &Order, items: &[NewOrderItem]) -> Result<()>;

  /// PENDING→COMPLETED, recording the gateway payment id. A no-op if the
  /// order is already COMPLETED (idempotent re-verification).
  async fn mark_payment_completed(&self, id: &str, gateway_payment_id: &str) -> Result<()>;

  /// PENDING→FAILED, driven only by explicit gateway failure events.
  async fn mark_payment_failed(&self, gateway_order_id: &str) -> Result<()>;

  async fn list_recent(&self, limit: i64) -> Result<Vec<Order>>;

  /// Applies a back-office patch, merging shipping extension fields
  /// non-destructively. Returns the updated order.
  async fn apply_admin_patch(&self, id: &str, patch: &OrderAdminPatch) -> Result<Order>;
}

/// Convenience shared by both lookup endpoints.
pub async fn load_with_items(store: &dyn OrderStore, order: Order) -> Result<OrderWithItems> {
  let items = store.items_for(&order.id).await?;
  Ok(OrderWithItems { order, items })
}

pub struct PgOrderStore {
  pool: PgPool,
}

impl PgOrderStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

const ORDER_COLUMNS: &str = "id, gateway_order_id, gateway_payment_id, amount, amount_minor, currency, \
   payment_status, fulfillment_status, customer_name, customer_email, customer_phone, \
   shipping_address, created_at, updated_at";

#[async_trait]
impl OrderStore for PgOrderStore {
  #[instrument(name = "db::find_by_id", skip(self))]
  async fn find_by_id(&self, id: &str) -> Result<Option<Order>> {
    let order = sqlx::query_as::<_, Order>(&format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS))
      .bind(id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(order)
  }

  #[instrument(name = "db::all_ids", skip(self))]
  async fn all_ids(&self) -> Result<Vec<String>> {
    let ids: Vec<(String,)> = sqlx::query_as("SELECT id FROM orders ORDER BY created_at DESC")
      .fetch_all(&self.pool)
      .await?;
    Ok(ids.into_iter().map(|(id,)| id).collect())
  }

  #[instrument(name = "db::find_by_gateway_order_id", skip(self))]
  async fn find_by_gateway_order_id(&self, gateway_order_id: &str) -> Result<Option<Order>> {
    let order = sqlx::query_as::<_, Order>(&format!(
      "SELECT {} FROM orders WHERE gateway_order_id = $1",
      ORDER_COLUMNS
    ))
    .bind(gateway_order_id)
    .fetch_optional(&self.pool)
    .await?;
    Ok(order)
  }

  #[instrument(name = "db::items_for", skip(self))]
  async fn items_for(&self, order_id: &str) -> Result<Vec<OrderItem>> {
    let items = sqlx::query_as::<_, OrderItem>(
      "SELECT id, order_id, product_id, product_name, unit_price, quantity \
       FROM order_items WHERE order_id = $1 ORDER BY id",
    )
    .bind(order_id)
    .fetch_all(&self.pool)
    .await?;
    Ok(items)
  }

  #[instrument(name = "db::insert_order", skip(self, order, items), fields(order_id = %order.id))]
  async fn insert_order(&self, order: &Order, items: &[NewOrderItem]) -> Result<()> {
    let mut tx = self.pool.begin().await?;

    sqlx::query(
      "INSERT INTO orders (id, gateway_order_id, amount, amount_minor, currency, \
         payment_status, fulfillment_status, customer_name, customer_email, customer_phone, \
         shipping_address, created_at, updated_at) \
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $12)",
    )
    .bind(&order.id)
    .bind(&order.gateway_order_id)
    .bind(order.amount)
    .bind(order.amount_minor)
    .bind(&order.currency)
    .bind(order.payment_status)
    .bind(order.fulfillment_status)
    .bind(&order.customer_name)
    .bind(&order.customer_email)
    .bind(&order.customer_phone)
    .bind(&order.shipping_address)
    .bind(order.created_at)
    .execute(&mut *tx)
    .await?;

    for item in items {
      sqlx::query(
        "INSERT INTO order_items (order_id, product_id, product_name, unit_price, quantity) \
         VALUES ($1, $2, $3, $4, $5)",
      )
      .bind(&order.id)
      .bind(&item.product_id)
      .bind(&item.product_name)
      .bind(item.unit_price)
      .bind(item.quantity)
      .execute(&mut *tx)
      .await?;
    }

    tx.commit().await?;
    Ok(())
  }

  #[instrument(name = "db::mark_payment_completed", skip(self))]
  async fn mark_payment_completed(&self, id: &str, gateway_payment_id: &str) -> Result<()> {
    // `payment_status <> 'failed'` keeps the transition forward-only while
    // letting an already-completed order pass through untouched.
    sqlx::query(
      "UPDATE orders SET payment_status = 'completed', gateway_payment_id = $2, updated_at = now() \
       WHERE id = $1 AND payment_status <> 'failed'",
    )
    .bind(id)
    .bind(gateway_payment_id)
    .execute(&self.pool)
    .await?;
    Ok(())
  }

  #[instrument(name = "db::mark_payment_failed", skip(self))]
  async fn mark_payment_failed(&self, gateway_order_id: &str) -> Result<()> {
    sqlx::query(
      "UPDATE orders SET payment_status = 'failed', updated_at = now() \
       WHERE gateway_order_id = $1 AND payment_status = 'pending'",
    )
    .bind(gateway_order_id)
    .execute(&self.pool)
    .await?;
    Ok(())
  }

  #[instrument(name = "db::list_recent", skip(self))]
  async fn list_recent(&self, limit: i64) -> Result<Vec<Order>> {
    let orders = sqlx::query_as::<_, Order>(&format!(
      "SELECT {} FROM orders ORDER BY created_at DESC LIMIT $1",
      ORDER_COLUMNS
    ))
    .bind(limit)
    .fetch_all(&self.pool)
    .await?;
    Ok(orders)
  }

  #[instrument(name = "db::apply_admin_patch", skip(self, patch))]
  async fn apply_admin_patch(&self, id: &str, patch: &OrderAdminPatch) -> Result<Order> {
    let mut tx = self.pool.begin().await?;

    let current = sqlx::query_as::<_, Order>(&format!(
      "SELECT {} FROM orders WHERE id = $1 FOR UPDATE",
      ORDER_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("No order with id '{}'", id)))?;

    // Merge the shipping sub-document in memory; the column is written back
    // whole but never loses fields the patch did not carry.
    let mut shipping = current.shipping_address.map(|j| j.0).unwrap_or_default();
    if let Some(ref s) = patch.shipping {
      shipping.merge(s);
    }

    let payment_status = patch.payment_status.unwrap_or(current.payment_status);
    let fulfillment_status = patch.fulfillment_status.unwrap_or(current.fulfillment_status);

    let updated = sqlx::query_as::<_, Order>(&format!(
      "UPDATE orders SET payment_status = $2, fulfillment_status = $3, shipping_address = $4, \
         updated_at = now() WHERE id = $1 RETURNING {}",
      ORDER_COLUMNS
    ))
    .bind(id)
    .bind(payment_status)
    .bind(fulfillment_status)
    .bind(Json(shipping))
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(updated)
  }
}

// tests/common/mod.rs

//! In-memory fakes for the store and gateway seams, with call counters so
//! tests can assert what was (and was not) reached.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use storefront::db::{OrderAdminPatch, OrderStore};
use storefront::errors::{AppError, Result};
use storefront::models::{FulfillmentStatus, NewOrderItem, Order, OrderItem, PaymentStatus};
use storefront::services::gateway::{GatewayNotes, GatewayOrder, GatewayPayment, PaymentGateway};

pub fn fake_order(id: &str, gateway_order_id: &str) -> Order {
  let now = Utc::now();
  Order {
    id: id.to_string(),
    gateway_order_id: gateway_order_id.to_string(),
    gateway_payment_id: None,
    amount: Decimal::new(10_000, 2),
    amount_minor: 10_000,
    currency: "INR".to_string(),
    payment_status: PaymentStatus::Pending,
    fulfillment_status: FulfillmentStatus::Pending,
    customer_name: None,
    customer_email: None,
    customer_phone: None,
    shipping_address: None,
    created_at: now,
    updated_at: now,
  }
}

#[derive(Default)]
pub struct InMemoryOrderStore {
  pub orders: Mutex<Vec<Order>>,
  pub items: Mutex<Vec<OrderItem>>,
  /// When set, `find_by_id` fails, simulating a malformed-key lookup error.
  pub fail_find_by_id: AtomicBool,
  pub all_ids_calls: AtomicUsize,
}

impl InMemoryOrderStore {
  pub fn with_orders(orders: Vec<Order>) -> Self {
    Self {
      orders: Mutex::new(orders),
      ..Default::default()
    }
  }

  pub fn payment_status_of(&self, id: &str) -> Option<PaymentStatus> {
    self
      .orders
      .lock()
      .unwrap()
      .iter()
      .find(|o| o.id == id)
      .map(|o| o.payment_status)
  }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
  async fn find_by_id(&self, id: &str) -> Result<Option<Order>> {
    if self.fail_find_by_id.load(Ordering::SeqCst) {
      return Err(AppError::Internal("simulated lookup failure".into()));
    }
    Ok(self.orders.lock().unwrap().iter().find(|o| o.id == id).cloned())
  }

  async fn all_ids(&self) -> Result<Vec<String>> {
    self.all_ids_calls.fetch_add(1, Ordering::SeqCst);
    Ok(self.orders.lock().unwrap().iter().map(|o| o.id.clone()).collect())
  }

  async fn find_by_gateway_order_id(&self, gateway_order_id: &str) -> Result<Option<Order>> {
    Ok(
      self
        .orders
        .lock()
        .unwrap()
        .iter()
        .find(|o| o.gateway_order_id == gateway_order_id)
        .cloned(),
    )
  }

  async fn items_for(&self, order_id: &str) -> Result<Vec<OrderItem>> {
    Ok(
      self
        .items
        .lock()
        .unwrap()
        .iter()
        .filter(|i| i.order_id == order_id)
        .cloned()
        .collect(),
    )
  }

  async fn insert_order(&self, order: &Order, items: &[NewOrderItem]) -> Result<()> {
    let mut orders = self.orders.lock().unwrap();
    // Mirrors the UNIQUE constraint on gateway_order_id.
    if orders.iter().any(|o| o.gateway_order_id == order.gateway_order_id) {
      return Err(AppError::Internal(format!(
        "duplicate gateway_order_id '{}'",
        order.gateway_order_id
      )));
    }
    orders.push(order.clone());
    let mut stored = self.items.lock().unwrap();
    for item in items {
      let id = stored.len() as i64 + 1;
      stored.push(OrderItem {
        id,
        order_id: order.id.clone(),
        product_id: item.product_id.clone(),
        product_name: item.product_name.clone(),
        unit_price: item.unit_price,
        quantity: item.quantity,
      });
    }
    Ok(())
  }

  async fn mark_payment_completed(&self, id: &str, gateway_payment_id: &str) -> Result<()> {
    let mut orders = self.orders.lock().unwrap();
    if let Some(order) = orders.iter_mut().find(|o| o.id == id) {
      if order.payment_status != PaymentStatus::Failed {
        order.payment_status = PaymentStatus::Completed;
        order.gateway_payment_id = Some(gateway_payment_id.to_string());
        order.updated_at = Utc::now();
      }
    }
    Ok(())
  }

  async fn mark_payment_failed(&self, gateway_order_id: &str) -> Result<()> {
    let mut orders = self.orders.lock().unwrap();
    if let Some(order) = orders
      .iter_mut()
      .find(|o| o.gateway_order_id == gateway_order_id && o.payment_status == PaymentStatus::Pending)
    {
      order.payment_status = PaymentStatus::Failed;
      order.updated_at = Utc::now();
    }
    Ok(())
  }

  async fn list_recent(&self, limit: i64) -> Result<Vec<Order>> {
    Ok(self.orders.lock().unwrap().iter().take(limit as usize).cloned().collect())
  }

  async fn apply_admin_patch(&self, id: &str, patch: &OrderAdminPatch) -> Result<Order> {
    let mut orders = self.orders.lock().unwrap();
    let order = orders
      .iter_mut()
      .find(|o| o.id == id)
      .ok_or_else(|| AppError::NotFound(format!("No order with id '{}'", id)))?;
    if let Some(f) = patch.fulfillment_status {
      order.fulfillment_status = f;
    }
    if let Some(p) = patch.payment_status {
      order.payment_status = p;
    }
    if let Some(ref shipping) = patch.shipping {
      let mut current = order.shipping_address.take().map(|j| j.0).unwrap_or_default();
      current.merge(shipping);
      order.shipping_address = Some(sqlx::types::Json(current));
    }
    order.updated_at = Utc::now();
    Ok(order.clone())
  }
}

pub struct FakeGateway {
  pub create_calls: AtomicUsize,
  pub fetch_calls: AtomicUsize,
  pub fail_create: bool,
  /// Status the gateway reports when a payment is fetched.
  pub payment_status: Mutex<String>,
  /// Gateway order the fetched payment claims to belong to, when set.
  pub payment_order_id: Mutex<Option<String>>,
}

impl Default for FakeGateway {
  fn default() -> Self {
    Self {
      create_calls: AtomicUsize::new(0),
      fetch_calls: AtomicUsize::new(0),
      fail_create: false,
      payment_status: Mutex::new("captured".to_string()),
      payment_order_id: Mutex::new(None),
    }
  }
}

impl FakeGateway {
  pub fn reporting(status: &str) -> Self {
    Self {
      payment_status: Mutex::new(status.to_string()),
      ..Default::default()
    }
  }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
  async fn create_order(
    &self,
    amount_minor: i64,
    currency: &str,
    receipt: &str,
    _notes: &GatewayNotes,
  ) -> Result<GatewayOrder> {
    self.create_calls.fetch_add(1, Ordering::SeqCst);
    if self.fail_create {
      return Err(AppError::Gateway {
        message: "BAD_REQUEST_ERROR: simulated rejection".into(),
        misconfigured: false,
      });
    }
    Ok(GatewayOrder {
      id: format!("order_fake_{}", receipt),
      amount: amount_minor,
      currency: currency.to_string(),
      status: "created".to_string(),
    })
  }

  async fn fetch_payment(&self, payment_id: &str) -> Result<GatewayPayment> {
    self.fetch_calls.fetch_add(1, Ordering::SeqCst);
    Ok(GatewayPayment {
      id: payment_id.to_string(),
      status: self.payment_status.lock().unwrap().clone(),
      order_id: self.payment_order_id.lock().unwrap().clone(),
    })
  }

  fn key_id(&self) -> &str {
    "rzp_test_fake"
  }
}

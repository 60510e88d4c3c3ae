// src/services/gateway.rs

//! Client for the Razorpay-style payment gateway.
//!
//! The orchestrator talks to the gateway only through the [`PaymentGateway`]
//! trait so tests can substitute an in-memory fake; the real implementation
//! is a thin reqwest wrapper constructed once at startup and shared.

use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// Gateway minor-unit bounds, per the gateway's published limits.
pub const MIN_AMOUNT_MINOR: i64 = 1;
pub const MAX_AMOUNT_MINOR: i64 = 99_999_999;

/// Customer metadata attached to a gateway order for reconciliation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GatewayNotes {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub customer_name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub customer_email: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub customer_phone: Option<String>,
}

/// The gateway's view of a created order (payment intent).
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayOrder {
  pub id: String,
  pub amount: i64,
  pub currency: String,
  pub status: String,
}

/// The gateway's live view of a payment.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayPayment {
  pub id: String,
  pub status: String,
  #[serde(default)]
  pub order_id: Option<String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
  /// Requests a payment intent for `amount_minor` in `currency`, tagged with
  /// the uniqueness `receipt` token and carrying customer `notes`.
  async fn create_order(
    &self,
    amount_minor: i64,
    currency: &str,
    receipt: &str,
    notes: &GatewayNotes,
  ) -> Result<GatewayOrder>;

  /// Fetches the live status of a payment by its gateway id.
  async fn fetch_payment(&self, payment_id: &str) -> Result<GatewayPayment>;

  /// The publishable key the client-side widget needs.
  fn key_id(&self) -> &str;
}

pub struct RazorpayGateway {
  http: reqwest::Client,
  base_url: String,
  key_id: String,
  key_secret: String,
}

#[derive(Serialize)]
struct CreateOrderBody<'a> {
  amount: i64,
  currency: &'a str,
  receipt: &'a str,
  notes: &'a GatewayNotes,
}

#[derive(Deserialize)]
struct GatewayErrorBody {
  error: Option<GatewayErrorDetail>,
}

#[derive(Deserialize)]
struct GatewayErrorDetail {
  #[serde(default)]
  code: Option<String>,
  #[serde(default)]
  description: Option<String>,
}

impl RazorpayGateway {
  pub fn new(base_url: &str, key_id: &str, key_secret: &str) -> Self {
    Self {
      http: reqwest::Client::new(),
      base_url: base_url.trim_end_matches('/').to_string(),
      key_id: key_id.to_string(),
      key_secret: key_secret.to_string(),
    }
  }

  fn unreachable_err(err: reqwest::Error) -> AppError {
    AppError::Gateway {
      message: format!("Gateway unreachable: {}", err),
      misconfigured: false,
    }
  }

  /// Maps a non-success gateway response to an AppError, preserving the
  /// credentials-vs-request distinction where the gateway provides it.
  async fn error_from_response(resp: reqwest::Response) -> AppError {
    let status = resp.status();
    let misconfigured = status == reqwest::StatusCode::UNAUTHORIZED;
    let detail = match resp.json::<GatewayErrorBody>().await {
      Ok(body) => body
        .error
        .map(|e| {
          format!(
            "{}: {}",
            e.code.unwrap_or_else(|| "UNKNOWN".into()),
            e.description.unwrap_or_default()
          )
        })
        .unwrap_or_else(|| format!("HTTP {}", status)),
      Err(_) => format!("HTTP {} (malformed error body)", status),
    };
    AppError::Gateway {
      message: detail,
      misconfigured,
    }
  }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
  #[instrument(name = "gateway::create_order", skip(self, notes))]
  async fn create_order(
    &self,
    amount_minor: i64,
    currency: &str,
    receipt: &str,
    notes: &GatewayNotes,
  ) -> Result<GatewayOrder> {
    let body = CreateOrderBody {
      amount: amount_minor,
      currency,
      receipt,
      notes,
    };
    let resp = self
      .http
      .post(format!("{}/orders", self.base_url))
      .basic_auth(&self.key_id, Some(&self.key_secret))
      .json(&body)
      .send()
      .await
      .map_err(Self::unreachable_err)?;

    if !resp.status().is_success() {
      return Err(Self::error_from_response(resp).await);
    }
    let order: GatewayOrder = resp.json().await.map_err(|e| AppError::Gateway {
      message: format!("Malformed gateway order response: {}", e),
      misconfigured: false,
    })?;
    info!(gateway_order_id = %order.id, "Gateway order created");
    Ok(order)
  }

  #[instrument(name = "gateway::fetch_payment", skip(self))]
  async fn fetch_payment(&self, payment_id: &str) -> Result<GatewayPayment> {
    let resp = self
      .http
      .get(format!("{}/payments/{}", self.base_url, payment_id))
      .basic_auth(&self.key_id, Some(&self.key_secret))
      .send()
      .await
      .map_err(Self::unreachable_err)?;

    if !resp.status().is_success() {
      return Err(Self::error_from_response(resp).await);
    }
    resp.json().await.map_err(|e| AppError::Gateway {
      message: format!("Malformed gateway payment response: {}", e),
      misconfigured: false,
    })
  }

  fn key_id(&self) -> &str {
    &self.key_id
  }
}

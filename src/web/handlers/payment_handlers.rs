// src/web/handlers/payment_handlers.rs

use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::services::payments::{self, CreateOrderRequest, VerifyPaymentRequest};
use crate::state::AppState;
use crate::web::guard::CurrentUser;

#[instrument(
  name = "handler::create_payment_order",
  skip(app_state, payload, current_user),
  fields(user_id = %current_user.user_id, amount = %payload.amount)
)]
pub async fn create_payment_order_handler(
  app_state: web::Data<AppState>,
  current_user: CurrentUser,
  payload: web::Json<CreateOrderRequest>,
) -> Result<HttpResponse, AppError> {
  info!("Checkout initiated by user {}", current_user.user_id);
  let mut req = payload.into_inner();
  // Fall back to the session email for reconciliation when the form left it out.
  if req.customer_email.is_none() {
    req.customer_email = Some(current_user.email.clone());
  }
  let session = payments::create_order(
    app_state.store.as_ref(),
    app_state.gateway.as_ref(),
    &app_state.config.currency,
    req,
  )
  .await?;
  Ok(HttpResponse::Created().json(session))
}

#[instrument(
  name = "handler::verify_payment",
  skip(app_state, payload, current_user),
  fields(user_id = %current_user.user_id, order_id = %payload.order_id)
)]
pub async fn verify_payment_handler(
  app_state: web::Data<AppState>,
  current_user: CurrentUser,
  payload: web::Json<VerifyPaymentRequest>,
) -> Result<HttpResponse, AppError> {
  payments::verify_payment(
    app_state.store.as_ref(),
    app_state.gateway.as_ref(),
    &app_state.config.gateway_key_secret,
    &payload,
  )
  .await?;
  Ok(HttpResponse::Ok().json(json!({"status": "completed", "orderId": payload.order_id})))
}

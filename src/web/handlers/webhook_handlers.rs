// src/web/handlers/webhook_handlers.rs

use actix_web::{web, HttpRequest, HttpResponse};
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::services::payments;
use crate::state::AppState;

const SIGNATURE_HEADER: &str = "x-razorpay-signature";

/// Gateway webhook receiver. Open route; trust comes from the body signature,
/// not from a session.
#[instrument(name = "handler::gateway_webhook", skip(app_state, req, body), fields(payload_len = body.len()))]
pub async fn gateway_webhook_handler(
  app_state: web::Data<AppState>,
  req: HttpRequest,
  body: web::Bytes,
) -> Result<HttpResponse, AppError> {
  let signature = req
    .headers()
    .get(SIGNATURE_HEADER)
    .and_then(|h| h.to_str().ok());

  payments::handle_gateway_event(
    app_state.store.as_ref(),
    &app_state.config.gateway_webhook_secret,
    &body,
    signature,
  )
  .await?;

  info!("Webhook acknowledged");
  Ok(HttpResponse::Ok().finish())
}

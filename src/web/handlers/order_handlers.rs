// src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::services::order_resolver;
use crate::state::AppState;
use crate::web::guard::CurrentUser;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackOrderRequest {
  pub order_id: String,
}

/// Anonymous "track by code" lookup. Accepts any identifier the customer has:
/// full order id, short printed code, or gateway reference.
#[instrument(name = "handler::track_order", skip(app_state, payload))]
pub async fn track_order_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<TrackOrderRequest>,
) -> Result<HttpResponse, AppError> {
  let found = order_resolver::resolve(app_state.store.as_ref(), &payload.order_id).await?;
  Ok(HttpResponse::Ok().json(found))
}

/// Authenticated "my order" view. Same resolution semantics as tracking.
#[instrument(name = "handler::my_order", skip(app_state, current_user), fields(user_id = %current_user.user_id))]
pub async fn my_order_handler(
  app_state: web::Data<AppState>,
  current_user: CurrentUser,
  order_id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  info!("Order lookup by user {}", current_user.user_id);
  let found = order_resolver::resolve(app_state.store.as_ref(), &order_id).await?;
  Ok(HttpResponse::Ok().json(found))
}

// src/web/handlers/admin_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::{info, instrument};

use crate::db::OrderAdminPatch;
use crate::errors::AppError;
use crate::state::AppState;
use crate::web::guard::CurrentUser;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
  pub limit: Option<i64>,
}

#[instrument(name = "handler::admin_list_orders", skip(app_state, current_user), fields(admin = %current_user.user_id))]
pub async fn list_orders_handler(
  app_state: web::Data<AppState>,
  current_user: CurrentUser,
  query: web::Query<ListQuery>,
) -> Result<HttpResponse, AppError> {
  let limit = query.limit.unwrap_or(50).clamp(1, 500);
  let orders = app_state.store.list_recent(limit).await?;
  Ok(HttpResponse::Ok().json(orders))
}

/// Back-office order update: fulfillment status, shipping extension fields
/// (merged, never replaced wholesale) and, as the administrative correction
/// path, payment status.
#[instrument(
  name = "handler::admin_update_order",
  skip(app_state, current_user, patch),
  fields(admin = %current_user.user_id)
)]
pub async fn update_order_handler(
  app_state: web::Data<AppState>,
  current_user: CurrentUser,
  order_id: web::Path<String>,
  patch: web::Json<OrderAdminPatch>,
) -> Result<HttpResponse, AppError> {
  let updated = app_state.store.apply_admin_patch(&order_id, &patch).await?;
  info!(order_id = %updated.id, "Order updated by back office");
  Ok(HttpResponse::Ok().json(updated))
}

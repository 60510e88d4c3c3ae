// src/web/routes.rs

use actix_web::web;

async fn health_check_handler() -> actix_web::HttpResponse {
  actix_web::HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

/// Configures all application routes under `/api/v1`. Authorization is
/// enforced by the [`SessionGuard`](crate::web::guard::SessionGuard)
/// middleware from its prefix tables, not per-route here.
pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  use crate::web::handlers::{admin_handlers, order_handlers, payment_handlers, webhook_handlers};

  cfg.service(
    web::scope("/api/v1")
      .route("/health", web::get().to(health_check_handler))
      .service(
        web::scope("/orders")
          .route("/track", web::post().to(order_handlers::track_order_handler))
          .route("/mine/{order_id}", web::get().to(order_handlers::my_order_handler)),
      )
      .service(
        web::scope("/payments")
          .route("/orders", web::post().to(payment_handlers::create_payment_order_handler))
          .route("/verify", web::post().to(payment_handlers::verify_payment_handler)),
      )
      .service(
        web::scope("/webhooks").route("/razorpay", web::post().to(webhook_handlers::gateway_webhook_handler)),
      )
      .service(
        web::scope("/admin").service(
          web::scope("/orders")
            .route("", web::get().to(admin_handlers::list_orders_handler))
            .route("/{order_id}", web::patch().to(admin_handlers::update_order_handler)),
        ),
      ),
  );
}

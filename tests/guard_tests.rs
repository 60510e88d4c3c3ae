// tests/guard_tests.rs

mod common;

use actix_web::cookie::Cookie;
use actix_web::{test, web, App};
use common::{fake_order, FakeGateway, InMemoryOrderStore};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use storefront::config::AppConfig;
use storefront::services::session::{issue_token, Role, SESSION_COOKIE_NAME};
use storefront::state::AppState;
use storefront::web::{configure_app_routes, SessionGuard};

const SECRET: &str = "integration-test-secret-32-bytes!!";

fn test_config() -> AppConfig {
  AppConfig {
    server_host: "127.0.0.1".into(),
    server_port: 0,
    database_url: "postgres://unused".into(),
    gateway_key_id: "rzp_test_fake".into(),
    gateway_key_secret: "rzp_secret_for_tests".into(),
    gateway_webhook_secret: "whsec_for_tests".into(),
    gateway_base_url: "http://unused".into(),
    currency: "INR".into(),
    session_secret: SECRET.into(),
    production: false,
  }
}

fn test_state(store: Arc<InMemoryOrderStore>, gateway: Arc<FakeGateway>) -> AppState {
  AppState {
    store,
    gateway,
    config: Arc::new(test_config()),
  }
}

fn session_cookie(role: Role) -> Cookie<'static> {
  let token = issue_token(SECRET, "user-42", "shopper@example.test", role);
  Cookie::new(SESSION_COOKIE_NAME, token)
}

#[actix_web::test]
async fn admin_route_without_cookie_is_unauthorized() {
  let store = Arc::new(InMemoryOrderStore::default());
  let gateway = Arc::new(FakeGateway::default());
  let app = test::init_service(
    App::new()
      .app_data(web::Data::new(test_state(store, gateway)))
      .wrap(SessionGuard)
      .configure(configure_app_routes),
  )
  .await;

  let resp = test::call_service(&app, test::TestRequest::get().uri("/api/v1/admin/orders").to_request()).await;
  assert_eq!(resp.status(), actix_web::http::StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn admin_route_with_customer_session_is_forbidden() {
  let store = Arc::new(InMemoryOrderStore::default());
  let gateway = Arc::new(FakeGateway::default());
  let app = test::init_service(
    App::new()
      .app_data(web::Data::new(test_state(store, gateway)))
      .wrap(SessionGuard)
      .configure(configure_app_routes),
  )
  .await;

  let req = test::TestRequest::get()
    .uri("/api/v1/admin/orders")
    .cookie(session_cookie(Role::Customer))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), actix_web::http::StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn admin_route_with_admin_session_succeeds() {
  let store = Arc::new(InMemoryOrderStore::default());
  let gateway = Arc::new(FakeGateway::default());
  let app = test::init_service(
    App::new()
      .app_data(web::Data::new(test_state(store, gateway)))
      .wrap(SessionGuard)
      .configure(configure_app_routes),
  )
  .await;

  let req = test::TestRequest::get()
    .uri("/api/v1/admin/orders")
    .cookie(session_cookie(Role::Admin))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), actix_web::http::StatusCode::OK);
}

#[actix_web::test]
async fn payment_route_without_cookie_never_reaches_the_handler() {
  let store = Arc::new(InMemoryOrderStore::default());
  let gateway = Arc::new(FakeGateway::default());
  let app = test::init_service(
    App::new()
      .app_data(web::Data::new(test_state(store.clone(), gateway.clone())))
      .wrap(SessionGuard)
      .configure(configure_app_routes),
  )
  .await;

  let req = test::TestRequest::post()
    .uri("/api/v1/payments/orders")
    .set_json(serde_json::json!({
      "amount": "100.00",
      "items": [{"productId": "p1", "productName": "Mug", "unitPrice": "100.00", "quantity": 1}]
    }))
    .to_request();
  let resp = test::call_service(&app, req).await;

  assert_eq!(resp.status(), actix_web::http::StatusCode::UNAUTHORIZED);
  assert_eq!(gateway.create_calls.load(Ordering::SeqCst), 0);
  assert!(store.orders.lock().unwrap().is_empty());
}

#[actix_web::test]
async fn open_routes_bypass_the_guard() {
  let store = Arc::new(InMemoryOrderStore::with_orders(vec![fake_order(
    "65a1b2c3d4e5f60718293a4b",
    "order_gw_1",
  )]));
  let gateway = Arc::new(FakeGateway::default());
  let app = test::init_service(
    App::new()
      .app_data(web::Data::new(test_state(store, gateway)))
      .wrap(SessionGuard)
      .configure(configure_app_routes),
  )
  .await;

  let resp = test::call_service(&app, test::TestRequest::get().uri("/api/v1/health").to_request()).await;
  assert_eq!(resp.status(), actix_web::http::StatusCode::OK);

  // Anonymous tracking by short code, no cookie involved.
  let req = test::TestRequest::post()
    .uri("/api/v1/orders/track")
    .set_json(serde_json::json!({"orderId": "18293A4B"}))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), actix_web::http::StatusCode::OK);
}

#[actix_web::test]
async fn garbage_cookie_counts_as_no_session() {
  let store = Arc::new(InMemoryOrderStore::default());
  let gateway = Arc::new(FakeGateway::default());
  let app = test::init_service(
    App::new()
      .app_data(web::Data::new(test_state(store, gateway)))
      .wrap(SessionGuard)
      .configure(configure_app_routes),
  )
  .await;

  let req = test::TestRequest::get()
    .uri("/api/v1/orders/mine/65a1b2c3d4e5f60718293a4b")
    .cookie(Cookie::new(SESSION_COOKIE_NAME, "zzzz.not-a-token"))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), actix_web::http::StatusCode::UNAUTHORIZED);
}

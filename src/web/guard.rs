// src/web/guard.rs

//! Cookie-session authorization middleware.
//!
//! Route classification is static and prefix-based. Admin routes need a valid
//! session with the admin role; a fixed set of other prefixes need any valid
//! session; everything else bypasses the guard. On success the verified
//! identity is injected into request extensions — handlers read it through
//! the [`CurrentUser`] extractor and never trust client-supplied identity
//! headers.

use crate::errors::AppError;
use crate::services::session::{self, Role, SESSION_COOKIE_NAME};
use crate::state::AppState;
use actix_web::body::EitherBody;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{web, Error, FromRequest, HttpMessage, HttpRequest, ResponseError};
use futures_util::future::{ready, LocalBoxFuture, Ready};
use std::rc::Rc;
use tracing::warn;

const ADMIN_PREFIXES: &[&str] = &["/api/v1/admin"];
const SESSION_PREFIXES: &[&str] = &["/api/v1/orders/mine", "/api/v1/payments"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
  /// Guard bypassed entirely.
  Open,
  /// Any valid session, role irrelevant.
  RequiresSession,
  /// Valid session with role admin.
  RequiresAdmin,
}

pub fn classify_route(path: &str) -> RouteClass {
  if ADMIN_PREFIXES.iter().any(|p| path.starts_with(p)) {
    RouteClass::RequiresAdmin
  } else if SESSION_PREFIXES.iter().any(|p| path.starts_with(p)) {
    RouteClass::RequiresSession
  } else {
    RouteClass::Open
  }
}

/// The verified identity of the requester, injected by [`SessionGuard`].
#[derive(Debug, Clone)]
pub struct CurrentUser {
  pub user_id: String,
  pub email: String,
  pub role: Role,
}

impl FromRequest for CurrentUser {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
    ready(
      req
        .extensions()
        .get::<CurrentUser>()
        .cloned()
        .ok_or_else(|| AppError::Auth("A valid session is required".to_string())),
    )
  }
}

pub struct SessionGuard;

impl<S, B> Transform<S, ServiceRequest> for SessionGuard
where
  S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
  S::Future: 'static,
  B: 'static,
{
  type Response = ServiceResponse<EitherBody<B>>;
  type Error = Error;
  type Transform = SessionGuardMiddleware<S>;
  type InitError = ();
  type Future = Ready<Result<Self::Transform, Self::InitError>>;

  fn new_transform(&self, service: S) -> Self::Future {
    ready(Ok(SessionGuardMiddleware {
      service: Rc::new(service),
    }))
  }
}

pub struct SessionGuardMiddleware<S> {
  service: Rc<S>,
}

impl<S> SessionGuardMiddleware<S> {
  /// Short-circuits the request with the error's HTTP response, without ever
  /// invoking the wrapped route handler.
  fn reject<B>(req: ServiceRequest, err: AppError) -> ServiceResponse<EitherBody<B>> {
    let (req, _payload) = req.into_parts();
    let response = err.error_response().map_into_right_body();
    ServiceResponse::new(req, response)
  }
}

impl<S, B> Service<ServiceRequest> for SessionGuardMiddleware<S>
where
  S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
  S::Future: 'static,
  B: 'static,
{
  type Response = ServiceResponse<EitherBody<B>>;
  type Error = Error;
  type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

  forward_ready!(service);

  fn call(&self, req: ServiceRequest) -> Self::Future {
    let class = classify_route(req.path());
    if class == RouteClass::Open {
      let fut = self.service.call(req);
      return Box::pin(async move { fut.await.map(|res| res.map_into_left_body()) });
    }

    let Some(state) = req.app_data::<web::Data<AppState>>() else {
      return Box::pin(ready(Ok(Self::reject(
        req,
        AppError::Config("AppState missing from request data".to_string()),
      ))));
    };
    let secret = state.config.session_secret.clone();

    // Expired, tampered and malformed tokens are deliberately
    // indistinguishable here: all of them are "no valid session".
    let claims = req
      .cookie(SESSION_COOKIE_NAME)
      .and_then(|c| session::verify_token(&secret, c.value()));

    let Some(claims) = claims else {
      warn!(path = %req.path(), "Request to guarded route without a valid session");
      return Box::pin(ready(Ok(Self::reject(
        req,
        AppError::Auth("A valid session is required".to_string()),
      ))));
    };

    if class == RouteClass::RequiresAdmin && claims.role != Role::Admin {
      warn!(path = %req.path(), user_id = %claims.sub, "Non-admin session on admin route");
      return Box::pin(ready(Ok(Self::reject(
        req,
        AppError::Forbidden("Administrator access is required".to_string()),
      ))));
    }

    req.extensions_mut().insert(CurrentUser {
      user_id: claims.sub,
      email: claims.email,
      role: claims.role,
    });
    let fut = self.service.call(req);
    Box::pin(async move { fut.await.map(|res| res.map_into_left_body()) })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn admin_prefix_requires_admin() {
    assert_eq!(classify_route("/api/v1/admin/orders"), RouteClass::RequiresAdmin);
    assert_eq!(classify_route("/api/v1/admin/orders/abc123"), RouteClass::RequiresAdmin);
  }

  #[test]
  fn session_prefixes_require_a_session() {
    assert_eq!(classify_route("/api/v1/orders/mine/abc123"), RouteClass::RequiresSession);
    assert_eq!(classify_route("/api/v1/payments/orders"), RouteClass::RequiresSession);
    assert_eq!(classify_route("/api/v1/payments/verify"), RouteClass::RequiresSession);
  }

  #[test]
  fn unclassified_routes_bypass_the_guard() {
    assert_eq!(classify_route("/api/v1/health"), RouteClass::Open);
    assert_eq!(classify_route("/api/v1/orders/track"), RouteClass::Open);
    assert_eq!(classify_route("/api/v1/webhooks/razorpay"), RouteClass::Open);
  }
}

// src/services/session.rs

//! Signed, time-bound session tokens carried in an httpOnly cookie.
//!
//! A token is `hex(claims_json) + "." + hex(hmac_sha256(secret, claims_json))`.
//! Nothing is persisted server-side; sign-out is cookie deletion on the
//! client and expiry is enforced by the `exp` claim. Verification failures of
//! any kind (bad signature, expired, malformed claims) collapse to `None` so
//! callers cannot tell them apart.

use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const SESSION_COOKIE_NAME: &str = "storefront_session";
pub const SESSION_TTL_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  Customer,
  Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
  /// User id.
  pub sub: String,
  pub email: String,
  pub role: Role,
  /// Issued-at, unix seconds.
  pub iat: i64,
  /// Expiry, unix seconds.
  pub exp: i64,
}

fn sign(secret: &str, payload: &[u8]) -> Vec<u8> {
  let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any size");
  mac.update(payload);
  mac.finalize().into_bytes().to_vec()
}

/// Issues a signed token valid for [`SESSION_TTL_DAYS`].
pub fn issue_token(secret: &str, user_id: &str, email: &str, role: Role) -> String {
  let now = Utc::now();
  let claims = Claims {
    sub: user_id.to_string(),
    email: email.to_string(),
    role,
    iat: now.timestamp(),
    exp: (now + Duration::days(SESSION_TTL_DAYS)).timestamp(),
  };
  let payload = serde_json::to_vec(&claims).expect("Claims serialize infallibly");
  format!("{}.{}", hex::encode(&payload), hex::encode(sign(secret, &payload)))
}

/// Verifies a token and returns its claims, or `None` for any failure.
pub fn verify_token(secret: &str, token: &str) -> Option<Claims> {
  let (payload_hex, signature_hex) = token.split_once('.')?;
  let payload = hex::decode(payload_hex).ok()?;
  let signature = hex::decode(signature_hex).ok()?;

  let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any size");
  mac.update(&payload);
  mac.verify_slice(&signature).ok()?;

  let claims: Claims = serde_json::from_slice(&payload).ok()?;
  if claims.exp <= Utc::now().timestamp() {
    return None;
  }
  Some(claims)
}

/// Builds the session cookie with the contract's attributes: httpOnly,
/// SameSite=Lax, Secure in production, 7-day lifetime.
pub fn build_session_cookie(token: String, production: bool) -> Cookie<'static> {
  Cookie::build(SESSION_COOKIE_NAME, token)
    .path("/")
    .http_only(true)
    .same_site(SameSite::Lax)
    .secure(production)
    .max_age(CookieDuration::days(SESSION_TTL_DAYS))
    .finish()
}

// src/web/mod.rs

pub mod guard;
pub mod handlers;
pub mod routes;

pub use guard::SessionGuard;
pub use routes::configure_app_routes;

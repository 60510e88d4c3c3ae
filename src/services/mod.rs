// src/services/mod.rs

//! Business services: order resolution, payment orchestration, the gateway
//! client, and session tokens.

pub mod gateway;
pub mod order_resolver;
pub mod payments;
pub mod session;

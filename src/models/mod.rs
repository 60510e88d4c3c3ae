// src/models/mod.rs

//! Contains data structures representing database entities.

pub mod order;
pub mod order_item;

pub use order::{new_order_id, FulfillmentStatus, Order, OrderWithItems, PaymentStatus, ShippingAddress, ORDER_ID_LEN};
pub use order_item::{NewOrderItem, OrderItem};

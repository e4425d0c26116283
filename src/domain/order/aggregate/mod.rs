//! Aggregates for the order bounded context.

mod order;

pub use order::{CreateOrderCommand, Order};

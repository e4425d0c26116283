//! The order bounded context: the Order aggregate, its lifecycle, and events.

pub mod aggregate;
pub mod errors;
pub mod events;
pub mod services;
pub mod value_objects;

pub use aggregate::{CreateOrderCommand, Order};
pub use errors::OrderError;
pub use events::OrderLifecycleEvent;
pub use services::OrderStateMachine;
pub use value_objects::{OrderSide, OrderStatus, OrderType, Product, ValidationReport, Validity};

//! Domain services for the order bounded context.

mod order_state_machine;

pub use order_state_machine::OrderStateMachine;

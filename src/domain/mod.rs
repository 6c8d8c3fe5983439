//! Domain layer: value types of the payment lifecycle and the ports the
//! orchestration core talks through.

pub mod money;
pub mod order;
pub mod payment;
pub mod ports;
pub mod problem;
pub mod transaction;

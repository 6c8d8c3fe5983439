//! Application layer: the payment orchestration core.
//!
//! [`core::Core`] is the entry point. Its operations are grouped by concern:
//! remote requests, payment lookups, order status, transaction classification,
//! capture/cancel/refund actions and the failed-order reconciliation loop.

pub mod actions;
pub mod core;
pub mod order_status;
pub mod payment_info;
pub mod reconcile;
pub mod request;
pub mod transactions;

//! # Payments
//!
//! Hosted-checkout subscriptions through Stripe, plus the signed webhook that
//! reports checkout completions, renewals and cancellations back to us.

pub mod events;
pub mod gateway;
pub mod handlers;
pub mod plans;
pub mod signature;
pub mod store;

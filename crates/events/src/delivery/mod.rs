//! Outbound delivery channels: SMTP email and chat webhooks.
//!
//! Both are traits so the alerter and notifier can be driven by
//! recording fakes in tests.

pub mod email;
pub mod webhook;

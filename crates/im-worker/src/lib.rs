//! # im-worker
//!
//! Durable push delivery: drains the push job stream through a consumer
//! group, deduplicates per recipient, drives FCM, and applies
//! exponential-backoff retry with dead-lettering.

pub mod consumer;
pub mod fcm;

pub use consumer::PushConsumer;
pub use fcm::{FcmClient, PushError, PushProvider, SendOutcome};

//! # im-gateway
//!
//! WebSocket gateway: authenticates connections, subscribes them to
//! threads, bridges sends to the API, and fans broadcasts out to local
//! subscribers.

pub mod client;
pub mod connection;
pub mod handlers;
pub mod protocol;
pub mod server;

pub use server::run;

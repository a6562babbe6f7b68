//! # im-service
//!
//! Application layer containing the message write path, thread operations,
//! and DTOs.
//!
//! ## Services
//!
//! - [`MessageService`] - idempotent message creation and push enqueue
//! - [`ThreadService`] - permission checks, read cursors, ensure, history
//!
//! Request types validate with the `validator` crate; response types
//! serialize with `serde`.

pub mod dto;
pub mod services;

// Re-export DTOs
pub use dto::{
    CreateMessageRequest, EnsureThreadRequest, MemberSpec, MessageCreatedResponse,
    MessageHistoryResponse, MessageResponse, PermissionResponse, ReadRequest, ReadResponse,
    ThreadResponse,
};

// Re-export services
pub use services::{
    MessageHistory, MessageService, ServiceContext, ServiceContextBuilder, ServiceError,
    ServiceResult, ThreadService,
};

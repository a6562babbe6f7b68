//! Request and response DTOs

mod requests;
mod responses;

pub use requests::{CreateMessageRequest, EnsureThreadRequest, MemberSpec, ReadRequest};
pub use responses::{
    MessageCreatedResponse, MessageHistoryResponse, MessageResponse, PermissionResponse,
    ReadResponse, ThreadResponse,
};

//! Domain entities

mod device_token;
mod message;
mod thread;

pub use device_token::{DeviceToken, Platform};
pub use message::{push_preview, Message, MessageReceipt, MessageType, NewMessage};
pub use thread::{MemberRole, Thread, ThreadMember, ThreadStatus, ThreadType};

//! Database row models with SQLx `FromRow` derives

mod message;
mod thread;

pub use message::MessageModel;
pub use thread::{ThreadMemberModel, ThreadModel};

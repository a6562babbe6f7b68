//! Repository traits implemented by the storage layer

mod repositories;

pub use repositories::{
    AppendOutcome, DeviceTokenRepository, EnsureThread, MessageQuery, MessageRepository,
    NewThreadMember, RepoResult, ThreadRepository,
};

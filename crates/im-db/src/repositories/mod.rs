//! PostgreSQL repository implementations

mod device_token;
mod error;
mod message;
mod thread;

pub use device_token::PgDeviceTokenRepository;
pub use message::PgMessageRepository;
pub use thread::PgThreadRepository;

pub(crate) use error::{is_unique_violation, map_db_error};

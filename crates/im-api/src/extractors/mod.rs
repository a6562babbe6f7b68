//! Request extractors

mod auth;
mod trace;
mod validated;

pub use auth::AuthUser;
pub use trace::{Trace, TRACE_HEADER};
pub use validated::ValidatedJson;

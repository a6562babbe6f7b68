//! Token verification utilities

mod jwt;

pub use jwt::{extract_bearer, Claims, JwtService};

//! Trace id generation
//!
//! Every inbound request or frame either echoes the caller's trace id or
//! gets a freshly generated one.

/// Generate a new trace id
#[must_use]
pub fn new_trace_id() -> String {
    format!("trace_{}", uuid::Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_ids_are_unique() {
        let a = new_trace_id();
        let b = new_trace_id();
        assert!(a.starts_with("trace_"));
        assert_ne!(a, b);
    }
}

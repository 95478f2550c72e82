//! Tracking-ID generation for provisioning calls.
//!
//! Caller-assigned token, distinct from the correlation ID the remote
//! attaches. One fresh ID per CLI invocation or HTTP request.

use uuid::Uuid;

pub fn new_tracking_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(new_tracking_id(), new_tracking_id());
    }

    #[test]
    fn test_id_shape() {
        let id = new_tracking_id();
        assert_eq!(id.len(), 36);
        assert_eq!(id.matches('-').count(), 4);
    }
}

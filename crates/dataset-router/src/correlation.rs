//! Correlation ID generation for request tracing.

use uuid::Uuid;

/// Generate a new correlation ID (UUID v4) for one inbound request.
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

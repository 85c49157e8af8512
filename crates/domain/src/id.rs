//! ID generation utilities.

use uuid::Uuid;

/// Generates a new UUID v7 as a string.
///
/// Every outgoing request is tagged with one of these so that a request,
/// its 401, and its replay can be correlated in the logs.
#[must_use]
pub fn generate_id_v7() -> String {
    Uuid::now_v7().to_string()
}

//! Topic names and key discipline. Key = ASCII decimal `check_id` for both
//! topics, so all events for one check land in the same partition and are
//! strictly ordered relative to each other.

pub const CHECKS_REQUEST_TOPIC: &str = "checks.request";
pub const STATUS_CHANGE_TOPIC: &str = "status.change";

#[must_use]
pub fn partition_key(check_id: i64) -> String {
    check_id.to_string()
}

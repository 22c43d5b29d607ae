/// Entity identifiers are prefixed strings, e.g. `reg_0192f3...`.
pub type EntityId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Generate a new identifier with the given prefix.
///
/// The suffix is a UUIDv7 so identifiers sort roughly by creation time.
pub fn generate_id(prefix: &str) -> EntityId {
    format!("{prefix}_{}", uuid::Uuid::now_v7().simple())
}

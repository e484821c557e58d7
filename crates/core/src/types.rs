use std::collections::BTreeMap;

/// All entity primary keys are UUIDs.
pub type DbId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Free-form key/value labels stored as a JSONB object.
pub type Labels = BTreeMap<String, String>;

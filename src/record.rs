// Record trait for rows persisted to JSONL snapshots

use crate::models::Task;
use serde::{Serialize, de::DeserializeOwned};

/// Anything that can be written as one JSONL line and deduplicated on read
pub trait Record: Serialize + DeserializeOwned + Clone {
    /// Unique identifier for this record
    fn id(&self) -> &str;

    /// Timestamp when this record was last updated (milliseconds since epoch)
    ///
    /// When the same id appears more than once, the highest value wins.
    fn updated_at(&self) -> i64;
}

impl Record for Task {
    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn updated_at(&self) -> i64 {
        self.updated_at
    }
}

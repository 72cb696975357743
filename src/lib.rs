// TaskForest - Hierarchical task store with derived view queries

pub mod clock;
pub mod config;
pub mod error;
pub mod filter;
pub mod forest;
pub mod jsonl;
pub mod models;
pub mod record;
pub mod seed;
pub mod stats;
pub mod store;

// Re-export main types for convenience
pub use clock::{Clock, FixedClock, SystemClock, now_ms};
pub use error::StoreError;
pub use filter::{SortOption, TaskFilter};
pub use forest::{Forest, TaskTree, Timeline};
pub use models::{NewTask, Priority, Status, Task, TaskId, TaskUpdate};
pub use record::Record;
pub use stats::DashboardStats;
pub use store::{Snapshot, SubscriptionId, TaskStore};

pub mod cli;
pub mod config;
pub mod debounce;
pub mod filter;
pub mod filter_store;
pub mod form;
pub mod logging;
pub mod models;
pub mod notify;
pub mod search;
pub mod storage;
pub mod task_store;
pub mod tracker;
pub mod tui;
pub mod utils;

pub use config::Config;
pub use filter::{DateRange, FilterCriteria, StatusFilter};
pub use filter_store::FilterStore;
pub use models::{Priority, Task, TaskId};
pub use storage::{MemoryStorage, SnapshotStorage, SqliteStorage};
pub use task_store::TaskStore;
pub use tracker::Tracker;
pub use utils::Profile;

pub mod database;
pub mod error;
pub mod file;
pub mod memory;
pub mod snapshot;
pub mod sqlite;

pub use database::Database;
pub use error::StoreError;
pub use file::FileSnapshotStore;
pub use memory::MemorySnapshotStore;
pub use snapshot::SnapshotStore;
pub use sqlite::SqliteSnapshotStore;

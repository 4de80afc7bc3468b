pub mod entry;
pub mod store;

pub use entry::PendingEntry;
pub use store::{FileLedger, PENDING_FILE_NAME};

mod archiver;
mod json_ld;
mod store;

pub use archiver::CardArchiver;
pub use store::{write_atomic, SnapshotStore};

pub mod connection;
pub mod runs;
pub mod sink;

pub use connection::{init_db, Database};
pub use sink::Sink;

mod connection;
pub mod repository;

pub use connection::{check_health, create_pool};
pub use repository::{Fields, Record, Value};

// Library root for the pick pool engine: game keys, side resolution,
// grading, the event log, and the latest-wins projection over it.

pub mod db;
pub mod error;
pub mod game_key;
pub mod grading;
pub mod import;
pub mod model;
pub mod pool;
pub mod projection;
pub mod side;
pub mod standings;
pub mod store;

pub use db::Database;
pub use error::{PoolError, PoolResult};
pub use pool::PickPool;
pub use store::{EventLog, MemoryLog};

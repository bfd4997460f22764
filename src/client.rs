//! Request manager: the coordinator between callers, the cache, the pending table and the
//! transport.

mod builder;
mod core;
mod execution;
mod methods;
mod options;
mod pending;

pub use builder::RequestManagerBuilder;
pub use self::core::{Outcome, RequestManager};
pub use options::{CacheOptions, RequestExtras, RequestOptions, Upload};
pub use pending::{PendingStats, PendingTable, Slot};

pub mod agreements;
pub mod clock;
pub mod config;
pub mod error;
pub mod ledger;
pub mod lifecycle;
pub mod snapshot;
pub mod types;
pub mod users;

pub use error::{ErrorKind, LendingError};
pub use lifecycle::LifecycleEngine;
pub use snapshot::PlatformSnapshot;
pub use types::*;

/// Standard result type for all lending operations
pub type LendingResult<T> = Result<T, LendingError>;

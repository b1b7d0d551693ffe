//! Session registry: token blacklist and per-user refresh bookkeeping.

pub mod cleanup;
pub mod store;

pub use cleanup::RegistryCleanup;
pub use store::{CleanupReport, RegistryStats, SessionRegistry};

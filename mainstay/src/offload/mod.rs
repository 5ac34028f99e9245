//! Background task execution for stale-entry revalidation.

mod manager;

pub use manager::{OffloadConfig, OffloadKey, OffloadManager};

//! Background jobs.

pub mod cleanup_locations;
pub mod offline_sweep;
pub mod scheduler;

pub use cleanup_locations::CleanupLocationsJob;
pub use offline_sweep::OfflineSweepJob;
pub use scheduler::{Job, JobFrequency, JobScheduler};

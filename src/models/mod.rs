//! Data models and structures for the speed test client

pub mod config;
pub mod measurement;
pub mod report;
pub mod server;

// Re-export main model types
pub use config::Config;
pub use measurement::{MeasurementRecord, PingJob, PingResult, ProbeOutcome, ResultPair, SkipReason};
pub use report::{FamilyInfo, RunReport};
pub use server::ServerDescriptor;

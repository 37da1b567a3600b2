//! Regional health probing and DNS failover control
//!
//! Each region is probed by its own independently scheduled task; debounced
//! classifications flow through one channel into the failover controller,
//! which serializes decision evaluation and drives the DNS updater and the
//! registry's active-region notification.

pub mod controller;
pub mod history;
pub mod prober;
pub mod tracker;

pub use controller::{ControllerState, FailoverController};
pub use history::FailoverLog;
pub use prober::{HealthProber, HealthReport, ProberConfig};
pub use tracker::{ProbeOutcome, RegionHealthTracker};

//! Long-lived view state: timers, token tracking, form submission and the
//! admin dashboard, each publishing through a `watch` channel.

mod dashboard;
mod registration;
mod scheduler;
mod tracker;

pub use dashboard::{DashboardAggregator, DashboardState};
pub use registration::{RegistrationFlow, RegistrationState};
pub use scheduler::{PollingOptions, PollingScheduler, DEFAULT_INTERVAL};
pub use tracker::{TokenStatusTracker, TrackerState};

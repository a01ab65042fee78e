pub mod config;
pub mod logging;
pub mod queue_client;
pub mod sync;
pub mod types;

#[cfg(test)]
mod test_support;

pub use config::Config;
pub use types::{AggregationError, ClientError, NetworkError, NetworkErrorKind, ValidationError};

mod endpoints;
mod types;

pub use endpoints::{Endpoint, DEFAULT_DEPARTMENT};
pub use types::RegisterPatientBody;

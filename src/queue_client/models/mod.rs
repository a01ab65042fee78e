mod dashboard;
mod prediction;
mod registration;
mod token;

pub use dashboard::{
    Alert, AlertFeed, DashboardSnapshot, DoctorAvailability, DoctorStatus, Insight, Insights,
    OpdLoad,
};
pub use prediction::CrowdPrediction;
pub use registration::{RegistrationForm, RegistrationReceipt, RegistrationRequest};
pub use token::{TokenId, TokenStatusSnapshot};

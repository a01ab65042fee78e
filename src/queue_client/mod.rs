mod api;
mod client;
mod core;
mod gateway;
mod helpers;
mod models;

pub use api::{Endpoint, DEFAULT_DEPARTMENT};
pub use client::QueueClient;
pub use self::core::DataAggregator;
pub use gateway::{Gateway, HttpGateway};
pub use models::{
    Alert, AlertFeed, CrowdPrediction, DashboardSnapshot, DoctorAvailability, DoctorStatus,
    Insight, Insights, OpdLoad, RegistrationForm, RegistrationReceipt, RegistrationRequest,
    TokenId, TokenStatusSnapshot,
};

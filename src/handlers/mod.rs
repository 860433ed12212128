//! API handlers for the fraud detection service

pub mod fraud;
pub mod health;

pub use fraud::check_fraud;
pub use health::{health_check, service_info};

//! Admission Module
//!
//! Sliding-window admission control for outbound requests.

mod controller;
mod policy;
mod window;

pub use controller::{AdmissionController, UsageStats, DEFAULT_CLIENT_ID};
pub use policy::{EndpointPolicy, DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW_MS};
pub use window::AdmissionWindow;

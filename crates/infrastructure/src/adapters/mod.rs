//! Adapter implementations of the application ports.

pub mod http;
mod management_api;
mod system_clock;

pub use management_api::ManagementApiClient;
pub use system_clock::SystemClock;

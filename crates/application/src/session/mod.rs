//! Session lifecycle orchestration.

mod controller;
mod settings;

pub use controller::SessionController;
pub use settings::SessionSettings;

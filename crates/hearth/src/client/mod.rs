//! Home-control clients.

pub mod demo;
pub mod home_assistant;

pub use demo::DemoHome;
pub use home_assistant::HassControl;

pub mod args;
pub mod clicker;
pub mod config;
pub mod controller;
pub mod input;
pub mod logging;
pub mod recorder;

pub use clicker::ImageClicker;
pub use config::Settings;
pub use controller::Controller;

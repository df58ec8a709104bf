// slp2mp4-gui - Desktop front end for the slp2mp4 replay converter
//
// This is the library crate containing the session logic, the converter process
// supervisor and the configuration store.
// The binary crate (main.rs) provides the GUI entry point.

pub mod config;
pub mod logging;
pub mod models;
pub mod services;
pub mod session;
pub mod ui;

// Re-export commonly used types for convenience
pub use config::{ConfigManager, ResourceLayout};
pub use models::{AppConfig, ConversionEvent, ConversionRequest, SettingsForm};
pub use services::{ConversionHandle, ConversionService, ConverterCommand};
pub use session::{SessionChange, SessionError, SessionManager};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

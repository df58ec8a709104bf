//! Data models for the slp2mp4 desktop shell.
//!
//! This module contains the core data structures used throughout the application:
//! - [`AppConfig`]: The converter settings persisted in `config.json`
//! - [`SettingsForm`]: The settings window's view of [`AppConfig`] with defaults applied
//! - [`ConversionRequest`]: Directories and upload options for one converter run
//! - [`ConversionEvent`]: The typed event stream produced by one converter run
//! - [`SessionState`]: Form state, progress log and supervisor phase of the session
//!
//! # Architecture Note
//!
//! The models are designed to be:
//! - **Serializable**: [`AppConfig`] derives `Serialize`/`Deserialize` for JSON persistence
//! - **Cloneable**: SessionState is wrapped in `Arc<RwLock<>>` by [`SessionManager`](crate::session::SessionManager)
//! - **Framework-agnostic**: No Slint types, the UI layer converts at its boundary

pub mod config;
pub mod conversion;
pub mod session_state;

pub use config::{AppConfig, ParallelGames, SettingsForm};
pub use conversion::{
    ConversionEvent, ConversionRequest, Privacy, SupervisorState, UnknownPrivacy, YoutubeOptions,
    parse_tags,
};
pub use session_state::{SessionState, YoutubeForm};

// UI module - Slint windows and the event loop bridge
//
// This module contains:
// - UiBridge: Coordinates between the tokio runtime and the Slint event loop
// - GuiController: Wires the main and settings windows to the session and converter

pub mod bridge;
pub mod controller;

pub use bridge::UiBridge;
pub use controller::GuiController;

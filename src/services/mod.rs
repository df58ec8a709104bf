//! Services module - Process supervision for the external converter.
//!
//! This module contains the business logic that launches the slp2mp4 converter and
//! relays what it prints. The services are **framework-agnostic** and have no
//! dependencies on the UI layer, so they can be driven from tests or a headless caller.
//!
//! # Components
//!
//! - [`ConversionService`]: The process supervisor. Handles:
//!   - Building the converter argument list from a [`ConversionRequest`](crate::models::ConversionRequest)
//!   - Spawning one child process per run with piped stdout/stderr
//!   - Forwarding output chunks as [`ConversionEvent`](crate::models::ConversionEvent)s
//!   - Reporting the raw exit code, or a sentinel code on spawn failure or cancellation
//!
//! - [`ConverterCommand`]: Where the converter lives (bundled executable or Python script)
//!
//! - [`ConversionHandle`]: The typed event stream of one run plus its cancel switch
//!
//! # Usage Example
//!
//! ```ignore
//! use slp2mp4_gui::services::{ConversionService, ConverterCommand};
//!
//! let service = ConversionService::new(ConverterCommand::new("slp2mp4"));
//! let mut handle = service.start(&runtime_handle, request);
//!
//! while let Some(event) = handle.next_event().await {
//!     println!("{:?}", event);
//! }
//! ```

pub mod conversion;

pub use conversion::{
    CANCELLED_EXIT_CODE, ConversionCanceller, ConversionError, ConversionHandle, ConversionService,
    ConverterCommand, SPAWN_FAILED_EXIT_CODE,
};

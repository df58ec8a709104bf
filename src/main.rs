//! slp2mp4-gui - Desktop front end for the slp2mp4 replay converter
//!
//! Main entry point for the GUI application.
//!
//! # Overview
//!
//! This binary crate provides the Slint GUI frontend. It initializes:
//! - Logging infrastructure (file rotation + console output)
//! - Tokio async runtime (converter supervision)
//! - Resource layout detection (bundled converter or development checkout)
//! - Session management ([`SessionManager`])
//! - GUI controller ([`GuiController`] - bridges Slint UI with the session)
//!
//! The application uses a hybrid threading model:
//! - **Main thread**: Runs the Slint event loop (blocking, synchronous)
//! - **Tokio workers**: Spawn the converter and forward its output
//!
//! # Execution Flow
//!
//! 1. Initialize logging → logs/slp2mp4-gui.<date>
//! 2. Create tokio runtime
//! 3. Detect where the converter and `config.json` live
//! 4. Create SessionManager, ConfigManager and ConversionService
//! 5. Create GuiController and run the Slint event loop until the window closes
//! 6. Cancel a running conversion and shut the runtime down with a 5s timeout

use anyhow::Result;
use slp2mp4_gui::logging::{self, LogSettings};
use slp2mp4_gui::ui::GuiController;
use slp2mp4_gui::{
    APP_NAME, ConfigManager, ConversionService, ResourceLayout, SessionManager, VERSION,
};
use std::sync::Arc;
use std::time::Duration;

const WORKER_THREADS: usize = 2;

fn main() -> Result<()> {
    // Held until exit so buffered log lines are flushed
    let _log_guard = logging::init(&LogSettings::default())?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(WORKER_THREADS)
        .thread_name("slp2mp4-worker")
        .build()?;

    tracing::info!("Tokio runtime initialized with {} worker threads", WORKER_THREADS);

    let layout = ResourceLayout::from_environment()?;

    let session = Arc::new(SessionManager::new());
    let config_manager = Arc::new(ConfigManager::new(&layout.config_path));
    let service = Arc::new(ConversionService::new(layout.converter.clone()));

    let gui_controller = GuiController::new(
        Arc::clone(&session),
        config_manager,
        service,
        runtime.handle().clone(),
    )?;

    tracing::info!("GUI controller initialized, launching window");

    // Blocks until the main window is closed
    let result = gui_controller.run();

    tracing::info!("GUI closed, shutting down");

    if session.shutdown() {
        // Give the supervisor a moment to kill the converter
        std::thread::sleep(Duration::from_millis(500));
    }

    drop(gui_controller);
    runtime.shutdown_timeout(Duration::from_secs(5));

    tracing::info!("Application shutdown complete");

    result.map_err(|e| {
        tracing::error!("GUI error: {}", e);
        anyhow::anyhow!("GUI error: {}", e)
    })
}

// GUI Controller - Bridges the Slint windows with the session and the converter
//
// This module contains the GuiController which coordinates between:
// - Slint UI (MainWindow, SettingsWindow)
// - SessionManager (form state, progress log, active conversion)
// - ConversionService (process supervisor)
// - ConfigManager (config.json)
//
// It handles:
// - Setting up UI callbacks → session operations and async tasks
// - Subscribing to session changes → UI updates
// - Folder and file dialogs
// - The settings window

use crate::config::ConfigManager;
use crate::models::{AppConfig, SessionState, SettingsForm, SupervisorState, YoutubeForm};
use crate::services::ConversionService;
use crate::session::{SessionChange, SessionManager};
use crate::ui::bridge::UiBridge;
use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

// Include the generated Slint code
slint::include_modules!();

/// Extensions offered by the Melee ISO picker
const DISC_IMAGE_EXTENSIONS: &[&str] = &["iso", "gcm", "ciso"];

/// GUI Controller that wires up the Slint windows with the session and converter
///
/// Owns the main window and, once opened, the settings window. The session it
/// is given owns the zero-or-one active conversion.
///
/// # Example
/// ```ignore
/// let session = Arc::new(SessionManager::new());
/// let controller = GuiController::new(session, config_manager, service, runtime.handle().clone())?;
/// controller.run()?;  // Blocks until the main window is closed
/// ```
pub struct GuiController {
    /// The main Slint window
    ui: MainWindow,

    /// Settings window, created the first time it is opened
    _settings: Rc<RefCell<Option<SettingsWindow>>>,
}

impl GuiController {
    /// Create a new GUI controller
    ///
    /// Must be called on the thread that will run the Slint event loop.
    pub fn new(
        session: Arc<SessionManager>,
        config_manager: Arc<ConfigManager>,
        service: Arc<ConversionService>,
        tokio_handle: tokio::runtime::Handle,
    ) -> Result<Self> {
        let ui = MainWindow::new().context("Failed to create main window")?;
        let bridge = UiBridge::new(&ui, tokio_handle);

        Self::sync_ui_with_session(&ui, &session.snapshot());

        Self::setup_directory_callbacks(&ui, &session);
        Self::setup_conversion_callbacks(&ui, &bridge, &session, &service);

        let settings = Rc::new(RefCell::new(None));
        Self::setup_settings_callback(&ui, &settings, &config_manager);

        Self::setup_session_subscription(&bridge, &session);

        tracing::info!("GUI controller initialized");

        Ok(Self {
            ui,
            _settings: settings,
        })
    }

    /// Run the GUI (blocks until the main window is closed)
    pub fn run(&self) -> Result<(), slint::PlatformError> {
        tracing::info!("Starting GUI event loop");
        self.ui.run()
    }

    /// Copy the whole session into the main window
    fn sync_ui_with_session(ui: &MainWindow, state: &SessionState) {
        ui.set_input_path_label(Self::directory_label("Input", state.input_directory.as_ref()).into());
        ui.set_output_path_label(
            Self::directory_label("Output", state.output_directory.as_ref()).into(),
        );
        ui.set_is_converting(state.supervisor.is_running());
        ui.set_log_text(state.log.clone().into());
    }

    fn directory_label(kind: &str, path: Option<&Utf8PathBuf>) -> String {
        match path {
            Some(path) => format!("{}: {}", kind, path),
            None => format!("{}: (not selected)", kind),
        }
    }

    fn setup_directory_callbacks(ui: &MainWindow, session: &Arc<SessionManager>) {
        let state = Arc::clone(session);
        ui.on_select_input_directory(move || {
            tracing::debug!("Select input directory clicked");
            if let Some(path) = Self::show_folder_picker("Select Input Directory") {
                state.set_input_directory(path);
            }
        });

        let state = Arc::clone(session);
        ui.on_select_output_directory(move || {
            tracing::debug!("Select output directory clicked");
            if let Some(path) = Self::show_folder_picker("Select Output Directory") {
                state.set_output_directory(path);
            }
        });
    }

    fn setup_conversion_callbacks(
        ui: &MainWindow,
        bridge: &UiBridge<MainWindow>,
        session: &Arc<SessionManager>,
        service: &Arc<ConversionService>,
    ) {
        let bridge_for_start = bridge.clone();
        let state = Arc::clone(session);
        let service = Arc::clone(service);
        let ui_weak = ui.as_weak();

        ui.on_start_conversion(move || {
            tracing::info!("Start conversion button clicked");

            let Some(ui) = ui_weak.upgrade() else {
                return;
            };

            state.set_youtube_form(Self::read_youtube_form(&ui));

            match state.start_conversion(&service, bridge_for_start.runtime()) {
                Ok(handle) => {
                    let state = Arc::clone(&state);
                    bridge_for_start.spawn(async move {
                        match state.pump_events(handle).await {
                            Some(0) => tracing::info!("Conversion completed successfully"),
                            Some(code) => tracing::warn!("Conversion completed with exit code {}", code),
                            None => tracing::error!("Conversion ended without a completion event"),
                        }
                    });
                }
                Err(e) => {
                    Self::show_message_dialog(&ui, "Cannot start conversion", e.to_string());
                }
            }
        });

        let state = Arc::clone(session);
        ui.on_cancel_conversion(move || {
            tracing::info!("Cancel conversion button clicked");
            if !state.cancel_conversion() {
                tracing::debug!("No conversion to cancel");
            }
        });
    }

    fn read_youtube_form(ui: &MainWindow) -> YoutubeForm {
        YoutubeForm {
            enabled: ui.get_youtube_enabled(),
            title_template: ui.get_youtube_title_template().to_string(),
            description: ui.get_youtube_description().to_string(),
            tags: ui.get_youtube_tags().to_string(),
            privacy: ui.get_youtube_privacy().to_string(),
        }
    }

    /// Wire the Settings button
    ///
    /// The settings window is created on first use and reloaded from disk
    /// every time it is opened.
    fn setup_settings_callback(
        ui: &MainWindow,
        settings: &Rc<RefCell<Option<SettingsWindow>>>,
        config_manager: &Arc<ConfigManager>,
    ) {
        let settings = Rc::clone(settings);
        let config_manager = Arc::clone(config_manager);
        let loaded = Rc::new(RefCell::new(AppConfig::default()));
        let ui_weak = ui.as_weak();

        ui.on_open_settings(move || {
            tracing::info!("Settings button clicked");

            let mut slot = settings.borrow_mut();
            if slot.is_none() {
                match SettingsWindow::new() {
                    Ok(window) => {
                        Self::wire_settings_window(
                            &window,
                            ui_weak.clone(),
                            Arc::clone(&config_manager),
                            Rc::clone(&loaded),
                        );
                        *slot = Some(window);
                    }
                    Err(e) => {
                        tracing::error!("Failed to create settings window: {}", e);
                        return;
                    }
                }
            }

            let Some(window) = slot.as_ref() else {
                return;
            };

            let config = config_manager.load_config().unwrap_or_else(|e| {
                tracing::error!("Error reading config file: {:#}", e);
                AppConfig::default()
            });
            Self::populate_settings(window, &SettingsForm::from_config(&config));
            *loaded.borrow_mut() = config;

            window.set_status_text("".into());
            if let Err(e) = window.show() {
                tracing::error!("Failed to show settings window: {}", e);
            }
        });
    }

    fn wire_settings_window(
        window: &SettingsWindow,
        main_weak: slint::Weak<MainWindow>,
        config_manager: Arc<ConfigManager>,
        loaded: Rc<RefCell<AppConfig>>,
    ) {
        let window_weak = window.as_weak();
        window.on_save_settings(move || {
            let Some(window) = window_weak.upgrade() else {
                return;
            };

            let config = Self::read_settings_form(&window).into_config(&loaded.borrow());

            match config_manager.save_config(&config) {
                Ok(()) => {
                    *loaded.borrow_mut() = config;
                    if let Err(e) = window.hide() {
                        tracing::warn!("Failed to hide settings window: {}", e);
                    }
                    if let Some(ui) = main_weak.upgrade() {
                        Self::show_message_dialog(
                            &ui,
                            "Settings",
                            "Configuration saved successfully!",
                        );
                    }
                }
                Err(e) => {
                    tracing::error!("Error writing config file: {:#}", e);
                    window.set_status_text("Error saving configuration. Please try again.".into());
                }
            }
        });

        let window_weak = window.as_weak();
        window.on_browse_melee_iso(move || {
            if let (Some(window), Some(path)) = (
                window_weak.upgrade(),
                Self::show_file_picker("Select Melee ISO", vec![("Disc images", DISC_IMAGE_EXTENSIONS)]),
            ) {
                window.set_melee_iso(path.as_str().into());
            }
        });

        let window_weak = window.as_weak();
        window.on_browse_dolphin_dir(move || {
            if let (Some(window), Some(path)) = (
                window_weak.upgrade(),
                Self::show_folder_picker("Select Dolphin Directory"),
            ) {
                window.set_dolphin_dir(path.as_str().into());
            }
        });

        let window_weak = window.as_weak();
        window.on_browse_ffmpeg(move || {
            if let (Some(window), Some(path)) = (
                window_weak.upgrade(),
                Self::show_file_picker("Select FFmpeg Executable", Vec::new()),
            ) {
                window.set_ffmpeg(path.as_str().into());
            }
        });
    }

    fn populate_settings(window: &SettingsWindow, form: &SettingsForm) {
        window.set_melee_iso(form.melee_iso.as_str().into());
        window.set_dolphin_dir(form.dolphin_dir.as_str().into());
        window.set_ffmpeg(form.ffmpeg.as_str().into());
        window.set_resolution(form.resolution.as_str().into());
        window.set_video_backend(form.video_backend.as_str().into());
        window.set_widescreen(form.widescreen);
        window.set_bitrate_kbps(form.bitrate_kbps.as_str().into());
        window.set_parallel_games(form.parallel_games.as_str().into());
        window.set_remove_short(form.remove_short);
        window.set_combine(form.combine);
        window.set_remove_slps(form.remove_slps);
    }

    fn read_settings_form(window: &SettingsWindow) -> SettingsForm {
        SettingsForm {
            melee_iso: window.get_melee_iso().to_string(),
            dolphin_dir: window.get_dolphin_dir().to_string(),
            ffmpeg: window.get_ffmpeg().to_string(),
            resolution: window.get_resolution().to_string(),
            video_backend: window.get_video_backend().to_string(),
            widescreen: window.get_widescreen(),
            bitrate_kbps: window.get_bitrate_kbps().to_string(),
            parallel_games: window.get_parallel_games().to_string(),
            remove_short: window.get_remove_short(),
            combine: window.get_combine(),
            remove_slps: window.get_remove_slps(),
        }
    }

    /// Subscribe to session changes and update the main window accordingly
    ///
    /// Runs on the tokio runtime; every UI mutation is posted to the event loop.
    fn setup_session_subscription(bridge: &UiBridge<MainWindow>, session: &Arc<SessionManager>) {
        let mut rx = session.subscribe();
        let state = Arc::clone(session);
        let bridge_for_task = bridge.clone();

        bridge.spawn(async move {
            tracing::debug!("Session subscription task started");

            loop {
                let received = rx.recv().await;
                match received {
                    Ok(change) => {
                        tracing::trace!("Session change received: {:?}", change);
                        Self::apply_change(&bridge_for_task, change);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("UI lagged behind by {} session changes, resyncing", skipped);
                        let snapshot = state.resync(&mut rx);
                        bridge_for_task.post(move |ui| Self::sync_ui_with_session(ui, &snapshot));
                    }
                    Err(RecvError::Closed) => break,
                }
            }

            tracing::debug!("Session subscription task terminated");
        });
    }

    fn apply_change(bridge: &UiBridge<MainWindow>, change: SessionChange) {
        match change {
            SessionChange::DirectoriesChanged { input, output } => {
                let input = Self::directory_label("Input", input.map(Utf8PathBuf::from).as_ref());
                let output = Self::directory_label("Output", output.map(Utf8PathBuf::from).as_ref());
                bridge.post(move |ui| {
                    ui.set_input_path_label(input.into());
                    ui.set_output_path_label(output.into());
                });
            }
            SessionChange::ConversionStateChanged { state } => {
                tracing::debug!("Conversion state: {:?}", state);
                bridge.post(move |ui| ui.set_is_converting(state == SupervisorState::Running));
            }
            SessionChange::LogReset { text } => {
                bridge.post(move |ui| ui.set_log_text(text.into()));
            }
            SessionChange::LogAppended { text } => {
                bridge.post(move |ui| {
                    let mut log = ui.get_log_text().to_string();
                    log.push_str(&text);
                    ui.set_log_text(log.into());
                });
            }
        }
    }

    /// Show an informational message over the main window
    fn show_message_dialog(
        ui: &MainWindow,
        title: impl Into<slint::SharedString>,
        message: impl Into<slint::SharedString>,
    ) {
        ui.set_message_title(title.into());
        ui.set_message_text(message.into());
        ui.set_show_message_dialog(true);
    }

    /// Show a native folder picker
    ///
    /// # Returns
    /// The selected folder, or None if cancelled or not valid UTF-8
    fn show_folder_picker(title: &str) -> Option<Utf8PathBuf> {
        rfd::FileDialog::new()
            .set_title(title)
            .pick_folder()
            .and_then(Self::into_utf8)
    }

    /// Show a native file picker
    ///
    /// # Arguments
    /// * `title` - Dialog title
    /// * `filters` - File type filters (name, extensions)
    fn show_file_picker(title: &str, filters: Vec<(&str, &[&str])>) -> Option<Utf8PathBuf> {
        let mut dialog = rfd::FileDialog::new().set_title(title);

        for (name, extensions) in filters {
            dialog = dialog.add_filter(name, extensions);
        }

        dialog.pick_file().and_then(Self::into_utf8)
    }

    fn into_utf8(path: std::path::PathBuf) -> Option<Utf8PathBuf> {
        Utf8PathBuf::try_from(path)
            .map_err(|e| {
                tracing::error!("Failed to convert path to UTF-8: {}", e);
                e
            })
            .ok()
    }
}

// Session module
//
// This module provides the SessionManager, the application-session object that owns the
// main window's form state, the progress log and the zero-or-one active conversion. It wraps
// SessionState with Arc<RwLock<T>> and emits change events for GUI updates.

use crate::models::session_state::LogUpdate;
use crate::models::{
    ConversionEvent, ConversionRequest, SessionState, SupervisorState, UnknownPrivacy, YoutubeForm,
};
use crate::services::{ConversionHandle, ConversionService};
use camino::Utf8PathBuf;
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;

/// Capacity of the change broadcast; lagging subscribers resync from a snapshot
const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// Change events emitted when the session is modified
#[derive(Clone, Debug, PartialEq)]
pub enum SessionChange {
    /// An input or output directory was chosen
    DirectoriesChanged {
        input: Option<String>,
        output: Option<String>,
    },

    /// The supervisor moved between Idle, Running and Terminated
    ConversionStateChanged { state: SupervisorState },

    /// The progress log was replaced
    LogReset { text: String },

    /// Text was appended to the progress log
    LogAppended { text: String },
}

/// Reasons a conversion cannot be started
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Please select both input and output directories")]
    MissingDirectories,

    #[error("A conversion is already running")]
    AlreadyRunning,

    #[error(transparent)]
    InvalidPrivacy(#[from] UnknownPrivacy),
}

/// Thread-safe session state with event emission
///
/// This is the central coordination point between the UI and the process
/// supervisor:
/// - Validates the form before any converter is spawned
/// - Tracks the active run and its [`SupervisorState`]
/// - Renders [`ConversionEvent`]s into the progress log
/// - Broadcasts [`SessionChange`] events to subscribers (the GUI)
///
/// # Lifecycle
///
/// Created once in `main` and shared with the GUI controller. Call
/// [`shutdown()`](Self::shutdown) when the main window closes so a running
/// converter is cancelled.
pub struct SessionManager {
    state: Arc<RwLock<SessionState>>,
    change_tx: broadcast::Sender<SessionChange>,
}

impl SessionManager {
    pub fn new() -> Self {
        let (change_tx, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            state: Arc::new(RwLock::new(SessionState::default())),
            change_tx,
        }
    }

    /// Clone of the current state
    pub fn snapshot(&self) -> SessionState {
        self.read(SessionState::clone)
    }

    /// Execute a function with read access to the state
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&SessionState) -> R,
    {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }

    /// Mutate the state and emit the resulting change events
    ///
    /// Directory and supervisor changes are detected by comparing the state
    /// before and after `update_fn`. Log changes are emitted by
    /// [`apply_event`](Self::apply_event) directly. Changes are sent while the
    /// write lock is held, so a reader holding the read lock sees a state
    /// consistent with everything broadcast so far.
    pub fn update<F>(&self, update_fn: F) -> Vec<SessionChange>
    where
        F: FnOnce(&mut SessionState),
    {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let old_state = state.clone();
        update_fn(&mut state);
        let changes = Self::detect_changes(&old_state, &state);

        for change in &changes {
            self.emit(change.clone());
        }

        changes
    }

    /// Subscribe to session change events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionChange> {
        self.change_tx.subscribe()
    }

    /// Bring a lagging subscriber back in step
    ///
    /// Discards every change still queued for `rx` and returns the state that
    /// already includes them. Changes received afterwards apply on top of the
    /// returned state.
    pub fn resync(&self, rx: &mut broadcast::Receiver<SessionChange>) -> SessionState {
        self.read(|state| {
            loop {
                match rx.try_recv() {
                    Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
                    Err(TryRecvError::Empty | TryRecvError::Closed) => break,
                }
            }
            state.clone()
        })
    }

    fn emit(&self, change: SessionChange) {
        // No subscribers is fine
        let _ = self.change_tx.send(change);
    }

    fn detect_changes(old: &SessionState, new: &SessionState) -> Vec<SessionChange> {
        let mut changes = Vec::new();

        if old.input_directory != new.input_directory
            || old.output_directory != new.output_directory
        {
            changes.push(SessionChange::DirectoriesChanged {
                input: new.input_directory.as_ref().map(|p| p.to_string()),
                output: new.output_directory.as_ref().map(|p| p.to_string()),
            });
        }

        if old.supervisor != new.supervisor {
            changes.push(SessionChange::ConversionStateChanged {
                state: new.supervisor,
            });
        }

        changes
    }

    // Convenience methods for common state updates

    pub fn set_input_directory(&self, path: Utf8PathBuf) -> Vec<SessionChange> {
        tracing::info!("Input directory selected: {}", path);
        self.update(|state| state.input_directory = Some(path))
    }

    pub fn set_output_directory(&self, path: Utf8PathBuf) -> Vec<SessionChange> {
        tracing::info!("Output directory selected: {}", path);
        self.update(|state| state.output_directory = Some(path))
    }

    pub fn set_youtube_form(&self, form: YoutubeForm) -> Vec<SessionChange> {
        self.update(|state| state.youtube = form)
    }

    /// Validate the form and build a request
    pub fn build_request(&self) -> Result<ConversionRequest, SessionError> {
        self.read(Self::validate)
    }

    fn validate(state: &SessionState) -> Result<ConversionRequest, SessionError> {
        if state.supervisor.is_running() {
            return Err(SessionError::AlreadyRunning);
        }

        match state.request() {
            None => Err(SessionError::MissingDirectories),
            Some(request) => Ok(request?),
        }
    }

    /// Validate the form and launch the converter
    ///
    /// Nothing is spawned when validation fails. Validation, the spawn and the
    /// move to `Running` happen under one write lock, so at most one caller
    /// wins. On success the caller should feed the handle to
    /// [`pump_events`](Self::pump_events).
    pub fn start_conversion(
        &self,
        service: &ConversionService,
        runtime: &tokio::runtime::Handle,
    ) -> Result<ConversionHandle, SessionError> {
        let mut started = Err(SessionError::AlreadyRunning);

        self.update(|state| {
            started = Self::validate(state).map(|request| {
                let handle = service.start(runtime, request);
                state.supervisor = SupervisorState::Running;
                state.active = Some(handle.canceller());
                handle
            });
        });

        started.inspect_err(|e| {
            tracing::warn!("Conversion not started: {}", e);
        })
    }

    /// Render a converter event into the session
    pub fn apply_event(&self, event: &ConversionEvent) -> Vec<SessionChange> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let old_state = state.clone();
        let log_change = match state.record_event(event) {
            LogUpdate::Reset(text) => SessionChange::LogReset { text },
            LogUpdate::Append(text) => SessionChange::LogAppended { text },
        };

        let mut changes = Self::detect_changes(&old_state, &state);
        changes.push(log_change);

        for change in &changes {
            self.emit(change.clone());
        }

        changes
    }

    /// Apply every event of a run until it completes
    ///
    /// # Returns
    /// The exit code carried by `Completed`
    pub async fn pump_events(&self, mut handle: ConversionHandle) -> Option<i32> {
        let mut exit_code = None;

        while let Some(event) = handle.next_event().await {
            match &event {
                ConversionEvent::ProgressChunk(text) => tracing::debug!("converter: {}", text.trim_end()),
                ConversionEvent::ErrorChunk(text) => tracing::debug!("converter stderr: {}", text.trim_end()),
                ConversionEvent::Completed { exit_code: code } => exit_code = Some(*code),
                ConversionEvent::Started => {}
            }
            tracing::trace!("Session received {}", event.name());
            self.apply_event(&event);
        }

        exit_code
    }

    /// Cancel the active run, if any
    ///
    /// # Returns
    /// `true` if a run was active
    pub fn cancel_conversion(&self) -> bool {
        match self.read(|state| state.active.clone()) {
            Some(canceller) => {
                canceller.cancel();
                true
            }
            None => false,
        }
    }

    /// Tear down the session when the main window closes
    ///
    /// # Returns
    /// `true` if a running conversion had to be cancelled
    pub fn shutdown(&self) -> bool {
        let cancelled = self.cancel_conversion();
        if cancelled {
            tracing::warn!("Window closed during conversion - cancelling converter");
        }
        cancelled
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for SessionManager {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            change_tx: self.change_tx.clone(),
        }
    }
}

use crate::models::conversion::{
    ConversionEvent, ConversionRequest, Privacy, SupervisorState, YoutubeOptions, parse_tags,
};
use crate::services::conversion::ConversionCanceller;
use camino::Utf8PathBuf;

/// Log text shown when a run starts
pub const LOG_STARTED: &str = "Conversion in progress...";

/// Log line appended when the converter exits with code 0
pub const LOG_SUCCESS: &str = "Conversion completed successfully.";

/// Raw contents of the YouTube section of the main window
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct YoutubeForm {
    pub enabled: bool,
    pub title_template: String,
    pub description: String,
    /// Comma-separated, as typed
    pub tags: String,
    /// Privacy level as selected, parsed when a request is built
    pub privacy: String,
}

impl YoutubeForm {
    /// Convert to request options
    ///
    /// An unparseable privacy level only matters when uploading is enabled;
    /// otherwise the default level is carried along unused.
    pub fn to_options(&self) -> Result<YoutubeOptions, crate::models::UnknownPrivacy> {
        let privacy = match self.privacy.parse::<Privacy>() {
            Ok(privacy) => privacy,
            Err(err) if self.enabled => return Err(err),
            Err(_) => Privacy::default(),
        };

        Ok(YoutubeOptions {
            enabled: self.enabled,
            title_template: self.title_template.clone(),
            description: self.description.clone(),
            tags: parse_tags(&self.tags),
            privacy,
        })
    }
}

/// How an event changed the progress log
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogUpdate {
    /// The log was replaced with this text
    Reset(String),
    /// This text was appended to the log
    Append(String),
}

/// State of one application session
///
/// Holds the main window's form values, the progress log and the supervisor
/// phase of the zero-or-one active conversion.
///
/// # Thread Safety
///
/// `SessionState` is wrapped in `Arc<RwLock<SessionState>>` by
/// [`SessionManager`](crate::session::SessionManager); mutate it only through
/// the manager so change events are emitted.
#[derive(Clone, Debug, Default)]
pub struct SessionState {
    pub input_directory: Option<Utf8PathBuf>,
    pub output_directory: Option<Utf8PathBuf>,
    pub youtube: YoutubeForm,

    pub supervisor: SupervisorState,
    /// Cancels the active run, present only while one is running
    pub active: Option<ConversionCanceller>,
    pub last_exit_code: Option<i32>,

    pub log: String,
}

impl SessionState {
    /// Whether both directories have been chosen
    pub fn has_directories(&self) -> bool {
        let chosen = |dir: &Option<Utf8PathBuf>| dir.as_ref().is_some_and(|d| !d.as_str().is_empty());
        chosen(&self.input_directory) && chosen(&self.output_directory)
    }

    /// Build a request from the current form, if both directories are set
    pub fn request(&self) -> Option<Result<ConversionRequest, crate::models::UnknownPrivacy>> {
        if !self.has_directories() {
            return None;
        }

        let (input_directory, output_directory) =
            (self.input_directory.clone()?, self.output_directory.clone()?);

        Some(self.youtube.to_options().map(|options| ConversionRequest {
            input_directory,
            output_directory,
            youtube: Some(options),
        }))
    }

    /// Render a converter event into the progress log
    pub fn record_event(&mut self, event: &ConversionEvent) -> LogUpdate {
        match event {
            ConversionEvent::Started => {
                self.supervisor = SupervisorState::Running;
                self.last_exit_code = None;
                self.log = LOG_STARTED.to_string();
                LogUpdate::Reset(self.log.clone())
            }
            ConversionEvent::ProgressChunk(text) => self.append(format!("\n{}", text)),
            ConversionEvent::ErrorChunk(text) => self.append(format!("\nError: {}", text)),
            ConversionEvent::Completed { exit_code } => {
                self.supervisor = SupervisorState::Terminated;
                self.active = None;
                self.last_exit_code = Some(*exit_code);
                if *exit_code == 0 {
                    self.append(format!("\n{}", LOG_SUCCESS))
                } else {
                    self.append(format!(
                        "\nConversion completed with errors. Exit code: {}",
                        exit_code
                    ))
                }
            }
        }
    }

    fn append(&mut self, text: String) -> LogUpdate {
        self.log.push_str(&text);
        LogUpdate::Append(text)
    }
}

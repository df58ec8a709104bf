use camino::Utf8PathBuf;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Parameters for one invocation of the external converter
///
/// Both directories are user-chosen and validated by the session before a
/// request is built. Nothing else is validated; the converter owns argument
/// validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    pub input_directory: Utf8PathBuf,
    pub output_directory: Utf8PathBuf,
    pub youtube: Option<YoutubeOptions>,
}

/// Upload settings forwarded to the converter's `--youtube*` flags
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct YoutubeOptions {
    pub enabled: bool,
    pub title_template: String,
    pub description: String,
    pub tags: Vec<String>,
    pub privacy: Privacy,
}

impl YoutubeOptions {
    /// Tags joined the way the converter expects them (`a,b,c`)
    pub fn joined_tags(&self) -> String {
        self.tags.join(",")
    }
}

/// YouTube visibility of uploaded videos
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Privacy {
    Public,
    Unlisted,
    #[default]
    Private,
}

impl Privacy {
    /// All levels in the order the UI lists them
    pub const ALL: [Privacy; 3] = [Privacy::Public, Privacy::Unlisted, Privacy::Private];

    /// Command-line spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            Privacy::Public => "public",
            Privacy::Unlisted => "unlisted",
            Privacy::Private => "private",
        }
    }
}

impl fmt::Display for Privacy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A privacy level the converter does not know
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown privacy level `{0}`")]
pub struct UnknownPrivacy(pub String);

impl FromStr for Privacy {
    type Err = UnknownPrivacy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Privacy::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownPrivacy(s.to_string()))
    }
}

/// Split the comma-separated tag field into trimmed tags
///
/// Empty entries are kept; the converter decides what to do with them.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',').map(|tag| tag.trim().to_string()).collect()
}

/// One notification from a converter run
///
/// `Started` is always the first event of a run and `Completed` the last.
/// Chunks from the same stream keep their order; chunks from stdout and
/// stderr may interleave arbitrarily.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionEvent {
    Started,
    /// Data read from the converter's stdout
    ProgressChunk(String),
    /// Data read from the converter's stderr
    ErrorChunk(String),
    Completed { exit_code: i32 },
}

impl ConversionEvent {
    /// Whether this event ends the stream
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConversionEvent::Completed { .. })
    }

    /// Message name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            ConversionEvent::Started => "conversion-started",
            ConversionEvent::ProgressChunk(_) => "conversion-progress",
            ConversionEvent::ErrorChunk(_) => "conversion-error",
            ConversionEvent::Completed { .. } => "conversion-complete",
        }
    }
}

/// Lifecycle of the process supervisor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SupervisorState {
    #[default]
    Idle,
    Running,
    Terminated,
}

impl SupervisorState {
    pub fn is_running(&self) -> bool {
        matches!(self, SupervisorState::Running)
    }
}

use crate::models::{ConversionEvent, ConversionRequest};
use std::process::Stdio;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Converter subcommand that converts a directory of replays
pub const CONVERTER_SUBCOMMAND: &str = "run";

/// Exit code reported when the converter could not be started
pub const SPAWN_FAILED_EXIT_CODE: i32 = -1;

/// Exit code reported when the converter was killed by a signal
pub const SIGNALLED_EXIT_CODE: i32 = -1;

/// Exit code reported when a run was cancelled from the UI
pub const CANCELLED_EXIT_CODE: i32 = -2;

const READ_BUFFER_SIZE: usize = 8 * 1024;

/// Errors that can occur while supervising the converter
#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("failed to start converter `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("converter {0} was not captured")]
    MissingPipe(&'static str),

    #[error("failed to wait for converter: {0}")]
    Wait(#[from] std::io::Error),
}

/// How to launch the external converter
///
/// `leading_args` are placed before the arguments built from a request, which
/// lets a development checkout run `python slp2mp4/slp2mp4.py run ...` while a
/// packaged build runs the bundled `slp2mp4 run ...` directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConverterCommand {
    program: String,
    leading_args: Vec<String>,
}

impl ConverterCommand {
    /// Run `program` directly
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
        }
    }

    /// Run a converter script through an interpreter
    pub fn script(interpreter: impl Into<String>, script: impl Into<String>) -> Self {
        Self::new(interpreter).with_leading_args([script.into()])
    }

    /// Arguments placed before the request arguments
    pub fn with_leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.leading_args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn leading_args(&self) -> &[String] {
        &self.leading_args
    }
}

/// Process supervisor for the slp2mp4 converter
///
/// Each call to [`start`](Self::start) spawns exactly one converter process and
/// returns a [`ConversionHandle`] whose event stream always begins with
/// [`ConversionEvent::Started`] and ends with exactly one
/// [`ConversionEvent::Completed`].
///
/// # Stream handling
///
/// stdout and stderr are read by one task each. Every read becomes one
/// `ProgressChunk` or `ErrorChunk` as soon as it arrives; there is no line
/// buffering. `Completed` is sent only after the child has exited and both
/// pipes have been drained, so no chunk can follow it.
#[derive(Debug, Clone)]
pub struct ConversionService {
    command: ConverterCommand,
}

impl ConversionService {
    pub fn new(command: ConverterCommand) -> Self {
        Self { command }
    }

    pub fn command(&self) -> &ConverterCommand {
        &self.command
    }

    /// Build the converter arguments for a request
    ///
    /// `run -o <output> <input>`, followed by the `--youtube*` flags only when
    /// uploading is enabled. Field contents are passed through unchanged.
    pub fn build_args(request: &ConversionRequest) -> Vec<String> {
        let mut args = vec![
            CONVERTER_SUBCOMMAND.to_string(),
            "-o".to_string(),
            request.output_directory.to_string(),
            request.input_directory.to_string(),
        ];

        if let Some(youtube) = request.youtube.as_ref().filter(|y| y.enabled) {
            args.push("--youtube".to_string());
            args.push("--youtube-title".to_string());
            args.push(youtube.title_template.clone());
            args.push("--youtube-description".to_string());
            args.push(youtube.description.clone());
            args.push("--youtube-tags".to_string());
            args.push(youtube.joined_tags());
            args.push("--youtube-privacy".to_string());
            args.push(youtube.privacy.to_string());
        }

        args
    }

    /// Full command line for a request, program first
    pub fn command_line(&self, request: &ConversionRequest) -> Vec<String> {
        std::iter::once(self.command.program.clone())
            .chain(self.command.leading_args.iter().cloned())
            .chain(Self::build_args(request))
            .collect()
    }

    /// Launch the converter for `request` on `runtime`
    ///
    /// `Started` is queued before this returns. The process runs on a task of
    /// `runtime`; nothing here blocks the calling thread, so it is safe to call
    /// from the UI thread.
    pub fn start(
        &self,
        runtime: &tokio::runtime::Handle,
        request: ConversionRequest,
    ) -> ConversionHandle {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (cancel_tx, cancel_rx) = watch::channel(false);

        // The receiver is still held here, so this cannot fail
        let _ = event_tx.send(ConversionEvent::Started);

        let args = Self::build_args(&request);
        tracing::info!(
            "Starting conversion: {} -> {}",
            request.input_directory,
            request.output_directory
        );
        tracing::debug!("Converter command line: {:?}", self.command_line(&request));

        let command = self.command.clone();
        let task = runtime.spawn(supervise(command, args, event_tx, cancel_rx));

        ConversionHandle {
            events: event_rx,
            canceller: ConversionCanceller {
                cancel_tx: Arc::new(cancel_tx),
            },
            task,
        }
    }
}

/// The running side of one conversion
///
/// Owns the typed event stream. Dropping the handle does not stop the
/// converter; use [`cancel`](Self::cancel) for that.
#[derive(Debug)]
pub struct ConversionHandle {
    events: mpsc::UnboundedReceiver<ConversionEvent>,
    canceller: ConversionCanceller,
    task: JoinHandle<()>,
}

impl ConversionHandle {
    /// Wait for the next event, `None` once `Completed` has been received
    pub async fn next_event(&mut self) -> Option<ConversionEvent> {
        self.events.recv().await
    }

    /// Request termination of the converter
    pub fn cancel(&self) {
        self.canceller.cancel();
    }

    /// A cloneable handle that can cancel this run from elsewhere
    pub fn canceller(&self) -> ConversionCanceller {
        self.canceller.clone()
    }

    /// Drain the stream until `Completed`, returning every event
    pub async fn collect(mut self) -> Vec<ConversionEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.next_event().await {
            events.push(event);
        }
        if let Err(e) = self.task.await {
            tracing::error!("Conversion supervisor task failed: {}", e);
        }
        events
    }
}

/// Cancels a running conversion
#[derive(Debug, Clone)]
pub struct ConversionCanceller {
    cancel_tx: Arc<watch::Sender<bool>>,
}

impl ConversionCanceller {
    pub fn cancel(&self) {
        tracing::info!("Conversion cancellation requested");
        let _ = self.cancel_tx.send(true);
    }
}

async fn supervise(
    command: ConverterCommand,
    args: Vec<String>,
    events: mpsc::UnboundedSender<ConversionEvent>,
    cancel_rx: watch::Receiver<bool>,
) {
    let exit_code = match run_converter(&command, &args, &events, cancel_rx).await {
        Ok(code) => code,
        Err(err) => {
            tracing::error!("Conversion failed: {}", err);
            let _ = events.send(ConversionEvent::ErrorChunk(err.to_string()));
            SPAWN_FAILED_EXIT_CODE
        }
    };

    tracing::info!("Converter finished with exit code {}", exit_code);
    let _ = events.send(ConversionEvent::Completed { exit_code });
}

async fn run_converter(
    command: &ConverterCommand,
    args: &[String],
    events: &mpsc::UnboundedSender<ConversionEvent>,
    mut cancel_rx: watch::Receiver<bool>,
) -> Result<i32, ConversionError> {
    let mut child = Command::new(command.program())
        .args(command.leading_args())
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| ConversionError::Spawn {
            program: command.program().to_string(),
            source,
        })?;

    tracing::debug!("Converter spawned with pid {:?}", child.id());

    let stdout = child.stdout.take().ok_or(ConversionError::MissingPipe("stdout"))?;
    let stderr = child.stderr.take().ok_or(ConversionError::MissingPipe("stderr"))?;

    let stdout_task = tokio::spawn(forward_stream(
        stdout,
        events.clone(),
        ConversionEvent::ProgressChunk,
    ));
    let stderr_task = tokio::spawn(forward_stream(
        stderr,
        events.clone(),
        ConversionEvent::ErrorChunk,
    ));

    let (outcome, drain) = tokio::select! {
        status = child.wait() => match status {
            Ok(status) => (Ok(status.code().unwrap_or(SIGNALLED_EXIT_CODE)), true),
            Err(e) => (Err(ConversionError::from(e)), false),
        },
        _ = cancelled(&mut cancel_rx) => {
            if let Err(e) = child.kill().await {
                tracing::warn!("Failed to kill converter: {}", e);
            }
            (Ok(CANCELLED_EXIT_CODE), false)
        }
    };

    for reader in [stdout_task, stderr_task] {
        // Grandchildren may keep the pipes open after a kill
        if !drain {
            reader.abort();
        }
        // No chunk may be sent once this returns
        let _ = reader.await;
    }

    outcome
}

/// Resolves once cancellation is requested; never if the sender is gone
async fn cancelled(cancel_rx: &mut watch::Receiver<bool>) {
    if cancel_rx.wait_for(|cancel| *cancel).await.is_err() {
        std::future::pending::<()>().await;
    }
}

async fn forward_stream<R>(
    mut reader: R,
    events: mpsc::UnboundedSender<ConversionEvent>,
    wrap: fn(String) -> ConversionEvent,
) where
    R: AsyncRead + Unpin,
{
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];

    loop {
        match reader.read(&mut buffer).await {
            Ok(0) => break,
            Ok(n) => {
                let text = String::from_utf8_lossy(&buffer[..n]).into_owned();
                if events.send(wrap(text)).is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::warn!("Failed to read converter output: {}", e);
                break;
            }
        }
    }
}

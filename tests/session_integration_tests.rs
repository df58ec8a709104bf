//! Integration tests for SessionManager driving real converter runs
//!
//! These tests verify that the session:
//! - Refuses to spawn anything without both directories
//! - Renders a run into the progress log the way the main window shows it
//! - Emits change events subscribers can follow
//! - Returns to a startable state after a run terminates

#![cfg(unix)]

use camino::Utf8PathBuf;
use slp2mp4_gui::models::{SupervisorState, YoutubeForm};
use slp2mp4_gui::services::{ConversionService, ConverterCommand};
use slp2mp4_gui::{SessionChange, SessionError, SessionManager};
use std::sync::Arc;
use tokio::time::{Duration, timeout};

fn script_service(script: &str) -> ConversionService {
    ConversionService::new(ConverterCommand::new("sh").with_leading_args(["-c", script, "slp2mp4"]))
}

fn ready_session() -> Arc<SessionManager> {
    let session = Arc::new(SessionManager::new());
    session.set_input_directory(Utf8PathBuf::from("/replays"));
    session.set_output_directory(Utf8PathBuf::from("/videos"));
    session
}

#[tokio::test]
async fn test_missing_directories_never_spawn() {
    let session = Arc::new(SessionManager::new());
    // Would create the marker file if it ever ran
    let service = script_service("touch /tmp/slp2mp4-gui-should-not-exist");

    let result = session.start_conversion(&service, &tokio::runtime::Handle::current());

    assert!(matches!(result, Err(SessionError::MissingDirectories)));
    assert_eq!(session.snapshot().supervisor, SupervisorState::Idle);
    assert!(session.snapshot().log.is_empty());
}

#[tokio::test]
async fn test_successful_run_log() {
    let session = ready_session();
    let service = script_service("printf 'Converting game 1'");

    let handle = session
        .start_conversion(&service, &tokio::runtime::Handle::current())
        .unwrap();
    assert_eq!(session.snapshot().supervisor, SupervisorState::Running);

    let exit_code = timeout(Duration::from_secs(10), session.pump_events(handle))
        .await
        .expect("Timeout waiting for conversion");
    assert_eq!(exit_code, Some(0));

    let state = session.snapshot();
    assert_eq!(
        state.log,
        "Conversion in progress...\nConverting game 1\nConversion completed successfully."
    );
    assert_eq!(state.supervisor, SupervisorState::Terminated);
    assert!(state.active.is_none());
}

#[tokio::test]
async fn test_failed_run_log() {
    let session = ready_session();
    let service = script_service("printf 'bad iso' >&2; exit 1");

    let handle = session
        .start_conversion(&service, &tokio::runtime::Handle::current())
        .unwrap();
    let exit_code = timeout(Duration::from_secs(10), session.pump_events(handle))
        .await
        .expect("Timeout waiting for conversion");

    assert_eq!(exit_code, Some(1));
    let log = session.snapshot().log;
    assert!(log.contains("\nError: bad iso"));
    assert!(log.ends_with("\nConversion completed with errors. Exit code: 1"));
    assert!(!log.contains("completed successfully"));
}

#[tokio::test]
async fn test_second_start_rejected_while_running() {
    let session = ready_session();
    let service = script_service("sleep 30");
    let runtime = tokio::runtime::Handle::current();

    let handle = session.start_conversion(&service, &runtime).unwrap();

    let second = session.start_conversion(&service, &runtime);
    assert!(matches!(second, Err(SessionError::AlreadyRunning)));

    assert!(session.cancel_conversion());
    let exit_code = timeout(Duration::from_secs(10), session.pump_events(handle))
        .await
        .expect("Timeout waiting for cancellation");
    assert_eq!(exit_code, Some(-2));

    // A terminated session can start again
    let handle = session
        .start_conversion(&script_service("exit 0"), &runtime)
        .unwrap();
    let exit_code = timeout(Duration::from_secs(10), session.pump_events(handle))
        .await
        .expect("Timeout waiting for conversion");
    assert_eq!(exit_code, Some(0));
}

#[tokio::test]
async fn test_subscribers_follow_the_run() {
    let session = ready_session();
    let mut rx = session.subscribe();
    let service = script_service("printf hello");

    let handle = session
        .start_conversion(&service, &tokio::runtime::Handle::current())
        .unwrap();
    session.pump_events(handle).await;

    let mut changes = Vec::new();
    while let Ok(change) = rx.try_recv() {
        changes.push(change);
    }

    assert_eq!(
        changes.first(),
        Some(&SessionChange::ConversionStateChanged {
            state: SupervisorState::Running
        })
    );
    assert!(changes.contains(&SessionChange::LogReset {
        text: "Conversion in progress...".to_string()
    }));
    assert!(changes.contains(&SessionChange::LogAppended {
        text: "\nhello".to_string()
    }));
    assert_eq!(
        changes.last(),
        Some(&SessionChange::LogAppended {
            text: "\nConversion completed successfully.".to_string()
        })
    );
}

#[tokio::test]
async fn test_invalid_privacy_blocks_upload_run() {
    let session = ready_session();
    session.set_youtube_form(YoutubeForm {
        enabled: true,
        privacy: "friends-only".to_string(),
        ..YoutubeForm::default()
    });

    let result = session.start_conversion(&script_service("exit 0"), &tokio::runtime::Handle::current());
    assert!(matches!(result, Err(SessionError::InvalidPrivacy(_))));
}

#[tokio::test]
async fn test_shutdown_cancels_active_run() {
    let session = ready_session();
    let handle = session
        .start_conversion(&script_service("sleep 30"), &tokio::runtime::Handle::current())
        .unwrap();

    assert!(session.shutdown());

    let exit_code = timeout(Duration::from_secs(10), session.pump_events(handle))
        .await
        .expect("Timeout waiting for cancellation");
    assert_eq!(exit_code, Some(-2));
    assert!(!session.shutdown());
}

mod common;

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use pretty_assertions::assert_eq;

use common::{fast_options, FakeBackend, Script};
use ocbridge_core::api::{wrap_prompt, CompletionDriver, CompletionError, Signal};

async fn collect(backend: FakeBackend, prompt: &str) -> (String, Vec<CompletionError>) {
    let driver = CompletionDriver::new(Arc::new(backend), fast_options());
    let mut stream = driver.produce_completion(prompt);
    let mut text = String::new();
    let mut errors = Vec::new();
    while let Some(item) = stream.next().await {
        match item {
            Ok(ch) => text.push(ch),
            Err(e) => errors.push(e),
        }
    }
    (text, errors)
}

#[tokio::test]
async fn content_is_kept_despite_nonzero_exit() {
    let backend =
        FakeBackend::new(Script::stdout("<opencode_output>\nHi\n</opencode_output>\n").exit(1));
    let (text, errors) = collect(backend, "User: hi").await;
    assert_eq!(text, "Hi\n");
    assert!(errors.is_empty(), "unexpected errors: {errors:?}");
}

#[tokio::test]
async fn one_character_line_survives_nonzero_exit() {
    let backend = FakeBackend::new(Script::stdout("<opencode_output>\nx").exit(1));
    let (text, errors) = collect(backend, "User: hi").await;
    assert_eq!(text, "x\n");
    assert!(errors.is_empty(), "unexpected errors: {errors:?}");
}

#[tokio::test]
async fn nonzero_exit_without_output_is_an_invocation_failure() {
    let backend = FakeBackend::new(Script::stdout("").exit(2).stderr("auth required\n"));
    let (text, errors) = collect(backend, "User: hi").await;
    assert_eq!(text, "");
    assert_eq!(errors.len(), 1);
    assert!(matches!(
        errors[0],
        CompletionError::InvocationFailed { exit_code: 2 }
    ));
}

#[tokio::test]
async fn zero_exit_without_region_yields_empty_completion() {
    let backend = FakeBackend::new(Script::stdout("Thinking...\nno tags here\n"));
    let (text, errors) = collect(backend, "User: hi").await;
    assert_eq!(text, "");
    assert!(errors.is_empty());
}

#[tokio::test]
async fn prompt_is_wrapped_and_sent_on_stdin() {
    let backend = FakeBackend::new(Script::stdout("<opencode_output>\nok\n</opencode_output>\n"));
    let recorder = backend.recorder();
    let (text, _) = collect(backend, "User: hello").await;
    assert_eq!(text, "ok\n");
    assert_eq!(recorder.stdin(), wrap_prompt("User: hello"));
    assert_eq!(recorder.starts(), 1);
}

#[tokio::test]
async fn missing_executable_fails_before_any_output() {
    let backend = FakeBackend::new(Script::failing_launch(std::io::ErrorKind::NotFound));
    let (text, errors) = collect(backend, "User: hi").await;
    assert_eq!(text, "");
    assert_eq!(errors.len(), 1);
    assert!(matches!(
        &errors[0],
        CompletionError::ExecutableNotFound { cmd } if cmd == "opencode"
    ));
}

#[tokio::test]
async fn other_launch_failures_are_reported() {
    let backend = FakeBackend::new(Script::failing_launch(std::io::ErrorKind::PermissionDenied));
    let (_, errors) = collect(backend, "User: hi").await;
    assert!(matches!(
        errors.as_slice(),
        [CompletionError::ProcessLaunchFailed { .. }]
    ));
}

#[tokio::test]
async fn planning_failure_surfaces_as_launch_failure() {
    let mut backend = FakeBackend::new(Script::default());
    backend.fail_plan = true;
    let recorder = backend.recorder();
    let (_, errors) = collect(backend, "User: hi").await;
    assert!(matches!(
        errors.as_slice(),
        [CompletionError::ProcessLaunchFailed { .. }]
    ));
    assert_eq!(recorder.starts(), 0);
}

#[tokio::test]
async fn chunk_boundaries_do_not_change_output() {
    let full = "banner\n<opencode_output>\n\x1b[1;36m@build github-copilot/gpt-4.1\x1b[0m\n\nNi hao 你好\n</opencode_output>\n";
    let bytes = full.as_bytes();
    let pieces: Vec<&[u8]> = bytes.chunks(3).collect();
    let backend = FakeBackend::new(Script::chunks(&pieces));
    let (text, errors) = collect(backend, "User: hi").await;
    assert_eq!(text, "Ni hao 你好\n");
    assert!(errors.is_empty());
}

#[tokio::test]
async fn output_after_end_marker_is_dropped_and_process_reaped() {
    let backend = FakeBackend::new(Script::stdout(
        "<opencode_output>\nA\n</opencode_output>\ntrailing log\nmore log\n",
    ));
    let recorder = backend.recorder();
    let (text, errors) = collect(backend, "User: hi").await;
    assert_eq!(text, "A\n");
    assert!(errors.is_empty());
    assert!(recorder.signals().is_empty());
}

#[tokio::test]
async fn truncated_trailing_sequence_ends_stream_cleanly() {
    let backend = FakeBackend::new(Script::chunks(&[&b"<opencode_output>\nok\nx\xe4\xbd"[..]]));
    let (text, errors) = collect(backend, "User: hi").await;
    assert_eq!(text, "ok\nx\n");
    assert!(errors.is_empty());
}

#[tokio::test]
async fn dropping_the_stream_terminates_the_process() {
    let backend =
        FakeBackend::new(Script::stdout("<opencode_output>\nfirst line\nsecond\n").hanging());
    let recorder = backend.recorder();
    let driver = CompletionDriver::new(Arc::new(backend), fast_options());

    let mut stream = driver.produce_completion("User: hi");
    let mut got = String::new();
    for _ in 0..5 {
        match stream.next().await {
            Some(Ok(ch)) => got.push(ch),
            other => panic!("unexpected item: {other:?}"),
        }
    }
    assert_eq!(got, "first");
    drop(stream);

    let terminated = recorder
        .wait_for(Duration::from_secs(2), |r| r.signals().contains(&Signal::Term))
        .await;
    assert!(terminated, "SIGTERM was not sent");
    assert!(!recorder.signals().contains(&Signal::Kill));
}

#[tokio::test]
async fn stubborn_process_is_killed_after_grace() {
    let backend = FakeBackend::new(
        Script::stdout("<opencode_output>\nline\n")
            .hanging()
            .ignoring_term(),
    );
    let recorder = backend.recorder();
    let driver = CompletionDriver::new(Arc::new(backend), fast_options());

    let mut stream = driver.produce_completion("User: hi");
    assert!(matches!(stream.next().await, Some(Ok('l'))));
    drop(stream);

    let killed = recorder
        .wait_for(Duration::from_secs(2), |r| r.signals().contains(&Signal::Kill))
        .await;
    assert!(killed, "process was not killed");
    assert_eq!(recorder.signals(), vec![Signal::Term, Signal::Kill]);
}

#[tokio::test]
async fn each_call_starts_a_fresh_process() {
    let backend = FakeBackend::new(Script::stdout("<opencode_output>\nx\n</opencode_output>\n"));
    let recorder = backend.recorder();
    let driver = CompletionDriver::new(Arc::new(backend), fast_options());

    for _ in 0..2 {
        let text: String = driver
            .produce_completion("User: hi")
            .filter_map(|item| async move { item.ok() })
            .collect()
            .await;
        assert_eq!(text, "x\n");
    }
    assert_eq!(recorder.starts(), 2);
}

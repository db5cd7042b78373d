#![cfg(unix)]

use std::collections::BTreeMap;
use std::error::Error;

use procrun::errors::ProcrunError;
use procrun::exec::{
    CommandLine, Environment, Executor, ExitValuePolicy, ProcessDestroyer, PumpStreamHandler,
};
use procrun_test_utils::{init_tracing, sh, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn successful_process_returns_zero() -> TestResult {
    init_tracing();
    let code = with_timeout(Executor::new().execute(&sh("exit 0"))).await?;
    assert_eq!(code, 0);
    Ok(())
}

#[tokio::test]
async fn default_policy_rejects_non_zero_exit() {
    init_tracing();
    let err = with_timeout(Executor::new().execute(&sh("exit 3")))
        .await
        .unwrap_err();

    match err {
        ProcrunError::ExitRejected { code, ref command } => {
            assert_eq!(code, 3);
            assert!(command.contains("exit 3"));
        }
        other => panic!("expected ExitRejected, got {other:?}"),
    }
}

#[tokio::test]
async fn single_exit_value_rejects_zero() {
    init_tracing();
    let executor = Executor::builder().exit_value(3).build();

    assert_eq!(with_timeout(executor.execute(&sh("exit 3"))).await.unwrap(), 3);

    let err = with_timeout(executor.execute(&sh("exit 0"))).await.unwrap_err();
    assert_eq!(err.exit_code(), Some(0));
}

#[tokio::test]
async fn empty_exit_value_set_accepts_everything() -> TestResult {
    init_tracing();
    let executor = Executor::builder().exit_values(Some(&[][..])).build();
    assert_eq!(executor.exit_policy(), &ExitValuePolicy::AcceptAll);

    for code in [0, 1, 42, 255] {
        let got = with_timeout(executor.execute(&sh(&format!("exit {code}")))).await?;
        assert_eq!(got, code);
    }
    Ok(())
}

#[tokio::test]
async fn unchecked_policy_returns_raw_code() -> TestResult {
    init_tracing();
    let executor = Executor::builder().exit_values(None).build();
    assert!(!executor.exit_policy().is_checked());

    assert_eq!(with_timeout(executor.execute(&sh("exit 7"))).await?, 7);
    Ok(())
}

#[tokio::test]
async fn later_policy_overwrites_earlier_one() -> TestResult {
    init_tracing();
    let executor = Executor::builder()
        .exit_values(None)
        .exit_values(Some(&[1, 2][..]))
        .exit_value(5)
        .build();

    assert_eq!(executor.exit_policy(), &ExitValuePolicy::single(5));
    assert_eq!(with_timeout(executor.execute(&sh("exit 5"))).await?, 5);
    assert!(with_timeout(executor.execute(&sh("exit 1"))).await.is_err());
    Ok(())
}

#[tokio::test]
async fn missing_program_is_a_start_failure() {
    init_tracing();
    let cmd = CommandLine::new("/definitely/not/a/real/program");
    let err = with_timeout(Executor::new().execute(&cmd)).await.unwrap_err();

    match err {
        ProcrunError::StartFailed { program, .. } => {
            assert_eq!(program, "/definitely/not/a/real/program");
        }
        other => panic!("expected StartFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_working_directory_is_a_start_failure() {
    init_tracing();
    let executor = Executor::builder()
        .working_directory("/definitely/not/a/real/dir")
        .build();
    let err = with_timeout(executor.execute(&sh("true"))).await.unwrap_err();
    assert!(matches!(err, ProcrunError::StartFailed { .. }));
    assert_eq!(err.exit_code(), None);
}

#[tokio::test]
async fn child_runs_in_configured_working_directory() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let expected = std::fs::canonicalize(dir.path())?;

    let (handler, stdout, _stderr) = PumpStreamHandler::capturing();
    let executor = Executor::builder()
        .working_directory(dir.path())
        .stream_handler(handler)
        .build();
    assert_eq!(executor.working_directory(), Some(dir.path()));

    with_timeout(executor.execute(&sh("pwd -P"))).await?;
    assert_eq!(stdout.text().trim_end(), expected.to_string_lossy());
    Ok(())
}

#[tokio::test]
async fn explicit_environment_is_exactly_what_the_child_sees() -> TestResult {
    init_tracing();
    let (handler, stdout, _stderr) = PumpStreamHandler::capturing();
    let executor = Executor::builder().stream_handler(handler).build();

    let env: Environment = BTreeMap::from([("FOO".to_string(), "bar".to_string())]);
    let cmd = CommandLine::new("/usr/bin/env");

    with_timeout(executor.execute_with_env(&cmd, &env)).await?;
    assert_eq!(stdout.text(), "FOO=bar\n");
    Ok(())
}

#[tokio::test]
async fn inherited_environment_reaches_the_child() -> TestResult {
    init_tracing();
    let (handler, stdout, _stderr) = PumpStreamHandler::capturing();
    let executor = Executor::builder().stream_handler(handler).build();

    with_timeout(executor.execute(&sh("printf '%s' \"$PATH\""))).await?;
    assert_eq!(stdout.text(), std::env::var("PATH").unwrap_or_default());
    Ok(())
}

#[tokio::test]
async fn stdin_input_and_both_outputs_are_pumped() -> TestResult {
    init_tracing();
    let (handler, stdout, stderr) = PumpStreamHandler::capturing();
    let executor = Executor::builder()
        .stream_handler(handler.with_input("hello\nworld\n"))
        .build();

    with_timeout(executor.execute(&sh("cat; echo oops >&2"))).await?;
    assert_eq!(stdout.text(), "hello\nworld\n");
    assert_eq!(stderr.text(), "oops\n");
    Ok(())
}

#[tokio::test]
async fn destroyer_is_empty_after_execution() -> TestResult {
    init_tracing();
    let destroyer = std::sync::Arc::new(procrun::exec::ShutdownHookProcessDestroyer::new());
    let executor = Executor::builder()
        .process_destroyer(destroyer.clone())
        .build();
    assert!(executor.process_destroyer().is_some());

    with_timeout(executor.execute(&sh("exit 0"))).await?;
    assert!(destroyer.is_empty());
    Ok(())
}

#[tokio::test]
async fn capture_buffers_are_shared_across_executions() -> TestResult {
    init_tracing();
    let (handler, stdout, _stderr) = PumpStreamHandler::capturing();
    let executor = Executor::builder().stream_handler(handler).build();

    with_timeout(executor.execute(&sh("printf first"))).await?;
    with_timeout(executor.execute(&sh("printf second"))).await?;
    assert_eq!(stdout.text(), "firstsecond");

    stdout.clear();
    assert!(stdout.bytes().is_empty());
    Ok(())
}

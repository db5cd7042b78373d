#![cfg(unix)]

use std::error::Error;
use std::time::{Duration, Instant};

use procrun::errors::ProcrunError;
use procrun::exec::{
    CommandLine, DefaultResultHandler, Executor, INVALID_EXIT_VALUE, Watchdog,
};
use procrun_test_utils::{init_tracing, sh, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn sleep_cmd(secs: u32) -> CommandLine {
    CommandLine::new("sleep").arg(secs.to_string())
}

#[tokio::test]
async fn timeout_kills_long_running_process() {
    init_tracing();
    let dog = Watchdog::new(Duration::from_millis(200));
    let executor = Executor::builder().watchdog(dog.clone()).build();

    let started = Instant::now();
    let err = with_timeout(executor.execute(&sleep_cmd(30))).await.unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(dog.killed_process());
    assert!(!dog.is_watching());
    assert_eq!(err.exit_code(), Some(INVALID_EXIT_VALUE));
}

#[tokio::test]
async fn killed_process_returns_raw_code_when_unchecked() -> TestResult {
    init_tracing();
    let dog = Watchdog::new(Duration::from_millis(100));
    let executor = Executor::builder()
        .watchdog(dog.clone())
        .exit_values(None)
        .build();

    let code = with_timeout(executor.execute(&sleep_cmd(30))).await?;
    assert_eq!(code, INVALID_EXIT_VALUE);
    assert!(dog.killed_process());
    Ok(())
}

#[tokio::test]
async fn fast_process_is_not_killed() -> TestResult {
    init_tracing();
    let dog = Watchdog::new(Duration::from_secs(10));
    let executor = Executor::builder().watchdog(dog.clone()).build();

    assert_eq!(with_timeout(executor.execute(&sh("exit 0"))).await?, 0);
    assert!(!dog.killed_process());
    Ok(())
}

#[tokio::test]
async fn destroy_process_terminates_monitored_execution() -> TestResult {
    init_tracing();
    let dog = Watchdog::manual();
    let executor = Executor::builder().watchdog(dog.clone()).build();
    let (handler, receiver) = DefaultResultHandler::new();

    executor.execute_async(&sleep_cmd(30), handler);

    with_timeout(async {
        while !dog.is_watching() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    dog.destroy_process();

    let err = with_timeout(receiver.wait()).await.unwrap_err();
    assert!(matches!(err, ProcrunError::ExitRejected { .. }));
    assert!(dog.killed_process());
    Ok(())
}

#[tokio::test]
async fn watchdog_refuses_a_second_concurrent_execution() -> TestResult {
    init_tracing();
    let dog = Watchdog::manual();
    let executor = Executor::builder().watchdog(dog.clone()).build();
    let (handler, receiver) = DefaultResultHandler::new();

    executor.execute_async(&sleep_cmd(30), handler);
    with_timeout(async {
        while !dog.is_watching() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;

    let err = with_timeout(executor.execute(&sh("exit 0"))).await.unwrap_err();
    assert!(matches!(err, ProcrunError::WatchdogBusy));

    dog.destroy_process();
    let _ = with_timeout(receiver.wait()).await;

    // Released again once the first execution is over.
    assert_eq!(with_timeout(executor.execute(&sh("exit 0"))).await?, 0);
    Ok(())
}

#[tokio::test]
async fn background_grandchild_does_not_outlive_the_watchdog() -> TestResult {
    init_tracing();
    let dog = Watchdog::new(Duration::from_millis(300));
    let executor = Executor::builder().watchdog(dog.clone()).build();

    // The grandchild inherits the piped stdout/stderr and keeps them open.
    let started = Instant::now();
    let code = with_timeout(executor.execute(&sh("sleep 4 & exit 0"))).await?;

    assert_eq!(code, 0);
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(!dog.killed_process());
    assert!(!dog.is_watching());
    Ok(())
}

#[tokio::test]
async fn open_pipes_are_abandoned_without_a_watchdog() -> TestResult {
    init_tracing();
    let started = Instant::now();
    let code = with_timeout(Executor::new().execute(&sh("sleep 5 & exit 0"))).await?;

    assert_eq!(code, 0);
    assert!(started.elapsed() < Duration::from_secs(4));
    Ok(())
}

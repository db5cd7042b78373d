#![cfg(unix)]

use std::error::Error;
use std::sync::Arc;

use procrun::errors::ProcrunError;
use procrun::exec::{PumpStreamHandler, ShutdownHookProcessDestroyer};
use procrun::resolve::ResolverChain;
use procrun::runner::{RunOptions, prepare_commands, run_commands};
use procrun_test_utils::builders::{CommandConfigBuilder, ConfigFileBuilder};
use procrun_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[test]
fn prepare_expands_vars_and_selects_by_name() -> TestResult {
    let cfg = ConfigFileBuilder::new()
        .with_var("target", "world")
        .with_command("greet", CommandConfigBuilder::new("echo hello-${target}").build())
        .with_command("other", CommandConfigBuilder::new("true").build())
        .build();

    let prepared = prepare_commands(&cfg, &names(&["greet"]), &ResolverChain::standard())?;
    assert_eq!(prepared.len(), 1);
    assert_eq!(prepared[0].name, "greet");
    assert_eq!(prepared[0].command_line.arguments(), &["hello-world"]);

    let all = prepare_commands(&cfg, &[], &ResolverChain::standard())?;
    assert_eq!(all.len(), 2);
    Ok(())
}

#[test]
fn unknown_command_name_is_reported() {
    let cfg = ConfigFileBuilder::new()
        .with_command("a", CommandConfigBuilder::new("true").build())
        .build();

    let err = prepare_commands(&cfg, &names(&["b"]), &ResolverChain::standard()).unwrap_err();
    assert!(matches!(err, ProcrunError::CommandNotFound(name) if name == "b"));
}

#[test]
fn unresolved_placeholder_fails_preparation() {
    let cfg = ConfigFileBuilder::new()
        .with_command("a", CommandConfigBuilder::new("echo ${missing}").build())
        .build();

    let err = prepare_commands(&cfg, &[], &ResolverChain::standard()).unwrap_err();
    assert!(matches!(err, ProcrunError::Expression(_)));
}

fn options(parallel: bool) -> (RunOptions, procrun::exec::CapturedOutput) {
    let (handler, stdout, _stderr) = PumpStreamHandler::capturing();
    let opts = RunOptions {
        parallel,
        stream_handler: Arc::new(handler),
        destroyer: Some(Arc::new(ShutdownHookProcessDestroyer::new())),
    };
    (opts, stdout)
}

#[tokio::test]
async fn sequential_run_reports_each_outcome() -> TestResult {
    init_tracing();
    let cfg = ConfigFileBuilder::new()
        .inherit_env(false)
        .with_env("FOO", "bar")
        .with_command("a_ok", CommandConfigBuilder::new("/bin/sh -c 'printf %s \"$FOO\"'").build())
        .with_command("b_fail", CommandConfigBuilder::new("/bin/sh -c 'exit 2'").build())
        .with_command(
            "c_allowed",
            CommandConfigBuilder::new("/bin/sh -c 'exit 2'").exit_values(&[2]).build(),
        )
        .build();

    let (opts, stdout) = options(false);
    let commands = prepare_commands(&cfg, &[], &ResolverChain::standard())?;
    let summary = with_timeout(run_commands(commands, &opts)).await;

    assert_eq!(summary.outcomes.len(), 3);
    assert_eq!(summary.outcomes[0].result.as_ref().ok(), Some(&0));
    assert_eq!(summary.outcomes[1].result.as_ref().err().and_then(|e| e.exit_code()), Some(2));
    assert_eq!(summary.outcomes[2].result.as_ref().ok(), Some(&2));
    assert!(!summary.all_succeeded());
    assert_eq!(summary.failures().count(), 1);
    assert_eq!(stdout.text(), "bar");
    Ok(())
}

#[tokio::test]
async fn parallel_run_marks_timed_out_commands() -> TestResult {
    init_tracing();
    let cfg = ConfigFileBuilder::new()
        .with_command("fast", CommandConfigBuilder::new("true").build())
        .with_command("slow", CommandConfigBuilder::new("sleep 30").timeout("200ms").build())
        .build();

    let (opts, _stdout) = options(true);
    let commands = prepare_commands(&cfg, &[], &ResolverChain::standard())?;
    let summary = with_timeout(run_commands(commands, &opts)).await;

    let fast = &summary.outcomes[0];
    let slow = &summary.outcomes[1];
    assert_eq!(fast.name, "fast");
    assert!(fast.result.is_ok());
    assert!(!fast.timed_out);
    assert_eq!(slow.name, "slow");
    assert!(slow.result.is_err());
    assert!(slow.timed_out);
    Ok(())
}

#[tokio::test]
async fn run_stops_dispatching_once_shutdown_started() -> TestResult {
    init_tracing();
    let cfg = ConfigFileBuilder::new()
        .with_command("a", CommandConfigBuilder::new("true").build())
        .with_command("b", CommandConfigBuilder::new("true").build())
        .build();

    let destroyer = Arc::new(ShutdownHookProcessDestroyer::new());
    destroyer.destroy_all();

    for parallel in [false, true] {
        let opts = RunOptions {
            parallel,
            stream_handler: Arc::new(PumpStreamHandler::logging()),
            destroyer: Some(destroyer.clone()),
        };
        let commands = prepare_commands(&cfg, &[], &ResolverChain::standard())?;
        let summary = with_timeout(run_commands(commands, &opts)).await;

        assert_eq!(summary.outcomes.len(), 2);
        assert_eq!(summary.failures().count(), 2);
        for o in &summary.outcomes {
            assert!(matches!(&o.result, Err(ProcrunError::ShutdownInProgress(n)) if *n == o.name));
            assert!(!o.timed_out);
        }
    }
    Ok(())
}

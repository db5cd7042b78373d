// src/runner.rs

//! Runs named commands from a validated [`ConfigFile`].
//!
//! For each selected command this:
//! - expands `${...}` placeholders through the resolver chain using `[vars]`,
//! - builds an [`Executor`] from the command's settings,
//! - runs it sequentially (`execute_with_env`) or concurrently
//!   (`execute_async_with_env`).
//!
//! Once the process destroyer is shutting down, remaining commands are not
//! started and are reported as [`ProcrunError::ShutdownInProgress`].

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::config::{CommandSpec, ConfigFile};
use crate::errors::{ProcrunError, Result};
use crate::exec::{
    CommandLine, DefaultResultHandler, Environment, Executor, ProcessDestroyer, ResultReceiver,
    StreamHandler, Watchdog,
};
use crate::resolve::ExprResolver;

/// A command ready to launch: placeholders expanded, environment computed.
#[derive(Debug, Clone)]
pub struct PreparedCommand {
    pub name: String,
    pub command_line: CommandLine,
    pub environment: Environment,
    pub spec: CommandSpec,
}

/// Outcome of one command.
#[derive(Debug)]
pub struct CommandOutcome {
    pub name: String,
    pub result: Result<i32>,
    /// Whether the watchdog terminated the process.
    pub timed_out: bool,
}

/// Outcome of a whole run, in the order the commands were selected.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub outcomes: Vec<CommandOutcome>,
}

impl RunSummary {
    pub fn failures(&self) -> impl Iterator<Item = &CommandOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }

    pub fn all_succeeded(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// Options shared by every execution in a run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub parallel: bool,
    pub stream_handler: Arc<dyn StreamHandler>,
    pub destroyer: Option<Arc<dyn ProcessDestroyer>>,
}

/// Select commands by name (all when `names` is empty) and expand them.
pub fn prepare_commands(
    cfg: &ConfigFile,
    names: &[String],
    resolver: &dyn ExprResolver,
) -> Result<Vec<PreparedCommand>> {
    let selected: Vec<&CommandSpec> = if names.is_empty() {
        cfg.command.values().collect()
    } else {
        names
            .iter()
            .map(|n| {
                cfg.command
                    .get(n)
                    .ok_or_else(|| ProcrunError::CommandNotFound(n.clone()))
            })
            .collect::<Result<_>>()?
    };

    selected
        .into_iter()
        .map(|spec| {
            let command_line = spec.command_line.expand(resolver, &cfg.vars)?;
            Ok(PreparedCommand {
                name: spec.name.clone(),
                command_line,
                environment: spec.environment(),
                spec: spec.clone(),
            })
        })
        .collect()
}

/// Build the executor for one command. Each command gets its own watchdog.
pub fn executor_for(spec: &CommandSpec, opts: &RunOptions) -> (Executor, Option<Watchdog>) {
    let mut builder = Executor::builder()
        .exit_policy(spec.exit_policy.clone())
        .shared_stream_handler(Arc::clone(&opts.stream_handler));

    if let Some(ref dir) = spec.working_dir {
        builder = builder.working_directory(dir);
    }
    if let Some(ref destroyer) = opts.destroyer {
        builder = builder.process_destroyer(Arc::clone(destroyer));
    }

    let watchdog = spec.timeout.map(Watchdog::new);
    if let Some(ref dog) = watchdog {
        builder = builder.watchdog(dog.clone());
    }

    (builder.build(), watchdog)
}

/// Run prepared commands and collect their outcomes.
pub async fn run_commands(commands: Vec<PreparedCommand>, opts: &RunOptions) -> RunSummary {
    let mut summary = RunSummary::default();

    if opts.parallel {
        let mut pending = Vec::with_capacity(commands.len());
        for cmd in commands {
            if shutting_down(opts) {
                pending.push(Pending::Skipped(cmd.name));
                continue;
            }
            let (executor, watchdog) = executor_for(&cmd.spec, opts);
            let (handler, receiver) = DefaultResultHandler::new();
            info!(command = %cmd.name, line = %cmd.command_line, "starting command");
            executor.execute_async_with_env(&cmd.command_line, &cmd.environment, handler);
            pending.push(Pending::Running(cmd.name, receiver, watchdog));
        }
        for p in pending {
            summary.outcomes.push(match p {
                Pending::Running(name, receiver, watchdog) => {
                    let result = receiver.wait().await;
                    outcome(name, result, watchdog.as_ref())
                }
                Pending::Skipped(name) => skipped(name),
            });
        }
    } else {
        for cmd in commands {
            if shutting_down(opts) {
                summary.outcomes.push(skipped(cmd.name));
                continue;
            }
            let (executor, watchdog) = executor_for(&cmd.spec, opts);
            info!(command = %cmd.name, line = %cmd.command_line, "running command");
            let result = executor
                .execute_with_env(&cmd.command_line, &cmd.environment)
                .await;
            summary.outcomes.push(outcome(cmd.name, result, watchdog.as_ref()));
        }
    }

    summary
}

enum Pending {
    Running(String, ResultReceiver, Option<Watchdog>),
    Skipped(String),
}

fn shutting_down(opts: &RunOptions) -> bool {
    opts.destroyer.as_ref().is_some_and(|d| d.is_shutting_down())
}

fn skipped(name: String) -> CommandOutcome {
    warn!(command = %name, "shutdown in progress; skipping command");
    CommandOutcome {
        result: Err(ProcrunError::ShutdownInProgress(name.clone())),
        name,
        timed_out: false,
    }
}

fn outcome(name: String, result: Result<i32>, watchdog: Option<&Watchdog>) -> CommandOutcome {
    let timed_out = watchdog.is_some_and(Watchdog::killed_process);
    match result {
        Ok(code) => info!(command = %name, exit_code = code, "command finished"),
        Err(ref e) => error!(command = %name, timed_out, error = %e, "command failed"),
    }
    CommandOutcome {
        name,
        result,
        timed_out,
    }
}

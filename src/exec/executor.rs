// src/exec/executor.rs

//! The process executor.
//!
//! An [`Executor`] wraps an immutable [`ExecutorConfig`] built through
//! [`ExecutorBuilder`]. It is cheap to clone and can be reused for any number
//! of executions; each execution is independent, except that a configured
//! [`Watchdog`] only monitors one execution at a time.

use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;

use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::command_line::CommandLine;
use super::destroyer::ProcessDestroyer;
use super::env::Environment;
use super::handler::ResultHandler;
use super::policy::{ExitValuePolicy, INVALID_EXIT_VALUE};
use super::stream::{PumpStreamHandler, StreamHandler, StreamSession};
use super::watchdog::{WatchGuard, Watchdog};
use crate::errors::{ProcrunError, Result};

/// How long to wait for output pumps once the child has exited or was
/// killed. Grandchildren may keep the pipes open indefinitely.
const STREAM_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    exit_policy: ExitValuePolicy,
    stream_handler: Arc<dyn StreamHandler>,
    watchdog: Option<Watchdog>,
    process_destroyer: Option<Arc<dyn ProcessDestroyer>>,
    working_directory: Option<PathBuf>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            exit_policy: ExitValuePolicy::default(),
            stream_handler: Arc::new(PumpStreamHandler::logging()),
            watchdog: None,
            process_destroyer: None,
            working_directory: None,
        }
    }
}

impl ExecutorConfig {
    pub fn exit_policy(&self) -> &ExitValuePolicy {
        &self.exit_policy
    }

    pub fn stream_handler(&self) -> &Arc<dyn StreamHandler> {
        &self.stream_handler
    }

    pub fn watchdog(&self) -> Option<&Watchdog> {
        self.watchdog.as_ref()
    }

    pub fn process_destroyer(&self) -> Option<&Arc<dyn ProcessDestroyer>> {
        self.process_destroyer.as_ref()
    }

    /// `None` means the current working directory.
    pub fn working_directory(&self) -> Option<&Path> {
        self.working_directory.as_deref()
    }
}

/// Builder for [`Executor`]. Every setter overwrites what was set before.
#[derive(Debug, Clone, Default)]
pub struct ExecutorBuilder {
    config: ExecutorConfig,
}

impl ExecutorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept exactly one exit code.
    pub fn exit_value(mut self, code: i32) -> Self {
        self.config.exit_policy = ExitValuePolicy::single(code);
        self
    }

    /// See [`ExitValuePolicy::from_values`].
    pub fn exit_values(mut self, codes: Option<&[i32]>) -> Self {
        self.config.exit_policy = ExitValuePolicy::from_values(codes);
        self
    }

    pub fn exit_policy(mut self, policy: ExitValuePolicy) -> Self {
        self.config.exit_policy = policy;
        self
    }

    pub fn stream_handler(mut self, handler: impl StreamHandler + 'static) -> Self {
        self.config.stream_handler = Arc::new(handler);
        self
    }

    pub fn shared_stream_handler(mut self, handler: Arc<dyn StreamHandler>) -> Self {
        self.config.stream_handler = handler;
        self
    }

    pub fn watchdog(mut self, watchdog: Watchdog) -> Self {
        self.config.watchdog = Some(watchdog);
        self
    }

    pub fn process_destroyer(mut self, destroyer: Arc<dyn ProcessDestroyer>) -> Self {
        self.config.process_destroyer = Some(destroyer);
        self
    }

    pub fn working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.working_directory = Some(dir.into());
        self
    }

    pub fn build(self) -> Executor {
        Executor {
            config: Arc::new(self.config),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Executor {
    config: Arc<ExecutorConfig>,
}

impl Executor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> ExecutorBuilder {
        ExecutorBuilder::new()
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn exit_policy(&self) -> &ExitValuePolicy {
        self.config.exit_policy()
    }

    pub fn stream_handler(&self) -> &Arc<dyn StreamHandler> {
        self.config.stream_handler()
    }

    pub fn watchdog(&self) -> Option<&Watchdog> {
        self.config.watchdog()
    }

    pub fn process_destroyer(&self) -> Option<&Arc<dyn ProcessDestroyer>> {
        self.config.process_destroyer()
    }

    pub fn working_directory(&self) -> Option<&Path> {
        self.config.working_directory()
    }

    /// Run `cmd` with the inherited environment and wait for it to exit.
    ///
    /// Returns the exit code accepted by the exit-value policy.
    pub async fn execute(&self, cmd: &CommandLine) -> Result<i32> {
        run_process(&self.config, cmd, None).await
    }

    /// Run `cmd` with exactly `env` as its environment and wait for it to
    /// exit.
    pub async fn execute_with_env(&self, cmd: &CommandLine, env: &Environment) -> Result<i32> {
        run_process(&self.config, cmd, Some(env)).await
    }

    /// Start `cmd` in the background. `handler` is called exactly once with
    /// the outcome. Must be called from within a Tokio runtime.
    pub fn execute_async(
        &self,
        cmd: &CommandLine,
        handler: impl ResultHandler,
    ) -> JoinHandle<()> {
        self.spawn_execution(cmd.clone(), None, Box::new(handler))
    }

    /// Background variant of [`Self::execute_with_env`].
    pub fn execute_async_with_env(
        &self,
        cmd: &CommandLine,
        env: &Environment,
        handler: impl ResultHandler,
    ) -> JoinHandle<()> {
        self.spawn_execution(cmd.clone(), Some(env.clone()), Box::new(handler))
    }

    fn spawn_execution(
        &self,
        cmd: CommandLine,
        env: Option<Environment>,
        handler: Box<dyn ResultHandler>,
    ) -> JoinHandle<()> {
        let config = Arc::clone(&self.config);
        tokio::spawn(async move {
            let result = run_process(&config, &cmd, env.as_ref()).await;
            if let Err(ref e) = result {
                debug!(command = %cmd, error = %e, "async execution failed");
            }
            handler.handle(result);
        })
    }
}

async fn run_process(
    config: &ExecutorConfig,
    cmd: &CommandLine,
    env: Option<&Environment>,
) -> Result<i32> {
    let label = cmd.to_string();
    if config
        .process_destroyer
        .as_ref()
        .is_some_and(|d| d.is_shutting_down())
    {
        warn!(command = %label, "shutdown in progress; not starting process");
        return Err(ProcrunError::ShutdownInProgress(label));
    }

    let guard = config.watchdog.as_ref().map(Watchdog::start).transpose()?;

    let mut command = Command::new(cmd.program());
    command.args(cmd.arguments());
    if let Some(env) = env {
        command.env_clear().envs(env);
    }
    if let Some(ref dir) = config.working_directory {
        command.current_dir(dir);
    }
    config.stream_handler.configure(&mut command);
    command.kill_on_drop(true);

    let mut child = command.spawn().map_err(|source| ProcrunError::StartFailed {
        program: cmd.program().to_string(),
        source,
    })?;

    let pid = child.id();
    info!(
        command = %label,
        pid = ?pid,
        working_dir = ?config.working_directory,
        explicit_env = env.is_some(),
        "process started"
    );

    let registered = match (&config.process_destroyer, pid) {
        (Some(destroyer), Some(pid)) => {
            if !destroyer.add(pid) {
                // Nobody would kill this process on shutdown.
                warn!(command = %label, pid, "process destroyer refused registration; killing process");
                if let Err(e) = child.kill().await {
                    warn!(command = %label, error = %e, "failed to kill process");
                }
                return Err(ProcrunError::ShutdownInProgress(label));
            }
            Some((destroyer, pid))
        }
        _ => None,
    };

    let session = match config.stream_handler.start(&label, &mut child) {
        Ok(session) => session,
        Err(e) => {
            warn!(command = %label, error = %e, "stream handler failed to start; killing process");
            let _ = child.kill().await;
            if let Some((destroyer, pid)) = registered {
                destroyer.remove(pid);
            }
            return Err(e);
        }
    };

    let mut killed = false;
    let status = tokio::select! {
        status = child.wait() => status,
        _ = watchdog_expired(guard.as_ref()) => {
            warn!(command = %label, pid = ?pid, "watchdog fired; killing process");
            if let Err(e) = child.kill().await {
                warn!(command = %label, error = %e, "failed to kill process");
            }
            killed = true;
            if let Some(ref g) = guard {
                g.mark_killed();
            }
            child.wait().await
        }
    };

    if let Some((destroyer, pid)) = registered {
        destroyer.remove(pid);
    }

    let status = status?;

    if killed {
        session.finish_within(STREAM_DRAIN_TIMEOUT).await?;
    } else {
        drain_after_exit(session, guard.as_ref(), &label).await?;
    }

    let code = exit_code(status);
    info!(
        command = %label,
        exit_code = code,
        killed,
        policy = %config.exit_policy,
        "process exited"
    );

    if config.exit_policy.is_failure(code) {
        return Err(ProcrunError::ExitRejected {
            command: label,
            code,
        });
    }
    Ok(code)
}

/// The watchdog stays in charge while output drains, so a grandchild holding
/// the pipes cannot keep the execution alive past its deadline.
async fn drain_after_exit(
    session: StreamSession,
    guard: Option<&WatchGuard>,
    label: &str,
) -> Result<()> {
    let aborts = session.abort_handles();
    tokio::select! {
        biased;
        res = session.finish_within(STREAM_DRAIN_TIMEOUT) => res,
        _ = watchdog_expired(guard) => {
            warn!(command = %label, "watchdog fired while output was draining; abandoning remaining output");
            for a in aborts {
                a.abort();
            }
            Ok(())
        }
    }
}

async fn watchdog_expired(guard: Option<&WatchGuard>) {
    match guard {
        Some(g) => g.expired().await,
        None => std::future::pending().await,
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(INVALID_EXIT_VALUE)
}

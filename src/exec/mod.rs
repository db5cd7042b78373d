// src/exec/mod.rs

//! Process execution layer.
//!
//! This module launches external processes with `tokio::process::Command`
//! and supervises them until they exit.
//!
//! - [`command_line`] describes what to run.
//! - [`policy`] decides which exit codes count as success.
//! - [`stream`] owns the child's stdin/stdout/stderr.
//! - [`watchdog`] kills a process on timeout or on demand.
//! - [`destroyer`] kills registered processes on shutdown.
//! - [`executor`] ties these together behind four entry points
//!   (sync/async x inherited/explicit environment).
//! - [`handler`] delivers async results exactly once.

pub mod command_line;
pub mod destroyer;
pub mod env;
pub mod executor;
pub mod handler;
pub mod policy;
pub mod stream;
pub mod watchdog;

pub use command_line::CommandLine;
pub use destroyer::{ProcessDestroyer, ShutdownHookProcessDestroyer};
pub use env::{Environment, current_environment, inherit_with};
pub use executor::{Executor, ExecutorBuilder, ExecutorConfig};
pub use handler::{DefaultResultHandler, ResultHandler, ResultReceiver};
pub use policy::{ExitValuePolicy, INVALID_EXIT_VALUE};
pub use stream::{CapturedOutput, OutputTarget, PumpStreamHandler, StreamHandler, StreamSession};
pub use watchdog::Watchdog;

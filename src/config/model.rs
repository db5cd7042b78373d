// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::exec::{CommandLine, Environment, ExitValuePolicy};
use crate::resolve::MapContext;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [executor]
/// exit_values = [0]
/// timeout = "30s"
///
/// [vars]
/// profile = "release"
///
/// [env]
/// FOO = "bar"
///
/// [command.build]
/// cmd = "cargo build --${profile}"
/// ```
///
/// All sections are optional at the TOML level; validation requires at least
/// one command.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    /// Defaults from `[executor]`.
    #[serde(default)]
    pub executor: ExecutorSection,

    /// Values for `${...}` placeholders from `[vars]`.
    #[serde(default)]
    pub vars: BTreeMap<String, toml::Value>,

    /// Environment shared by all commands from `[env]`.
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// All commands from `[command.<name>]`.
    #[serde(default)]
    pub command: BTreeMap<String, CommandConfig>,
}

/// `[executor]` section: defaults that every command inherits.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutorSection {
    #[serde(default)]
    pub working_dir: Option<PathBuf>,

    /// Accepted exit codes; `[]` accepts every code. Defaults to `[0]`.
    #[serde(default)]
    pub exit_values: Option<Vec<i32>>,

    /// `false` turns exit-code checking off entirely.
    #[serde(default = "default_true")]
    pub check_exit: bool,

    /// Watchdog timeout, e.g. `"30s"`.
    #[serde(default)]
    pub timeout: Option<String>,

    /// If `false`, children only see `[env]` plus their own `env`.
    #[serde(default = "default_true")]
    pub inherit_env: bool,

    /// Kill running children on Ctrl-C.
    #[serde(default = "default_true")]
    pub destroy_on_shutdown: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ExecutorSection {
    fn default() -> Self {
        Self {
            working_dir: None,
            exit_values: None,
            check_exit: true,
            timeout: None,
            inherit_env: true,
            destroy_on_shutdown: true,
        }
    }
}

/// `[command.<name>]` section. Unset fields fall back to `[executor]`.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandConfig {
    /// Command line, split on whitespace with quote support.
    pub cmd: String,

    #[serde(default)]
    pub working_dir: Option<PathBuf>,

    #[serde(default)]
    pub exit_values: Option<Vec<i32>>,

    #[serde(default)]
    pub check_exit: Option<bool>,

    #[serde(default)]
    pub timeout: Option<String>,

    #[serde(default)]
    pub inherit_env: Option<bool>,

    /// Extra variables, applied on top of `[env]`.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// A validated configuration.
///
/// Only produced through `TryFrom<RawConfigFile>` (see `validate.rs`), so the
/// commands in it are guaranteed to parse and their timeouts are known.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub executor: ExecutorSection,
    pub vars: MapContext,
    pub env: BTreeMap<String, String>,
    pub command: BTreeMap<String, CommandSpec>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        executor: ExecutorSection,
        vars: MapContext,
        env: BTreeMap<String, String>,
        command: BTreeMap<String, CommandSpec>,
    ) -> Self {
        Self {
            executor,
            vars,
            env,
            command,
        }
    }

    pub fn command_names(&self) -> impl Iterator<Item = &str> {
        self.command.keys().map(String::as_str)
    }
}

/// Fully-resolved settings for one named command.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub name: String,
    /// Unexpanded; `${...}` placeholders are still in place.
    pub command_line: CommandLine,
    pub working_dir: Option<PathBuf>,
    pub exit_policy: ExitValuePolicy,
    pub timeout: Option<Duration>,
    /// If `false`, the child sees only `overlay`.
    pub inherit_env: bool,
    /// `[env]` merged with the command's own `env`.
    pub overlay: BTreeMap<String, String>,
}

impl CommandSpec {
    /// Environment to pass to the executor.
    pub fn environment(&self) -> Environment {
        if self.inherit_env {
            crate::exec::inherit_with(self.overlay.clone())
        } else {
            self.overlay.clone()
        }
    }
}

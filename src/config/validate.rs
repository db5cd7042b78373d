// src/config/validate.rs

use std::collections::BTreeMap;
use std::time::Duration;

use crate::config::duration::parse_duration;
use crate::config::model::{CommandConfig, CommandSpec, ConfigFile, ExecutorSection, RawConfigFile};
use crate::errors::{ProcrunError, Result};
use crate::exec::{CommandLine, ExitValuePolicy};
use crate::resolve::{MapContext, Value};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = ProcrunError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        ensure_has_commands(&raw)?;
        let default_timeout = parse_timeout("[executor].timeout", raw.executor.timeout.as_deref())?;
        validate_exit_settings("[executor]", raw.executor.exit_values.as_deref(), Some(raw.executor.check_exit))?;

        let vars = build_vars(&raw.vars)?;

        let mut commands = BTreeMap::new();
        for (name, cmd) in &raw.command {
            let spec = build_command(name, cmd, &raw.executor, default_timeout, &raw.env)?;
            commands.insert(name.clone(), spec);
        }

        Ok(ConfigFile::new_unchecked(raw.executor, vars, raw.env, commands))
    }
}

fn ensure_has_commands(cfg: &RawConfigFile) -> Result<()> {
    if cfg.command.is_empty() {
        return Err(ProcrunError::ConfigError(
            "config must contain at least one [command.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn parse_timeout(field: &str, value: Option<&str>) -> Result<Option<Duration>> {
    let Some(s) = value else {
        return Ok(None);
    };
    let d = parse_duration(s)
        .map_err(|e| ProcrunError::ConfigError(format!("{field}: {e}")))?;
    if d.is_zero() {
        return Err(ProcrunError::ConfigError(format!(
            "{field} must be greater than zero"
        )));
    }
    Ok(Some(d))
}

/// `check_exit = false` together with an explicit code list is contradictory.
fn validate_exit_settings(
    section: &str,
    exit_values: Option<&[i32]>,
    check_exit: Option<bool>,
) -> Result<()> {
    if exit_values.is_some() && check_exit == Some(false) {
        return Err(ProcrunError::ConfigError(format!(
            "{section}: exit_values cannot be combined with check_exit = false"
        )));
    }
    Ok(())
}

fn build_command(
    name: &str,
    cmd: &CommandConfig,
    defaults: &ExecutorSection,
    default_timeout: Option<Duration>,
    global_env: &BTreeMap<String, String>,
) -> Result<CommandSpec> {
    let section = format!("[command.{name}]");

    let command_line = CommandLine::parse(&cmd.cmd)
        .map_err(|e| ProcrunError::ConfigError(format!("{section}.cmd: {e}")))?;

    validate_exit_settings(&section, cmd.exit_values.as_deref(), cmd.check_exit)?;
    let exit_policy = effective_policy(cmd, defaults);

    let timeout = match cmd.timeout.as_deref() {
        Some(t) => parse_timeout(&format!("{section}.timeout"), Some(t))?,
        None => default_timeout,
    };

    let mut overlay = global_env.clone();
    overlay.extend(cmd.env.iter().map(|(k, v)| (k.clone(), v.clone())));

    Ok(CommandSpec {
        name: name.to_string(),
        command_line,
        working_dir: cmd.working_dir.clone().or_else(|| defaults.working_dir.clone()),
        exit_policy,
        timeout,
        inherit_env: cmd.inherit_env.unwrap_or(defaults.inherit_env),
        overlay,
    })
}

/// Command settings win over `[executor]`; an explicit `check_exit = false`
/// on the command wins over everything.
fn effective_policy(cmd: &CommandConfig, defaults: &ExecutorSection) -> ExitValuePolicy {
    if cmd.check_exit == Some(false) {
        return ExitValuePolicy::Unchecked;
    }
    if let Some(ref values) = cmd.exit_values {
        return ExitValuePolicy::from_values(Some(values.as_slice()));
    }
    if cmd.check_exit.is_none() && !defaults.check_exit {
        return ExitValuePolicy::Unchecked;
    }
    match defaults.exit_values {
        Some(ref values) => ExitValuePolicy::from_values(Some(values.as_slice())),
        None => ExitValuePolicy::default(),
    }
}

fn build_vars(vars: &BTreeMap<String, toml::Value>) -> Result<MapContext> {
    let mut ctx = MapContext::new();
    for (name, raw) in vars {
        let value = convert_value(raw).map_err(|kind| {
            ProcrunError::ConfigError(format!(
                "[vars].{name}: unsupported value type {kind}"
            ))
        })?;
        ctx.set(name.clone(), value);
    }
    Ok(ctx)
}

fn convert_value(v: &toml::Value) -> std::result::Result<Value, &'static str> {
    Ok(match v {
        toml::Value::String(s) => Value::Str(s.clone()),
        toml::Value::Integer(i) => Value::Int(*i),
        toml::Value::Float(x) => Value::Float(*x),
        toml::Value::Boolean(b) => Value::Bool(*b),
        toml::Value::Array(items) => {
            Value::List(items.iter().map(convert_value).collect::<std::result::Result<_, _>>()?)
        }
        toml::Value::Datetime(_) => return Err("datetime"),
        toml::Value::Table(_) => return Err("table"),
    })
}

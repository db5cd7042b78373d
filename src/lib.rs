// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod resolve;
pub mod runner;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Result, bail};
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{ConfigFile, default_config_path, load_and_validate};
use crate::exec::{ProcessDestroyer, PumpStreamHandler, ShutdownHookProcessDestroyer};
use crate::resolve::ResolverChain;
use crate::runner::{PreparedCommand, RunOptions, prepare_commands, run_commands};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - `${...}` expansion through the standard resolver chain
/// - the process destroyer + Ctrl-C hook
/// - sequential or parallel execution
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = args
        .config
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path);
    let cfg = load_and_validate(&config_path)?;

    let resolver = ResolverChain::standard();
    let commands = prepare_commands(&cfg, &args.commands, &resolver)?;

    if args.dry_run {
        print_dry_run(&cfg, &commands);
        return Ok(());
    }

    let destroyer: Option<Arc<dyn ProcessDestroyer>> = if cfg.executor.destroy_on_shutdown {
        let d = Arc::new(ShutdownHookProcessDestroyer::new());
        d.install_ctrl_c_hook();
        Some(d)
    } else {
        None
    };

    let opts = RunOptions {
        parallel: args.parallel,
        stream_handler: Arc::new(PumpStreamHandler::inherit()),
        destroyer,
    };

    info!(
        config = %config_path.display(),
        commands = commands.len(),
        parallel = opts.parallel,
        "starting run"
    );

    let summary = run_commands(commands, &opts).await;
    let failed: Vec<&str> = summary.failures().map(|o| o.name.as_str()).collect();
    if !failed.is_empty() {
        bail!("{} command(s) failed: {}", failed.len(), failed.join(", "));
    }
    Ok(())
}

/// Simple dry-run output: print each command as it would be launched.
fn print_dry_run(cfg: &ConfigFile, commands: &[PreparedCommand]) {
    println!("procrun dry-run");
    println!(
        "  executor.destroy_on_shutdown = {}",
        cfg.executor.destroy_on_shutdown
    );
    println!();

    println!("commands ({}):", commands.len());
    for cmd in commands {
        println!("  - {}", cmd.name);
        println!("      cmd: {}", cmd.command_line);
        println!("      exit: {}", cmd.spec.exit_policy);
        if let Some(ref dir) = cmd.spec.working_dir {
            println!("      working_dir: {}", dir.display());
        }
        if let Some(timeout) = cmd.spec.timeout {
            println!("      timeout: {timeout:?}");
        }
        if !cmd.spec.inherit_env {
            println!("      env: {:?}", cmd.environment);
        } else if !cmd.spec.overlay.is_empty() {
            println!("      env (overlay): {:?}", cmd.spec.overlay);
        }
    }

    debug!("dry-run complete (no execution)");
}

//! Background watcher that restores files git reports as modified only
//! because of pending line-ending or filter normalization.
//!
//! Repositories and the poll interval live in a TOML config file
//! (`retouch config path` shows where).

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use retouch::check::RepoChecker;
use retouch::control::{describe_cycle, describe_event, spawn_console};
use retouch::core::types::Trigger;
use retouch::exit_codes;
use retouch::io::config::{WatcherConfig, default_config_path, load_config, write_config};
use retouch::io::opener::open_for_editing;
use retouch::io::probe::FsProbe;
use retouch::logging;
use retouch::watch::{WatchEvent, Watcher, WatcherState};
use tracing::info;

#[derive(Parser)]
#[command(
    name = "retouch",
    version,
    about = "Restore files git reports as modified only because of pending normalization"
)]
struct Cli {
    /// Config file (defaults to the per-user config directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Watch configured repositories until stopped. Reads commands from stdin.
    Watch,
    /// Check every configured repository once and exit.
    Check {
        /// Print the cycle summary as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Inspect or edit the config file.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the config file path.
    Path,
    /// Print the effective config.
    Show,
    /// Write the default config.
    Init {
        /// Overwrite an existing file.
        #[arg(short, long)]
        force: bool,
    },
    /// Open the config file in an editor.
    Open,
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let config_path = match cli.config {
        Some(path) => path,
        None => default_config_path()?,
    };
    match cli.command {
        Command::Watch => cmd_watch(&config_path),
        Command::Check { json } => cmd_check(&config_path, json),
        Command::Config { action } => cmd_config(&config_path, action),
    }
}

fn cmd_watch(config_path: &Path) -> Result<i32> {
    let cfg = load_config(config_path)?;
    info!(config = %config_path.display(), "starting watcher");

    let checker = RepoChecker::new(cfg.process_runner(), FsProbe, cfg.classifier());
    let reload_path = config_path.to_path_buf();
    let watcher = Watcher::spawn(checker, WatcherState::from_config(&cfg), move || {
        load_config(&reload_path)
    })?;

    spawn_console(watcher.handle(), config_path.to_path_buf())?;
    #[cfg(unix)]
    retouch::control::spawn_signal_listener(watcher.handle())?;

    for event in watcher.events().iter() {
        println!("{}", describe_event(&event));
        if event == WatchEvent::Stopped {
            break;
        }
    }
    watcher.join()?;
    Ok(exit_codes::OK)
}

fn cmd_check(config_path: &Path, json: bool) -> Result<i32> {
    let cfg = load_config(config_path)?;
    let checker = RepoChecker::new(cfg.process_runner(), FsProbe, cfg.classifier());
    let summary = checker.run_cycle(&cfg.repositories(), Trigger::Manual, &AtomicBool::new(true));

    if json {
        let payload = serde_json::to_string_pretty(&summary).context("serialize summary")?;
        println!("{payload}");
    } else {
        println!("{}", describe_cycle(&summary));
    }

    if summary.failed_count() > 0 {
        return Ok(exit_codes::REPAIR_FAILED);
    }
    Ok(exit_codes::OK)
}

fn cmd_config(config_path: &Path, action: ConfigAction) -> Result<i32> {
    match action {
        ConfigAction::Path => println!("{}", config_path.display()),
        ConfigAction::Show => {
            let cfg = load_config(config_path)?;
            print!("{}", toml::to_string_pretty(&cfg).context("serialize config toml")?);
        }
        ConfigAction::Init { force } => {
            if !force && config_path.exists() {
                bail!(
                    "{} already exists (use --force to overwrite)",
                    config_path.display()
                );
            }
            write_config(config_path, &WatcherConfig::bootstrap())?;
            println!("wrote {}", config_path.display());
        }
        ConfigAction::Open => {
            load_config(config_path)?;
            open_for_editing(config_path)?;
        }
    }
    Ok(exit_codes::OK)
}

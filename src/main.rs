//! Mount a Subversion repository as a read-only filesystem, without a
//! working copy.
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{debug, error};

mod app_config;
mod daemon;
mod fuse_check;
mod trc;

use crate::app_config::Config;
use crate::trc::Trc;

#[derive(Parser)]
#[command(version, about = "A read-only FUSE filesystem for svn repositories.")]
struct Args {
    #[arg(short, long, value_parser, help = "Optional path to a config TOML.")]
    config_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Mount the repository and serve it until interrupted.
    Run {
        /// Repository URL. Overrides the `repository` key in the config.
        repository: Option<String>,

        /// Run the daemon in the background.
        #[arg(short, long, help = "Run the daemon in the background.")]
        daemonize: bool,
    },
}

fn run_foreground(config: Config, repository: String) {
    if let Err(e) = Trc::default().init() {
        eprintln!("Failed to initialize logging: {e}");
        std::process::exit(1);
    }

    if let Err(e) = fuse_check::ensure_fuse() {
        error!("{e}");
        std::process::exit(1);
    }

    if let Err(e) = daemon::spawn(config, repository) {
        error!("Daemon failed: {e}");
        std::process::exit(1);
    }
}

/// Detaches from the terminal, then runs the daemon.
///
/// Logging is initialized only after the fork so the subscriber never
/// holds file descriptors across it.
fn run_daemonized(config: Config, repository: String) {
    // Safe: Config.validate() guarantees pid_file has a parent.
    let pid_file_parent = config
        .daemon
        .pid_file
        .parent()
        .unwrap_or_else(|| unreachable!("Config.validate() ensures pid_file has a parent"));
    if let Err(e) = std::fs::create_dir_all(pid_file_parent) {
        eprintln!("Failed to create PID file directory: {e}");
        std::process::exit(1);
    }

    let daemonize = daemonize::Daemonize::new()
        .pid_file(&config.daemon.pid_file)
        .chown_pid_file(true)
        .user(config.uid)
        .group(config.gid);

    match daemonize.start() {
        Ok(()) => {
            // stdout/stderr are gone after the fork, so there is nowhere to
            // report a subscriber failure.
            if Trc::default().for_daemon().init().is_err() {
                std::process::exit(1);
            }
            debug!(config = ?config, "Daemonized with configuration.");

            if let Err(e) = fuse_check::ensure_fuse() {
                error!("{e}");
                std::process::exit(1);
            }

            if let Err(e) = daemon::spawn(config, repository) {
                error!("Daemon failed: {e}");
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("Failed to spawn the daemon: {e}");
            std::process::exit(1);
        }
    }
}

/// Main entry point for the application.
fn main() {
    let args = Args::parse();

    // Errors use eprintln since tracing isn't initialized yet.
    let config = Config::load(args.config_path.as_deref()).unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {e}");
        std::process::exit(1);
    });
    if let Err(error_messages) = config.validate() {
        eprintln!("Configuration is invalid.");
        for msg in &error_messages {
            eprintln!(" - {msg}");
        }
        std::process::exit(1);
    }

    match args.command.unwrap_or(Command::Run {
        repository: None,
        daemonize: false,
    }) {
        Command::Run {
            repository,
            daemonize,
        } => {
            let Some(repository) = repository.or_else(|| config.repository.clone()) else {
                eprintln!(
                    "No repository URL given. Pass one as an argument to `run` or set \
                     `repository` in the config."
                );
                std::process::exit(1);
            };

            if daemonize {
                run_daemonized(config, repository);
            } else {
                run_foreground(config, repository);
            }
        }
    }
}

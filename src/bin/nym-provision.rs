//! nym-provision - install a working nym-node binary
//!
//! Usage:
//!   nym-provision                    Install the latest release to ~/.local/bin
//!   nym-provision v1.2.3             Install a specific release
//!   nym-provision --dest /opt/bin    Install somewhere else
//!   nym-provision --build-from-source
//!
//! Exit codes: 0 success, 2 configuration, 3 version resolution,
//! 4 acquisition, 5 integrity, 6 installation, 130 interrupted.

use anyhow::{Context, Result};
use clap::Parser;
use nym_provision::core::config::{self, ConfigToml};
use nym_provision::core::workspace;
use nym_provision::{
    Pipeline, ProductionCollaborators, ProvisionConfig, ProvisionError, Reporter, Verbosity,
    VersionSpec,
};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

/// Exit status after Ctrl-C, as a shell reports SIGINT
const EXIT_INTERRUPTED: i32 = 130;

/// Default install directory (~/.local/bin)
fn default_destination() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Cannot determine home directory; pass --dest")?;
    Ok(home.join(".local").join("bin"))
}

#[derive(Parser)]
#[command(name = "nym-provision")]
#[command(about = "Download or build nym-node and install it")]
#[command(version)]
struct Cli {
    /// Release tag to install, or "latest"
    #[arg(id = "spec", value_name = "VERSION", default_value = "latest")]
    spec: VersionSpec,

    /// Installation directory [default: ~/.local/bin]
    #[arg(short, long, env = "NYM_PROVISION_DEST")]
    dest: Option<PathBuf>,

    /// Never prompt; take the default answer to every question
    #[arg(short, long, conflicts_with = "interactive")]
    yes: bool,

    /// Prompt even when stdin is not a terminal
    #[arg(long)]
    interactive: bool,

    /// Only print warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Echo every external command
    #[arg(short, long)]
    verbose: bool,

    /// Compile from source even where a pre-built binary exists
    #[arg(long)]
    build_from_source: bool,

    /// Extra config file, applied after the XDG config files
    #[arg(short, long, env = "NYM_PROVISION_CONFIG")]
    config: Option<PathBuf>,
}

impl Cli {
    /// Apply command-line overrides on top of the file configuration.
    fn overlay(&self, mut file: ConfigToml) -> ProvisionConfig {
        if self.yes {
            file.interactive = Some(false);
        } else if self.interactive {
            file.interactive = Some(true);
        } else if file.interactive.is_none() {
            file.interactive = Some(std::io::stdin().is_terminal());
        }

        if self.quiet {
            file.verbosity = Some(Verbosity::Quiet);
        } else if self.verbose {
            file.verbosity = Some(Verbosity::Verbose);
        }

        let mut resolved = file.resolve();
        resolved.force_build = self.build_from_source;
        resolved
    }
}

fn load_config(cli: &Cli) -> Result<(ProvisionConfig, PathBuf)> {
    let file = config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let resolved = cli.overlay(file);
    let dest = match &cli.dest {
        Some(dest) => dest.clone(),
        None => default_destination()?,
    };
    Ok((resolved, dest))
}

fn report(reporter: &Reporter, err: &ProvisionError) {
    reporter.error(&format!("[{}] {err}", err.stage()));
    if err.is_integrity_failure() {
        reporter.error("the downloaded file does not match the published checksum; nothing was installed");
    }
}

/// Remove the run's workspace on Ctrl-C before exiting.
fn install_interrupt_handler() -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(|| {
        workspace::discard_active();
        Reporter::default().error("interrupted; temporary files removed");
        std::process::exit(EXIT_INTERRUPTED);
    })
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let (config, dest) = match load_config(&cli) {
        Ok(loaded) => loaded,
        Err(e) => {
            let err = ProvisionError::Config(format!("{e:#}"));
            report(&Reporter::default(), &err);
            return ExitCode::from(err.exit_code());
        }
    };

    let reporter = Reporter::new(config.verbosity);
    if let Err(e) = install_interrupt_handler() {
        reporter.warning(&format!("cannot handle Ctrl-C: {e}"));
    }
    let production = ProductionCollaborators::new(&config);
    match Pipeline::new(&config, production.collaborators()).run(&cli.spec, &dest) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            report(&reporter, &err);
            ExitCode::from(err.exit_code())
        }
    }
}

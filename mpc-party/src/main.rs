mod demo;

use demo::{INPUT_LENGTH, SumOfInputs};

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use mpc_substrate::bootstrap::{PartyLauncher, PartyReport, cleanup_stale_endpoints, run_party};
use mpc_substrate::config::NetworkConfig;
use mpc_substrate::errors::MpcError;
use mpc_substrate::network::SocketFactory;
use mpc_substrate::topology::Topology;

#[derive(Parser, Debug)]
#[command(name = "mpc-party")]
#[command(about = "Runs an N-party computation over local sockets", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start every party: clean up old endpoints, spawn the others, run the last one here
    Launch {
        /// JSON network config; defaults apply when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Run a single party (started by `launch`)
    Party {
        /// Party ID (0 to n-1)
        #[arg(short, long)]
        pid: usize,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn load_config(path: Option<&Path>) -> Result<NetworkConfig, MpcError> {
    match path {
        Some(path) => NetworkConfig::load(path),
        None => {
            let config = NetworkConfig::default();
            config.validate()?;
            Ok(config)
        }
    }
}

fn run_as(pid: usize, config: &NetworkConfig) -> Result<PartyReport, MpcError> {
    let topology = Topology::new(config.parties, config.base_port)?;
    if pid >= topology.parties() {
        return Err(MpcError::Topology(format!(
            "P{} is not one of {} parties",
            pid,
            topology.parties()
        )));
    }
    let factory = SocketFactory::new(config.clone());
    let report = run_party(pid, &topology, &factory, &mut SumOfInputs::new(INPUT_LENGTH))?;
    log::debug!("[P{}] report: {}", pid, serde_json::to_string(&report)?);
    Ok(report)
}

fn launch(config_path: Option<PathBuf>) -> Result<(), MpcError> {
    let config = load_config(config_path.as_deref())?;
    let topology = Topology::new(config.parties, config.base_port)?;
    let removed = cleanup_stale_endpoints(&config, &topology)?;
    if removed > 0 {
        log::info!("removed {} stale endpoints", removed);
    }

    let mut launcher = PartyLauncher::current_exe(config.parties)?;
    if let Some(path) = config_path {
        launcher = launcher.with_config(path);
    }
    let children = launcher.spawn()?;
    log::info!("launched {} child parties", children.len());

    let driver = run_as(launcher.driver_pid(), &config);
    children.finish(driver).map(|_| ())
}

fn main() -> ExitCode {
    // Log to stderr; `RUST_LOG=debug` for per-channel detail.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Launch { config } => launch(config),
        Commands::Party { pid, config } => {
            load_config(config.as_deref()).and_then(|config| run_as(pid, &config).map(|_| ()))
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

// ABOUTME: atactl - command-line front end for antenna reservation and device control.
// ABOUTME: Runs against the real daemons, or against a simulated array with --dry-run.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use ata_control::prelude::*;

#[derive(Parser)]
#[command(
    name = "atactl",
    version,
    about = "Reserve antennas and drive their RF chain",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML). Defaults apply when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (compact, json)
    #[arg(long, global = true, default_value = "compact")]
    log_format: LogFormat,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Run against an in-memory array seeded from [array].antennas
    #[arg(long, global = true)]
    dry_run: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List the members of a group
    List {
        /// Group name, e.g. none, bfa, maint
        group: String,
    },

    /// Reserve antennas (idle group to reserved group)
    Reserve {
        /// Comma-separated antennas, e.g. 1a,1c,2h
        antennas: String,
    },

    /// Release antennas back to the idle group
    Release {
        /// Comma-separated antennas
        antennas: String,

        /// Park each antenna after the release
        #[arg(long)]
        park: bool,
    },

    /// Move antennas between arbitrary groups
    Move {
        #[arg(long)]
        from: String,

        #[arg(long)]
        to: String,

        /// Comma-separated antennas
        antennas: String,
    },

    /// Set RF switch attenuators
    Atten {
        /// Comma-separated dB values, one per antpol
        #[arg(long)]
        db: String,

        /// Comma-separated antenna-polarisations, e.g. 1ax,1ay
        antpols: String,
    },

    /// Route antennas through the RF switch
    Rfswitch {
        /// Comma-separated antennas
        antennas: String,
    },

    /// Switch LNAs on or off
    Lna {
        /// on or off
        state: LnaState,

        /// Comma-separated antennas
        antennas: String,
    },

    /// Query LNA state per antenna
    LnaStatus {
        /// Comma-separated antennas
        antennas: String,
    },

    /// Read PAM attenuator values
    Pams {
        /// Comma-separated antennas
        antennas: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.log_format).context("failed to initialize logging")?;

    let config = match &cli.config {
        Some(path) => AtaConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => AtaConfig::default(),
    };

    let gateway: Arc<dyn Gateway> = if cli.dry_run {
        tracing::info!(
            antennas = config.array.antennas.len(),
            "dry run against simulated array"
        );
        Arc::new(SimulatedArray::idle(
            &config.membership,
            config.array.antennas.clone(),
        ))
    } else {
        Arc::new(ProcessGateway::new(config.gateway.clone()))
    };

    let executor = FanOutExecutor::new(&config.fanout);
    let coordinator =
        AntennaCoordinator::new(gateway.clone(), &config).with_executor(executor.clone());
    let devices = DeviceController::new(gateway, &config).with_executor(executor);

    match cli.command {
        Commands::List { group } => {
            let members = coordinator.registry().list(&Group::new(group)).await?;
            if cli.json {
                println!("{}", serde_json::to_string(&members)?);
            } else {
                println!("{}", AntennaId::join(&members));
            }
        }

        Commands::Reserve { antennas } => {
            let ants = antenna_list(&antennas)?;
            coordinator.reserve(&ants).await?;
            println!("reserved {}", AntennaId::join(&ants));
        }

        Commands::Release { antennas, park } => {
            let ants = antenna_list(&antennas)?;
            let report = coordinator.release(&ants, park).await?;
            println!("released {}", AntennaId::join(&report.released));
            if park {
                println!("parked {}", AntennaId::join(&report.parked));
                for failure in &report.park_failures {
                    eprintln!("park failed: {}", failure);
                }
            }
        }

        Commands::Move { from, to, antennas } => {
            let ants = antenna_list(&antennas)?;
            coordinator
                .move_antennas(&ants, &Group::new(from.as_str()), &Group::new(to.as_str()))
                .await?;
            println!("moved {} from {} to {}", AntennaId::join(&ants), from, to);
        }

        Commands::Atten { db, antpols } => {
            let antpols: Vec<String> = antpols
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
            let dbs = db_list(&db)?;
            let stdout = devices.set_attenuation(&antpols, &dbs).await?;
            print!("{}", stdout);
        }

        Commands::Rfswitch { antennas } => {
            let ants = antenna_list(&antennas)?;
            devices.set_rf_switch(&ants).await?;
            println!("rf switch set for {}", AntennaId::join(&ants));
        }

        Commands::Lna { state, antennas } => {
            let ants = antenna_list(&antennas)?;
            devices.set_lna(&ants, state).await?;
            println!("LNAs {} for {}", state, AntennaId::join(&ants));
        }

        Commands::LnaStatus { antennas } => {
            let ants = antenna_list(&antennas)?;
            let report = devices.lna_states(&ants).await?;
            let mut failed = false;
            for outcome in report.outcomes() {
                match &outcome.result {
                    Ok(state) => println!("{} {}", outcome.target, state),
                    Err(e) => {
                        failed = true;
                        eprintln!("{} error: {}", outcome.target, e);
                    }
                }
            }
            if failed {
                anyhow::bail!("LNA status query failed for some antennas");
            }
        }

        Commands::Pams { antennas } => {
            let ants = antenna_list(&antennas)?;
            let pams = devices.get_pams(&ants).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&pams)?);
            } else {
                for (antpol, value) in &pams {
                    println!("{} {}", antpol, value);
                }
            }
        }
    }

    Ok(())
}

fn antenna_list(list: &str) -> Result<Vec<AntennaId>> {
    let ants = AntennaId::parse_list(list);
    if ants.is_empty() {
        anyhow::bail!("no antennas given");
    }
    Ok(ants)
}

fn db_list(list: &str) -> Result<Vec<f64>> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<f64>()
                .with_context(|| format!("invalid attenuation value '{}'", s))
        })
        .collect()
}

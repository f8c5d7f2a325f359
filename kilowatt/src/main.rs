use clap::{Parser, Subcommand};
use resolver::TariffResolver;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

mod config;
use config::Config;

/// Residential tariff lookup for Brazilian electricity distributors.
#[derive(Parser)]
#[command(name = "kilowatt")]
struct Cli {
    /// Path to a YAML configuration file.
    #[arg(long, short)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the CORS relay for browser clients.
    Relay,
    /// Resolve distributor tariffs and print them.
    Resolve {
        /// Two-letter state code; restricts output to that state's
        /// distributors and enables the municipality listing.
        #[arg(long)]
        state: Option<String>,
        /// Also list the state's municipalities.
        #[arg(long)]
        cities: bool,
        /// Monthly spend in BRL; prints the estimated consumption per
        /// distributor.
        #[arg(long)]
        spend: Option<f64>,
    },
}

#[derive(thiserror::Error, Debug)]
enum AppError {
    #[error("{0}")]
    Config(#[from] config::ConfigError),
    #[error("{0}")]
    Relay(#[from] relay::RelayServerError),
    #[error("{0}")]
    Resolve(#[from] resolver::ResolveError),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if let Err(error) = run(cli).await {
        tracing::error!(%error, "exiting");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Command::Relay => {
            relay::run(config.relay).await?;
        }
        Command::Resolve {
            state,
            cities,
            spend,
        } => {
            resolve(config, state, cities, spend).await?;
        }
    }

    Ok(())
}

/// Thin output adapter over the resolver; all data shaping lives in
/// the library.
async fn resolve(
    config: Config,
    state: Option<String>,
    cities: bool,
    spend: Option<f64>,
) -> Result<(), AppError> {
    let resolver = TariffResolver::new(config.resolver);
    let resolved = resolver.resolve().await?;

    let Some(state) = state.map(|s| s.to_uppercase()) else {
        for state in resolved.states() {
            println!("{state}");
        }
        return Ok(());
    };

    for code in resolved.distributors(&state) {
        // distributors() only offers codes with a known tariff.
        let tariff = resolved.tariff(code).unwrap_or_default();
        match spend {
            Some(spend) if tariff > 0.0 => {
                println!("{code}\tR$ {tariff:.4}/kWh\t~{:.0} kWh", spend / tariff)
            }
            _ => println!("{code}\tR$ {tariff:.4}/kWh"),
        }
    }

    if cities {
        for city in resolver.municipalities(&state).await {
            println!("{city}");
        }
    }

    Ok(())
}

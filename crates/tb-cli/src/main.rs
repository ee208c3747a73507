use std::io;
use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use tb_cli::commands::{add, delete, rename, reset, status, switch, util, watch};
use tb_cli::{Cli, Commands, Config};

fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        // No subcommand, show help
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let config = load_config(cli.config.as_deref())?;
    let now = util::resolve_now(cli.at.as_deref())?;
    let mut stdout = io::stdout().lock();

    match command {
        Commands::Add { name } => add::run(&mut stdout, name, &config, now)?,
        Commands::Switch { name } => switch::run(&mut stdout, name, &config, now)?,
        Commands::Pause => switch::pause(&mut stdout, &config, now)?,
        Commands::Status { json } => status::run(&mut stdout, &config, now, *json)?,
        Commands::Reset { name } => reset::run(&mut stdout, name, &config, now)?,
        Commands::Clear => reset::clear(&mut stdout, &config, now)?,
        Commands::Delete { name } => delete::run(&mut stdout, name, &config, now)?,
        Commands::Rename { from, to } => rename::run(&mut stdout, from, to, &config, now)?,
        Commands::Watch { ticks } => {
            if cli.at.is_some() {
                bail!("watch follows the live clock and does not accept --at");
            }
            watch::run(&mut stdout, &config, *ticks)?;
        }
    }

    Ok(())
}

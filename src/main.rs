//! suseapi - Command line access to SUSE internal services
//!
//! This is the main entry point for the suseapi CLI.

mod cli;

use anyhow::Result;
use cli::commands::CommandContext;
use cli::{Cli, Commands};
use suseapi::config::Config;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Application version information
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    if cli.verbosity() >= 2 {
        eprintln!("suseapi v{}", VERSION);
    }

    // Load configuration
    let config = match Config::load(cli.config.as_ref()) {
        Ok(config) => config,
        Err(e) if cli.command.needs_config() => {
            eprintln!("{:#}", e);
            std::process::exit(1);
        }
        Err(e) => {
            tracing::debug!("Using default configuration: {:#}", e);
            Config::default()
        }
    };

    // Create command context
    let mut ctx = CommandContext::new(&cli, config);

    // Execute the appropriate command
    let result = match &cli.command {
        Commands::LookupUser(args) => args.execute(&mut ctx).await,
        Commands::Department(args) => args.execute(&mut ctx).await,
        Commands::Absence(args) => args.execute(&mut ctx).await,
        Commands::Bug(args) => args.execute(&mut ctx).await,
        Commands::SrStatus(args) => args.execute(&mut ctx).await,
        Commands::SrInfo(args) => args.execute(&mut ctx).await,
        Commands::Maintained(args) => args.execute(&mut ctx).await,
        Commands::Codestream(args) => args.execute(&mut ctx).await,
    };

    let exit_code = match result {
        Ok(code) => code,
        Err(e) => {
            ctx.output.error(&format!("{:#}", e));
            1
        }
    };

    std::process::exit(exit_code);
}

/// Initialize logging based on verbosity level
fn init_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(verbosity >= 3))
        .with(env_filter)
        .init();
}

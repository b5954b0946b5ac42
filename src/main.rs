use clap::Parser;
use fibcache::cli::{Cli, Commands};
use fibcache::types::config::Config;
use fibcache::FibcacheResult;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> FibcacheResult<()> {
    let cli = Cli::parse();

    // Load configuration first (no logging yet)
    let config = if cli.config.exists() {
        Config::load(&cli.config)?
    } else {
        Config::default_config()
    };

    // CLI flags take precedence over config
    let log_level = if cli.quiet {
        "error".to_string()
    } else if cli.verbose {
        "debug".to_string()
    } else {
        config.general.log_level.clone()
    };

    let filter = EnvFilter::from_default_env().add_directive(
        format!("fibcache={}", log_level)
            .parse()
            .unwrap_or_else(|_| "fibcache=info".parse().expect("fallback directive is valid")),
    );

    let registry = tracing_subscriber::registry().with(filter);
    if config.general.log_format == "json" {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    tracing::debug!("Configuration loaded from: {}", cli.config.display());

    match cli.command {
        Commands::Compute { indices, json } => {
            fibcache::cli::commands::compute(&indices, json, &config).await?;
        }
        Commands::Sequence { upto } => {
            fibcache::cli::commands::sequence(&upto, &config).await?;
        }
        Commands::Init { path } => {
            fibcache::cli::commands::init(path).await?;
        }
        Commands::Config => {
            fibcache::cli::commands::config_cmd(&config)?;
        }
        Commands::Version => {
            fibcache::cli::commands::version();
        }
    }

    Ok(())
}

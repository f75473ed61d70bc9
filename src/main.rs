mod cli;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use medley::{config, metrics::MetricsLedger, providers, server};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on the
    // verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "medley=trace,tower_http=debug".to_string()
        } else {
            "medley=debug,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Serve { host, port } => {
            let mut config = config::load_config_or_default(cli.config.as_deref())?;
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }

            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(server::start_server(config))
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Test { provider } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(test_provider(&provider, cli.config.as_deref()))
        }
        Commands::Version => {
            println!("medley {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn validate_config(path: Option<&std::path::Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            println!("  Providers: {}", config.providers.len());
            println!(
                "    Enabled: {}",
                config.providers.iter().filter(|p| p.enabled).count()
            );
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            println!("  Server: {}:{}", config.server.host, config.server.port);
        }
    }

    Ok(())
}

async fn test_provider(name: &str, config_path: Option<&std::path::Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let entry = config
        .providers
        .iter()
        .find(|p| p.name == name)
        .ok_or_else(|| anyhow::anyhow!("No provider named '{}' in config", name))?;

    if !entry.enabled {
        anyhow::bail!("Provider '{}' is disabled", name);
    }

    let metrics = Arc::new(MetricsLedger::new());
    let provider = providers::create_provider(entry, metrics)?;

    println!("Testing connection to '{}' ({})...", name, entry.kind);
    match provider.test_connection().await {
        Ok(meta) => {
            println!("✓ Connected: {} ({})", meta.name, meta.version);
            println!("  Server ID: {}", meta.id);
            Ok(())
        }
        Err(error) => {
            println!("✗ Connection failed: {}", error);
            if let Some(status) = error.http_status {
                println!("  HTTP status: {status}");
            }
            anyhow::bail!("Connection test failed")
        }
    }
}

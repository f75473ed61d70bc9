mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./medley.toml",
        "./config.toml",
        "~/.config/medley/config.toml",
        "/etc/medley/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    let mut seen = std::collections::HashSet::new();
    for provider in &config.providers {
        if !seen.insert(provider.name.as_str()) {
            anyhow::bail!("Duplicate provider name '{}'", provider.name);
        }
        if provider.hostname.trim().is_empty() {
            anyhow::bail!("Provider '{}' has no hostname", provider.name);
        }
        if provider.port == 0 {
            anyhow::bail!("Provider '{}' port cannot be 0", provider.name);
        }
        if provider.enabled && provider.api_key.is_empty() {
            anyhow::bail!("Provider '{}' is enabled but has no API key", provider.name);
        }
    }

    Ok(())
}

//! `validate` and `generate-config` commands.

use std::path::Path;

use anyhow::{Context, bail};
use tracing::info;

use cachet_monitor_client::CachetClient;
use cachet_monitor_config::{ConfigLoader, ConfigValidator};

pub(crate) fn run_validate(config_path: &Path) -> anyhow::Result<()> {
    let config = ConfigLoader::load(config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    let result = ConfigValidator::validate(&config);

    for warning in &result.warnings {
        println!("warning: {}", warning);
    }
    for error in &result.errors {
        println!("error: {}", error);
    }

    if !result.is_valid() {
        bail!("{} has {} error(s)", config_path.display(), result.errors.len());
    }

    println!(
        "{} is valid ({} endpoint(s), {} warning(s))",
        config_path.display(),
        config.endpoints.len(),
        result.warnings.len()
    );
    Ok(())
}

pub(crate) async fn run_generate_config(api_url: &str, token: &str, output: &Path) -> anyhow::Result<()> {
    let client = CachetClient::new(api_url, token)?;
    let config = client
        .generate_config()
        .await
        .context("Failed to list Cachet components")?;

    ConfigLoader::save(&config, output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    info!(
        endpoints = config.endpoints.len(),
        output = %output.display(),
        "Configuration generated"
    );
    Ok(())
}

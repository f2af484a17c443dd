use guarded_fetch_domain::{CliOverrides, Config};
use tracing::info;

pub fn load_config(
    config_path: Option<&str>,
    cli_overrides: CliOverrides,
) -> anyhow::Result<Config> {
    Ok(Config::load(config_path, cli_overrides)?)
}

/// Logged once the subscriber is installed.
pub fn log_config_summary(config: &Config, config_path: Option<&str>) {
    info!(
        config_file = config_path.unwrap_or("default"),
        https_only = config.fetch.https_only,
        max_redirects = config.fetch.max_redirects,
        allow_markup_format = config.fetch.allow_markup_format,
        inflight_max_entries = config.inflight.max_entries,
        "Configuration loaded"
    );
}

use std::path::Path;

use config::{Config, Environment, File};
use tracing::{debug, info};

use super::runtime::AnalyticsConfig;
use crate::error::{JournalError, Result};

const ENV_PREFIX: &str = "JOURNAL";

/// Load the analytics configuration.
///
/// Layers, lowest precedence first: built-in defaults, the optional TOML file
/// at `path`, then `JOURNAL__SECTION__KEY` environment variables (a `.env`
/// file in the working directory is read first when present).
pub fn load_config(path: Option<&Path>) -> Result<AnalyticsConfig> {
    if let Ok(env_file) = dotenvy::dotenv() {
        debug!("Loaded environment from {}", env_file.display());
    }

    let mut builder = Config::builder();
    if let Some(path) = path {
        info!("Reading configuration from {}", path.display());
        builder = builder.add_source(File::from(path).required(false));
    }
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__"),
    );

    let config: AnalyticsConfig = builder.build()?.try_deserialize()?;
    config
        .validate()
        .map_err(|errors| JournalError::InvalidConfig(errors.join(", ")))?;

    info!(
        "Configuration loaded: timezone={}, time_frame={}m, r_ladder={}..={} step {}",
        config.general.timezone,
        config.grouping.time_frame_minutes,
        config.r_ladder.start,
        config.r_ladder.end,
        config.r_ladder.step
    );
    Ok(config)
}

/// Render the effective configuration as TOML.
pub fn render_config(config: &AnalyticsConfig) -> Result<String> {
    toml::to_string_pretty(config).map_err(|e| JournalError::InvalidConfig(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = load_config(Some(Path::new("does-not-exist.toml"))).unwrap();
        assert_eq!(config.grouping.time_frame_minutes, 15);
        assert_eq!(config.r_ladder.step, dec!(0.5));
    }

    #[test]
    fn test_file_overrides_defaults() {
        let path = std::env::temp_dir().join("journal_analytics_loader_test.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[grouping]\ntime_frame_minutes = 30\n\n[general]\ntimezone = \"Europe/London\"").unwrap();
        drop(file);

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.grouping.time_frame_minutes, 30);
        assert_eq!(config.general.timezone, "Europe/London");
        assert_eq!(config.r_ladder.end, dec!(20.0));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let path = std::env::temp_dir().join("journal_analytics_loader_invalid.toml");
        std::fs::write(&path, "[grouping]\ntime_frame_minutes = 0\n").unwrap();

        let err = load_config(Some(&path)).unwrap_err();
        assert!(matches!(err, JournalError::InvalidConfig(_)));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_render_round_trips_sections() {
        let rendered = render_config(&AnalyticsConfig::default()).unwrap();
        assert!(rendered.contains("[grouping]"));
        assert!(rendered.contains("time_frame_minutes = 15"));
    }
}

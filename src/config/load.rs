use std::{env, path::PathBuf};

use super::schema::Settings;
use crate::data::filter::{POPULARITY_MAX, POPULARITY_MIN};

impl Settings {
    /// Load settings from environment and optional config file.
    pub fn load() -> Result<Self, ::config::ConfigError> {
        let config_path = resolve_config_path();

        let mut builder = ::config::Config::builder();

        if let Some(path) = &config_path {
            builder = builder.add_source(::config::File::from(path.as_path()).required(false));
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix("TRACK_DASHBOARD")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("data.paths")
                .try_parsing(true),
        );

        let cfg = builder.build()?;
        let settings: Settings = cfg.try_deserialize()?;
        Ok(settings)
    }

    /// Reject settings the pipeline cannot work with.
    pub fn validate(&self) -> Result<(), String> {
        if self.data.paths.is_empty() {
            return Err("data.paths must name at least one file".to_string());
        }
        if self.data.top_genres == 0 {
            return Err("data.top_genres must be >= 1".to_string());
        }
        if self.data.min_popularity < POPULARITY_MIN || self.data.max_popularity > POPULARITY_MAX {
            return Err(format!(
                "data.min_popularity and data.max_popularity must lie in \
                 [{POPULARITY_MIN}, {POPULARITY_MAX}]"
            ));
        }
        if self.data.min_popularity > self.data.max_popularity {
            return Err("data.min_popularity must not exceed data.max_popularity".to_string());
        }
        if self.charts.histogram_bins == 0 {
            return Err("charts.histogram_bins must be >= 1".to_string());
        }
        Ok(())
    }
}

/// Resolve the config path from `TRACK_DASHBOARD_CONFIG_PATH` or XDG defaults.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Some(p) = env::var_os("TRACK_DASHBOARD_CONFIG_PATH") {
        return Some(PathBuf::from(p));
    }
    default_config_path()
}

/// `$XDG_CONFIG_HOME/track-dashboard/config.toml`, or
/// `~/.config/track-dashboard/config.toml` when `XDG_CONFIG_HOME` is unset.
pub fn default_config_path() -> Option<PathBuf> {
    let config_home = if let Some(xdg) = env::var_os("XDG_CONFIG_HOME") {
        Some(PathBuf::from(xdg))
    } else {
        env::var_os("HOME").map(|home| PathBuf::from(home).join(".config"))
    };

    config_home.map(|d| d.join("track-dashboard").join("config.toml"))
}

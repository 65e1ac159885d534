use std::path::PathBuf;

use serde::Deserialize;

use crate::data::prepare::PrepareOptions;

/// Top-level application settings loaded from `config.toml`.
///
/// File format: TOML
/// Default path (Linux/XDG): `$XDG_CONFIG_HOME/track-dashboard/config.toml`
/// or `~/.config/track-dashboard/config.toml`
///
/// Precedence (highest wins):
/// 1) Environment variables (prefix `TRACK_DASHBOARD__`, `__` as nested separator)
/// 2) Config file (if present)
/// 3) Struct defaults
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data: DataSettings,
    pub charts: ChartSettings,
    pub window: WindowSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    /// Candidate data files, tried in order. The first readable one wins.
    pub paths: Vec<PathBuf>,
    /// Number of most frequent genres kept after cleaning.
    pub top_genres: usize,
    /// Tracks with popularity outside `[min_popularity, max_popularity]`
    /// are dropped as bad data.
    pub min_popularity: i64,
    pub max_popularity: i64,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            paths: vec![
                PathBuf::from("data/spotify_tracks.csv"),
                PathBuf::from("../data/spotify_tracks.csv"),
            ],
            top_genres: 10,
            min_popularity: 0,
            max_popularity: 100,
        }
    }
}

impl DataSettings {
    pub fn prepare_options(&self) -> PrepareOptions {
        PrepareOptions {
            top_genres: self.top_genres,
            min_popularity: self.min_popularity,
            max_popularity: self.max_popularity,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChartSettings {
    /// Number of bins in the popularity histogram.
    pub histogram_bins: usize,
    /// Marker radius of the scatter plots (points).
    pub point_radius: f32,
    /// Height of each chart (points).
    pub chart_height: f32,
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            histogram_bins: 30,
            point_radius: 2.0,
            chart_height: 280.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
    pub width: f32,
    pub height: f32,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            width: 1400.0,
            height: 900.0,
        }
    }
}

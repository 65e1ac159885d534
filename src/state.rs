use std::sync::Arc;

use crate::color::ColorMap;
use crate::config::ChartSettings;
use crate::data::aggregate::{
    genre_mean_features, genre_mean_popularity, popularity_histogram, scatter_points,
    FeatureTable, GenreMean, HistogramBin, ScatterPoint,
};
use crate::data::filter::{filtered_indices, FilterSelection, PopularityRange};
use crate::data::model::{Dataset, Feature, Track};
use crate::data::prepare::PrepareOptions;

// ---------------------------------------------------------------------------
// Filter-control events
// ---------------------------------------------------------------------------

/// A change made through one of the filter controls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterEvent {
    ToggleGenre(String),
    SelectAllGenres,
    SelectNoGenres,
    SetPopularityRange { lo: i64, hi: i64 },
}

// ---------------------------------------------------------------------------
// Derived views pushed to the charts
// ---------------------------------------------------------------------------

/// Everything the charts draw, recomputed from the filtered tracks.
#[derive(Debug, Clone, Default)]
pub struct DashboardViews {
    pub histogram: Vec<HistogramBin>,
    pub genre_popularity: Vec<GenreMean>,
    pub danceability_points: Vec<ScatterPoint>,
    pub energy_points: Vec<ScatterPoint>,
    pub genre_features: FeatureTable,
}

impl DashboardViews {
    pub fn compute(filtered: &[&Track], histogram_bins: usize) -> Self {
        Self {
            histogram: popularity_histogram(filtered, histogram_bins),
            genre_popularity: genre_mean_popularity(filtered),
            danceability_points: scatter_points(filtered, &Feature::Danceability),
            energy_points: scatter_points(filtered, &Feature::Energy),
            genre_features: genre_mean_features(filtered, &Feature::audio_features()),
        }
    }
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    /// Prepared dataset, shared with the process-wide cache.
    pub dataset: Option<Arc<Dataset>>,

    /// Current genre / popularity selection.
    pub selection: FilterSelection,

    /// Indices of tracks passing the current selection.
    pub visible_indices: Vec<usize>,

    /// Chart inputs for the current selection.
    pub views: DashboardViews,

    /// Genre colours, fixed per dataset.
    pub color_map: Option<ColorMap>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,

    pub charts: ChartSettings,

    /// Options used when the user opens another file.
    pub prepare_options: PrepareOptions,
}

impl AppState {
    pub fn new(charts: ChartSettings, prepare_options: PrepareOptions) -> Self {
        Self {
            dataset: None,
            selection: FilterSelection::default(),
            visible_indices: Vec::new(),
            views: DashboardViews::default(),
            color_map: None,
            status_message: None,
            charts,
            prepare_options,
        }
    }

    /// Ingest a prepared dataset: select everything and compute the views.
    pub fn set_dataset(&mut self, dataset: Arc<Dataset>) {
        self.selection = FilterSelection::all(&dataset);
        self.color_map = Some(ColorMap::new(&dataset.genres));
        self.dataset = Some(dataset);
        self.status_message = None;
        self.refresh();
    }

    /// Apply one filter-control change, then recompute every view.
    pub fn on_filter_event(&mut self, event: FilterEvent) {
        log::debug!("Filter event: {event:?}");
        match event {
            FilterEvent::ToggleGenre(genre) => {
                if !self.selection.genres.remove(&genre) {
                    self.selection.genres.insert(genre);
                }
            }
            FilterEvent::SelectAllGenres => {
                if let Some(ds) = &self.dataset {
                    self.selection.genres = ds.genres.iter().cloned().collect();
                }
            }
            FilterEvent::SelectNoGenres => self.selection.genres.clear(),
            FilterEvent::SetPopularityRange { lo, hi } => {
                self.selection.popularity = PopularityRange::new(lo, hi);
            }
        }
        self.refresh();
    }

    /// Recompute `visible_indices` and the chart views from the selection.
    pub fn refresh(&mut self) {
        let Some(ds) = &self.dataset else {
            self.visible_indices.clear();
            self.views = DashboardViews::default();
            return;
        };

        self.visible_indices = filtered_indices(ds, &self.selection);
        let filtered: Vec<&Track> = self
            .visible_indices
            .iter()
            .map(|&i| &ds.tracks[i])
            .collect();
        self.views = DashboardViews::compute(&filtered, self.charts.histogram_bins);
    }
}

use std::collections::BTreeSet;

use super::model::{Dataset, Track};

// ---------------------------------------------------------------------------
// Filter selection: chosen genres + popularity interval
// ---------------------------------------------------------------------------

pub const POPULARITY_MIN: i64 = 0;
pub const POPULARITY_MAX: i64 = 100;

/// Closed popularity interval with `0 <= lo <= hi <= 100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopularityRange {
    lo: i64,
    hi: i64,
}

impl PopularityRange {
    /// Build a range, clamping both ends into bounds and swapping them if
    /// they arrive reversed.
    pub fn new(lo: i64, hi: i64) -> Self {
        let lo = lo.clamp(POPULARITY_MIN, POPULARITY_MAX);
        let hi = hi.clamp(POPULARITY_MIN, POPULARITY_MAX);
        Self {
            lo: lo.min(hi),
            hi: lo.max(hi),
        }
    }

    pub fn lo(&self) -> i64 {
        self.lo
    }

    pub fn hi(&self) -> i64 {
        self.hi
    }

    pub fn contains(&self, popularity: i64) -> bool {
        self.lo <= popularity && popularity <= self.hi
    }
}

impl Default for PopularityRange {
    fn default() -> Self {
        Self::new(POPULARITY_MIN, POPULARITY_MAX)
    }
}

/// User-chosen genre subset plus popularity interval.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSelection {
    pub genres: BTreeSet<String>,
    pub popularity: PopularityRange,
}

impl FilterSelection {
    /// Everything selected: all dataset genres over the full range.
    pub fn all(dataset: &Dataset) -> Self {
        Self {
            genres: dataset.genres.iter().cloned().collect(),
            popularity: PopularityRange::default(),
        }
    }

    /// Whether a single track passes both conditions.
    pub fn matches(&self, track: &Track) -> bool {
        self.genres.contains(&track.track_genre) && self.popularity.contains(track.popularity)
    }
}

/// Return indices of tracks that pass the selection, in dataset order.
///
/// An empty genre set selects nothing. Genres absent from the dataset
/// simply match no track.
pub fn filtered_indices(dataset: &Dataset, selection: &FilterSelection) -> Vec<usize> {
    if selection.genres.is_empty() {
        return Vec::new();
    }
    dataset
        .tracks
        .iter()
        .enumerate()
        .filter(|(_, t)| selection.matches(t))
        .map(|(i, _)| i)
        .collect()
}

/// The filtered dataset: an ordered subsequence of `dataset.tracks`.
pub fn apply_filters<'a>(dataset: &'a Dataset, selection: &FilterSelection) -> Vec<&'a Track> {
    filtered_indices(dataset, selection)
        .into_iter()
        .map(|i| &dataset.tracks[i])
        .collect()
}

use std::collections::BTreeMap;

use super::model::{Feature, Track};

// ---------------------------------------------------------------------------
// Aggregate views over a filtered dataset
// ---------------------------------------------------------------------------

/// Mean popularity of one genre.
#[derive(Debug, Clone, PartialEq)]
pub struct GenreMean {
    pub genre: String,
    pub mean: f64,
}

/// Mean popularity per genre, highest first; ties by genre label.
pub fn genre_mean_popularity(filtered: &[&Track]) -> Vec<GenreMean> {
    let mut sums: BTreeMap<&str, (i64, usize)> = BTreeMap::new();
    for t in filtered {
        let entry = sums.entry(t.track_genre.as_str()).or_default();
        entry.0 += t.popularity;
        entry.1 += 1;
    }

    let mut means: Vec<GenreMean> = sums
        .into_iter()
        .map(|(genre, (sum, n))| GenreMean {
            genre: genre.to_string(),
            mean: sum as f64 / n as f64,
        })
        .collect();
    means.sort_by(|a, b| {
        b.mean
            .total_cmp(&a.mean)
            .then_with(|| a.genre.cmp(&b.genre))
    });
    means
}

/// Per-genre feature means. `means[i]` belongs to `FeatureTable::features[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub genre: String,
    /// `None` when no track of the genre carries that feature.
    pub means: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureTable {
    pub features: Vec<Feature>,
    /// One row per genre, ordered by genre label.
    pub rows: Vec<FeatureRow>,
}

impl FeatureTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Mean of `feature` for `genre`, if both exist and the mean is defined.
    pub fn get(&self, genre: &str, feature: &Feature) -> Option<f64> {
        let col = self.features.iter().position(|f| f == feature)?;
        self.rows
            .iter()
            .find(|r| r.genre == genre)
            .and_then(|r| r.means[col])
    }
}

/// Mean of every requested feature per genre. Missing values are skipped.
pub fn genre_mean_features(filtered: &[&Track], features: &[Feature]) -> FeatureTable {
    // genre → per-feature (sum, count)
    let mut sums: BTreeMap<&str, Vec<(f64, usize)>> = BTreeMap::new();
    for t in filtered {
        let acc = sums
            .entry(t.track_genre.as_str())
            .or_insert_with(|| vec![(0.0, 0); features.len()]);
        for (slot, feature) in acc.iter_mut().zip(features) {
            if let Some(v) = feature.value(t) {
                slot.0 += v;
                slot.1 += 1;
            }
        }
    }

    let rows = sums
        .into_iter()
        .map(|(genre, acc)| FeatureRow {
            genre: genre.to_string(),
            means: acc
                .into_iter()
                .map(|(sum, n)| (n > 0).then(|| sum / n as f64))
                .collect(),
        })
        .collect();

    FeatureTable {
        features: features.to_vec(),
        rows,
    }
}

// ---------------------------------------------------------------------------
// Chart inputs
// ---------------------------------------------------------------------------

/// Half-open popularity bin `[start, end)` and how many tracks fall in it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

impl HistogramBin {
    pub fn center(&self) -> f64 {
        (self.start + self.end) / 2.0
    }

    pub fn width(&self) -> f64 {
        self.end - self.start
    }
}

/// Equal-width popularity histogram spanning `[min, max + 1)` of the data.
pub fn popularity_histogram(filtered: &[&Track], bins: usize) -> Vec<HistogramBin> {
    if bins == 0 {
        return Vec::new();
    }
    let (Some(min), Some(max)) = (
        filtered.iter().map(|t| t.popularity).min(),
        filtered.iter().map(|t| t.popularity).max(),
    ) else {
        return Vec::new();
    };

    let start = min as f64;
    let width = (max - min + 1) as f64 / bins as f64;
    let mut histogram: Vec<HistogramBin> = (0..bins)
        .map(|i| HistogramBin {
            start: start + i as f64 * width,
            end: start + (i + 1) as f64 * width,
            count: 0,
        })
        .collect();

    for t in filtered {
        let idx = (((t.popularity - min) as f64) / width) as usize;
        histogram[idx.min(bins - 1)].count += 1;
    }
    histogram
}

/// One scatter point with the labels shown on hover.
#[derive(Debug, Clone, PartialEq)]
pub struct ScatterPoint {
    pub x: f64,
    pub popularity: f64,
    pub track_name: String,
    pub artists: String,
}

/// `x_feature` against popularity for every track carrying `x_feature`.
pub fn scatter_points(filtered: &[&Track], x_feature: &Feature) -> Vec<ScatterPoint> {
    filtered
        .iter()
        .filter_map(|t| {
            Some(ScatterPoint {
                x: x_feature.value(t)?,
                popularity: t.popularity as f64,
                track_name: t.track_name.clone(),
                artists: t.artists.clone(),
            })
        })
        .collect()
}

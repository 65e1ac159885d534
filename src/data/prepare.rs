use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use super::error::DataError;
use super::loader::{load_tracks, resolve_source};
use super::model::{Dataset, Track};

/// Knobs of the cleaning pipeline. Part of the cache key, so two callers
/// asking for different options never share a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PrepareOptions {
    /// How many of the most frequent genres to keep.
    pub top_genres: usize,
    pub min_popularity: i64,
    pub max_popularity: i64,
}

impl Default for PrepareOptions {
    fn default() -> Self {
        Self {
            top_genres: 10,
            min_popularity: 0,
            max_popularity: 100,
        }
    }
}

/// Resolve the first readable candidate, load it and clean it.
pub fn prepare_dataset(
    candidates: &[PathBuf],
    options: &PrepareOptions,
) -> Result<Dataset, DataError> {
    let source = resolve_source(candidates)?;
    let raw = load_tracks(&source)?;
    let n_raw = raw.len();

    let (tracks, genres) = clean_tracks(raw, options);

    log::info!(
        "Prepared {} of {} tracks from {} ({} genres)",
        tracks.len(),
        n_raw,
        source.display(),
        genres.len()
    );

    Ok(Dataset {
        tracks,
        genres,
        source,
    })
}

/// Dedup, bound popularity, keep the top genres. Returns the surviving
/// tracks in input order and the retained genres in ranking order.
pub fn clean_tracks(raw: Vec<Track>, options: &PrepareOptions) -> (Vec<Track>, Vec<String>) {
    let deduped = drop_duplicates(raw);
    log::debug!("{} tracks after duplicate removal", deduped.len());

    let bounded: Vec<Track> = deduped
        .into_iter()
        .filter(|t| (options.min_popularity..=options.max_popularity).contains(&t.popularity))
        .collect();
    log::debug!("{} tracks within popularity bounds", bounded.len());

    let genres = top_genres(&bounded, options.top_genres);
    let keep: HashSet<&str> = genres.iter().map(String::as_str).collect();
    let tracks: Vec<Track> = bounded
        .into_iter()
        .filter(|t| keep.contains(t.track_genre.as_str()))
        .collect();
    log::debug!("{} tracks in the top {} genres", tracks.len(), genres.len());

    (tracks, genres)
}

/// Keep the first occurrence of every distinct track.
pub fn drop_duplicates(tracks: Vec<Track>) -> Vec<Track> {
    let mut seen: HashSet<Track> = HashSet::with_capacity(tracks.len());
    tracks
        .into_iter()
        .filter(|t| {
            if seen.contains(t) {
                false
            } else {
                seen.insert(t.clone());
                true
            }
        })
        .collect()
}

/// The `n` most frequent genres, count descending then label ascending.
pub fn top_genres(tracks: &[Track], n: usize) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for t in tracks {
        *counts.entry(t.track_genre.as_str()).or_default() += 1;
    }

    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked
        .into_iter()
        .take(n)
        .map(|(genre, _)| genre.to_string())
        .collect()
}

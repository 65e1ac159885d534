use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// FieldValue – a single cell in a non-required column
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value for columns the dashboard does not model
/// explicitly (`track_id`, `album_name`, `tempo`, ...).
/// Must be `Ord + Hash` so whole tracks can be deduplicated.
#[derive(Debug, Clone)]
pub enum FieldValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

/// Float used for equality and hashing: `-0.0` folds into `0.0` and every
/// NaN into a single NaN.
fn canonical_float(v: f64) -> f64 {
    if v == 0.0 {
        0.0
    } else if v.is_nan() {
        f64::NAN
    } else {
        v
    }
}

// -- Manual Eq/Ord so we can put FieldValue in sets and hash it --

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for FieldValue {}

impl PartialOrd for FieldValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FieldValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use FieldValue::*;
        fn rank(v: &FieldValue) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                String(_) => 4,
            }
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => canonical_float(*a).total_cmp(&canonical_float(*b)),
            (String(a), String(b)) => a.cmp(b),
            _ => rank(self).cmp(&rank(other)),
        }
    }
}

impl Hash for FieldValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            FieldValue::String(s) => s.hash(state),
            FieldValue::Integer(i) => i.hash(state),
            FieldValue::Float(f) => canonical_float(*f).to_bits().hash(state),
            FieldValue::Bool(b) => b.hash(state),
            FieldValue::Null => {}
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::String(s) => write!(f, "{s}"),
            FieldValue::Integer(i) => write!(f, "{i}"),
            FieldValue::Float(v) => write!(f, "{v:.4}"),
            FieldValue::Bool(b) => write!(f, "{b}"),
            FieldValue::Null => write!(f, "<null>"),
        }
    }
}

impl FieldValue {
    /// Interpret the value as an `f64` when it is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Float(v) => Some(*v),
            FieldValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Track – one row of the source table
// ---------------------------------------------------------------------------

/// A single track record.
///
/// The required columns are typed fields; everything else the source row
/// carries lives in `extra` so that duplicate detection sees the full row.
#[derive(Debug, Clone)]
pub struct Track {
    pub track_name: String,
    pub artists: String,
    pub track_genre: String,
    pub popularity: i64,
    pub danceability: f64,
    pub energy: f64,
    pub valence: f64,
    /// Remaining columns: column_name → value.
    pub extra: BTreeMap<String, FieldValue>,
}

// Two tracks are duplicates when every field matches. Floats compare by the
// bit pattern of their canonical form so that `Eq` and `Hash` agree.
impl PartialEq for Track {
    fn eq(&self, other: &Self) -> bool {
        self.track_name == other.track_name
            && self.artists == other.artists
            && self.track_genre == other.track_genre
            && self.popularity == other.popularity
            && same_float(self.danceability, other.danceability)
            && same_float(self.energy, other.energy)
            && same_float(self.valence, other.valence)
            && self.extra == other.extra
    }
}

impl Eq for Track {}

fn same_float(a: f64, b: f64) -> bool {
    canonical_float(a).to_bits() == canonical_float(b).to_bits()
}

impl Hash for Track {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.track_name.hash(state);
        self.artists.hash(state);
        self.track_genre.hash(state);
        self.popularity.hash(state);
        canonical_float(self.danceability).to_bits().hash(state);
        canonical_float(self.energy).to_bits().hash(state);
        canonical_float(self.valence).to_bits().hash(state);
        self.extra.hash(state);
    }
}

// ---------------------------------------------------------------------------
// Feature – a numeric column that can be aggregated or plotted
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Feature {
    Popularity,
    Danceability,
    Energy,
    Valence,
    /// Any other numeric column, looked up in [`Track::extra`].
    Extra(String),
}

impl Feature {
    /// The three audio features shown in the per-genre comparison.
    pub fn audio_features() -> Vec<Feature> {
        vec![Feature::Danceability, Feature::Energy, Feature::Valence]
    }

    /// Column name as it appears in the source file.
    pub fn column_name(&self) -> &str {
        match self {
            Feature::Popularity => "popularity",
            Feature::Danceability => "danceability",
            Feature::Energy => "energy",
            Feature::Valence => "valence",
            Feature::Extra(name) => name,
        }
    }

    /// Read this feature from a track. `None` for missing or non-numeric
    /// extra columns.
    pub fn value(&self, track: &Track) -> Option<f64> {
        match self {
            Feature::Popularity => Some(track.popularity as f64),
            Feature::Danceability => Some(track.danceability),
            Feature::Energy => Some(track.energy),
            Feature::Valence => Some(track.valence),
            Feature::Extra(name) => track.extra.get(name).and_then(FieldValue::as_f64),
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

// ---------------------------------------------------------------------------
// Dataset – the prepared track table
// ---------------------------------------------------------------------------

/// The cleaned dataset produced by [`crate::data::prepare::prepare_dataset`].
#[derive(Debug, Clone)]
pub struct Dataset {
    /// Tracks in source-file order.
    pub tracks: Vec<Track>,
    /// Retained genres in ranking order (most frequent first).
    pub genres: Vec<String>,
    /// The file the tracks were read from.
    pub source: PathBuf,
}

impl Dataset {
    /// Number of tracks.
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

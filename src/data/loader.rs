use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::{can_cast_types, cast_with_options, CastOptions};
use arrow::datatypes::{DataType, Float32Type, Float64Type, Int32Type, Int64Type};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::error::DataError;
use super::model::{FieldValue, Track};

/// Columns every source table must provide.
pub const REQUIRED_COLUMNS: [&str; 7] = [
    "track_name",
    "artists",
    "track_genre",
    "popularity",
    "danceability",
    "energy",
    "valence",
];

// ---------------------------------------------------------------------------
// Path resolution
// ---------------------------------------------------------------------------

/// Return the first candidate that can be opened as a regular file.
pub fn resolve_source(candidates: &[PathBuf]) -> Result<PathBuf, DataError> {
    for candidate in candidates {
        if candidate.is_file() && File::open(candidate).is_ok() {
            log::debug!("Resolved data file {}", candidate.display());
            return Ok(candidate.clone());
        }
        log::debug!("Data file candidate {} not readable", candidate.display());
    }
    Err(DataError::FileAccess {
        tried: candidates.to_vec(),
    })
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load raw tracks from a file. Dispatch by extension.
///
/// Supported formats:
/// * `.csv` (and files without an extension) – header row, one track per line
/// * `.json`    – `[{ "track_name": ..., "popularity": ..., ... }, ...]`
/// * `.parquet` – flat table, one column per field
pub fn load_tracks(path: &Path) -> Result<Vec<Track>, DataError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("csv")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" | "tsv" | "txt" => load_csv(path),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        other => Err(DataError::UnsupportedFormat(other.to_string())),
    }
}

/// Fail with a schema error naming every required column absent from `columns`.
fn check_schema<'a>(
    path: &Path,
    columns: impl IntoIterator<Item = &'a str> + Clone,
) -> Result<(), DataError> {
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|req| !columns.clone().into_iter().any(|c| c == **req))
        .map(|req| req.to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(DataError::Schema {
            path: path.to_path_buf(),
            missing,
        })
    }
}

// ---------------------------------------------------------------------------
// Row → Track
// ---------------------------------------------------------------------------

/// Build a track from one row of named cells. Required columns are removed
/// from `fields`; what remains becomes [`Track::extra`].
fn track_from_fields(
    row: usize,
    mut fields: BTreeMap<String, FieldValue>,
) -> Result<Track, DataError> {
    let mut take = |column: &str| fields.remove(column).unwrap_or(FieldValue::Null);

    let track_name = as_text(take("track_name"));
    let artists = as_text(take("artists"));
    let track_genre = as_text(take("track_genre"));
    let popularity = as_integer(row, "popularity", take("popularity"))?;
    let danceability = as_float(row, "danceability", take("danceability"))?;
    let energy = as_float(row, "energy", take("energy"))?;
    let valence = as_float(row, "valence", take("valence"))?;

    Ok(Track {
        track_name,
        artists,
        track_genre,
        popularity,
        danceability,
        energy,
        valence,
        extra: fields,
    })
}

fn as_text(value: FieldValue) -> String {
    match value {
        FieldValue::String(s) => s,
        FieldValue::Null => String::new(),
        FieldValue::Float(v) => v.to_string(),
        other => other.to_string(),
    }
}

fn as_integer(row: usize, column: &str, value: FieldValue) -> Result<i64, DataError> {
    let parsed = match &value {
        FieldValue::Integer(i) => Some(*i),
        FieldValue::Float(v) if v.fract() == 0.0 => Some(*v as i64),
        FieldValue::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|v| v.fract() == 0.0)
                    .map(|v| v as i64)
            })
        }
        _ => None,
    };
    parsed.ok_or_else(|| parse_error(row, column, &value))
}

fn as_float(row: usize, column: &str, value: FieldValue) -> Result<f64, DataError> {
    let parsed = match &value {
        FieldValue::String(s) => s.trim().parse::<f64>().ok(),
        other => other.as_f64(),
    };
    parsed.ok_or_else(|| parse_error(row, column, &value))
}

fn parse_error(row: usize, column: &str, value: &FieldValue) -> DataError {
    DataError::Parse {
        row,
        column: column.to_string(),
        value: value.to_string(),
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, one track per record.
/// Required columns are kept as text and converted on demand. Every other
/// column gets one type inferred from all of its cells, so `1` and `1.0`
/// in the same column read as the same value.
fn load_csv(path: &Path) -> Result<Vec<Track>, DataError> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    check_schema(path, headers.iter().map(String::as_str))?;

    let records = reader.records().collect::<Result<Vec<_>, _>>()?;

    let kinds: Vec<Option<CellKind>> = headers
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            if REQUIRED_COLUMNS.contains(&column.as_str()) {
                None
            } else {
                Some(infer_column_kind(
                    records.iter().filter_map(|record| record.get(idx)),
                ))
            }
        })
        .collect();

    let mut tracks = Vec::with_capacity(records.len());
    for (row_no, record) in records.iter().enumerate() {
        let fields: BTreeMap<String, FieldValue> = headers
            .iter()
            .zip(&kinds)
            .zip(record.iter())
            .map(|((column, kind), raw)| {
                let value = match kind {
                    Some(kind) => parse_cell(raw, *kind),
                    None => FieldValue::String(raw.to_string()),
                };
                (column.clone(), value)
            })
            .collect();

        tracks.push(track_from_fields(row_no, fields)?);
    }

    log::debug!("Read {} CSV rows from {}", tracks.len(), path.display());
    Ok(tracks)
}

/// Type of a CSV column, widened as cells are seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellKind {
    Integer,
    Float,
    Bool,
    Text,
}

fn cell_kind(s: &str) -> CellKind {
    if s.parse::<i64>().is_ok() {
        CellKind::Integer
    } else if s.parse::<f64>().is_ok() {
        CellKind::Float
    } else if parse_bool(s).is_some() {
        CellKind::Bool
    } else {
        CellKind::Text
    }
}

/// Narrowest kind that holds every non-empty cell. An empty column is text.
fn infer_column_kind<'a>(cells: impl Iterator<Item = &'a str>) -> CellKind {
    cells
        .filter(|s| !s.is_empty())
        .map(cell_kind)
        .reduce(|acc, kind| match (acc, kind) {
            (a, b) if a == b => a,
            (CellKind::Integer, CellKind::Float) | (CellKind::Float, CellKind::Integer) => {
                CellKind::Float
            }
            _ => CellKind::Text,
        })
        .unwrap_or(CellKind::Text)
}

fn parse_cell(s: &str, kind: CellKind) -> FieldValue {
    if s.is_empty() {
        return FieldValue::Null;
    }
    let parsed = match kind {
        CellKind::Integer => s.parse::<i64>().ok().map(FieldValue::Integer),
        CellKind::Float => s.parse::<f64>().ok().map(FieldValue::Float),
        CellKind::Bool => parse_bool(s).map(FieldValue::Bool),
        CellKind::Text => None,
    };
    parsed.unwrap_or_else(|| FieldValue::String(s.to_string()))
}

fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "true" | "True" => Some(true),
        "false" | "False" => Some(false),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "track_name": "Song", "artists": "Someone", "track_genre": "pop",
///     "popularity": 73, "danceability": 0.67, "energy": 0.8, "valence": 0.5 },
///   ...
/// ]
/// ```
fn load_json(path: &Path) -> Result<Vec<Track>, DataError> {
    let text = std::fs::read_to_string(path)?;
    let root: JsonValue = serde_json::from_str(&text)?;

    let records = root
        .as_array()
        .ok_or_else(|| DataError::Malformed("expected a top-level array".to_string()))?;

    let mut tracks = Vec::with_capacity(records.len());
    for (row_no, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .ok_or_else(|| DataError::Malformed(format!("row {row_no} is not an object")))?;
        check_schema(path, obj.keys().map(String::as_str))?;

        let fields = obj
            .iter()
            .map(|(key, val)| (key.clone(), json_to_field(val)))
            .collect();
        tracks.push(track_from_fields(row_no, fields)?);
    }

    Ok(tracks)
}

fn json_to_field(val: &JsonValue) -> FieldValue {
    match val {
        JsonValue::String(s) => FieldValue::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                FieldValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                FieldValue::Float(f)
            } else {
                FieldValue::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => FieldValue::Bool(*b),
        JsonValue::Null => FieldValue::Null,
        other => FieldValue::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a flat Parquet table, as written by `df.to_parquet()` (Pandas) or
/// `df.write_parquet()` (Polars). One column per field.
fn load_parquet(path: &Path) -> Result<Vec<Track>, DataError> {
    let file = File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    {
        let schema = builder.schema();
        check_schema(path, schema.fields().iter().map(|f| f.name().as_str()))?;
    }
    let reader = builder.build()?;

    let mut tracks = Vec::new();
    for batch_result in reader {
        let batch = batch_result?;
        let schema = batch.schema();
        let columns = schema
            .fields()
            .iter()
            .zip(batch.columns())
            .map(|(field, col)| {
                normalize_column(field.name(), col).map(|col| (field.name().clone(), col))
            })
            .collect::<Result<Vec<(String, ArrayRef)>, DataError>>()?;

        for row in 0..batch.num_rows() {
            let fields = columns
                .iter()
                .map(|(name, col)| {
                    extract_field_value(name, col, row).map(|value| (name.clone(), value))
                })
                .collect::<Result<BTreeMap<String, FieldValue>, DataError>>()?;
            tracks.push(track_from_fields(tracks.len(), fields)?);
        }
    }

    Ok(tracks)
}

/// Cast a column to one of the types [`extract_field_value`] reads.
///
/// Dictionary and view columns become their plain value type, narrow and
/// unsigned integers become `Int64`, half floats and decimals become
/// `Float64`, and dates, times and anything else castable to text become
/// `Utf8`. Casts are strict: a value that does not fit is an error.
fn normalize_column(name: &str, col: &ArrayRef) -> Result<ArrayRef, DataError> {
    let target = match col.data_type() {
        DataType::Null
        | DataType::Boolean
        | DataType::Int32
        | DataType::Int64
        | DataType::Float32
        | DataType::Float64
        | DataType::Utf8
        | DataType::LargeUtf8 => return Ok(Arc::clone(col)),
        DataType::Dictionary(_, value_type) => {
            let values = cast_column(col, value_type)?;
            return normalize_column(name, &values);
        }
        DataType::Int8
        | DataType::Int16
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64 => DataType::Int64,
        DataType::Float16 | DataType::Decimal128(..) | DataType::Decimal256(..) => {
            DataType::Float64
        }
        other if can_cast_types(other, &DataType::Utf8) => DataType::Utf8,
        other => return Err(unsupported_column(name, other)),
    };
    cast_column(col, &target)
}

fn cast_column(col: &ArrayRef, to: &DataType) -> Result<ArrayRef, DataError> {
    let options = CastOptions {
        safe: false,
        ..Default::default()
    };
    Ok(cast_with_options(col, to, &options)?)
}

fn unsupported_column(name: &str, data_type: &DataType) -> DataError {
    DataError::UnsupportedColumnType {
        column: name.to_string(),
        data_type: data_type.to_string(),
    }
}

/// Extract a single cell from a normalized Arrow column at a given row.
fn extract_field_value(name: &str, col: &ArrayRef, row: usize) -> Result<FieldValue, DataError> {
    if col.is_null(row) {
        return Ok(FieldValue::Null);
    }
    let value = match col.data_type() {
        DataType::Null => FieldValue::Null,
        DataType::Utf8 => FieldValue::String(col.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => {
            FieldValue::String(col.as_string::<i64>().value(row).to_string())
        }
        DataType::Int32 => {
            FieldValue::Integer(col.as_primitive::<Int32Type>().value(row) as i64)
        }
        DataType::Int64 => FieldValue::Integer(col.as_primitive::<Int64Type>().value(row)),
        DataType::Float32 => {
            FieldValue::Float(col.as_primitive::<Float32Type>().value(row) as f64)
        }
        DataType::Float64 => FieldValue::Float(col.as_primitive::<Float64Type>().value(row)),
        DataType::Boolean => FieldValue::Bool(col.as_boolean().value(row)),
        other => return Err(unsupported_column(name, other)),
    };
    Ok(value)
}

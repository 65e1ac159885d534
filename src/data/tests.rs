use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::aggregate::*;
use super::cache::{CacheKey, DatasetCache};
use super::error::DataError;
use super::filter::*;
use super::loader::{load_tracks, resolve_source};
use super::model::*;
use super::prepare::*;

const HEADER: &str = "track_id,track_name,artists,track_genre,popularity,danceability,energy,valence";

fn track(name: &str, genre: &str, popularity: i64) -> Track {
    Track {
        track_name: name.to_string(),
        artists: format!("{name} artist"),
        track_genre: genre.to_string(),
        popularity,
        danceability: 0.5,
        energy: 0.5,
        valence: 0.5,
        extra: BTreeMap::new(),
    }
}

fn dataset(tracks: Vec<Track>) -> Dataset {
    let mut genres: Vec<String> = tracks.iter().map(|t| t.track_genre.clone()).collect();
    genres.sort();
    genres.dedup();
    Dataset {
        tracks,
        genres,
        source: PathBuf::from("memory.csv"),
    }
}

fn selection(genres: &[&str], lo: i64, hi: i64) -> FilterSelection {
    FilterSelection {
        genres: genres.iter().map(|g| g.to_string()).collect(),
        popularity: PopularityRange::new(lo, hi),
    }
}

fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(contents.as_bytes()).unwrap();
    path
}

/// CSV with 15 genres where genre `g{i}` has `20 - i` rows.
fn fifteen_genre_csv() -> String {
    let mut csv = String::from(HEADER);
    csv.push('\n');
    let mut id = 0;
    for g in 0..15 {
        for _ in 0..(20 - g) {
            csv.push_str(&format!("id{id},Song {id},Band,g{g:02},{},0.6,0.7,0.4\n", id % 90));
            id += 1;
        }
    }
    csv
}

// ---------------------------------------------------------------------------
// loader
// ---------------------------------------------------------------------------

#[test]
fn resolve_source_falls_back_to_second_candidate() {
    let dir = tempfile::tempdir().unwrap();
    let second = write_file(dir.path(), "tracks.csv", HEADER);
    let first = dir.path().join("missing").join("tracks.csv");

    let resolved = resolve_source(&[first, second.clone()]).unwrap();
    assert_eq!(resolved, second);
}

#[test]
fn resolve_source_reports_every_candidate_tried() {
    let dir = tempfile::tempdir().unwrap();
    let candidates = vec![dir.path().join("a.csv"), dir.path().join("b.csv")];

    match resolve_source(&candidates) {
        Err(DataError::FileAccess { tried }) => assert_eq!(tried, candidates),
        other => panic!("expected FileAccess, got {other:?}"),
    }
}

#[test]
fn missing_columns_are_a_schema_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        dir.path(),
        "tracks.csv",
        "track_name,artists,track_genre,popularity\nA,B,pop,10\n",
    );

    match load_tracks(&path) {
        Err(DataError::Schema { missing, .. }) => {
            assert_eq!(missing, vec!["danceability", "energy", "valence"]);
        }
        other => panic!("expected Schema, got {other:?}"),
    }
}

#[test]
fn unparsable_popularity_is_a_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        dir.path(),
        "tracks.csv",
        &format!("{HEADER}\nx,A,B,pop,very,0.1,0.2,0.3\n"),
    );

    match load_tracks(&path) {
        Err(DataError::Parse { row, column, .. }) => {
            assert_eq!(row, 0);
            assert_eq!(column, "popularity");
        }
        other => panic!("expected Parse, got {other:?}"),
    }
}

#[test]
fn csv_keeps_extra_columns_typed() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        dir.path(),
        "tracks.csv",
        "track_name,artists,track_genre,popularity,danceability,energy,valence,tempo,explicit\n\
         1999,Prince,funk,70,0.8,0.7,0.9,118.5,False\n",
    );

    let tracks = load_tracks(&path).unwrap();
    assert_eq!(tracks.len(), 1);
    let t = &tracks[0];
    assert_eq!(t.track_name, "1999");
    assert_eq!(t.popularity, 70);
    assert_eq!(t.extra.get("tempo"), Some(&FieldValue::Float(118.5)));
    assert_eq!(t.extra.get("explicit"), Some(&FieldValue::Bool(false)));
    assert_eq!(Feature::Extra("tempo".into()).value(t), Some(118.5));
    assert_eq!(Feature::Extra("explicit".into()).value(t), None);
}

#[test]
fn json_records_load_like_csv() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        dir.path(),
        "tracks.json",
        r#"[
            {"track_name": "A", "artists": "X", "track_genre": "pop", "popularity": 50,
             "danceability": 0.1, "energy": 0.2, "valence": 0.3, "album_name": null},
            {"track_name": "B", "artists": "Y", "track_genre": "rock", "popularity": 60.0,
             "danceability": 1, "energy": 0.5, "valence": 0.5}
        ]"#,
    );

    let tracks = load_tracks(&path).unwrap();
    assert_eq!(tracks.len(), 2);
    assert_eq!(tracks[0].extra.get("album_name"), Some(&FieldValue::Null));
    assert_eq!(tracks[1].popularity, 60);
    assert_eq!(tracks[1].danceability, 1.0);
}

#[test]
fn parquet_columns_map_onto_tracks() {
    use arrow::array::{ArrayRef, Float64Array, Int32Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;

    let schema = Arc::new(Schema::new(vec![
        Field::new("track_name", DataType::Utf8, true),
        Field::new("artists", DataType::Utf8, true),
        Field::new("track_genre", DataType::Utf8, false),
        Field::new("popularity", DataType::Int32, false),
        Field::new("danceability", DataType::Float64, false),
        Field::new("energy", DataType::Float64, false),
        Field::new("valence", DataType::Float64, false),
    ]));
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(vec![Some("A"), None])),
        Arc::new(StringArray::from(vec![Some("X"), Some("Y")])),
        Arc::new(StringArray::from(vec!["pop", "rock"])),
        Arc::new(Int32Array::from(vec![55, 101])),
        Arc::new(Float64Array::from(vec![0.1, 0.2])),
        Arc::new(Float64Array::from(vec![0.3, 0.4])),
        Arc::new(Float64Array::from(vec![0.5, 0.6])),
    ];
    let batch = RecordBatch::try_new(schema.clone(), columns).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tracks.parquet");
    let mut writer = ArrowWriter::try_new(std::fs::File::create(&path).unwrap(), schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();

    let tracks = load_tracks(&path).unwrap();
    assert_eq!(tracks.len(), 2);
    assert_eq!(tracks[0].popularity, 55);
    assert_eq!(tracks[1].track_name, "");
    assert_eq!(tracks[1].valence, 0.6);

    let ds = prepare_dataset(&[path], &PrepareOptions::default()).unwrap();
    assert_eq!(ds.genres, vec!["pop"]);
}

#[test]
fn parquet_dictionary_and_narrow_integer_columns_keep_their_values() {
    use arrow::array::{
        Array, ArrayRef, DictionaryArray, Float64Array, Int16Array, Int64Array, StringArray,
    };
    use arrow::datatypes::{DataType, Field, Int32Type, Schema};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;

    let genre: DictionaryArray<Int32Type> = vec!["pop", "rock", "jazz"].into_iter().collect();
    let schema = Arc::new(Schema::new(vec![
        Field::new("track_name", DataType::Utf8, false),
        Field::new("artists", DataType::Utf8, false),
        Field::new("track_genre", genre.data_type().clone(), false),
        Field::new("popularity", DataType::Int64, false),
        Field::new("danceability", DataType::Float64, false),
        Field::new("energy", DataType::Float64, false),
        Field::new("valence", DataType::Float64, false),
        Field::new("key", DataType::Int16, false),
    ]));
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(vec!["Same", "Same", "Same"])),
        Arc::new(StringArray::from(vec!["X", "X", "X"])),
        Arc::new(genre),
        Arc::new(Int64Array::from(vec![50, 50, 50])),
        Arc::new(Float64Array::from(vec![0.5, 0.5, 0.5])),
        Arc::new(Float64Array::from(vec![0.5, 0.5, 0.5])),
        Arc::new(Float64Array::from(vec![0.5, 0.5, 0.5])),
        Arc::new(Int16Array::from(vec![1, 2, 3])),
    ];
    let batch = RecordBatch::try_new(schema.clone(), columns).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tracks.parquet");
    let mut writer = ArrowWriter::try_new(std::fs::File::create(&path).unwrap(), schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();

    let ds = prepare_dataset(&[path], &PrepareOptions::default()).unwrap();
    assert_eq!(ds.len(), 3);
    let genres: BTreeSet<&str> = ds.genres.iter().map(String::as_str).collect();
    assert_eq!(genres, BTreeSet::from(["jazz", "pop", "rock"]));
    let keys: Vec<Option<&FieldValue>> = ds.tracks.iter().map(|t| t.extra.get("key")).collect();
    assert_eq!(
        keys,
        vec![
            Some(&FieldValue::Integer(1)),
            Some(&FieldValue::Integer(2)),
            Some(&FieldValue::Integer(3)),
        ]
    );
}

#[test]
fn parquet_unsigned_value_beyond_i64_is_an_error() {
    use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray, UInt64Array};
    use arrow::datatypes::{DataType, Field, Schema};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;

    let schema = Arc::new(Schema::new(vec![
        Field::new("track_name", DataType::Utf8, false),
        Field::new("artists", DataType::Utf8, false),
        Field::new("track_genre", DataType::Utf8, false),
        Field::new("popularity", DataType::Int64, false),
        Field::new("danceability", DataType::Float64, false),
        Field::new("energy", DataType::Float64, false),
        Field::new("valence", DataType::Float64, false),
        Field::new("plays", DataType::UInt64, false),
    ]));
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(vec!["A"])),
        Arc::new(StringArray::from(vec!["X"])),
        Arc::new(StringArray::from(vec!["pop"])),
        Arc::new(Int64Array::from(vec![50])),
        Arc::new(Float64Array::from(vec![0.5])),
        Arc::new(Float64Array::from(vec![0.5])),
        Arc::new(Float64Array::from(vec![0.5])),
        Arc::new(UInt64Array::from(vec![u64::MAX])),
    ];
    let batch = RecordBatch::try_new(schema.clone(), columns).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tracks.parquet");
    let mut writer = ArrowWriter::try_new(std::fs::File::create(&path).unwrap(), schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();

    assert!(matches!(load_tracks(&path), Err(DataError::Arrow(_))));
}

#[test]
fn csv_extra_column_uses_one_type_for_every_row() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        dir.path(),
        "tracks.csv",
        "track_name,artists,track_genre,popularity,danceability,energy,valence,tempo,loudness\n\
         A,X,pop,50,0.5,0.5,0.5,1,-0.0\n\
         A,X,pop,50,0.5,0.5,0.5,1.0,0.0\n",
    );

    let tracks = load_tracks(&path).unwrap();
    assert_eq!(tracks[0].extra.get("tempo"), Some(&FieldValue::Float(1.0)));
    assert_eq!(tracks[1].extra.get("tempo"), Some(&FieldValue::Float(1.0)));

    let ds = prepare_dataset(&[path], &PrepareOptions::default()).unwrap();
    assert_eq!(ds.len(), 1);
}

#[test]
fn unknown_extension_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "tracks.xlsx", "");
    assert!(matches!(
        load_tracks(&path),
        Err(DataError::UnsupportedFormat(ext)) if ext == "xlsx"
    ));
}

// ---------------------------------------------------------------------------
// prepare
// ---------------------------------------------------------------------------

#[test]
fn identical_rows_collapse_to_one() {
    let a = track("Same", "pop", 40);
    let mut b = track("Same", "pop", 40);
    b.extra.insert("track_id".into(), FieldValue::String("other".into()));

    let out = drop_duplicates(vec![a.clone(), a.clone(), b.clone(), a]);
    assert_eq!(out.len(), 2);
    assert_eq!(out[1], b);
}

#[test]
fn negative_zero_counts_as_zero_for_duplicates() {
    let mut zero = track("Same", "pop", 40);
    zero.energy = 0.0;
    zero.extra.insert("loudness".into(), FieldValue::Float(0.0));
    let mut negative = zero.clone();
    negative.energy = -0.0;
    negative.extra.insert("loudness".into(), FieldValue::Float(-0.0));
    let other = track("Same", "pop", 40);

    assert_eq!(FieldValue::Float(-0.0), FieldValue::Float(0.0));
    assert_eq!(FieldValue::Float(f64::NAN), FieldValue::Float(f64::NAN));
    let out = drop_duplicates(vec![zero, negative, other.clone()]);
    assert_eq!(out.len(), 2);
    assert_eq!(out[1], other);
}

#[test]
fn out_of_range_popularity_is_dropped() {
    let raw = vec![
        track("ok", "pop", 100),
        track("too high", "pop", 150),
        track("negative", "pop", -1),
        track("zero", "pop", 0),
    ];
    let (tracks, _) = clean_tracks(raw, &PrepareOptions::default());
    let names: Vec<&str> = tracks.iter().map(|t| t.track_name.as_str()).collect();
    assert_eq!(names, vec!["ok", "zero"]);
}

#[test]
fn top_genres_ranks_by_count_then_label() {
    let tracks = vec![
        track("1", "rock", 1),
        track("2", "jazz", 1),
        track("3", "rock", 1),
        track("4", "blues", 1),
        track("5", "jazz", 1),
        track("6", "ambient", 1),
    ];
    assert_eq!(top_genres(&tracks, 3), vec!["jazz", "rock", "ambient"]);
    assert_eq!(top_genres(&tracks, 10).len(), 4);
}

#[test]
fn prepare_keeps_only_ten_most_frequent_of_fifteen_genres() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "tracks.csv", &fifteen_genre_csv());

    let ds = prepare_dataset(&[path], &PrepareOptions::default()).unwrap();

    let expected: Vec<String> = (0..10).map(|g| format!("g{g:02}")).collect();
    assert_eq!(ds.genres, expected);
    let present: BTreeSet<&str> = ds.tracks.iter().map(|t| t.track_genre.as_str()).collect();
    assert_eq!(present.len(), 10);
    assert!(present.contains("g00"));
    for g in 10..15 {
        assert!(!present.contains(format!("g{g:02}").as_str()));
    }
    assert!(ds.tracks.iter().all(|t| (0..=100).contains(&t.popularity)));
}

#[test]
fn prepare_preserves_file_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        dir.path(),
        "tracks.csv",
        &format!(
            "{HEADER}\n\
             1,C,x,rock,30,0.1,0.1,0.1\n\
             2,A,x,pop,150,0.1,0.1,0.1\n\
             3,B,x,pop,20,0.1,0.1,0.1\n\
             1,C,x,rock,30,0.1,0.1,0.1\n\
             4,D,x,rock,90,0.1,0.1,0.1\n"
        ),
    );

    let ds = prepare_dataset(&[path], &PrepareOptions::default()).unwrap();
    let names: Vec<&str> = ds.tracks.iter().map(|t| t.track_name.as_str()).collect();
    assert_eq!(names, vec!["C", "B", "D"]);
    assert_eq!(ds.genres, vec!["rock", "pop"]);
}

#[test]
fn prepare_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "tracks.csv", &fifteen_genre_csv());

    let a = prepare_dataset(&[path.clone()], &PrepareOptions::default()).unwrap();
    let b = prepare_dataset(&[path], &PrepareOptions::default()).unwrap();
    assert_eq!(a.tracks, b.tracks);
    assert_eq!(a.genres, b.genres);
}

// ---------------------------------------------------------------------------
// filter
// ---------------------------------------------------------------------------

#[test]
fn popularity_range_is_clamped_and_ordered() {
    let r = PopularityRange::new(120, -5);
    assert_eq!((r.lo(), r.hi()), (0, 100));
    let r = PopularityRange::new(70, 30);
    assert_eq!((r.lo(), r.hi()), (30, 70));
    assert!(r.contains(30) && r.contains(70) && !r.contains(71));
}

#[test]
fn filter_keeps_matching_tracks_in_order() {
    let ds = dataset(vec![
        track("a", "pop", 10),
        track("b", "rock", 50),
        track("c", "pop", 50),
        track("d", "pop", 51),
        track("e", "jazz", 20),
        track("f", "pop", 20),
    ]);

    let out = apply_filters(&ds, &selection(&["pop", "jazz"], 20, 50));
    let names: Vec<&str> = out.iter().map(|t| t.track_name.as_str()).collect();
    assert_eq!(names, vec!["c", "e", "f"]);
    assert_eq!(filtered_indices(&ds, &selection(&["pop", "jazz"], 20, 50)), vec![2, 4, 5]);
}

#[test]
fn empty_genre_selection_matches_nothing() {
    let ds = dataset(vec![track("a", "pop", 10), track("b", "rock", 50)]);
    assert!(apply_filters(&ds, &selection(&[], 0, 100)).is_empty());
}

#[test]
fn unknown_genres_match_nothing_without_failing() {
    let ds = dataset(vec![track("a", "pop", 10)]);
    assert!(apply_filters(&ds, &selection(&["polka"], 0, 100)).is_empty());
    assert_eq!(apply_filters(&ds, &selection(&["polka", "pop"], 0, 100)).len(), 1);
}

#[test]
fn default_selection_keeps_everything() {
    let ds = dataset(vec![track("a", "pop", 0), track("b", "rock", 100)]);
    assert_eq!(apply_filters(&ds, &FilterSelection::all(&ds)).len(), 2);
}

// ---------------------------------------------------------------------------
// aggregate
// ---------------------------------------------------------------------------

#[test]
fn genre_mean_popularity_sorts_descending() {
    let rows = [track("1", "A", 50), track("2", "A", 70), track("3", "B", 90)];
    let refs: Vec<&Track> = rows.iter().collect();

    let means = genre_mean_popularity(&refs);
    assert_eq!(
        means,
        vec![
            GenreMean { genre: "B".into(), mean: 90.0 },
            GenreMean { genre: "A".into(), mean: 60.0 },
        ]
    );
}

#[test]
fn genre_mean_popularity_breaks_ties_by_label() {
    let rows = [track("1", "zouk", 40), track("2", "afro", 40), track("3", "mid", 60)];
    let refs: Vec<&Track> = rows.iter().collect();

    let order: Vec<String> = genre_mean_popularity(&refs).into_iter().map(|m| m.genre).collect();
    assert_eq!(order, vec!["mid", "afro", "zouk"]);
}

#[test]
fn genre_mean_features_per_genre() {
    let mut a1 = track("1", "A", 10);
    a1.danceability = 0.2;
    a1.energy = 0.4;
    a1.extra.insert("tempo".into(), FieldValue::Float(100.0));
    let mut a2 = track("2", "A", 10);
    a2.danceability = 0.6;
    a2.energy = 0.8;
    let mut b = track("3", "B", 10);
    b.valence = 0.9;
    let rows = [b, a1, a2];
    let refs: Vec<&Track> = rows.iter().collect();

    let mut features = Feature::audio_features();
    features.push(Feature::Extra("tempo".into()));
    let table = genre_mean_features(&refs, &features);

    let genres: Vec<&str> = table.rows.iter().map(|r| r.genre.as_str()).collect();
    assert_eq!(genres, vec!["A", "B"]);
    assert!((table.get("A", &Feature::Danceability).unwrap() - 0.4).abs() < 1e-12);
    assert!((table.get("A", &Feature::Energy).unwrap() - 0.6).abs() < 1e-12);
    assert_eq!(table.get("B", &Feature::Valence), Some(0.9));
    assert_eq!(table.get("A", &Feature::Extra("tempo".into())), Some(100.0));
    assert_eq!(table.get("B", &Feature::Extra("tempo".into())), None);
}

#[test]
fn aggregates_of_nothing_are_empty() {
    let empty: Vec<&Track> = Vec::new();
    assert!(genre_mean_popularity(&empty).is_empty());
    assert!(genre_mean_features(&empty, &Feature::audio_features()).is_empty());
    assert!(popularity_histogram(&empty, 30).is_empty());
    assert!(scatter_points(&empty, &Feature::Energy).is_empty());
}

#[test]
fn histogram_counts_every_track_once() {
    let rows: Vec<Track> = (0..=100).map(|p| track("t", "pop", p)).collect();
    let refs: Vec<&Track> = rows.iter().collect();

    let bins = popularity_histogram(&refs, 30);
    assert_eq!(bins.len(), 30);
    assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 101);
    assert_eq!(bins[0].start, 0.0);
    assert!((bins[29].end - 101.0).abs() < 1e-9);

    let single = [track("t", "pop", 42)];
    let refs: Vec<&Track> = single.iter().collect();
    let bins = popularity_histogram(&refs, 5);
    assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 1);
    assert!(popularity_histogram(&refs, 0).is_empty());
}

#[test]
fn scatter_points_carry_hover_labels() {
    let mut t = track("Song", "pop", 77);
    t.danceability = 0.31;
    let rows = [t];
    let refs: Vec<&Track> = rows.iter().collect();

    let points = scatter_points(&refs, &Feature::Danceability);
    assert_eq!(
        points,
        vec![ScatterPoint {
            x: 0.31,
            popularity: 77.0,
            track_name: "Song".into(),
            artists: "Song artist".into(),
        }]
    );
}

// ---------------------------------------------------------------------------
// cache
// ---------------------------------------------------------------------------

#[test]
fn cache_returns_the_same_dataset_object() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "tracks.csv", &fifteen_genre_csv());
    let cache = DatasetCache::new();
    let opts = PrepareOptions::default();

    let a = cache.load(&[path.clone()], &opts).unwrap();
    let b = cache.load(&[dir.path().join("nope.csv"), path], &opts).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(cache.len(), 1);
}

#[test]
fn cache_separates_different_options_and_contents() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "tracks.csv", &fifteen_genre_csv());
    let cache = DatasetCache::new();

    let ten = cache.load(&[path.clone()], &PrepareOptions::default()).unwrap();
    let three = cache
        .load(
            &[path.clone()],
            &PrepareOptions {
                top_genres: 3,
                ..PrepareOptions::default()
            },
        )
        .unwrap();
    assert_eq!(ten.genres.len(), 10);
    assert_eq!(three.genres.len(), 3);

    // Different length means a different key even within one mtime tick.
    write_file(dir.path(), "tracks.csv", &format!("{HEADER}\nz,Z,Z,solo,5,0.1,0.1,0.1\n"));
    let changed = cache.load(&[path], &PrepareOptions::default()).unwrap();
    assert_eq!(changed.genres, vec!["solo"]);
    assert_eq!(cache.len(), 3);
}

#[test]
fn cache_does_not_keep_failures() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "tracks.csv", HEADER);
    let key = CacheKey::for_file(&path, &PrepareOptions::default()).unwrap();
    let cache = DatasetCache::new();

    let err = cache.get_or_load(key.clone(), || {
        Err(DataError::FileAccess { tried: Vec::new() })
    });
    assert!(err.is_err());
    assert!(cache.is_empty());
    assert_eq!(cache.slot_count(), 0);

    let ok = cache.get_or_load(key, || Ok(dataset(vec![track("a", "pop", 1)])));
    assert_eq!(ok.unwrap().len(), 1);
    assert_eq!(cache.slot_count(), 1);
}

#[test]
fn repeated_failures_leave_no_slots_behind() {
    let dir = tempfile::tempdir().unwrap();
    let cache = DatasetCache::new();

    for i in 0..5 {
        let path = write_file(dir.path(), &format!("broken{i}.csv"), HEADER);
        let key = CacheKey::for_file(&path, &PrepareOptions::default()).unwrap();
        let result = cache.get_or_load(key, || {
            Err(DataError::Malformed("unreadable".to_string()))
        });
        assert!(result.is_err());
    }

    assert_eq!(cache.slot_count(), 0);
}

#[test]
fn concurrent_first_access_loads_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "tracks.csv", HEADER);
    let key = CacheKey::for_file(&path, &PrepareOptions::default()).unwrap();
    let cache = DatasetCache::new();
    let loads = AtomicUsize::new(0);

    let results: Vec<Arc<Dataset>> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                s.spawn(|| {
                    cache
                        .get_or_load(key.clone(), || {
                            loads.fetch_add(1, Ordering::SeqCst);
                            std::thread::sleep(std::time::Duration::from_millis(20));
                            Ok(dataset(vec![track("a", "pop", 1)]))
                        })
                        .unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert!(results.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
}

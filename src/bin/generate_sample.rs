use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use serde::Serialize;

/// One synthetic track, column order matching the public Spotify tracks dump.
#[derive(Debug, Clone, Serialize)]
struct SampleTrack {
    track_id: String,
    artists: String,
    album_name: String,
    track_name: String,
    popularity: i64,
    danceability: f64,
    energy: f64,
    valence: f64,
    tempo: f64,
    track_genre: String,
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// (genre, track count, mean popularity, danceability, energy, valence)
const GENRES: [(&str, usize, f64, f64, f64, f64); 15] = [
    ("pop", 400, 62.0, 0.68, 0.66, 0.55),
    ("rock", 360, 48.0, 0.50, 0.78, 0.50),
    ("hip-hop", 340, 55.0, 0.76, 0.65, 0.52),
    ("edm", 320, 45.0, 0.66, 0.85, 0.40),
    ("jazz", 300, 30.0, 0.55, 0.35, 0.52),
    ("classical", 280, 25.0, 0.30, 0.15, 0.25),
    ("country", 260, 40.0, 0.58, 0.62, 0.57),
    ("latin", 240, 52.0, 0.72, 0.70, 0.68),
    ("metal", 220, 35.0, 0.42, 0.92, 0.30),
    ("r-n-b", 200, 44.0, 0.66, 0.58, 0.50),
    ("blues", 120, 28.0, 0.52, 0.48, 0.58),
    ("folk", 100, 30.0, 0.52, 0.40, 0.45),
    ("reggae", 80, 33.0, 0.74, 0.60, 0.75),
    ("ambient", 60, 20.0, 0.32, 0.20, 0.18),
    ("opera", 40, 15.0, 0.25, 0.20, 0.20),
];

fn unit(v: f64) -> f64 {
    v.clamp(0.0, 1.0)
}

fn main() -> anyhow::Result<()> {
    let mut rng = SimpleRng::new(42);
    let mut tracks: Vec<SampleTrack> = Vec::new();

    for &(genre, count, pop, dance, energy, valence) in &GENRES {
        for i in 0..count {
            let id = tracks.len();
            let mut popularity = rng.gauss(pop, 15.0).round() as i64;
            // A few corrupt rows the cleaning step must drop.
            if i % 97 == 0 {
                popularity = 150;
            }
            tracks.push(SampleTrack {
                track_id: format!("trk{id:06}"),
                artists: format!("Artist {}", (rng.next_u64() % 500) + 1),
                album_name: format!("{genre} album {}", i / 10),
                track_name: format!("{genre} song {i}"),
                popularity: popularity.max(0),
                danceability: unit(rng.gauss(dance, 0.12)),
                energy: unit(rng.gauss(energy, 0.12)),
                valence: unit(rng.gauss(valence, 0.18)),
                tempo: rng.gauss(120.0, 20.0).max(40.0),
                track_genre: genre.to_string(),
            });
        }
    }

    // Exact duplicates, as in the public dump.
    let duplicates: Vec<SampleTrack> = tracks.iter().step_by(50).cloned().collect();
    tracks.extend(duplicates);

    std::fs::create_dir_all("data")?;

    // Write CSV
    let csv_path = "data/spotify_tracks.csv";
    let mut writer = csv::Writer::from_path(csv_path)?;
    for t in &tracks {
        writer.serialize(t)?;
    }
    writer.flush()?;

    // Write Parquet
    let schema = Arc::new(Schema::new(vec![
        Field::new("track_id", DataType::Utf8, false),
        Field::new("artists", DataType::Utf8, false),
        Field::new("album_name", DataType::Utf8, false),
        Field::new("track_name", DataType::Utf8, false),
        Field::new("popularity", DataType::Int64, false),
        Field::new("danceability", DataType::Float64, false),
        Field::new("energy", DataType::Float64, false),
        Field::new("valence", DataType::Float64, false),
        Field::new("tempo", DataType::Float64, false),
        Field::new("track_genre", DataType::Utf8, false),
    ]));

    let text = |f: fn(&SampleTrack) -> &str| -> ArrayRef {
        Arc::new(StringArray::from(tracks.iter().map(f).collect::<Vec<_>>()))
    };
    let float = |f: fn(&SampleTrack) -> f64| -> ArrayRef {
        Arc::new(Float64Array::from(tracks.iter().map(f).collect::<Vec<_>>()))
    };

    let popularity: ArrayRef = Arc::new(Int64Array::from(
        tracks.iter().map(|t| t.popularity).collect::<Vec<_>>(),
    ));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            text(|t| t.track_id.as_str()),
            text(|t| t.artists.as_str()),
            text(|t| t.album_name.as_str()),
            text(|t| t.track_name.as_str()),
            popularity,
            float(|t| t.danceability),
            float(|t| t.energy),
            float(|t| t.valence),
            float(|t| t.tempo),
            text(|t| t.track_genre.as_str()),
        ],
    )?;

    let parquet_path = "data/spotify_tracks.parquet";
    let file = std::fs::File::create(parquet_path)?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;

    println!(
        "Wrote {} tracks in {} genres to {csv_path} and {parquet_path}",
        tracks.len(),
        GENRES.len()
    );
    Ok(())
}

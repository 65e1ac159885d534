/// Data layer: core types, loading, cleaning, filtering and aggregation.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  resolve path candidate, parse rows → Vec<Track>
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  prepare  │  dedup, popularity bounds, top-N genres → Dataset
///   └──────────┘     (memoized by `cache`)
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  genre set + popularity range → filtered tracks
///   └──────────┘
///        │
///        ▼
///   ┌───────────┐
///   │ aggregate  │  genre means, histogram, scatter points
///   └───────────┘
/// ```

pub mod aggregate;
pub mod cache;
pub mod error;
pub mod filter;
pub mod loader;
pub mod model;
pub mod prepare;

#[cfg(test)]
mod tests;

//! Data layer: sample types, loading, cleaning, transforming and binning.
//!
//! Architecture:
//! ```text
//!  .csv / .json / .parquet
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader   │  two named channels → RawSample (Option<f64> pairs)
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  filter   │  drop missing / non-finite / non-positive rows → Sample
//!   └──────────┘
//!        │
//!        ▼
//!   ┌───────────┐
//!   │ transform  │  log10 / ln / asinh on both channels
//!   └───────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │ binning   │  fixed-width bins on primary → Vec<BinSummary>
//!   └──────────┘
//! ```

pub mod binning;
pub mod filter;
pub mod loader;
pub mod model;
pub mod transform;

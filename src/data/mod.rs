//! Data layer: core types, loading, masking, resampling and writing.
//!
//! Architecture:
//! ```text
//!  ERC_data_<tier>_YYYY_MM.csv / .parquet
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader   │  parse monthly files → FieldTable
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │   mask    │  no-flow / data-gap / faulty sensor periods → NaN
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │ resample  │  30 s → 5 min means
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  writer   │  FieldTable → monthly file
//!   └──────────┘
//! ```
//! `prepare` chains mask, resample and writer per month; `filter` holds the
//! viewer's exchanger selection.

pub mod filter;
pub mod loader;
pub mod mask;
pub mod model;
pub mod prepare;
pub mod resample;
pub mod writer;

//! Loading, preparation and figures for the monitoring data of a
//! 40-exchanger borehole heat exchanger field.
//!
//! ```text
//!  data/raw_30s/ERC_data_raw_YYYY_MM.csv ──┐
//!  data/prepared_5min/ERC_data_prepared_…  ─┤
//!                                           ▼
//!                                     data::loader ──► FieldTable ──► MeasurementSeries
//!                                           │                              │
//!                          data::mask / data::resample                     ▼
//!                                           │                          figure / ui
//!                                           ▼
//!                                    data::writer (prepare)
//! ```

pub mod analysis;
pub mod app;
pub mod color;
pub mod config;
pub mod data;
pub mod error;
pub mod figure;
pub mod state;
pub mod ui;

pub use error::{Error, Result};

//! egui widgets of the viewer: side/top panels and the time-series plots.

pub mod panels;
pub mod plot;

use eframe::egui;

use crate::config::DataLayout;
use crate::state::AppState;
use crate::ui::{panels, plot};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct BheFieldViewerApp {
    pub state: AppState,
}

impl BheFieldViewerApp {
    pub fn new(layout: DataLayout) -> Self {
        Self {
            state: AppState {
                layout,
                ..AppState::default()
            },
        }
    }
}

impl eframe::App for BheFieldViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: period and exchangers ----
        egui::SidePanel::left("selection_panel")
            .default_width(240.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: plots ----
        egui::CentralPanel::default().show(ctx, |ui| {
            plot::time_series_plot(ui, &self.state);
        });
    }
}

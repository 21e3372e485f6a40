use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::DatePickerButton;

use crate::config::DataLayout;
use crate::data::filter::available_by_vault;
use crate::data::model::{Channel, Resolution};
use crate::figure::FigureOptions;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – period and exchanger selection
// ---------------------------------------------------------------------------

/// Render the left panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Data");
    ui.separator();

    ui.horizontal(|ui: &mut Ui| {
        ui.label(RichText::new(state.layout.root.display().to_string()).monospace());
        if ui.small_button("…").on_hover_text("Choose data folder").clicked() {
            choose_data_folder(state);
        }
    });

    egui::ComboBox::from_label("Resolution")
        .selected_text(state.resolution.to_string())
        .show_ui(ui, |ui: &mut Ui| {
            for resolution in Resolution::ALL {
                ui.selectable_value(&mut state.resolution, resolution, resolution.to_string());
            }
        });

    egui::Grid::new("period").num_columns(2).show(ui, |ui: &mut Ui| {
        ui.label("From");
        ui.add(DatePickerButton::new(&mut state.start).id_salt("period_start"));
        ui.end_row();
        ui.label("To");
        ui.add(DatePickerButton::new(&mut state.end).id_salt("period_end"));
        ui.end_row();
    });

    ui.checkbox(&mut state.masked, "Mask no-flow periods");

    let load = ui.add_enabled(!state.loading, egui::Button::new("Load"));
    if load.clicked() {
        load_period(state);
    }
    ui.separator();

    let Some(table) = &state.table else {
        ui.label("No data loaded.");
        return;
    };
    let grouped = available_by_vault(table);

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- Channel selector ----
            ui.strong("Channel");
            egui::ComboBox::from_id_salt("channel")
                .selected_text(state.channel.axis_label())
                .show_ui(ui, |ui: &mut Ui| {
                    for channel in Channel::ALL {
                        ui.selectable_value(&mut state.channel, channel, channel.axis_label());
                    }
                });
            ui.separator();

            // ---- Per-vault exchanger checkboxes ----
            for (vault, members) in &grouped {
                let n_selected = state.filter.get(vault).map_or(0, |s| s.len());
                let header_text = format!("{vault}  ({n_selected}/{})", members.len());

                egui::CollapsingHeader::new(RichText::new(header_text).strong())
                    .id_salt(vault.label())
                    .default_open(true)
                    .show(ui, |ui: &mut Ui| {
                        ui.horizontal(|ui: &mut Ui| {
                            if ui.small_button("All").clicked() {
                                state.select_all(*vault);
                            }
                            if ui.small_button("None").clicked() {
                                state.select_none(*vault);
                            }
                        });

                        for bhe in members {
                            let mut checked = state
                                .filter
                                .get(vault)
                                .is_some_and(|s| s.contains(bhe));
                            let text = RichText::new(format!("BHE {bhe}"))
                                .color(state.colors.color_for(*bhe));
                            if ui.checkbox(&mut checked, text).changed() {
                                state.toggle_bhe(*bhe);
                            }
                        }
                    });
            }
        });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Choose data folder…").clicked() {
                choose_data_folder(state);
                ui.close_menu();
            }
            let can_export = state.table.is_some() && !state.visible.is_empty();
            if ui
                .add_enabled(can_export, egui::Button::new("Export figure…"))
                .clicked()
            {
                export_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(table) = &state.table {
            ui.label(format!(
                "{} samples, {} of {} exchangers shown",
                table.len(),
                state.visible.len(),
                table.bhes().len()
            ));
        }

        ui.separator();

        if ui
            .selectable_label(state.minmax_scaling, "Min-Max Scaling")
            .clicked()
        {
            state.minmax_scaling = !state.minmax_scaling;
        }
        if ui.selectable_label(state.show_flow, "Flow").clicked() {
            state.show_flow = !state.show_flow;
        }

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// Dialogs and actions
// ---------------------------------------------------------------------------

pub fn choose_data_folder(state: &mut AppState) {
    let folder = rfd::FileDialog::new()
        .set_title("Choose the folder holding raw_30s/ and prepared_5min/")
        .set_directory(&state.layout.root)
        .pick_folder();

    if let Some(root) = folder {
        log::info!("Data root set to {}", root.display());
        state.layout = DataLayout::new(root);
    }
}

fn load_period(state: &mut AppState) {
    match state.load() {
        Ok(()) => {
            if let Some(table) = &state.table {
                log::info!(
                    "Loaded {} samples for {} exchangers",
                    table.len(),
                    table.bhes().len()
                );
            }
        }
        Err(e) => {
            log::error!("Failed to load data: {e}");
            state.status_message = Some(format!("Error: {e}"));
        }
    }
}

pub fn export_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Export figure")
        .add_filter("PNG image", &["png"])
        .set_file_name(format!("{}_{}.png", state.channel, state.start))
        .save_file();

    if let Some(path) = file {
        if let Err(e) = state.export_figure(&path, FigureOptions::default()) {
            log::error!("Failed to export figure: {e}");
            state.status_message = Some(format!("Error: {e}"));
        }
    }
}

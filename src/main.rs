use std::path::PathBuf;

use bhe_field_viewer::app::BheFieldViewerApp;
use bhe_field_viewer::config::{DEFAULT_DATA_ROOT, DataLayout};
use clap::Parser;
use eframe::egui;

/// Interactive viewer for the monitoring data of the exchanger field.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Folder holding raw_30s/ and prepared_5min/.
    #[arg(long, default_value = DEFAULT_DATA_ROOT)]
    data_root: PathBuf,
}

fn main() -> eframe::Result {
    env_logger::init();
    let args = Args::parse();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "BHE Field Viewer",
        options,
        Box::new(move |_cc| {
            Ok(Box::new(BheFieldViewerApp::new(DataLayout::new(args.data_root))))
        }),
    )
}

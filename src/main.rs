use anyhow::Context;
use eframe::egui;
use socratic_lens::gui::SocraticApp;
use socratic_lens::logging;
use socratic_lens::settings::{Settings, SETTINGS_FILE};

fn main() -> anyhow::Result<()> {
    let settings_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| SETTINGS_FILE.to_string());
    let settings = Settings::load(&settings_path)?;
    logging::init(settings.debug_logging, settings.log_file.clone());
    tracing::info!(
        settings = %settings_path,
        service = %settings.service_url,
        "starting"
    );

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 760.0])
            .with_min_inner_size([720.0, 480.0])
            .with_drag_and_drop(true),
        ..Default::default()
    };

    eframe::run_native(
        "Socratic Lens",
        native_options,
        Box::new(move |_cc| Box::new(SocraticApp::new(settings))),
    )
    .map_err(|e| anyhow::anyhow!("{e}"))
    .context("running the window")?;
    Ok(())
}

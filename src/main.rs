mod app;
mod ui;

use std::path::PathBuf;

use anyhow::Context;
use app::RustyTorqueApp;
use eframe::egui;
use rusty_torque::config::{AppConfig, CONFIG_ENV_VAR, DEFAULT_CONFIG_FILE};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config_path = std::env::var_os(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let config = AppConfig::load(&config_path)
        .with_context(|| format!("loading configuration from {}", config_path.display()))?;
    let title = config.app_title.clone();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(&title)
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([800.0, 500.0]),
        ..Default::default()
    };

    eframe::run_native(
        &title,
        options,
        Box::new(move |_cc| Ok(Box::new(RustyTorqueApp::new(config)))),
    )
    .map_err(|e| anyhow::anyhow!("UI terminated with an error: {e}"))
}

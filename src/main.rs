mod app;
mod color;
mod config;
mod data;
mod state;
mod ui;

use anyhow::{anyhow, Context};
use eframe::egui;

use crate::app::DashboardApp;
use crate::config::Settings;
use crate::data::cache::DatasetCache;

fn main() -> anyhow::Result<()> {
    // RUST_LOG=debug shows per-step row counts of the cleaning pipeline.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .filter_module("wgpu_core", log::LevelFilter::Warn)
        .filter_module("wgpu_hal", log::LevelFilter::Warn)
        .filter_module("naga", log::LevelFilter::Warn)
        .init();

    let settings = Settings::load().context("loading configuration")?;
    settings.validate().map_err(|msg| anyhow!("invalid configuration: {msg}"))?;

    // Without data there is nothing to draw, so a load failure ends startup.
    let dataset = DatasetCache::global()
        .load(&settings.data.paths, &settings.data.prepare_options())
        .inspect_err(|e| log::error!("Failed to load track data: {e}"))
        .context("loading track data")?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([settings.window.width, settings.window.height])
            .with_min_inner_size([800.0, 500.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Track Dashboard – Music Analytics",
        options,
        Box::new(move |_cc| Ok(Box::new(DashboardApp::new(&settings, dataset)))),
    )
    .map_err(|e| anyhow!("running the dashboard: {e}"))
}

use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::data::cache::DatasetCache;
use crate::state::{AppState, FilterEvent};

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel. Every widget change becomes a
/// [`FilterEvent`] that is handed to the state once the panel is drawn.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filters");
    ui.separator();

    let Some(dataset) = &state.dataset else {
        ui.label("No dataset loaded.");
        return;
    };

    let mut events: Vec<FilterEvent> = Vec::new();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- Genre multi-select ----
            let n_selected = state.selection.genres.len();
            let n_total = dataset.genres.len();
            egui::CollapsingHeader::new(
                RichText::new(format!("Select Genre(s)  ({n_selected}/{n_total})")).strong(),
            )
            .id_salt("genre_filter")
            .default_open(true)
            .show(ui, |ui: &mut Ui| {
                ui.horizontal(|ui: &mut Ui| {
                    if ui.small_button("All").clicked() {
                        events.push(FilterEvent::SelectAllGenres);
                    }
                    if ui.small_button("None").clicked() {
                        events.push(FilterEvent::SelectNoGenres);
                    }
                });

                for genre in &dataset.genres {
                    let mut checked = state.selection.genres.contains(genre);
                    let mut text = RichText::new(genre);
                    if let Some(cm) = &state.color_map {
                        text = text.color(cm.color_for(genre));
                    }
                    if ui.checkbox(&mut checked, text).changed() {
                        events.push(FilterEvent::ToggleGenre(genre.clone()));
                    }
                }
            });
            ui.separator();

            // ---- Popularity range ----
            ui.strong("Select Popularity Range");
            let mut lo = state.selection.popularity.lo();
            let mut hi = state.selection.popularity.hi();
            let lo_changed = ui
                .add(egui::Slider::new(&mut lo, 0..=100).text("min"))
                .changed();
            let hi_changed = ui
                .add(egui::Slider::new(&mut hi, 0..=100).text("max"))
                .changed();
            if lo_changed || hi_changed {
                // Dragging one handle past the other pushes the other along.
                if lo_changed && lo > hi {
                    hi = lo;
                } else if hi_changed && hi < lo {
                    lo = hi;
                }
                events.push(FilterEvent::SetPopularityRange { lo, hi });
            }
        });

    for event in events {
        state.on_filter_event(event);
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(ds) = &state.dataset {
            ui.label(format!(
                "{} tracks loaded from {}, {} visible",
                ds.len(),
                ds.source.display(),
                state.visible_indices.len()
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

/// Let the user pick another track table. On failure the current dataset
/// stays and the error is shown in the top bar.
pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open track data")
        .add_filter("Supported files", &["csv", "json", "parquet", "pq"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        match DatasetCache::global().load(&[path], &state.prepare_options) {
            Ok(dataset) => {
                log::info!(
                    "Loaded {} tracks in genres {:?}",
                    dataset.len(),
                    dataset.genres
                );
                state.set_dataset(dataset);
            }
            Err(e) => {
                log::error!("Failed to load file: {e}");
                state.status_message = Some(format!("Error: {e}"));
            }
        }
    }
}

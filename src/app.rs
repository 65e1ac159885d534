use std::sync::Arc;

use eframe::egui;

use crate::config::Settings;
use crate::data::model::Dataset;
use crate::state::AppState;
use crate::ui::{charts, panels};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct DashboardApp {
    pub state: AppState,
}

impl DashboardApp {
    pub fn new(settings: &Settings, dataset: Arc<Dataset>) -> Self {
        let mut state = AppState::new(settings.charts.clone(), settings.data.prepare_options());
        state.set_dataset(dataset);
        Self { state }
    }
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: filters ----
        egui::SidePanel::left("filter_panel")
            .default_width(220.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: charts ----
        egui::CentralPanel::default().show(ctx, |ui| {
            charts::dashboard(ui, &self.state);
        });
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    use super::*;
    use crate::data::model::Track;

    fn track(genre: &str, popularity: i64) -> Track {
        Track {
            track_name: format!("{genre} {popularity}"),
            artists: "Someone".to_string(),
            track_genre: genre.to_string(),
            popularity,
            danceability: 0.5,
            energy: 0.6,
            valence: 0.7,
            extra: BTreeMap::new(),
        }
    }

    #[test]
    fn app_starts_with_the_startup_dataset_on_screen() {
        let dataset = Arc::new(Dataset {
            tracks: vec![track("pop", 50), track("rock", 70)],
            genres: vec!["pop".to_string(), "rock".to_string()],
            source: PathBuf::from("tracks.csv"),
        });

        let app = DashboardApp::new(&Settings::default(), Arc::clone(&dataset));

        let shown = app.state.dataset.as_ref().unwrap();
        assert!(Arc::ptr_eq(shown, &dataset));
        assert_eq!(app.state.visible_indices, vec![0, 1]);
        assert_eq!(app.state.views.genre_popularity.len(), 2);
        assert_eq!(app.state.views.danceability_points.len(), 2);
    }
}

use eframe::egui::{self, Color32, ScrollArea, Ui};
use egui_extras::{Column, TableBuilder};
use egui_plot::{Bar, BarChart, GridMark, Legend, Plot, PlotPoints, Points};

use crate::color::{generate_palette, ColorMap};
use crate::data::aggregate::ScatterPoint;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Central panel – the dashboard
// ---------------------------------------------------------------------------

/// Render every chart for the current views. Empty views draw empty plots.
/// The app is only constructed with a dataset, so there is no "nothing
/// loaded" screen.
pub fn dashboard(ui: &mut Ui, state: &AppState) {
    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            ui.heading("Music Analytics Dashboard");
            ui.label(
                "Song characteristics, genres and popularity, explored through audio features.",
            );
            if state.visible_indices.is_empty() {
                ui.colored_label(Color32::YELLOW, "No tracks match the current filters.");
            }
            ui.add_space(8.0);

            ui.columns(2, |cols: &mut [Ui]| {
                popularity_histogram(&mut cols[0], state);
                genre_popularity_bars(&mut cols[1], state);
            });
            ui.add_space(8.0);

            ui.columns(2, |cols: &mut [Ui]| {
                scatter(
                    &mut cols[0],
                    state,
                    "danceability_scatter",
                    "Danceability vs Popularity",
                    "danceability",
                    &state.views.danceability_points,
                );
                scatter(
                    &mut cols[1],
                    state,
                    "energy_scatter",
                    "Energy vs Popularity",
                    "energy",
                    &state.views.energy_points,
                );
            });
            ui.add_space(8.0);

            genre_feature_bars(ui, state);
            ui.add_space(8.0);
            genre_feature_table(ui, state);
        });
}

// ---------------------------------------------------------------------------
// Individual charts
// ---------------------------------------------------------------------------

fn popularity_histogram(ui: &mut Ui, state: &AppState) {
    ui.strong("Distribution of Song Popularity");

    let bars: Vec<Bar> = state
        .views
        .histogram
        .iter()
        .map(|bin| {
            Bar::new(bin.center(), bin.count as f64)
                .width(bin.width())
                .name(format!("{:.0}–{:.0}", bin.start, bin.end))
        })
        .collect();

    Plot::new("popularity_histogram")
        .height(state.charts.chart_height)
        .x_axis_label("popularity")
        .y_axis_label("count")
        .allow_drag(false)
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).color(Color32::LIGHT_BLUE));
        });
}

fn genre_popularity_bars(ui: &mut Ui, state: &AppState) {
    ui.strong("Average Popularity by Genre");

    let labels: Vec<String> = state
        .views
        .genre_popularity
        .iter()
        .map(|m| m.genre.clone())
        .collect();
    let bars: Vec<Bar> = state
        .views
        .genre_popularity
        .iter()
        .enumerate()
        .map(|(i, m)| {
            Bar::new(i as f64, m.mean)
                .width(0.7)
                .name(&m.genre)
                .fill(genre_color(state.color_map.as_ref(), &m.genre))
        })
        .collect();

    Plot::new("genre_popularity")
        .height(state.charts.chart_height)
        .y_axis_label("mean popularity")
        .x_axis_formatter(move |mark, _range| category_label(&labels, mark))
        .allow_drag(false)
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars));
        });
}

/// Scatter of one feature against popularity. Hovering a point shows the
/// track name and artists of the nearest track.
fn scatter(
    ui: &mut Ui,
    state: &AppState,
    id: &str,
    title: &str,
    x_label: &str,
    points: &[ScatterPoint],
) {
    ui.strong(title);

    let series: PlotPoints = points.iter().map(|p| [p.x, p.popularity]).collect();

    let response = Plot::new(id)
        .height(state.charts.chart_height)
        .x_axis_label(x_label.to_string())
        .y_axis_label("popularity")
        .show(ui, |plot_ui| {
            plot_ui.points(
                Points::new(series)
                    .radius(state.charts.point_radius)
                    .color(Color32::from_rgb(99, 110, 250)),
            );

            let pointer = plot_ui.pointer_coordinate()?;
            let bounds = plot_ui.plot_bounds();
            nearest_point(points, pointer.x, pointer.y, bounds.width(), bounds.height())
        });

    if let Some(idx) = response.inner {
        let p = &points[idx];
        response.response.on_hover_text(format!(
            "{}\n{}\n{x_label}: {:.3}, popularity: {:.0}",
            p.track_name, p.artists, p.x, p.popularity
        ));
    }
}

fn genre_feature_bars(ui: &mut Ui, state: &AppState) {
    ui.strong("Average Audio Features by Genre");

    let table = &state.views.genre_features;
    let labels: Vec<String> = table.rows.iter().map(|r| r.genre.clone()).collect();
    let n_features = table.features.len().max(1);
    let bar_width = 0.8 / n_features as f64;
    let colors = generate_palette(table.features.len());

    let charts: Vec<BarChart> = table
        .features
        .iter()
        .enumerate()
        .map(|(fi, feature)| {
            let offset = (fi as f64 - (n_features as f64 - 1.0) / 2.0) * bar_width;
            let bars: Vec<Bar> = table
                .rows
                .iter()
                .enumerate()
                .filter_map(|(gi, row)| {
                    let mean = row.means[fi]?;
                    Some(Bar::new(gi as f64 + offset, mean).width(bar_width))
                })
                .collect();
            BarChart::new(bars)
                .name(feature.to_string())
                .color(colors[fi])
        })
        .collect();

    Plot::new("genre_features")
        .height(state.charts.chart_height)
        .legend(Legend::default())
        .y_axis_label("mean")
        .x_axis_formatter(move |mark, _range| category_label(&labels, mark))
        .allow_drag(false)
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            for chart in charts {
                plot_ui.bar_chart(chart);
            }
        });
}

fn genre_feature_table(ui: &mut Ui, state: &AppState) {
    let table = &state.views.genre_features;
    if table.is_empty() {
        return;
    }

    egui::CollapsingHeader::new("Feature means table")
        .default_open(false)
        .show(ui, |ui: &mut Ui| {
            TableBuilder::new(ui)
                .striped(true)
                .column(Column::auto().at_least(120.0))
                .columns(Column::auto().at_least(90.0), table.features.len())
                .header(20.0, |mut header| {
                    header.col(|ui| {
                        ui.strong("track_genre");
                    });
                    for feature in &table.features {
                        header.col(|ui| {
                            ui.strong(feature.to_string());
                        });
                    }
                })
                .body(|mut body| {
                    for row in &table.rows {
                        body.row(18.0, |mut table_row| {
                            table_row.col(|ui| {
                                ui.colored_label(
                                    genre_color(state.color_map.as_ref(), &row.genre),
                                    &row.genre,
                                );
                            });
                            for mean in &row.means {
                                table_row.col(|ui| {
                                    match mean {
                                        Some(v) => ui.label(format!("{v:.3}")),
                                        None => ui.weak("–"),
                                    };
                                });
                            }
                        });
                    }
                });
        });
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn genre_color(color_map: Option<&ColorMap>, genre: &str) -> Color32 {
    color_map
        .map(|cm| cm.color_for(genre))
        .unwrap_or(Color32::LIGHT_BLUE)
}

/// Axis label for categorical charts: only whole grid marks get a name.
fn category_label(labels: &[String], mark: GridMark) -> String {
    let idx = mark.value.round();
    if (mark.value - idx).abs() > 1e-6 || idx < 0.0 {
        return String::new();
    }
    labels.get(idx as usize).cloned().unwrap_or_default()
}

/// Index of the point closest to `(x, y)`, measured in fractions of the
/// visible plot area. `None` when nothing is within 2% of it.
fn nearest_point(points: &[ScatterPoint], x: f64, y: f64, width: f64, height: f64) -> Option<usize> {
    if width <= 0.0 || height <= 0.0 {
        return None;
    }
    points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let dx = (p.x - x) / width;
            let dy = (p.popularity - y) / height;
            (i, dx * dx + dy * dy)
        })
        .filter(|(_, d)| *d < 0.02 * 0.02)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
}

use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use rusty_torque::data::loader::SUPPORTED_EXTENSIONS;
use rusty_torque::data::model::Categorical;
use rusty_torque::report::export::default_file_name;
use rusty_torque::report::html::HtmlExporter;
use rusty_torque::state::AppState;

use super::color32;

/// A filter change requested by a widget, applied once rendering is done.
enum FilterAction {
    Toggle(Categorical, String),
    All(Categorical),
    None(Categorical),
}

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filters");
    ui.separator();

    let Some(table) = &state.table else {
        ui.label("No dataset loaded.");
        return;
    };

    let mut actions = Vec::new();
    let colors = state.chart_builder().map(|b| b.colors());

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            for cat in Categorical::ALL {
                let all_values = table.unique_values(cat);
                let n_selected = all_values
                    .iter()
                    .filter(|v| state.selection.is_allowed(cat, v))
                    .count();
                let header_text = format!(
                    "{}  ({n_selected}/{})",
                    table.categorical_column(cat),
                    all_values.len()
                );

                egui::CollapsingHeader::new(RichText::new(header_text).strong())
                    .id_salt(cat.label())
                    .default_open(true)
                    .show(ui, |ui: &mut Ui| {
                        ui.horizontal(|ui: &mut Ui| {
                            if ui.small_button("All").clicked() {
                                actions.push(FilterAction::All(cat));
                            }
                            if ui.small_button("None").clicked() {
                                actions.push(FilterAction::None(cat));
                            }
                        });

                        for val in all_values {
                            let label = if val.is_empty() { "<empty>" } else { val.as_str() };
                            let mut text = RichText::new(label);
                            // Programs carry their chart colour.
                            if cat == Categorical::Program {
                                if let Some(cm) = colors {
                                    text = text.color(color32(cm.color_for(val)));
                                }
                            }

                            let mut checked = state.selection.is_allowed(cat, val);
                            if ui.checkbox(&mut checked, text).changed() {
                                actions.push(FilterAction::Toggle(cat, val.clone()));
                            }
                        }
                    });
            }
        });

    for action in actions {
        match action {
            FilterAction::Toggle(cat, value) => state.toggle_filter_value(cat, &value),
            FilterAction::All(cat) => state.select_all(cat),
            FilterAction::None(cat) => state.select_none(cat),
        }
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
            let can_export = state.table.is_some() && !state.is_exporting();
            if ui
                .add_enabled(can_export, egui::Button::new("Export report…"))
                .clicked()
            {
                save_report_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();
        ui.strong(&state.config.app_title);

        if let Some(table) = &state.table {
            ui.separator();
            ui.label(format!(
                "{}: {} rows loaded, {} visible",
                state.source_name.as_deref().unwrap_or("table"),
                table.len(),
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
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open test results")
        .add_filter("Supported files", SUPPORTED_EXTENSIONS)
        .add_filter("Excel", &["xlsx", "xlsm", "xlsb", "xls"])
        .add_filter("OpenDocument", &["ods"])
        .add_filter("CSV", &["csv"])
        .add_filter("Parquet", &["parquet", "pq"])
        .add_filter("JSON", &["json"])
        .pick_file();

    if let Some(path) = file {
        // Failures are reported through `status_message`.
        let _ = state.load_path(&path);
    }
}

pub fn save_report_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Save report")
        .set_file_name(default_file_name(&state.config.export.file_stem, &HtmlExporter))
        .add_filter("HTML", &["html"])
        .add_filter("JSON", &["json"])
        .save_file();

    if let Some(path) = file {
        state.start_export(path);
    }
}

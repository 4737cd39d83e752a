use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::{Column, TableBuilder};
use rusty_torque::chart::ChartSpec;
use rusty_torque::error::ChartError;
use rusty_torque::metrics::MetricsSnapshot;
use rusty_torque::state::{AppState, ExportStatus};

use super::{panels, plot};

const CHART_HEIGHT: f32 = 320.0;
const WARNING: Color32 = Color32::from_rgb(230, 160, 0);

// ---------------------------------------------------------------------------
// Central panel
// ---------------------------------------------------------------------------

pub fn dashboard(ui: &mut Ui, state: &mut AppState) {
    if state.table.is_none() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Load a results file to begin (File → Open…)");
        });
        return;
    }

    let mut axes_changed = false;

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            let Some(derived) = &state.derived else {
                return;
            };

            ui.heading(&state.config.app_title);
            kpi_row(ui, &derived.metrics);
            if state.is_view_empty() {
                ui.colored_label(WARNING, "⚠ No rows match the current filters.");
            }

            // ---- Box plots, one tab per configured column ----
            ui.separator();
            ui.heading("Distributions");
            ui.horizontal(|ui: &mut Ui| {
                for (i, (column, _)) in derived.box_charts.iter().enumerate() {
                    ui.selectable_value(&mut state.active_tab, i, column.as_str());
                }
            });
            if let Some((column, chart)) = derived.box_charts.get(state.active_tab) {
                chart_or_warning(ui, &format!("box_{column}"), chart);
            }

            // ---- Scatter with per-program trend lines ----
            ui.separator();
            ui.heading("Relations between numeric variables");
            let numeric = &state.config.numeric_columns;
            ui.horizontal(|ui: &mut Ui| {
                axes_changed |= column_picker(ui, "scatter_x", "X", numeric, &mut state.scatter_axes.x);
                axes_changed |= column_picker(ui, "scatter_y", "Y", numeric, &mut state.scatter_axes.y);
            });
            chart_or_warning(ui, "scatter", &derived.scatter);

            // ---- One curve per program ----
            ui.separator();
            ui.heading("Curves");
            ui.horizontal(|ui: &mut Ui| {
                axes_changed |= column_picker(ui, "curve_x", "X", numeric, &mut state.curve_axes.x);
                axes_changed |= column_picker(ui, "curve_y", "Y", numeric, &mut state.curve_axes.y);
            });
            chart_or_warning(ui, "curves", &derived.curves);

            // ---- Values ranked over the part count ----
            ui.separator();
            ui.heading("Variable curves");
            ui.horizontal(|ui: &mut Ui| {
                axes_changed |=
                    column_picker(ui, "sequence_col", "Column", numeric, &mut state.sequence_column);
                if let Ok(ChartSpec::Sequence(seq)) = &derived.sequence {
                    ui.label(format!("Filtered rows: {}", seq.total_rows));
                }
            });
            chart_or_warning(ui, "sequence", &derived.sequence);

            // ---- Data and report ----
            ui.separator();
            egui::CollapsingHeader::new(RichText::new("Filtered data").strong())
                .default_open(false)
                .show(ui, |ui: &mut Ui| data_table(ui, state));
        });

    // The report section mutates state, so it is drawn after the borrow above.
    ui.separator();
    report_section(ui, state);

    if axes_changed {
        state.recompute();
    }
}

// ---------------------------------------------------------------------------
// Widgets
// ---------------------------------------------------------------------------

fn kpi_row(ui: &mut Ui, metrics: &MetricsSnapshot) {
    ui.horizontal_wrapped(|ui: &mut Ui| {
        kpi(ui, "Filtered rows", metrics.row_count.to_string());
        kpi(ui, "Non-conforming", metrics.nonconforming_count.to_string());
        for mean in &metrics.means {
            kpi(ui, &format!("{} mean", mean.column), mean.display());
        }
    });
}

fn kpi(ui: &mut Ui, label: &str, value: String) {
    ui.group(|ui: &mut Ui| {
        ui.vertical(|ui: &mut Ui| {
            ui.label(RichText::new(label).small());
            ui.label(RichText::new(value).heading().strong());
        });
    });
}

/// Combo box over the numeric columns. Returns true when the choice changed.
fn column_picker(
    ui: &mut Ui,
    id: &str,
    label: &str,
    columns: &[String],
    selected: &mut String,
) -> bool {
    let before = selected.clone();
    ui.label(label);
    egui::ComboBox::from_id_salt(id)
        .selected_text(selected.as_str())
        .show_ui(ui, |ui: &mut Ui| {
            for col in columns {
                ui.selectable_value(selected, col.clone(), col.as_str());
            }
        });
    *selected != before
}

fn chart_or_warning(ui: &mut Ui, id: &str, chart: &Result<ChartSpec, ChartError>) {
    match chart {
        Ok(spec) => plot::chart(ui, id, spec, CHART_HEIGHT),
        Err(ChartError::InvalidSelection(msg)) => {
            ui.colored_label(WARNING, format!("⚠ {msg}"));
        }
        Err(e) => {
            ui.colored_label(Color32::RED, e.to_string());
        }
    }
}

fn data_table(ui: &mut Ui, state: &AppState) {
    let Some(view) = state.view() else {
        return;
    };
    let table = view.table();
    let rows = view.row_indices();

    TableBuilder::new(ui)
        .striped(true)
        .resizable(true)
        .max_scroll_height(360.0)
        .columns(Column::auto().at_least(60.0), table.columns().len())
        .header(20.0, |mut header| {
            for name in table.columns() {
                header.col(|ui: &mut Ui| {
                    ui.strong(name.as_str());
                });
            }
        })
        .body(|body| {
            body.rows(18.0, rows.len(), |mut row| {
                let record = table.record(rows[row.index()]);
                for cell in record.cells() {
                    row.col(|ui: &mut Ui| {
                        ui.label(cell.to_string());
                    });
                }
            });
        });
}

fn report_section(ui: &mut Ui, state: &mut AppState) {
    ui.horizontal(|ui: &mut Ui| {
        let busy = state.is_exporting();
        if ui
            .add_enabled(!busy, egui::Button::new("Generate report…"))
            .clicked()
        {
            panels::save_report_dialog(state);
        }

        match &state.export_status {
            ExportStatus::Idle => {}
            ExportStatus::Working => {
                ui.spinner();
                ui.label("Generating report…");
            }
            ExportStatus::Done(path) => {
                ui.label(format!("Report saved to {}", path.display()));
            }
            ExportStatus::Failed(msg) => {
                ui.colored_label(Color32::RED, format!("Report failed: {msg}"));
                if ui.button("Retry").clicked() {
                    panels::save_report_dialog(state);
                }
            }
        }
    });
}

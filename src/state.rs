use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use crate::chart::{ChartBuilder, ChartSpec};
use crate::config::AppConfig;
use crate::data::filter::{filtered_indices, FilterSelection, FilteredView};
use crate::data::loader::load_file;
use crate::data::model::{Categorical, Table};
use crate::error::{ChartError, ExportError, LoadError};
use crate::metrics::{summarize, MetricsSnapshot, NonconformityMatcher};
use crate::report::export::{export_report, exporter_for_path};
use crate::report::{self, ReportDocument};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// X/Y column choice of one chart section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxisChoice {
    pub x: String,
    pub y: String,
}

/// Everything recomputed from the current view on each interaction. Every
/// chart carries its own result so one failure never hides the others.
#[derive(Debug, Clone)]
pub struct Derived {
    pub metrics: MetricsSnapshot,
    /// One grouped box plot per `default_tabs` entry.
    pub box_charts: Vec<(String, Result<ChartSpec, ChartError>)>,
    pub scatter: Result<ChartSpec, ChartError>,
    pub curves: Result<ChartSpec, ChartError>,
    pub sequence: Result<ChartSpec, ChartError>,
}

/// Progress of the latest report export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportStatus {
    Idle,
    Working,
    Done(PathBuf),
    Failed(String),
}

/// The full session state, independent of rendering.
pub struct AppState {
    pub config: AppConfig,

    /// Loaded table (None until the user loads a file).
    pub table: Option<Table>,

    /// File name of the loaded table.
    pub source_name: Option<String>,

    /// Per-column filter selections.
    pub selection: FilterSelection,

    /// Indices of rows passing the current filters (cached).
    pub visible_indices: Vec<usize>,

    /// Index into `config.default_tabs` of the box plot on display.
    pub active_tab: usize,

    pub scatter_axes: AxisChoice,
    pub curve_axes: AxisChoice,
    pub sequence_column: String,

    pub derived: Option<Derived>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,

    pub export_status: ExportStatus,

    pending_export: Option<Receiver<Result<PathBuf, ExportError>>>,
    matcher: NonconformityMatcher,
    builder: Option<ChartBuilder>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let defaults = AxisChoice {
            x: config.x_y_defaults.x.clone(),
            y: config.x_y_defaults.y.clone(),
        };
        Self {
            matcher: NonconformityMatcher::new(&config.nonconforming_markers),
            sequence_column: defaults.x.clone(),
            scatter_axes: defaults.clone(),
            curve_axes: defaults,
            table: None,
            source_name: None,
            selection: FilterSelection::default(),
            visible_indices: Vec::new(),
            active_tab: 0,
            derived: None,
            status_message: None,
            export_status: ExportStatus::Idle,
            pending_export: None,
            builder: None,
            config,
        }
    }

    /// Load a file; on failure the previous table (if any) stays in place.
    pub fn load_path(&mut self, path: &Path) -> Result<(), LoadError> {
        match load_file(path, &self.config.schema()) {
            Ok(table) => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                self.set_table(table, name);
                Ok(())
            }
            Err(e) => {
                log::error!("Failed to load {}: {e}", path.display());
                self.status_message = Some(format!("Error: {e}"));
                Err(e)
            }
        }
    }

    /// Ingest a newly loaded table, reset filters and recompute.
    pub fn set_table(&mut self, table: Table, source_name: impl Into<String>) {
        self.selection = FilterSelection::all(&table);
        self.visible_indices = (0..table.len()).collect();
        self.builder = Some(ChartBuilder::new(&self.config, &table));
        self.table = Some(table);
        self.source_name = Some(source_name.into());
        self.status_message = None;
        self.export_status = ExportStatus::Idle;
        self.recompute();
    }

    /// The current filtered view.
    pub fn view(&self) -> Option<FilteredView<'_>> {
        self.table
            .as_ref()
            .map(|t| FilteredView::from_indices(t, self.visible_indices.clone()))
    }

    /// The chart builder of the loaded table.
    pub fn chart_builder(&self) -> Option<&ChartBuilder> {
        self.builder.as_ref()
    }

    /// Recompute `visible_indices` after a filter change, then everything
    /// derived from them.
    pub fn refilter(&mut self) {
        if let Some(table) = &self.table {
            self.visible_indices = filtered_indices(table, &self.selection);
        }
        self.recompute();
    }

    /// Rebuild metrics and charts from the current view.
    pub fn recompute(&mut self) {
        let derived = match (self.view(), &self.builder) {
            (Some(view), Some(builder)) => Some(derive(self, builder, &view)),
            _ => None,
        };
        self.derived = derived;
    }

    /// Toggle a single value in a column's filter.
    pub fn toggle_filter_value(&mut self, cat: Categorical, value: &str) {
        self.selection.toggle(cat, value);
        self.refilter();
    }

    /// Select all values in a column.
    pub fn select_all(&mut self, cat: Categorical) {
        let Some(table) = &self.table else {
            return;
        };
        self.selection.select_all(table, cat);
        self.refilter();
    }

    /// Deselect all values in a column.
    pub fn select_none(&mut self, cat: Categorical) {
        self.selection.select_none(cat);
        self.refilter();
    }

    /// Whether the current view has no rows.
    pub fn is_view_empty(&self) -> bool {
        self.table.is_some() && self.visible_indices.is_empty()
    }

    /// Report document of the current view.
    pub fn report(&self) -> Option<ReportDocument> {
        let view = self.view()?;
        let metrics = &self.derived.as_ref()?.metrics;
        Some(report::build(&view, metrics, &self.config.app_title))
    }

    /// Start exporting the current report to `destination` in the
    /// background. A newer request supersedes one still running.
    pub fn start_export(&mut self, destination: PathBuf) {
        let Some(document) = self.report() else {
            self.export_status = ExportStatus::Failed("no data loaded".to_string());
            return;
        };
        let exporter = exporter_for_path(&destination);
        let timeout = self.config.export_timeout();
        let (tx, rx) = mpsc::channel();
        let spawned = thread::Builder::new()
            .name("report-request".to_string())
            .spawn(move || {
                let _ = tx.send(export_report(document, exporter, &destination, timeout));
            });

        match spawned {
            Ok(_) => {
                self.pending_export = Some(rx);
                self.export_status = ExportStatus::Working;
            }
            Err(e) => {
                self.pending_export = None;
                self.export_status = ExportStatus::Failed(e.to_string());
            }
        }
    }

    /// Collect the export result if it has arrived.
    pub fn poll_export(&mut self) {
        let Some(rx) = &self.pending_export else {
            return;
        };
        let outcome = match rx.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return,
            Err(TryRecvError::Disconnected) => Err(ExportError::WorkerLost),
        };
        self.pending_export = None;
        self.export_status = match outcome {
            Ok(path) => ExportStatus::Done(path),
            Err(e) => {
                log::error!("Report export failed: {e}");
                ExportStatus::Failed(e.to_string())
            }
        };
    }

    pub fn is_exporting(&self) -> bool {
        self.pending_export.is_some()
    }
}

fn derive(state: &AppState, builder: &ChartBuilder, view: &FilteredView<'_>) -> Derived {
    let config = &state.config;
    log::debug!("Recomputing metrics and charts over {} rows", view.len());
    if view.is_empty() {
        log::warn!("The current filter selection matches no rows");
    }

    let metrics = summarize(view, &state.matcher, config.kpi_columns());
    let box_charts = config
        .default_tabs
        .iter()
        .map(|col| {
            let chart = builder.grouped_box(view, col).map(ChartSpec::from);
            (col.clone(), logged(chart))
        })
        .collect();
    let scatter = builder
        .scatter_trend(view, &state.scatter_axes.x, &state.scatter_axes.y)
        .map(ChartSpec::from);
    let curves = builder
        .multi_line(view, &state.curve_axes.x, &state.curve_axes.y)
        .map(ChartSpec::from);
    let sequence = builder
        .sequence(view, &state.sequence_column)
        .map(ChartSpec::from);

    Derived {
        metrics,
        box_charts,
        scatter: logged(scatter),
        curves: logged(curves),
        sequence: logged(sequence),
    }
}

fn logged(chart: Result<ChartSpec, ChartError>) -> Result<ChartSpec, ChartError> {
    if let Err(e) = &chart {
        log::warn!("Chart omitted: {e}");
    }
    chart
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::{load_bytes, InputFormat};
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    const CONFIG: &str = r#"{
        "app_title": "Station 3",
        "numeric_columns": ["M[Nm]", "T[s]"],
        "default_tabs": ["M[Nm]", "T[s]"],
        "x_y_defaults": { "x": "T[s]", "y": "M[Nm]" },
        "plot_colors": {
            "main_palette": "Plotly",
            "trendline": { "color": "black", "style": "dash" }
        }
    }"#;

    const CSV: &str = "Prog.,Result.,M[Nm],T[s]\n\
                       A,OK,1.0,0.5\n\
                       B,ERR1,2.0,0.7\n\
                       A,OK,3.0,0.6\n\
                       B,W2,4.0,0.9\n";

    fn state() -> AppState {
        let config = AppConfig::from_json_str(CONFIG).unwrap();
        let table = load_bytes(CSV.as_bytes(), InputFormat::Csv, &config.schema()).unwrap();
        let mut state = AppState::new(config);
        state.set_table(table, "results.csv");
        state
    }

    #[test]
    fn test_initial_state_shows_everything() {
        let s = state();
        assert_eq!(s.visible_indices, vec![0, 1, 2, 3]);
        let derived = s.derived.as_ref().unwrap();
        assert_eq!(derived.metrics.row_count, 4);
        assert_eq!(derived.metrics.nonconforming_count, 2);
        assert_eq!(derived.box_charts.len(), 2);
        assert!(derived.scatter.is_ok());
        assert!(derived.curves.is_ok());
        assert!(derived.sequence.is_ok());
        assert_eq!(s.sequence_column, "T[s]");
    }

    #[test]
    fn test_filter_change_recomputes_metrics() {
        let mut s = state();
        s.toggle_filter_value(Categorical::Program, "B");
        assert_eq!(s.visible_indices, vec![0, 2]);
        let metrics = &s.derived.as_ref().unwrap().metrics;
        assert_eq!(metrics.row_count, 2);
        assert_eq!(metrics.mean("M[Nm]").unwrap().value, 2.0);
    }

    #[test]
    fn test_invalid_axes_only_drop_that_chart() {
        let mut s = state();
        s.scatter_axes.x = "M[Nm]".into();
        s.recompute();
        let derived = s.derived.as_ref().unwrap();
        assert!(matches!(derived.scatter, Err(ChartError::InvalidSelection(_))));
        assert!(derived.curves.is_ok());
        assert!(derived.box_charts.iter().all(|(_, c)| c.is_ok()));
        assert_eq!(derived.metrics.row_count, 4);
    }

    #[test]
    fn test_empty_selection_degrades_gracefully() {
        let mut s = state();
        s.select_none(Categorical::Result);
        assert!(s.is_view_empty());
        let derived = s.derived.as_ref().unwrap();
        assert_eq!(derived.metrics.row_count, 0);
        assert!(!derived.metrics.means[0].has_data());
        s.select_all(Categorical::Result);
        assert_eq!(s.visible_indices.len(), 4);
    }

    #[test]
    fn test_failed_load_keeps_previous_table() {
        let mut s = state();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.csv");
        std::fs::write(&path, "Prog.,M[Nm],T[s]\nA,1,2\n").unwrap();
        let err = s.load_path(&path).unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn(ref c) if c == "Result."));
        assert_eq!(s.table.as_ref().unwrap().len(), 4);
        assert!(s.status_message.as_ref().unwrap().contains("Result."));
    }

    #[test]
    fn test_load_path_resets_filters() {
        let mut s = state();
        s.select_none(Categorical::Program);
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("next.csv");
        std::fs::write(&path, CSV).unwrap();
        s.load_path(&path).unwrap();
        assert_eq!(s.visible_indices.len(), 4);
        assert_eq!(s.source_name.as_deref(), Some("next.csv"));
    }

    #[test]
    fn test_background_export_completes() {
        let mut s = state();
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("rapport.html");
        s.start_export(dest.clone());
        assert!(s.is_exporting());

        let deadline = Instant::now() + Duration::from_secs(10);
        while s.is_exporting() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
            s.poll_export();
        }
        assert_eq!(s.export_status, ExportStatus::Done(dest.clone()));
        let html = std::fs::read_to_string(dest).unwrap();
        assert!(html.contains("<h1>Station 3</h1>"));
    }

    #[test]
    fn test_export_without_data_fails() {
        let config = AppConfig::from_json_str(CONFIG).unwrap();
        let mut s = AppState::new(config);
        s.start_export(PathBuf::from("rapport.html"));
        assert!(matches!(s.export_status, ExportStatus::Failed(_)));
        assert!(!s.is_exporting());
    }
}

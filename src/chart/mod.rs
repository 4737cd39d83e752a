//! Chart derivation: turns a filtered view into renderer-agnostic chart
//! descriptions. Nothing here knows how a chart is drawn.
//!
//! Four kinds are produced:
//! * grouped box plots with a group-mean trend overlay, one per column;
//! * scatter plots coloured by group with a per-group OLS fit;
//! * multi-series lines, one series per group, sorted by X;
//! * a single line of a column against its rank in the sorted view.

pub mod stats;

use std::cmp::Ordering;

use serde::Serialize;

use crate::color::{parse_color, to_hex, ColorMap};
use crate::config::{AppConfig, DashStyle};
use crate::data::filter::FilteredView;
use crate::data::model::{Categorical, Table};
use crate::error::ChartError;
use crate::metrics::mean;
use stats::{BoxStats, LinearFit};

/// Axis title of the sequence chart.
pub const SEQUENCE_AXIS_TITLE: &str = "Total number of parts";

// ---------------------------------------------------------------------------
// Chart specifications
// ---------------------------------------------------------------------------

/// One renderer-agnostic chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChartSpec {
    GroupedBox(GroupedBoxChart),
    ScatterTrend(ScatterChart),
    MultiLine(MultiLineChart),
    Sequence(SequenceChart),
}

impl ChartSpec {
    pub fn title(&self) -> &str {
        match self {
            ChartSpec::GroupedBox(c) => &c.title,
            ChartSpec::ScatterTrend(c) => &c.title,
            ChartSpec::MultiLine(c) => &c.title,
            ChartSpec::Sequence(c) => &c.title,
        }
    }
}

/// Distribution of one column per group, with the group means joined by a
/// trend line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupedBoxChart {
    pub title: String,
    pub column: String,
    pub group_column: String,
    pub palette: String,
    /// One box per group, groups ascending.
    pub boxes: Vec<GroupBox>,
    pub trend: TrendLine,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupBox {
    pub group: String,
    pub color: String,
    /// `None` when the group has no value for the column.
    pub stats: Option<BoxStats>,
}

/// Overlay joining per-group means, groups ascending.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendLine {
    pub name: String,
    pub color: String,
    pub dash: DashStyle,
    pub points: Vec<GroupMean>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupMean {
    pub group: String,
    pub mean: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterChart {
    pub title: String,
    pub x_column: String,
    pub y_column: String,
    pub group_column: String,
    pub palette: String,
    pub groups: Vec<ScatterGroup>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterGroup {
    pub group: String,
    pub color: String,
    pub points: Vec<[f64; 2]>,
    /// Per-group regression; `None` with fewer than two distinct X values.
    pub fit: Option<LinearFit>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultiLineChart {
    pub title: String,
    pub x_column: String,
    pub y_column: String,
    pub palette: String,
    pub series: Vec<LineSeries>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineSeries {
    /// Legend label: the group identifier.
    pub name: String,
    pub color: String,
    /// Sorted by ascending X.
    pub points: Vec<[f64; 2]>,
}

/// A column plotted against the 1-based rank of each row once the view is
/// sorted by that column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SequenceChart {
    pub title: String,
    pub column: String,
    pub x_title: String,
    pub color: String,
    /// Number of rows ranked, including rows with no value.
    pub total_rows: usize,
    /// `[sequence index, value]`.
    pub points: Vec<[f64; 2]>,
}

impl From<GroupedBoxChart> for ChartSpec {
    fn from(c: GroupedBoxChart) -> Self {
        ChartSpec::GroupedBox(c)
    }
}

impl From<ScatterChart> for ChartSpec {
    fn from(c: ScatterChart) -> Self {
        ChartSpec::ScatterTrend(c)
    }
}

impl From<MultiLineChart> for ChartSpec {
    fn from(c: MultiLineChart) -> Self {
        ChartSpec::MultiLine(c)
    }
}

impl From<SequenceChart> for ChartSpec {
    fn from(c: SequenceChart) -> Self {
        ChartSpec::Sequence(c)
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Derives chart specs for one loaded table.
///
/// Group colours are assigned over every program of the table, so a program
/// keeps its colour whatever the filter.
#[derive(Debug, Clone)]
pub struct ChartBuilder {
    numeric_columns: Vec<String>,
    palette_name: String,
    palette: Vec<String>,
    colors: ColorMap,
    trend_color: String,
    trend_dash: DashStyle,
}

impl ChartBuilder {
    pub fn new(config: &AppConfig, table: &Table) -> Self {
        let palette = config.palette();
        let trend_color = parse_color(&config.plot_colors.trendline.color)
            .map(to_hex)
            .unwrap_or_else(|| "#000000".to_string());
        ChartBuilder {
            numeric_columns: config.numeric_columns.clone(),
            palette_name: config.plot_colors.main_palette.clone(),
            colors: ColorMap::new(&palette, table.unique_values(Categorical::Program)),
            palette,
            trend_color,
            trend_dash: config.plot_colors.trendline.style,
        }
    }

    pub fn colors(&self) -> &ColorMap {
        &self.colors
    }

    /// Box plot of `column` by program with the program-mean trend line.
    pub fn grouped_box(
        &self,
        view: &FilteredView<'_>,
        column: &str,
    ) -> Result<GroupedBoxChart, ChartError> {
        self.check_column(column)?;
        let table = view.table();

        let mut boxes = Vec::new();
        let mut trend_points = Vec::new();
        for group in view.distinct(Categorical::Program) {
            let values: Vec<f64> = view
                .row_indices()
                .iter()
                .filter(|&&row| table.category(row, Categorical::Program) == group)
                .filter_map(|&row| table.number(row, column))
                .collect();

            let group_mean = mean(values.iter().copied());
            if !group_mean.is_nan() {
                trend_points.push(GroupMean {
                    group: group.to_string(),
                    mean: group_mean,
                });
            }
            boxes.push(GroupBox {
                group: group.to_string(),
                color: self.colors.color_for(group).to_string(),
                stats: BoxStats::from_values(&values),
            });
        }

        Ok(GroupedBoxChart {
            title: format!("Distribution of {column} by program"),
            column: column.to_string(),
            group_column: table.categorical_column(Categorical::Program).to_string(),
            palette: self.palette_name.clone(),
            boxes,
            trend: TrendLine {
                name: format!("Mean {column}"),
                color: self.trend_color.clone(),
                dash: self.trend_dash,
                points: trend_points,
            },
        })
    }

    /// Y against X, coloured by program, with one OLS fit per program.
    pub fn scatter_trend(
        &self,
        view: &FilteredView<'_>,
        x: &str,
        y: &str,
    ) -> Result<ScatterChart, ChartError> {
        self.check_pair(x, y)?;
        let table = view.table();

        let groups = view
            .distinct(Categorical::Program)
            .into_iter()
            .map(|group| {
                let points: Vec<[f64; 2]> = view
                    .row_indices()
                    .iter()
                    .filter(|&&row| table.category(row, Categorical::Program) == group)
                    .filter_map(|&row| Some([table.number(row, x)?, table.number(row, y)?]))
                    .collect();
                ScatterGroup {
                    group: group.to_string(),
                    color: self.colors.color_for(group).to_string(),
                    fit: LinearFit::fit(&points),
                    points,
                }
            })
            .collect();

        Ok(ScatterChart {
            title: format!("Relation between {x} and {y} by program"),
            x_column: x.to_string(),
            y_column: y.to_string(),
            group_column: table.categorical_column(Categorical::Program).to_string(),
            palette: self.palette_name.clone(),
            groups,
        })
    }

    /// One line per program, each sorted by ascending X.
    pub fn multi_line(
        &self,
        view: &FilteredView<'_>,
        x: &str,
        y: &str,
    ) -> Result<MultiLineChart, ChartError> {
        self.check_pair(x, y)?;
        let table = view.table();
        let sorted = sorted_by(view, x);

        let mut series: Vec<LineSeries> = Vec::new();
        for row in sorted {
            let group = table.category(row, Categorical::Program);
            let idx = match series.iter().position(|s| s.name == group) {
                Some(idx) => idx,
                None => {
                    series.push(LineSeries {
                        name: group.to_string(),
                        color: self.colors.color_for(group).to_string(),
                        points: Vec::new(),
                    });
                    series.len() - 1
                }
            };
            if let (Some(xv), Some(yv)) = (table.number(row, x), table.number(row, y)) {
                series[idx].points.push([xv, yv]);
            }
        }

        Ok(MultiLineChart {
            title: format!("{y} versus {x}"),
            x_column: x.to_string(),
            y_column: y.to_string(),
            palette: self.palette_name.clone(),
            series,
        })
    }

    /// `column` plotted against each row's 1-based rank after sorting the
    /// view by `column`. Rows without a value rank last.
    pub fn sequence(
        &self,
        view: &FilteredView<'_>,
        column: &str,
    ) -> Result<SequenceChart, ChartError> {
        self.check_column(column)?;
        let table = view.table();

        let points = sorted_by(view, column)
            .into_iter()
            .enumerate()
            .filter_map(|(i, row)| Some([(i + 1) as f64, table.number(row, column)?]))
            .collect();

        Ok(SequenceChart {
            title: format!("Evolution of {column} over the total number of parts"),
            column: column.to_string(),
            x_title: SEQUENCE_AXIS_TITLE.to_string(),
            color: self.palette.first().cloned().unwrap_or_default(),
            total_rows: view.len(),
            points,
        })
    }

    fn check_column(&self, column: &str) -> Result<(), ChartError> {
        if self.numeric_columns.iter().any(|c| c == column) {
            Ok(())
        } else {
            Err(ChartError::UnknownColumn(column.to_string()))
        }
    }

    fn check_pair(&self, x: &str, y: &str) -> Result<(), ChartError> {
        self.check_column(x)?;
        self.check_column(y)?;
        if x == y {
            return Err(ChartError::InvalidSelection(x.to_string()));
        }
        Ok(())
    }
}

/// Row indices of the view, stably sorted by ascending `column`, missing
/// values last.
fn sorted_by(view: &FilteredView<'_>, column: &str) -> Vec<usize> {
    let table = view.table();
    let mut rows = view.row_indices().to_vec();
    rows.sort_by(|&a, &b| match (table.number(a, column), table.number(b, column)) {
        (Some(va), Some(vb)) => va.total_cmp(&vb),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    rows
}

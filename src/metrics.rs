//! KPI computation over a filtered view.

use crate::data::filter::FilteredView;
use crate::data::model::Categorical;

/// Shown in place of a mean computed over no values.
pub const NO_DATA: &str = "no data";

/// Case-insensitive substring matcher for non-conforming result codes.
///
/// Markers are matched literally anywhere in the code, so `"T"` also matches
/// `"OK_TQ"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonconformityMatcher {
    markers: Vec<String>,
}

impl NonconformityMatcher {
    pub fn new<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        NonconformityMatcher {
            markers: markers
                .into_iter()
                .map(|m| m.as_ref().to_lowercase())
                .filter(|m| !m.is_empty())
                .collect(),
        }
    }

    pub fn is_nonconforming(&self, result_code: &str) -> bool {
        let code = result_code.to_lowercase();
        self.markers.iter().any(|m| code.contains(m.as_str()))
    }
}

impl Default for NonconformityMatcher {
    fn default() -> Self {
        Self::new(["ERR", "W", "L", "T"])
    }
}

/// Mean of one numeric column, at full precision. `NaN` when the view held
/// no value for the column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMean {
    pub column: String,
    pub value: f64,
}

impl ColumnMean {
    pub fn has_data(&self) -> bool {
        !self.value.is_nan()
    }

    /// Two-decimal value as displayed, `None` when there is no data.
    pub fn rounded(&self) -> Option<f64> {
        self.has_data()
            .then(|| format!("{:.2}", self.value).parse().ok())
            .flatten()
    }

    /// Display text: the value formatted to two decimals, or [`NO_DATA`].
    pub fn display(&self) -> String {
        if self.has_data() {
            format!("{:.2}", self.value)
        } else {
            NO_DATA.to_string()
        }
    }
}

/// Summary statistics of a single view.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSnapshot {
    pub row_count: usize,
    pub nonconforming_count: usize,
    pub means: Vec<ColumnMean>,
}

impl MetricsSnapshot {
    /// Mean of `column`, if it was part of the snapshot.
    pub fn mean(&self, column: &str) -> Option<&ColumnMean> {
        self.means.iter().find(|m| m.column == column)
    }
}

/// Compute the snapshot of `view`. Columns the table does not carry as
/// numeric columns produce a `NaN` mean.
pub fn summarize(
    view: &FilteredView<'_>,
    matcher: &NonconformityMatcher,
    columns: &[String],
) -> MetricsSnapshot {
    let nonconforming_count = view
        .categories(Categorical::Result)
        .filter(|code| matcher.is_nonconforming(code))
        .count();

    let means = columns
        .iter()
        .map(|column| ColumnMean {
            column: column.clone(),
            value: mean(view.numbers(column).flatten()),
        })
        .collect();

    MetricsSnapshot {
        row_count: view.len(),
        nonconforming_count,
        means,
    }
}

/// Arithmetic mean; `NaN` for an empty input.
pub fn mean(values: impl IntoIterator<Item = f64>) -> f64 {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::{apply, FilterSelection};
    use crate::data::model::{CellValue, RawTable, Schema, Table};

    fn table() -> Table {
        let rows = [
            ("A", "OK", Some(1.0)),
            ("B", "ERR1", Some(2.0)),
            ("A", "OK", None),
            ("B", "w2", Some(4.0)),
        ]
        .iter()
        .map(|(p, r, m)| {
            vec![
                CellValue::Text(p.to_string()),
                CellValue::Text(r.to_string()),
                m.map(CellValue::Number).unwrap_or(CellValue::Empty),
            ]
        })
        .collect();
        let schema = Schema {
            result_column: "Result.".into(),
            program_column: "Prog.".into(),
            numeric_columns: vec!["M".into()],
        };
        let raw = RawTable {
            headers: vec!["Prog.".into(), "Result.".into(), "M".into()],
            rows,
        };
        Table::from_raw(raw, &schema).unwrap()
    }

    #[test]
    fn test_matcher_is_case_insensitive_substring() {
        let m = NonconformityMatcher::default();
        assert!(m.is_nonconforming("ERR1"));
        assert!(m.is_nonconforming("err"));
        assert!(m.is_nonconforming("w2"));
        assert!(m.is_nonconforming("Tq-low"));
        assert!(!m.is_nonconforming("OK"));
        assert!(!m.is_nonconforming(""));
    }

    #[test]
    fn test_summary_skips_missing_values() {
        let t = table();
        let view = apply(&t, &FilterSelection::all(&t));
        let snap = summarize(&view, &NonconformityMatcher::default(), &["M".to_string()]);
        assert_eq!(snap.row_count, 4);
        assert_eq!(snap.nonconforming_count, 2);
        let m = snap.mean("M").unwrap();
        assert!((m.value - 7.0 / 3.0).abs() < 1e-12);
        assert_eq!(m.rounded(), Some(2.33));
        assert_eq!(m.display(), "2.33");
    }

    #[test]
    fn test_display_formats_the_exact_binary_value() {
        // 12.125 and 0.125 are exact in binary; formatting rounds them half to even.
        for (value, shown) in [(12.125, "12.12"), (0.125, "0.12"), (2.675, "2.67"), (1.5, "1.50")] {
            let m = ColumnMean {
                column: "M".into(),
                value,
            };
            assert_eq!(m.display(), shown);
            assert_eq!(m.rounded(), Some(shown.parse::<f64>().unwrap()));
        }
    }

    #[test]
    fn test_empty_view_reports_no_data() {
        let t = table();
        let mut sel = FilterSelection::all(&t);
        sel.select_none(Categorical::Program);
        let view = apply(&t, &sel);
        let snap = summarize(&view, &NonconformityMatcher::default(), &["M".to_string()]);
        assert_eq!(snap.row_count, 0);
        assert_eq!(snap.nonconforming_count, 0);
        let m = snap.mean("M").unwrap();
        assert!(m.value.is_nan());
        assert_eq!(m.rounded(), None);
        assert_eq!(m.display(), NO_DATA);
    }

    #[test]
    fn test_mean_of_nothing_is_nan() {
        assert!(mean(Vec::<f64>::new()).is_nan());
        assert_eq!(mean([1.0, 2.0, 3.0]), 2.0);
    }
}

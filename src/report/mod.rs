//! Report assembly: a self-contained document made of the KPIs and a full
//! dump of the filtered rows.
//!
//! [`build`] is a pure function of its inputs; no clock or environment value
//! leaks into the document, so two builds from the same view serialize to the
//! same bytes. Writing the document to disk goes through [`export`].

pub mod export;
pub mod html;

use serde::Serialize;

use crate::data::filter::FilteredView;
use crate::metrics::MetricsSnapshot;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportDocument {
    pub title: String,
    pub metrics: Vec<ReportMetric>,
    pub table: ReportTable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportMetric {
    pub label: String,
    pub value: String,
}

/// Every column of the view, in file order, with one text row per record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Assemble the report for `view`.
pub fn build(view: &FilteredView<'_>, snapshot: &MetricsSnapshot, title: &str) -> ReportDocument {
    let mut metrics = vec![
        ReportMetric {
            label: "Filtered rows".to_string(),
            value: snapshot.row_count.to_string(),
        },
        ReportMetric {
            label: "Non-conforming".to_string(),
            value: snapshot.nonconforming_count.to_string(),
        },
    ];
    metrics.extend(snapshot.means.iter().map(|m| ReportMetric {
        label: format!("{} mean", m.column),
        value: m.display(),
    }));

    let rows = view
        .records()
        .map(|record| record.cells().iter().map(|c| c.to_string()).collect())
        .collect();

    ReportDocument {
        title: title.to_string(),
        metrics,
        table: ReportTable {
            columns: view.table().columns().to_vec(),
            rows,
        },
    }
}

impl ReportDocument {
    /// Canonical serialized form (pretty JSON).
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::{apply, FilterSelection};
    use crate::data::model::{Categorical, CellValue, RawTable, Schema, Table};
    use crate::metrics::{summarize, NonconformityMatcher};

    fn table() -> Table {
        let raw = RawTable {
            headers: vec!["Date".into(), "Prog.".into(), "Result.".into(), "M".into()],
            rows: vec![
                vec![
                    CellValue::Text("2024-01-02".into()),
                    CellValue::Number(1.0),
                    CellValue::Text("OK".into()),
                    CellValue::Number(4.126),
                ],
                vec![
                    CellValue::Text("2024-01-03".into()),
                    CellValue::Number(2.0),
                    CellValue::Text("ERR".into()),
                    CellValue::Empty,
                ],
            ],
        };
        let schema = Schema {
            result_column: "Result.".into(),
            program_column: "Prog.".into(),
            numeric_columns: vec!["M".into()],
        };
        Table::from_raw(raw, &schema).unwrap()
    }

    #[test]
    fn test_report_contains_metrics_and_every_cell() {
        let t = table();
        let view = FilteredView::unfiltered(&t);
        let snap = summarize(&view, &NonconformityMatcher::default(), &["M".to_string()]);
        let doc = build(&view, &snap, "Line 4");

        assert_eq!(doc.title, "Line 4");
        let metrics: Vec<_> = doc
            .metrics
            .iter()
            .map(|m| (m.label.as_str(), m.value.as_str()))
            .collect();
        assert_eq!(
            metrics,
            [("Filtered rows", "2"), ("Non-conforming", "1"), ("M mean", "4.13")]
        );
        assert_eq!(doc.table.columns, ["Date", "Prog.", "Result.", "M"]);
        assert_eq!(doc.table.rows[0], ["2024-01-02", "1", "OK", "4.126"]);
        assert_eq!(doc.table.rows[1], ["2024-01-03", "2", "ERR", ""]);
    }

    #[test]
    fn test_report_is_deterministic() {
        let t = table();
        let view = FilteredView::unfiltered(&t);
        let snap = summarize(&view, &NonconformityMatcher::default(), &["M".to_string()]);
        let a = build(&view, &snap, "Line 4").to_json_bytes().unwrap();
        let b = build(&view, &snap, "Line 4").to_json_bytes().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_view_report() {
        let t = table();
        let mut sel = FilterSelection::all(&t);
        sel.select_none(Categorical::Program);
        let view = apply(&t, &sel);
        let snap = summarize(&view, &NonconformityMatcher::default(), &["M".to_string()]);
        let doc = build(&view, &snap, "Empty");
        assert!(doc.table.rows.is_empty());
        assert_eq!(doc.table.columns.len(), 4);
        assert_eq!(doc.metrics[2].value, "no data");
    }
}

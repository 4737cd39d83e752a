use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use crate::error::LoadError;

// ---------------------------------------------------------------------------
// CellValue – a single cell of the result table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell as read from the input file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Bool(bool),
    Empty,
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Number(v) => write!(f, "{}", format_number(*v)),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Empty => Ok(()),
        }
    }
}

impl CellValue {
    /// Interpret the value as an `f64` if it is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(v) if !v.is_nan() => Some(*v),
            _ => None,
        }
    }

    /// Interpret the value as text, if it is text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }
}

/// Integral values print without a fractional part (`7.0` → `7`), anything
/// else in its shortest round-trip form.
pub fn format_number(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

// ---------------------------------------------------------------------------
// Schema – the typed column contract
// ---------------------------------------------------------------------------

/// Columns a table must provide, checked once at load time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub result_column: String,
    pub program_column: String,
    pub numeric_columns: Vec<String>,
}

/// The two columns filtered by discrete membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Categorical {
    Result,
    Program,
}

impl Categorical {
    pub const ALL: [Categorical; 2] = [Categorical::Result, Categorical::Program];

    /// Human label for filter widgets.
    pub fn label(self) -> &'static str {
        match self {
            Categorical::Result => "Result",
            Categorical::Program => "Program",
        }
    }
}

// ---------------------------------------------------------------------------
// RawTable – what a loader produces before normalization
// ---------------------------------------------------------------------------

/// Header plus untyped rows, exactly as decoded from the input file.
/// Rows may be shorter or longer than the header.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

// ---------------------------------------------------------------------------
// Record / Table – the canonical in-memory dataset
// ---------------------------------------------------------------------------

/// One row of the result table; cells are aligned with [`Table::columns`].
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    cells: Vec<CellValue>,
}

impl Record {
    pub fn cells(&self) -> &[CellValue] {
        &self.cells
    }
}

/// The normalized, schema-checked result table.
///
/// Categorical cells are always [`CellValue::Text`] (trimmed); numeric-column
/// cells are always [`CellValue::Number`] or [`CellValue::Empty`].
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    records: Vec<Record>,
    result_idx: usize,
    program_idx: usize,
    /// Numeric column name → position, in schema order.
    numeric_idx: Vec<(String, usize)>,
    /// For each categorical column the sorted set of observed values.
    unique_values: BTreeMap<Categorical, BTreeSet<String>>,
}

impl Table {
    /// Normalize a raw table and check it against `schema`.
    ///
    /// Column names are trimmed, categorical values are coerced to trimmed
    /// strings and numeric columns must hold numbers or blanks.
    pub fn from_raw(raw: RawTable, schema: &Schema) -> Result<Self, LoadError> {
        let columns: Vec<String> = raw
            .headers
            .iter()
            .enumerate()
            .map(|(i, h)| match h.trim() {
                "" => format!("Unnamed: {i}"),
                trimmed => trimmed.to_string(),
            })
            .collect();

        let mut seen = BTreeSet::new();
        for col in &columns {
            if !seen.insert(col.as_str()) {
                return Err(LoadError::DuplicateColumn(col.clone()));
            }
        }

        let position = |name: &str| {
            columns
                .iter()
                .position(|c| c == name)
                .ok_or_else(|| LoadError::MissingColumn(name.to_string()))
        };
        let result_idx = position(&schema.result_column)?;
        let program_idx = position(&schema.program_column)?;
        let numeric_idx = schema
            .numeric_columns
            .iter()
            .map(|name| position(name).map(|idx| (name.clone(), idx)))
            .collect::<Result<Vec<_>, _>>()?;

        let width = columns.len();
        let mut records = Vec::with_capacity(raw.rows.len());
        for (row_no, mut cells) in raw.rows.into_iter().enumerate() {
            cells.resize(width, CellValue::Empty);

            for idx in [result_idx, program_idx] {
                let text = category_text(&cells[idx]);
                cells[idx] = CellValue::Text(text);
            }
            for (name, idx) in &numeric_idx {
                let value = numeric_cell(&cells[*idx]).ok_or_else(|| LoadError::NotNumeric {
                    column: name.clone(),
                    row: row_no + 1,
                    value: cells[*idx].to_string(),
                })?;
                cells[*idx] = value;
            }
            records.push(Record { cells });
        }

        let mut table = Table {
            columns,
            records,
            result_idx,
            program_idx,
            numeric_idx,
            unique_values: BTreeMap::new(),
        };
        for cat in Categorical::ALL {
            let values = (0..table.len())
                .map(|row| table.category(row, cat).to_string())
                .collect();
            table.unique_values.insert(cat, values);
        }
        Ok(table)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Column names in file order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn record(&self, row: usize) -> &Record {
        &self.records[row]
    }

    /// Name of a categorical column.
    pub fn categorical_column(&self, cat: Categorical) -> &str {
        &self.columns[self.categorical_idx(cat)]
    }

    /// Value of a categorical column at `row`.
    pub fn category(&self, row: usize, cat: Categorical) -> &str {
        self.records[row].cells[self.categorical_idx(cat)]
            .as_str()
            .unwrap_or("")
    }

    /// Sorted distinct values observed in a categorical column.
    pub fn unique_values(&self, cat: Categorical) -> &BTreeSet<String> {
        &self.unique_values[&cat]
    }

    /// Value of numeric `column` at `row`; `None` when missing or when the
    /// column is not part of the numeric schema.
    pub fn number(&self, row: usize, column: &str) -> Option<f64> {
        let idx = self.numeric_position(column)?;
        self.records[row].cells[idx].as_f64()
    }

    fn numeric_position(&self, column: &str) -> Option<usize> {
        self.numeric_idx
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, idx)| *idx)
    }

    fn categorical_idx(&self, cat: Categorical) -> usize {
        match cat {
            Categorical::Result => self.result_idx,
            Categorical::Program => self.program_idx,
        }
    }
}

fn category_text(value: &CellValue) -> String {
    match value {
        CellValue::Text(s) => s.trim().to_string(),
        other => other.to_string().trim().to_string(),
    }
}

/// Coerce a cell into the numeric domain; `None` means "not a number".
fn numeric_cell(value: &CellValue) -> Option<CellValue> {
    match value {
        CellValue::Number(v) if v.is_nan() => Some(CellValue::Empty),
        CellValue::Number(v) => Some(CellValue::Number(*v)),
        CellValue::Empty => Some(CellValue::Empty),
        CellValue::Text(s) => {
            let s = s.trim();
            if s.is_empty() || s.eq_ignore_ascii_case("nan") {
                return Some(CellValue::Empty);
            }
            s.parse::<f64>().ok().map(CellValue::Number)
        }
        CellValue::Bool(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        Schema {
            result_column: "Result.".into(),
            program_column: "Prog.".into(),
            numeric_columns: vec!["M[Nm]".into()],
        }
    }

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn test_headers_and_categorical_values_are_trimmed() {
        let raw = RawTable {
            headers: vec!["  Result. ".into(), "Prog.\t".into(), "M[Nm]".into()],
            rows: vec![
                vec![text(" OK "), CellValue::Number(7.0), CellValue::Number(1.5)],
                vec![text("ERR1"), text(" 3 "), text(" 2.5 ")],
            ],
        };
        let table = Table::from_raw(raw, &schema()).unwrap();
        assert_eq!(table.columns(), ["Result.", "Prog.", "M[Nm]"]);
        assert_eq!(table.category(0, Categorical::Result), "OK");
        assert_eq!(table.category(0, Categorical::Program), "7");
        assert_eq!(table.category(1, Categorical::Program), "3");
        assert_eq!(table.number(1, "M[Nm]"), Some(2.5));
        let programs: Vec<_> = table.unique_values(Categorical::Program).iter().collect();
        assert_eq!(programs, ["3", "7"]);
    }

    #[test]
    fn test_missing_column_is_named() {
        let raw = RawTable {
            headers: vec!["Result.".into(), "M[Nm]".into()],
            rows: vec![],
        };
        match Table::from_raw(raw, &schema()) {
            Err(LoadError::MissingColumn(col)) => assert_eq!(col, "Prog."),
            other => panic!("expected MissingColumn, got {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_column_after_trim_is_rejected() {
        let raw = RawTable {
            headers: vec!["Result.".into(), "Prog.".into(), "M[Nm]".into(), " M[Nm]".into()],
            rows: vec![],
        };
        assert!(matches!(
            Table::from_raw(raw, &schema()),
            Err(LoadError::DuplicateColumn(c)) if c == "M[Nm]"
        ));
    }

    #[test]
    fn test_non_numeric_text_in_numeric_column_is_rejected() {
        let raw = RawTable {
            headers: vec!["Result.".into(), "Prog.".into(), "M[Nm]".into()],
            rows: vec![
                vec![text("OK"), text("A"), CellValue::Number(1.0)],
                vec![text("OK"), text("A"), text("high")],
            ],
        };
        match Table::from_raw(raw, &schema()) {
            Err(LoadError::NotNumeric { column, row, value }) => {
                assert_eq!(column, "M[Nm]");
                assert_eq!(row, 2);
                assert_eq!(value, "high");
            }
            other => panic!("expected NotNumeric, got {other:?}"),
        }
    }

    #[test]
    fn test_short_rows_are_padded_and_blanks_are_missing() {
        let raw = RawTable {
            headers: vec!["Result.".into(), "Prog.".into(), "M[Nm]".into()],
            rows: vec![vec![text("OK")], vec![text("OK"), text("B"), text("NaN")]],
        };
        let table = Table::from_raw(raw, &schema()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.category(0, Categorical::Program), "");
        assert_eq!(table.number(0, "M[Nm]"), None);
        assert_eq!(table.number(1, "M[Nm]"), None);
        assert_eq!(table.number(1, "Prog."), None);
    }

    #[test]
    fn test_cell_display() {
        assert_eq!(CellValue::Number(3.0).to_string(), "3");
        assert_eq!(CellValue::Number(3.25).to_string(), "3.25");
        assert_eq!(CellValue::Bool(true).to_string(), "true");
        assert_eq!(CellValue::Empty.to_string(), "");
    }
}

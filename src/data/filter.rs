use std::collections::{BTreeMap, BTreeSet};

use super::model::{Categorical, Record, Table};

// ---------------------------------------------------------------------------
// Filter predicate: which values are allowed per categorical column
// ---------------------------------------------------------------------------

/// Per-column selection state: maps a categorical column → allowed values.
///
/// A column absent from the map does not constrain. A column mapped to an
/// empty set rejects every row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSelection {
    allowed: BTreeMap<Categorical, BTreeSet<String>>,
}

impl FilterSelection {
    /// Selection with every observed value allowed (i.e., show everything).
    pub fn all(table: &Table) -> Self {
        let allowed = Categorical::ALL
            .iter()
            .map(|&cat| (cat, table.unique_values(cat).clone()))
            .collect();
        FilterSelection { allowed }
    }

    /// Replace the allowed set of one column.
    pub fn set<I, S>(&mut self, cat: Categorical, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed
            .insert(cat, values.into_iter().map(Into::into).collect());
    }

    /// Builder form of [`FilterSelection::set`].
    pub fn with<I, S>(mut self, cat: Categorical, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set(cat, values);
        self
    }

    /// Whether `value` passes the predicate of `cat`.
    pub fn is_allowed(&self, cat: Categorical, value: &str) -> bool {
        self.allowed
            .get(&cat)
            .map_or(true, |selected| selected.contains(value))
    }

    /// Toggle a single value in a column's selection.
    pub fn toggle(&mut self, cat: Categorical, value: &str) {
        let selected = self.allowed.entry(cat).or_default();
        if !selected.remove(value) {
            selected.insert(value.to_string());
        }
    }

    /// Select all observed values of a column.
    pub fn select_all(&mut self, table: &Table, cat: Categorical) {
        self.allowed.insert(cat, table.unique_values(cat).clone());
    }

    /// Deselect all values of a column.
    pub fn select_none(&mut self, cat: Categorical) {
        self.allowed.insert(cat, BTreeSet::new());
    }

    /// Whether a row of `table` satisfies every predicate.
    pub fn matches(&self, table: &Table, row: usize) -> bool {
        self.allowed
            .iter()
            .all(|(&cat, selected)| selected.contains(table.category(row, cat)))
    }
}

// ---------------------------------------------------------------------------
// FilteredView – read-only projection of the table
// ---------------------------------------------------------------------------

/// The rows of a [`Table`] that pass a selection, in original order.
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredView<'a> {
    table: &'a Table,
    rows: Vec<usize>,
}

/// Apply `selection` to the whole table.
pub fn apply<'a>(table: &'a Table, selection: &FilterSelection) -> FilteredView<'a> {
    FilteredView {
        table,
        rows: filtered_indices(table, selection),
    }
}

/// Return indices of rows that pass all active filters.
///
/// A row passes a column filter when:
/// * The column is not present in `selection` → passes (no constraint)
/// * The allowed set for that column is empty → nothing selected → fails
/// * The row's value for that column is in the allowed set → passes
pub fn filtered_indices(table: &Table, selection: &FilterSelection) -> Vec<usize> {
    (0..table.len())
        .filter(|&row| selection.matches(table, row))
        .collect()
}

impl<'a> FilteredView<'a> {
    /// The whole table, unfiltered.
    pub fn unfiltered(table: &'a Table) -> Self {
        FilteredView {
            table,
            rows: (0..table.len()).collect(),
        }
    }

    /// Rebuild a view from previously computed row indices.
    ///
    /// Indices past the end of the table are dropped.
    pub fn from_indices(table: &'a Table, mut rows: Vec<usize>) -> Self {
        rows.retain(|&row| row < table.len());
        FilteredView { table, rows }
    }

    /// Filter this view further; the table is never touched.
    pub fn refine(&self, selection: &FilterSelection) -> FilteredView<'a> {
        FilteredView {
            table: self.table,
            rows: self
                .rows
                .iter()
                .copied()
                .filter(|&row| selection.matches(self.table, row))
                .collect(),
        }
    }

    pub fn table(&self) -> &'a Table {
        self.table
    }

    /// Indices of retained rows in the source table.
    pub fn row_indices(&self) -> &[usize] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Retained records, in order.
    pub fn records(&self) -> impl Iterator<Item = &'a Record> + '_ {
        let table = self.table;
        self.rows.iter().map(move |&row| table.record(row))
    }

    /// Values of a categorical column, one per retained row.
    pub fn categories(&self, cat: Categorical) -> impl Iterator<Item = &'a str> + '_ {
        let table = self.table;
        self.rows.iter().map(move |&row| table.category(row, cat))
    }

    /// Values of a numeric column, one per retained row (`None` = missing).
    pub fn numbers<'s>(&'s self, column: &'s str) -> impl Iterator<Item = Option<f64>> + 's {
        let table = self.table;
        self.rows.iter().map(move |&row| table.number(row, column))
    }

    /// Distinct values of a categorical column present in this view.
    pub fn distinct(&self, cat: Categorical) -> BTreeSet<&'a str> {
        self.categories(cat).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{CellValue, RawTable, Schema};

    fn table() -> Table {
        let rows = [("A", "OK"), ("B", "ERR1"), ("A", "OK"), ("B", "W2"), ("C", "OK")]
            .iter()
            .enumerate()
            .map(|(i, (prog, res))| {
                vec![
                    CellValue::Text(prog.to_string()),
                    CellValue::Text(res.to_string()),
                    CellValue::Number(i as f64 + 1.0),
                ]
            })
            .collect();
        let raw = RawTable {
            headers: vec!["Prog.".into(), "Result.".into(), "M".into()],
            rows,
        };
        let schema = Schema {
            result_column: "Result.".into(),
            program_column: "Prog.".into(),
            numeric_columns: vec!["M".into()],
        };
        Table::from_raw(raw, &schema).unwrap()
    }

    #[test]
    fn test_default_selection_keeps_everything_in_order() {
        let t = table();
        let view = apply(&t, &FilterSelection::all(&t));
        assert_eq!(view.row_indices(), [0, 1, 2, 3, 4]);
        assert_eq!(view, FilteredView::unfiltered(&t));
    }

    #[test]
    fn test_membership_filter_is_stable() {
        let t = table();
        let sel = FilterSelection::default().with(Categorical::Program, ["B", "C"]);
        let view = apply(&t, &sel);
        assert_eq!(view.row_indices(), [1, 3, 4]);
        assert!(view
            .categories(Categorical::Program)
            .all(|p| p == "B" || p == "C"));
    }

    #[test]
    fn test_predicates_combine() {
        let t = table();
        let sel = FilterSelection::all(&t)
            .with(Categorical::Program, ["A", "B"])
            .with(Categorical::Result, ["OK"]);
        assert_eq!(apply(&t, &sel).row_indices(), [0, 2]);
    }

    #[test]
    fn test_empty_allowed_set_yields_empty_view() {
        let t = table();
        let mut sel = FilterSelection::all(&t);
        sel.select_none(Categorical::Result);
        let view = apply(&t, &sel);
        assert!(view.is_empty());
        assert_eq!(view.numbers("M").count(), 0);
    }

    #[test]
    fn test_refine_is_idempotent() {
        let t = table();
        let sel = FilterSelection::default().with(Categorical::Result, ["OK", "W2"]);
        let once = apply(&t, &sel);
        let twice = once.refine(&sel);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_toggle_and_select_all() {
        let t = table();
        let mut sel = FilterSelection::all(&t);
        sel.toggle(Categorical::Program, "A");
        assert!(!sel.is_allowed(Categorical::Program, "A"));
        assert_eq!(apply(&t, &sel).len(), 3);
        sel.toggle(Categorical::Program, "A");
        assert!(sel.is_allowed(Categorical::Program, "A"));
        sel.select_none(Categorical::Program);
        sel.select_all(&t, Categorical::Program);
        assert_eq!(apply(&t, &sel).len(), t.len());
    }

    #[test]
    fn test_from_indices_drops_out_of_range_rows() {
        let t = table();
        let view = FilteredView::from_indices(&t, vec![0, 4, 9]);
        assert_eq!(view.row_indices(), [0, 4]);
        assert_eq!(view.distinct(Categorical::Program).len(), 2);
    }
}

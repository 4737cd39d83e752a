use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, AsArray};
use arrow::datatypes::{DataType, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type, UInt32Type};
use arrow::util::display::array_value_to_string;
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{CellValue, RawTable, Schema, Table};
use crate::error::LoadError;

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Input encodings understood by the loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// `.xlsx`, `.xlsm`, `.xlsb`, `.xls`, `.ods` – first worksheet, first row = header.
    Spreadsheet,
    Csv,
    /// Records-oriented JSON (`df.to_json(orient='records')`).
    Json,
    Parquet,
}

impl InputFormat {
    /// Guess the format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Some(InputFormat::Spreadsheet),
            "csv" => Some(InputFormat::Csv),
            "json" => Some(InputFormat::Json),
            "parquet" | "pq" => Some(InputFormat::Parquet),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            InputFormat::Spreadsheet => "spreadsheet",
            InputFormat::Csv => "CSV",
            InputFormat::Json => "JSON",
            InputFormat::Parquet => "Parquet",
        }
    }
}

/// Extensions offered by file dialogs.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "xlsx", "xlsm", "xlsb", "xls", "ods", "csv", "json", "parquet", "pq",
];

/// Load a result table from a file. Dispatch by extension.
pub fn load_file(path: &Path, schema: &Schema) -> Result<Table, LoadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_string();
    let format =
        InputFormat::from_extension(&ext).ok_or_else(|| LoadError::UnsupportedFormat(ext))?;
    let bytes = std::fs::read(path)?;
    let table = load_bytes(&bytes, format, schema)?;
    log::info!(
        "Loaded {} rows from {} with columns {:?}",
        table.len(),
        path.display(),
        table.columns()
    );
    Ok(table)
}

/// Decode `bytes` as `format`, normalize, and check against `schema`.
pub fn load_bytes(bytes: &[u8], format: InputFormat, schema: &Schema) -> Result<Table, LoadError> {
    let raw = match format {
        InputFormat::Spreadsheet => read_spreadsheet(bytes)?,
        InputFormat::Csv => read_csv(bytes)?,
        InputFormat::Json => read_json(bytes)?,
        InputFormat::Parquet => read_parquet(bytes)?,
    };
    log::debug!(
        "Decoded {} input: {} columns, {} rows",
        format.name(),
        raw.headers.len(),
        raw.rows.len()
    );
    Table::from_raw(raw, schema)
}

// ---------------------------------------------------------------------------
// Spreadsheet loader
// ---------------------------------------------------------------------------

fn read_spreadsheet(bytes: &[u8]) -> Result<RawTable, LoadError> {
    let unreadable = |e: calamine::Error| LoadError::unreadable("spreadsheet", e);

    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec())).map_err(unreadable)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(LoadError::NoWorksheet)?
        .map_err(unreadable)?;

    let mut rows = range.rows();
    let headers = rows
        .next()
        .ok_or(LoadError::MissingHeader)?
        .iter()
        .map(|cell| cell.to_string())
        .collect();

    let rows = rows
        .map(|row| row.iter().map(spreadsheet_cell).collect::<Vec<_>>())
        .filter(|cells| !cells.iter().all(CellValue::is_empty))
        .collect();

    Ok(RawTable { headers, rows })
}

fn spreadsheet_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::Empty | Data::Error(_) => CellValue::Empty,
        other => CellValue::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, one record per line.
fn read_csv(bytes: &[u8]) -> Result<RawTable, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(bytes);
    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| LoadError::unreadable("CSV", e))?
        .iter()
        .map(|h| h.to_string())
        .collect();
    if headers.is_empty() {
        return Err(LoadError::MissingHeader);
    }

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record =
            result.map_err(|e| LoadError::unreadable("CSV", format!("row {}: {e}", row_no + 1)))?;
        rows.push(record.iter().map(guess_cell_type).collect());
    }

    Ok(RawTable { headers, rows })
}

fn guess_cell_type(s: &str) -> CellValue {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return CellValue::Empty;
    }
    if let Ok(f) = trimmed.parse::<f64>() {
        return CellValue::Number(f);
    }
    if trimmed == "true" || trimmed == "false" {
        return CellValue::Bool(trimmed == "true");
    }
    CellValue::Text(s.to_string())
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented):
///
/// ```json
/// [
///   { "Prog.": 1, "Result.": "OK", "M[Nm]": 4.52, "T[s]": 1.2 },
///   ...
/// ]
/// ```
///
/// Columns appear in order of first occurrence.
fn read_json(bytes: &[u8]) -> Result<RawTable, LoadError> {
    let root: JsonValue =
        serde_json::from_slice(bytes).map_err(|e| LoadError::unreadable("JSON", e))?;
    let records = root
        .as_array()
        .ok_or_else(|| LoadError::unreadable("JSON", "expected a top-level array"))?;

    let mut headers: Vec<String> = Vec::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .ok_or_else(|| LoadError::unreadable("JSON", format!("row {i} is not an object")))?;
        for key in obj.keys() {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
    }

    let rows = records
        .iter()
        .filter_map(JsonValue::as_object)
        .map(|obj| {
            headers
                .iter()
                .map(|h| obj.get(h).map(json_to_cell).unwrap_or(CellValue::Empty))
                .collect()
        })
        .collect();

    Ok(RawTable { headers, rows })
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) => CellValue::Text(s.clone()),
        JsonValue::Number(n) => n
            .as_f64()
            .map(CellValue::Number)
            .unwrap_or_else(|| CellValue::Text(n.to_string())),
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Null => CellValue::Empty,
        other => CellValue::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a flat Parquet table (scalar columns only), as written by
/// `df.to_parquet()` in Pandas or `df.write_parquet()` in Polars.
fn read_parquet(bytes: &[u8]) -> Result<RawTable, LoadError> {
    let unreadable = |e: parquet::errors::ParquetError| LoadError::unreadable("Parquet", e);

    let data = bytes::Bytes::copy_from_slice(bytes);
    let builder = ParquetRecordBatchReaderBuilder::try_new(data).map_err(unreadable)?;
    let headers: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().map_err(unreadable)?;

    let mut rows = Vec::new();
    for batch_result in reader {
        let batch = batch_result.map_err(|e| LoadError::unreadable("Parquet", e))?;
        for row in 0..batch.num_rows() {
            let cells = batch
                .columns()
                .iter()
                .map(|col| extract_cell(col, row))
                .collect();
            rows.push(cells);
        }
    }

    Ok(RawTable { headers, rows })
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_cell(col: &Arc<dyn Array>, row: usize) -> CellValue {
    if col.is_null(row) {
        return CellValue::Empty;
    }
    match col.data_type() {
        DataType::Utf8 => CellValue::Text(col.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => CellValue::Text(col.as_string::<i64>().value(row).to_string()),
        DataType::Int16 => CellValue::Number(col.as_primitive::<Int16Type>().value(row) as f64),
        DataType::Int32 => CellValue::Number(col.as_primitive::<Int32Type>().value(row) as f64),
        DataType::UInt32 => CellValue::Number(col.as_primitive::<UInt32Type>().value(row) as f64),
        DataType::Int64 => CellValue::Number(col.as_primitive::<Int64Type>().value(row) as f64),
        DataType::Float32 => {
            CellValue::Number(col.as_primitive::<Float32Type>().value(row) as f64)
        }
        DataType::Float64 => CellValue::Number(col.as_primitive::<Float64Type>().value(row)),
        DataType::Boolean => CellValue::Bool(col.as_boolean().value(row)),
        _ => match array_value_to_string(col, row) {
            Ok(text) => CellValue::Text(text),
            Err(_) => CellValue::Text(format!("{:?}", col.data_type())),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Categorical;

    fn schema() -> Schema {
        Schema {
            result_column: "Result.".into(),
            program_column: "Prog.".into(),
            numeric_columns: vec!["M[Nm]".into(), "T[s]".into()],
        }
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(InputFormat::from_extension("XLSX"), Some(InputFormat::Spreadsheet));
        assert_eq!(InputFormat::from_extension("csv"), Some(InputFormat::Csv));
        assert_eq!(InputFormat::from_extension("pq"), Some(InputFormat::Parquet));
        assert_eq!(InputFormat::from_extension("txt"), None);
        for ext in SUPPORTED_EXTENSIONS {
            assert!(InputFormat::from_extension(ext).is_some(), "{ext}");
        }
        for ext in ["xlsx", "xlsm", "xlsb", "xls", "ods"] {
            assert!(SUPPORTED_EXTENSIONS.contains(&ext), "{ext}");
        }
    }

    #[test]
    fn test_csv_with_padded_headers() {
        let csv = " Prog. ,Result. , M[Nm],T[s]\n1, OK ,4.5,1.2\n2,ERR3,,1.4\n";
        let table = load_bytes(csv.as_bytes(), InputFormat::Csv, &schema()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.columns(), ["Prog.", "Result.", "M[Nm]", "T[s]"]);
        assert_eq!(table.category(0, Categorical::Result), "OK");
        assert_eq!(table.category(1, Categorical::Program), "2");
        assert_eq!(table.number(0, "M[Nm]"), Some(4.5));
        assert_eq!(table.number(1, "M[Nm]"), None);
    }

    #[test]
    fn test_csv_missing_column() {
        let csv = "Prog.,Result.,M[Nm]\n1,OK,4.5\n";
        let err = load_bytes(csv.as_bytes(), InputFormat::Csv, &schema()).unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn(ref c) if c == "T[s]"));
        assert!(err.to_string().contains("T[s]"));
    }

    #[test]
    fn test_json_records_keep_first_seen_column_order() {
        let json = r#"[
            {"Result.": "OK", "Prog.": "A", "M[Nm]": 1.0, "T[s]": 2},
            {"Result.": "W2", "Prog.": "B", "M[Nm]": null, "T[s]": 3, "Operator": "x"}
        ]"#;
        let table = load_bytes(json.as_bytes(), InputFormat::Json, &schema()).unwrap();
        assert_eq!(table.columns(), ["Result.", "Prog.", "M[Nm]", "T[s]", "Operator"]);
        assert_eq!(table.number(1, "M[Nm]"), None);
        assert_eq!(table.number(1, "T[s]"), Some(3.0));
        assert!(table.record(0).cells()[4].is_empty());
    }

    #[test]
    fn test_json_must_be_an_array() {
        let err = load_bytes(br#"{"a": 1}"#, InputFormat::Json, &schema()).unwrap_err();
        assert!(matches!(err, LoadError::Unreadable { format: "JSON", .. }));
    }

    #[test]
    fn test_xlsx_round_trip_through_workbook_writer() {
        use rust_xlsxwriter::Workbook;

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (col, name) in [" Prog. ", "Result. ", "M[Nm]", "T[s]"].into_iter().enumerate() {
            sheet.write_string(0, col as u16, name).unwrap();
        }
        sheet.write_number(1, 0, 7.0).unwrap();
        sheet.write_string(1, 1, " OK ").unwrap();
        sheet.write_number(1, 2, 4.5).unwrap();
        sheet.write_number(1, 3, 1.2).unwrap();
        // Row 2 has no torque; row 3 is left blank.
        sheet.write_number(2, 0, 8.0).unwrap();
        sheet.write_string(2, 1, "ERR1").unwrap();
        sheet.write_number(2, 3, 1.4).unwrap();
        sheet.write_string(4, 0, "A12").unwrap();
        sheet.write_string(4, 1, "W2").unwrap();
        sheet.write_string(4, 2, "3.25").unwrap();
        sheet.write_number(4, 3, 0.9).unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let table = load_bytes(&bytes, InputFormat::Spreadsheet, &schema()).unwrap();
        assert_eq!(table.columns(), ["Prog.", "Result.", "M[Nm]", "T[s]"]);
        assert_eq!(table.len(), 3);
        assert_eq!(table.category(0, Categorical::Program), "7");
        assert_eq!(table.category(0, Categorical::Result), "OK");
        assert_eq!(table.number(0, "M[Nm]"), Some(4.5));
        assert_eq!(table.number(1, "M[Nm]"), None);
        assert_eq!(table.number(1, "T[s]"), Some(1.4));
        assert_eq!(table.category(2, Categorical::Program), "A12");
        assert_eq!(table.number(2, "M[Nm]"), Some(3.25));
    }

    #[test]
    fn test_garbage_spreadsheet_is_unreadable() {
        let err = load_bytes(b"definitely not a zip", InputFormat::Spreadsheet, &schema())
            .unwrap_err();
        assert!(matches!(err, LoadError::Unreadable { .. }));
    }

    #[test]
    fn test_load_file_rejects_unknown_extension() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("results.txt");
        std::fs::write(&path, "Prog.,Result.\n").unwrap();
        assert!(matches!(
            load_file(&path, &schema()),
            Err(LoadError::UnsupportedFormat(ext)) if ext == "txt"
        ));
    }

    #[test]
    fn test_parquet_round_trip_through_arrow_writer() {
        use arrow::array::{Float64Array, Int64Array, StringArray};
        use arrow::datatypes::{Field, Schema as ArrowSchema};
        use arrow::record_batch::RecordBatch;
        use parquet::arrow::ArrowWriter;

        let arrow_schema = Arc::new(ArrowSchema::new(vec![
            Field::new("Prog.", DataType::Int64, false),
            Field::new("Result.", DataType::Utf8, false),
            Field::new("M[Nm]", DataType::Float64, true),
            Field::new("T[s]", DataType::Float64, true),
        ]));
        let batch = RecordBatch::try_new(
            arrow_schema.clone(),
            vec![
                Arc::new(Int64Array::from(vec![1, 2])),
                Arc::new(StringArray::from(vec!["OK", " ERR1 "])),
                Arc::new(Float64Array::from(vec![Some(4.0), None])),
                Arc::new(Float64Array::from(vec![1.0, 2.0])),
            ],
        )
        .unwrap();
        let mut buf = Vec::new();
        let mut writer = ArrowWriter::try_new(&mut buf, arrow_schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let table = load_bytes(&buf, InputFormat::Parquet, &schema()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.category(0, Categorical::Program), "1");
        assert_eq!(table.category(1, Categorical::Result), "ERR1");
        assert_eq!(table.number(1, "M[Nm]"), None);
        assert_eq!(table.number(1, "T[s]"), Some(2.0));
    }
}

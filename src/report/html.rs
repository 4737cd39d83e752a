use std::io::Write;

use super::export::DocumentExporter;
use super::ReportDocument;
use crate::error::ExportError;

const STYLE: &str = r#"body { font-family: Arial, sans-serif; margin: 20px; color: #333; }
h1 { color: #0b5394; }
table { width: 100%; border-collapse: collapse; margin-top: 20px; font-size: 12px; }
th, td { border: 1px solid #ccc; padding: 6px; text-align: left; }
th { background-color: #f2f2f2; }"#;

/// Renders a report as a single self-contained HTML page, ready for printing
/// or conversion to PDF by an external tool.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlExporter;

impl DocumentExporter for HtmlExporter {
    fn extension(&self) -> &'static str {
        "html"
    }

    fn render(&self, doc: &ReportDocument, out: &mut dyn Write) -> Result<(), ExportError> {
        writeln!(out, "<!DOCTYPE html>")?;
        writeln!(out, "<html>")?;
        writeln!(out, "<head>")?;
        writeln!(out, "<meta charset=\"utf-8\">")?;
        writeln!(out, "<title>{}</title>", escape(&doc.title))?;
        writeln!(out, "<style>\n{STYLE}\n</style>")?;
        writeln!(out, "</head>")?;
        writeln!(out, "<body>")?;
        writeln!(out, "<h1>{}</h1>", escape(&doc.title))?;

        writeln!(out, "<h2>Summary</h2>")?;
        writeln!(out, "<ul>")?;
        for metric in &doc.metrics {
            writeln!(
                out,
                "<li>{} : {}</li>",
                escape(&metric.label),
                escape(&metric.value)
            )?;
        }
        writeln!(out, "</ul>")?;

        writeln!(out, "<h2>Filtered data</h2>")?;
        writeln!(out, "<table>")?;
        write!(out, "<thead><tr>")?;
        for col in &doc.table.columns {
            write!(out, "<th>{}</th>", escape(col))?;
        }
        writeln!(out, "</tr></thead>")?;
        writeln!(out, "<tbody>")?;
        for row in &doc.table.rows {
            write!(out, "<tr>")?;
            for cell in row {
                write!(out, "<td>{}</td>", escape(cell))?;
            }
            writeln!(out, "</tr>")?;
        }
        writeln!(out, "</tbody>")?;
        writeln!(out, "</table>")?;
        writeln!(out, "</body>")?;
        writeln!(out, "</html>")?;
        Ok(())
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

//! Writing a report to disk.
//!
//! Rendering runs on a worker thread and must finish within a deadline. The
//! bytes land in a temporary file next to the destination, which is renamed
//! into place only once it is complete; on any failure the temporary file is
//! removed and the destination is left untouched.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::html::HtmlExporter;
use super::ReportDocument;
use crate::error::ExportError;

/// Serializes a [`ReportDocument`] into a distributable format.
pub trait DocumentExporter: Send + Sync {
    /// File extension of the produced artifact, without the dot.
    fn extension(&self) -> &'static str;

    fn render(&self, doc: &ReportDocument, out: &mut dyn Write) -> Result<(), ExportError>;
}

/// Writes the document as pretty-printed JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonExporter;

impl DocumentExporter for JsonExporter {
    fn extension(&self) -> &'static str {
        "json"
    }

    fn render(&self, doc: &ReportDocument, out: &mut dyn Write) -> Result<(), ExportError> {
        let bytes = doc
            .to_json_bytes()
            .map_err(|e| ExportError::Render(e.to_string()))?;
        out.write_all(&bytes)?;
        Ok(())
    }
}

/// Pick an exporter from the destination's extension; HTML unless `.json`.
pub fn exporter_for_path(path: &Path) -> Arc<dyn DocumentExporter> {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => Arc::new(JsonExporter),
        _ => Arc::new(HtmlExporter),
    }
}

/// Default artifact name, e.g. `rapport.html`.
pub fn default_file_name(stem: &str, exporter: &dyn DocumentExporter) -> String {
    format!("{stem}.{}", exporter.extension())
}

/// Render `document` with `exporter` and write it atomically to
/// `destination`, giving up after `timeout`.
///
/// A timeout abandons the render worker rather than cancelling it: the thread
/// runs to completion in the background, its output is dropped and nothing is
/// written.
pub fn export_report(
    document: ReportDocument,
    exporter: Arc<dyn DocumentExporter>,
    destination: &Path,
    timeout: Duration,
) -> Result<PathBuf, ExportError> {
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("report-export".to_string())
        .spawn(move || {
            let mut buf = Vec::new();
            let result = exporter.render(&document, &mut buf).map(|()| buf);
            // The receiver is gone once the deadline has passed.
            let _ = tx.send(result);
        })?;

    let bytes = match rx.recv_timeout(timeout) {
        Ok(result) => result?,
        Err(RecvTimeoutError::Timeout) => {
            log::warn!("Report export timed out after {timeout:?}");
            return Err(ExportError::Timeout(timeout));
        }
        Err(RecvTimeoutError::Disconnected) => return Err(ExportError::WorkerLost),
    };

    let dir = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::Builder::new()
        .prefix(".report-")
        .suffix(".part")
        .tempfile_in(dir)?;
    tmp.write_all(&bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(destination).map_err(|e| ExportError::Io(e.error))?;

    log::info!(
        "Report written to {} ({} bytes)",
        destination.display(),
        bytes.len()
    );
    Ok(destination.to_path_buf())
}

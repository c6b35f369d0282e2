pub mod converter;
pub mod diagnostics;
pub mod error;
pub mod gpx_types;
pub mod options;
pub mod parser;

use std::fmt::Display;
use std::io::Write;
use std::path::Path;

use chrono::TimeZone;
use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::converter::{CsvEmitter, RowFormatter};
use crate::diagnostics::{Diagnostic, RecordingReporter, Reporter};
use crate::error::ConvertError;
use crate::options::ConvertOptions;

/// Outcome of a multi-file run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConversionSummary {
    pub files_converted: usize,
    pub files_skipped: usize,
    pub rows_written: usize,
}

/// Convert GPX files in the given order, appending their rows to `emitter`.
///
/// Unreadable or undecodable files are reported and skipped without
/// contributing any rows. Only a sink failure aborts the run.
pub fn convert_files<P, W, Tz, R>(
    paths: &[P],
    emitter: &mut CsvEmitter<W, Tz, R>,
) -> Result<ConversionSummary, ConvertError>
where
    P: AsRef<Path>,
    W: Write,
    Tz: TimeZone,
    Tz::Offset: Display,
    R: Reporter,
{
    let mut summary = ConversionSummary::default();

    for path in paths {
        let path = path.as_ref();
        emitter.reporter_mut().report(Diagnostic::FileStarted {
            path: path.to_path_buf(),
        });

        match convert_file(path, emitter) {
            Ok(rows) => {
                summary.files_converted += 1;
                summary.rows_written += rows;
                emitter.reporter_mut().report(Diagnostic::FileConverted {
                    path: path.to_path_buf(),
                    rows,
                });
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                summary.files_skipped += 1;
                emitter.reporter_mut().report(Diagnostic::FileSkipped {
                    path: path.to_path_buf(),
                    error: e.to_string(),
                });
            }
        }
    }

    Ok(summary)
}

fn convert_file<W, Tz, R>(path: &Path, emitter: &mut CsvEmitter<W, Tz, R>) -> Result<usize, ConvertError>
where
    W: Write,
    Tz: TimeZone,
    Tz::Offset: Display,
    R: Reporter,
{
    let bytes = std::fs::read(path).map_err(|source| ConvertError::InputRead {
        path: path.to_path_buf(),
        source,
    })?;
    let gpx_data = parser::parse_gpx(&bytes)?;
    emitter.write_document(&gpx_data)
}

/// Convert one in-memory GPX document into a complete CSV table, header included.
pub fn gpx_str_to_csv<Tz, R>(
    gpx_string: &str,
    tz: Tz,
    opts: ConvertOptions,
    reporter: R,
) -> Result<(String, R), ConvertError>
where
    Tz: TimeZone,
    Tz::Offset: Display,
    R: Reporter,
{
    let gpx_data = parser::parse_gpx_str(gpx_string)?;
    let mut emitter = CsvEmitter::new(Vec::new(), RowFormatter::new(tz, opts), reporter)?;
    emitter.write_document(&gpx_data)?;
    let (bytes, reporter) = emitter.finish()?;
    // Every field originates from a &str or ASCII formatting.
    let csv = String::from_utf8(bytes).map_err(ConvertError::malformed)?;
    Ok((csv, reporter))
}

/// CSV table plus every diagnostic raised while producing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvConversion {
    pub csv: String,
    pub diagnostics: Vec<String>,
}

/// Like `gpx_str_to_csv`, with the diagnostics rendered as messages.
pub fn convert_gpx_str<Tz>(
    gpx_string: &str,
    tz: Tz,
    opts: ConvertOptions,
) -> Result<CsvConversion, ConvertError>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let (csv, rec) = gpx_str_to_csv(gpx_string, tz, opts, RecordingReporter::new())?;
    Ok(CsvConversion {
        csv,
        diagnostics: rec.events.iter().map(ToString::to_string).collect(),
    })
}

/// Convert GPX string to `{ csv, diagnostics }`, timestamps in the host's local zone.
#[wasm_bindgen(js_name = gpxToCsv)]
pub fn gpx_to_csv(gpx_string: &str, options: JsValue) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();

    let opts = parse_options(options)?;
    let conversion = convert_gpx_str(gpx_string, chrono::Local, opts)?;
    serde_wasm_bindgen::to_value(&conversion).map_err(|e| JsValue::from_str(&e.to_string()))
}

fn parse_options(options: JsValue) -> Result<ConvertOptions, JsValue> {
    if options.is_undefined() || options.is_null() {
        Ok(ConvertOptions::default())
    } else {
        serde_wasm_bindgen::from_value(options).map_err(|e| JsValue::from_str(&e.to_string()))
    }
}

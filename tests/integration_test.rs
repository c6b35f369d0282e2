use chrono::{FixedOffset, Utc};
use gpx2csv::converter::{CsvEmitter, RowFormatter, CSV_HEADER};
use gpx2csv::diagnostics::{Diagnostic, RecordingReporter};
use gpx2csv::error::ConvertError;
use gpx2csv::options::ConvertOptions;
use gpx2csv::parser::parse_gpx;
use gpx2csv::{convert_files, ConversionSummary};

fn load_fixture(path: &str) -> Vec<u8> {
    std::fs::read(format!("tests/fixtures/{path}")).unwrap()
}

fn fixture_path(path: &str) -> String {
    format!("tests/fixtures/{path}")
}

fn rows(csv: &str) -> Vec<Vec<String>> {
    let mut reader = csv::Reader::from_reader(csv.as_bytes());
    reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect()
}

fn run(paths: &[String], opts: ConvertOptions) -> (String, RecordingReporter, ConversionSummary) {
    let formatter = RowFormatter::new(Utc, opts);
    let mut emitter = CsvEmitter::new(Vec::new(), formatter, RecordingReporter::new()).unwrap();
    let summary = convert_files(paths, &mut emitter).unwrap();
    let (bytes, rec) = emitter.finish().unwrap();
    (String::from_utf8(bytes).unwrap(), rec, summary)
}

// ---- decoding ----

#[test]
fn test_01_simple_track_decodes() {
    let data = parse_gpx(&load_fixture("basic/01_simple_track.gpx")).unwrap();
    assert_eq!(data.version.as_deref(), Some("1.1"));
    assert_eq!(data.tracks.len(), 1);
    assert_eq!(data.track_point_count(), 4);
    let first = data.track_points().next().unwrap();
    assert!((first.lat - 35.6762).abs() < 1e-10);
    assert!((first.lon - 139.6503).abs() < 1e-10);
    assert_eq!(first.time.as_deref(), Some("2025-01-01T06:00:00Z"));
}

#[test]
fn test_02_multi_segment_decodes() {
    let data = parse_gpx(&load_fixture("basic/02_multi_segment.gpx")).unwrap();
    assert_eq!(data.tracks.len(), 2);
    assert_eq!(data.tracks[0].segments.len(), 3);
    assert_eq!(data.waypoints.len(), 1);
    assert_eq!(data.track_point_count(), 4);
}

#[test]
fn test_05_invalid_coordinate_is_malformed() {
    let err = parse_gpx(&load_fixture("edge_cases/05_invalid_coordinate.gpx")).unwrap_err();
    assert!(matches!(err, ConvertError::MalformedDocument { .. }));
    assert!(err.to_string().contains("thirty-five"), "{err}");
}

#[test]
fn test_06_truncated_is_malformed() {
    let err = parse_gpx(&load_fixture("edge_cases/06_truncated.gpx")).unwrap_err();
    assert!(matches!(err, ConvertError::MalformedDocument { .. }));
}

// ---- conversion ----

#[test]
fn test_header_row() {
    let (csv, _, _) = run(&[fixture_path("basic/01_simple_track.gpx")], ConvertOptions::default());
    assert_eq!(csv.lines().next().unwrap(), CSV_HEADER.join(","));
    assert_eq!(
        csv.lines().next().unwrap(),
        "SourceFile,GPSDateTime,GPSLatitude,GPSLatitudeRef,GPSLongitude,GPSLongitudeRef"
    );
}

#[test]
fn test_utc_rows() {
    let (csv, rec, summary) =
        run(&[fixture_path("basic/02_multi_segment.gpx")], ConvertOptions::default());
    assert_eq!(summary.rows_written, 4);
    assert!(rec.timestamp_fallbacks().next().is_none());

    let rows = rows(&csv);
    assert_eq!(
        rows[1],
        vec![
            "./2024-05-31T14:00:10Z.jpg",
            "2024-05-31T14:00:10Z",
            "-33.8689000",
            "South",
            "151.2094000",
            "East",
        ]
    );
    assert_eq!(rows[3][2..], ["0.0000000", "South", "0.0000000", "West"]);
}

#[test]
fn test_source_file_follows_date_time() {
    let (csv, _, _) = run(&[fixture_path("edge_cases/03_bad_times.gpx")], ConvertOptions::default());
    for row in rows(&csv) {
        assert_eq!(row[0], format!("./{}.jpg", row[1]));
    }
}

#[test]
fn test_custom_source_naming() {
    let opts = ConvertOptions {
        source_prefix: "DCIM/".to_string(),
        source_extension: "ARW".to_string(),
    };
    let (csv, _, _) = run(&[fixture_path("edge_cases/07_extensions.gpx")], opts);
    let rows = rows(&csv);
    assert_eq!(rows[0][0], "DCIM/2025-01-01T00:00:00Z.ARW");
    assert_eq!(rows[1][0], "DCIM/2025-01-01T00:00:05Z.ARW");
}

#[test]
fn test_timestamp_fallbacks_reported() {
    let (csv, rec, summary) =
        run(&[fixture_path("edge_cases/03_bad_times.gpx")], ConvertOptions::default());
    assert_eq!(summary.rows_written, 8);
    assert_eq!(rows(&csv).len(), 8);
    assert_eq!(
        rec.timestamp_fallbacks().collect::<Vec<_>>(),
        vec![
            "",
            "2023-13-45T25:70:90Z",
            "15/01/2023 10:30",
            "",
            "2023-01-15 10:30:45Z",
            "2023-01-15t10:30:45z",
            "2023-01-15T23:59:60Z",
        ]
    );
}

#[test]
fn test_formatting_is_idempotent() {
    let data = parse_gpx(&load_fixture("edge_cases/03_bad_times.gpx")).unwrap();
    let formatter = RowFormatter::new(FixedOffset::west_opt(3 * 3600).unwrap(), ConvertOptions::default());
    let mut rec = RecordingReporter::new();
    for pt in data.track_points() {
        assert_eq!(formatter.format_point(pt, &mut rec), formatter.format_point(pt, &mut rec));
    }
}

// ---- multi-file ----

#[test]
fn test_failed_files_skipped() {
    let paths = [
        fixture_path("edge_cases/06_truncated.gpx"),
        fixture_path("basic/01_simple_track.gpx"),
        fixture_path("does/not/exist.gpx"),
        fixture_path("edge_cases/05_invalid_coordinate.gpx"),
        fixture_path("edge_cases/07_extensions.gpx"),
    ];
    let (csv, rec, summary) = run(&paths, ConvertOptions::default());
    assert_eq!(
        summary,
        ConversionSummary {
            files_converted: 2,
            files_skipped: 3,
            rows_written: 6,
        }
    );
    assert_eq!(csv.matches("SourceFile").count(), 1);
    assert_eq!(rows(&csv).len(), 6);

    let skipped: Vec<String> = rec
        .skipped_files()
        .map(|p| p.to_string_lossy().into_owned())
        .collect();
    assert_eq!(skipped, vec![paths[0].clone(), paths[2].clone(), paths[3].clone()]);

    let read_failure = rec.events.iter().find_map(|d| match d {
        Diagnostic::FileSkipped { path, error } if path.ends_with("exist.gpx") => Some(error),
        _ => None,
    });
    assert!(read_failure.unwrap().starts_with("cannot read"));
}

#[test]
fn test_only_failed_files_still_write_header() {
    let (csv, _, summary) = run(&[fixture_path("edge_cases/06_truncated.gpx")], ConvertOptions::default());
    assert_eq!(summary.files_skipped, 1);
    assert_eq!(csv, format!("{}\n", CSV_HEADER.join(",")));
}

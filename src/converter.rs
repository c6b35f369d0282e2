use std::fmt::Display;
use std::io::Write;

use chrono::{DateTime, SecondsFormat, TimeZone};

use crate::diagnostics::{Diagnostic, Reporter};
use crate::error::{ConvertError, TimestampError};
use crate::gpx_types::*;
use crate::options::ConvertOptions;

/// Column names, written once at the top of the table.
pub const CSV_HEADER: [&str; 6] = [
    "SourceFile",
    "GPSDateTime",
    "GPSLatitude",
    "GPSLatitudeRef",
    "GPSLongitude",
    "GPSLongitudeRef",
];

/// Digits after the decimal point for latitude and longitude.
pub const COORDINATE_PRECISION: usize = 7;

/// One CSV data row derived from a track point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeotagRow {
    pub source_file: String,
    pub date_time: String,
    pub latitude: String,
    pub latitude_ref: &'static str,
    pub longitude: String,
    pub longitude_ref: &'static str,
}

impl GeotagRow {
    /// Fields in `CSV_HEADER` order.
    pub fn fields(&self) -> [&str; 6] {
        [
            self.source_file.as_str(),
            self.date_time.as_str(),
            self.latitude.as_str(),
            self.latitude_ref,
            self.longitude.as_str(),
            self.longitude_ref,
        ]
    }
}

/// Fixed-point rendering with `COORDINATE_PRECISION` digits, never exponential.
pub fn format_coordinate(value: f64) -> String {
    format!("{value:.prec$}", prec = COORDINATE_PRECISION)
}

/// "North" for strictly positive latitudes, "South" otherwise (zero included).
pub fn latitude_ref(lat: f64) -> &'static str {
    if lat > 0.0 { "North" } else { "South" }
}

/// "East" for strictly positive longitudes, "West" otherwise (zero included).
pub fn longitude_ref(lon: f64) -> &'static str {
    if lon > 0.0 { "East" } else { "West" }
}

/// Re-express an RFC 3339 timestamp in `tz`, at whole-second precision.
/// A zero offset renders as `Z`.
///
/// Only the strict form is accepted: uppercase `T` and `Z`, two-digit
/// fields, seconds below 60.
pub fn localize_timestamp<Tz>(raw: &str, tz: &Tz) -> Result<String, TimestampError>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    check_rfc3339_layout(raw)?;
    let instant = DateTime::parse_from_rfc3339(raw)?;
    Ok(instant
        .with_timezone(tz)
        .to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// Shape check ahead of chrono, which also takes `t`, `z`, a space
/// separator and leap seconds.
fn check_rfc3339_layout(raw: &str) -> Result<(), TimestampError> {
    let b = raw.as_bytes();
    let digits = |from: usize, to: usize| {
        b.get(from..to)
            .is_some_and(|s| s.iter().all(u8::is_ascii_digit))
    };
    let at = |i: usize, c: u8| b.get(i) == Some(&c);

    let date_time = digits(0, 4)
        && at(4, b'-')
        && digits(5, 7)
        && at(7, b'-')
        && digits(8, 10)
        && at(10, b'T')
        && digits(11, 13)
        && at(13, b':')
        && digits(14, 16)
        && at(16, b':')
        && digits(17, 19);
    if !date_time {
        return Err(TimestampError::Layout);
    }
    if b[17] >= b'6' {
        return Err(TimestampError::SecondOutOfRange);
    }

    let mut rest = &b[19..];
    if let Some(fraction) = rest.strip_prefix(b".") {
        let n = fraction.iter().take_while(|c| c.is_ascii_digit()).count();
        if n == 0 {
            return Err(TimestampError::Layout);
        }
        rest = &fraction[n..];
    }

    match rest {
        b"Z" => Ok(()),
        [b'+' | b'-', h1, h2, b':', m1, m2] if [h1, h2, m1, m2].iter().all(|c| c.is_ascii_digit()) => {
            Ok(())
        }
        _ => Err(TimestampError::Layout),
    }
}

/// Pure per-point row derivation.
#[derive(Debug, Clone)]
pub struct RowFormatter<Tz: TimeZone> {
    tz: Tz,
    options: ConvertOptions,
}

impl<Tz> RowFormatter<Tz>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    pub fn new(tz: Tz, options: ConvertOptions) -> Self {
        Self { tz, options }
    }

    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    /// Derive the CSV row for one point.
    ///
    /// A missing or unparseable time is emitted verbatim (missing reads as
    /// the empty string) and reported as `Diagnostic::TimestampFallback`.
    pub fn format_point<R: Reporter + ?Sized>(&self, pt: &GpxPoint, reporter: &mut R) -> GeotagRow {
        let raw = pt.time.as_deref().unwrap_or_default();
        let date_time = match localize_timestamp(raw, &self.tz) {
            Ok(local) => local,
            Err(e) => {
                reporter.report(Diagnostic::TimestampFallback {
                    timestamp: raw.to_string(),
                    reason: e.to_string(),
                });
                raw.to_string()
            }
        };

        GeotagRow {
            source_file: self.options.source_file_name(&date_time),
            date_time,
            latitude: format_coordinate(pt.lat),
            latitude_ref: latitude_ref(pt.lat),
            longitude: format_coordinate(pt.lon),
            longitude_ref: longitude_ref(pt.lon),
        }
    }
}

/// Streams geotag rows into a CSV sink.
///
/// The header goes out on construction. Every decoded document then appends
/// its track points in track → segment → point order.
pub struct CsvEmitter<W: Write, Tz: TimeZone, R: Reporter> {
    writer: csv::Writer<W>,
    formatter: RowFormatter<Tz>,
    reporter: R,
    rows_written: usize,
}

impl<W, Tz, R> CsvEmitter<W, Tz, R>
where
    W: Write,
    Tz: TimeZone,
    Tz::Offset: Display,
    R: Reporter,
{
    pub fn new(sink: W, formatter: RowFormatter<Tz>, reporter: R) -> Result<Self, ConvertError> {
        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(sink);
        writer.write_record(CSV_HEADER)?;
        Ok(Self {
            writer,
            formatter,
            reporter,
            rows_written: 0,
        })
    }

    /// Append one row per track point and flush. Returns the rows written.
    pub fn write_document(&mut self, data: &GpxData) -> Result<usize, ConvertError> {
        let mut rows = 0;
        for pt in data.track_points() {
            let row = self.formatter.format_point(pt, &mut self.reporter);
            self.writer.write_record(row.fields())?;
            rows += 1;
        }
        self.writer.flush()?;
        self.rows_written += rows;
        Ok(rows)
    }

    pub fn reporter_mut(&mut self) -> &mut R {
        &mut self.reporter
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    /// Flush and hand back the sink and the reporter.
    pub fn finish(mut self) -> Result<(W, R), ConvertError> {
        self.writer.flush()?;
        let sink = self.writer.into_inner().map_err(|e| {
            ConvertError::SinkIo(std::io::Error::new(e.error().kind(), e.error().to_string()))
        })?;
        Ok((sink, self.reporter))
    }
}

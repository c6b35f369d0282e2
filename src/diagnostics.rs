use std::fmt;
use std::path::PathBuf;

/// Non-fatal events raised while converting.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    FileStarted { path: PathBuf },
    FileConverted { path: PathBuf, rows: usize },
    /// The file was unreadable or undecodable and produced no rows.
    FileSkipped { path: PathBuf, error: String },
    /// A point's time was not RFC 3339 and was emitted unconverted.
    TimestampFallback { timestamp: String, reason: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FileStarted { path } => write!(f, "{}", path.display()),
            Self::FileConverted { path, rows } => {
                write!(f, "{}: {rows} rows written", path.display())
            }
            Self::FileSkipped { path, error } => {
                write!(f, "skipping {}: {error}", path.display())
            }
            Self::TimestampFallback { timestamp, reason } => {
                write!(f, "error parsing timestamp '{timestamp}': {reason}")
            }
        }
    }
}

/// Receives diagnostics. Kept apart from the CSV sink so they never mix.
pub trait Reporter {
    fn report(&mut self, diagnostic: Diagnostic);
}

impl<R: Reporter + ?Sized> Reporter for &mut R {
    fn report(&mut self, diagnostic: Diagnostic) {
        (**self).report(diagnostic);
    }
}

/// Forwards diagnostics to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn report(&mut self, diagnostic: Diagnostic) {
        match &diagnostic {
            Diagnostic::FileStarted { .. } => log::info!("{diagnostic}"),
            Diagnostic::FileConverted { .. } => log::debug!("{diagnostic}"),
            Diagnostic::FileSkipped { .. } => log::error!("{diagnostic}"),
            Diagnostic::TimestampFallback { .. } => log::warn!("{diagnostic}"),
        }
    }
}

/// Keeps every diagnostic in memory, in arrival order.
#[derive(Debug, Default, Clone)]
pub struct RecordingReporter {
    pub events: Vec<Diagnostic>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timestamp_fallbacks(&self) -> impl Iterator<Item = &str> {
        self.events.iter().filter_map(|d| match d {
            Diagnostic::TimestampFallback { timestamp, .. } => Some(timestamp.as_str()),
            _ => None,
        })
    }

    pub fn skipped_files(&self) -> impl Iterator<Item = &PathBuf> {
        self.events.iter().filter_map(|d| match d {
            Diagnostic::FileSkipped { path, .. } => Some(path),
            _ => None,
        })
    }
}

impl Reporter for RecordingReporter {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.events.push(diagnostic);
    }
}

use std::path::PathBuf;

use wasm_bindgen::JsValue;

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// Input is not well-formed XML or does not fit the GPX nesting.
    #[error("malformed GPX document: {reason}")]
    MalformedDocument { reason: String },

    #[error("cannot read {}: {source}", .path.display())]
    InputRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write CSV record: {0}")]
    SinkWrite(#[from] csv::Error),

    #[error("failed to flush CSV output: {0}")]
    SinkIo(#[from] std::io::Error),
}

/// Why a point's time could not be localized.
#[derive(Debug, thiserror::Error)]
pub enum TimestampError {
    #[error("expected layout YYYY-MM-DDThh:mm:ss[.fraction](Z|+hh:mm|-hh:mm)")]
    Layout,
    #[error("second out of range")]
    SecondOutOfRange,
    #[error(transparent)]
    Parse(#[from] chrono::ParseError),
}

impl ConvertError {
    pub(crate) fn malformed(reason: impl std::fmt::Display) -> Self {
        Self::MalformedDocument {
            reason: reason.to_string(),
        }
    }

    /// Sink failures end the whole run; everything else only skips a file.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::SinkWrite(_) | Self::SinkIo(_))
    }
}

impl From<quick_xml::Error> for ConvertError {
    fn from(e: quick_xml::Error) -> Self {
        Self::malformed(format_args!("XML parse error: {e}"))
    }
}

impl From<ConvertError> for JsValue {
    fn from(e: ConvertError) -> Self {
        JsValue::from_str(&e.to_string())
    }
}

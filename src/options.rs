use serde::Deserialize;

pub const DEFAULT_SOURCE_PREFIX: &str = "./";
pub const DEFAULT_SOURCE_EXTENSION: &str = "jpg";

/// Options for GPX to CSV conversion.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertOptions {
    /// Prepended to the timestamp in the SourceFile column (default: "./")
    #[serde(default = "default_source_prefix")]
    pub source_prefix: String,

    /// Photo file extension appended to the SourceFile column (default: "jpg")
    #[serde(default = "default_source_extension")]
    pub source_extension: String,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            source_prefix: default_source_prefix(),
            source_extension: default_source_extension(),
        }
    }
}

impl ConvertOptions {
    /// Photo path derived from a capture timestamp. No file lookup happens.
    pub fn source_file_name(&self, date_time: &str) -> String {
        let extension = self.source_extension.trim_start_matches('.');
        if extension.is_empty() {
            format!("{}{date_time}", self.source_prefix)
        } else {
            format!("{}{date_time}.{extension}", self.source_prefix)
        }
    }
}

fn default_source_prefix() -> String {
    DEFAULT_SOURCE_PREFIX.to_string()
}

fn default_source_extension() -> String {
    DEFAULT_SOURCE_EXTENSION.to_string()
}

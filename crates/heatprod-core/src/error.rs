use std::io;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Library result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// An asset whose category has no work-intensity entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnmappedAsset {
    pub asset_id: String,
    pub category: String,
}

/// Every failure the pipeline reports. None are recovered mid-run.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Input file not found: {path}")]
    MissingInputFile { path: PathBuf },

    #[error("Schema validation failed for {file}: {message}")]
    SchemaValidation { file: PathBuf, message: String },

    #[error("No work-intensity mapping for {} asset(s): {}", unmapped.len(), format_unmapped(unmapped))]
    Mapping { unmapped: Vec<UnmappedAsset> },

    #[error("Grid access failed for {path}: {message}")]
    GridAccess { path: PathBuf, message: String },

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn schema(file: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Error::SchemaValidation { file: file.into(), message: message.into() }
    }

    pub(crate) fn grid(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Error::GridAccess { path: path.into(), message: message.into() }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io { path: path.into(), source }
    }

    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Error::Csv { path: path.into(), source }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Error::Json { path: path.into(), source }
    }
}

fn format_unmapped(unmapped: &[UnmappedAsset]) -> String {
    unmapped
        .iter()
        .map(|u| format!("{} ('{}')", u.asset_id, u.category))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapping_error_lists_offenders() {
        let err = Error::Mapping {
            unmapped: vec![
                UnmappedAsset { asset_id: "A1".into(), category: "Igloo".into() },
                UnmappedAsset { asset_id: "B7".into(), category: "Moon Base".into() },
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("2 asset(s)"), "{msg}");
        assert!(msg.contains("A1 ('Igloo')"), "{msg}");
        assert!(msg.contains("B7 ('Moon Base')"), "{msg}");
    }

    #[test]
    fn missing_input_names_path() {
        let err = Error::MissingInputFile { path: PathBuf::from("data/nope.csv") };
        assert_eq!(err.to_string(), "Input file not found: data/nope.csv");
    }
}

//! Scraped records and their download outcome.
//!
//! A [`Record`] stores a single [`DownloadOutcome`]; both `local_path` and
//! `download_status` are derived from it on serialization, so `local_path`
//! is `"N/A"` exactly when the status is not `"success"`.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;

/// Placeholder written for `local_path` when nothing was saved.
pub const NO_LOCAL_PATH: &str = "N/A";

/// The seven positional metadata cells that follow the document cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RowMetadata {
    pub fatal5: String,
    pub activity: String,
    pub equipment: String,
    pub body_part: String,
    pub injury: String,
    pub area: String,
    pub country: String,
}

/// What happened when the row's document was fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// Written to this path.
    Saved(PathBuf),
    /// The server answered with a non-200 status.
    Failed,
    /// No request was made.
    NotAttempted,
    /// The fetch or the write raised an error.
    Error(String),
}

impl DownloadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, DownloadOutcome::Saved(_))
    }

    /// Value of the `local_path` field.
    pub fn local_path(&self) -> String {
        match self {
            DownloadOutcome::Saved(path) => path.display().to_string(),
            _ => NO_LOCAL_PATH.to_string(),
        }
    }
}

impl fmt::Display for DownloadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadOutcome::Saved(_) => f.write_str("success"),
            DownloadOutcome::Failed => f.write_str("download failed"),
            DownloadOutcome::NotAttempted => f.write_str("not attempted"),
            DownloadOutcome::Error(detail) => write!(f, "error: {detail}"),
        }
    }
}

/// One fully resolved table row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub filename: String,
    pub file_url: String,
    pub download: DownloadOutcome,
    pub metadata: RowMetadata,
}

impl Record {
    pub fn new(
        filename: String,
        file_url: String,
        download: DownloadOutcome,
        metadata: RowMetadata,
    ) -> Self {
        Self {
            filename,
            file_url,
            download,
            metadata,
        }
    }

    pub fn local_path(&self) -> String {
        self.download.local_path()
    }

    pub fn download_status(&self) -> String {
        self.download.to_string()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Record", 5)?;
        s.serialize_field("filename", &self.filename)?;
        s.serialize_field("file_url", &self.file_url)?;
        s.serialize_field("local_path", &self.local_path())?;
        s.serialize_field("download_status", &self.download_status())?;
        s.serialize_field("metadata", &self.metadata)?;
        s.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(download: DownloadOutcome) -> Record {
        Record::new(
            "LP-001".into(),
            "https://fatal5.com/files/1".into(),
            download,
            RowMetadata {
                fatal5: "Dropped object".into(),
                country: "NO".into(),
                ..RowMetadata::default()
            },
        )
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(DownloadOutcome::Saved("a.pdf".into()).to_string(), "success");
        assert_eq!(DownloadOutcome::Failed.to_string(), "download failed");
        assert_eq!(DownloadOutcome::NotAttempted.to_string(), "not attempted");
        assert_eq!(
            DownloadOutcome::Error("connection reset".into()).to_string(),
            "error: connection reset"
        );
    }

    #[test]
    fn test_local_path_is_na_unless_saved() {
        let outcomes = [
            DownloadOutcome::Saved(PathBuf::from("downloads").join("a.pdf")),
            DownloadOutcome::Failed,
            DownloadOutcome::NotAttempted,
            DownloadOutcome::Error("timeout".into()),
        ];
        for outcome in outcomes {
            let r = record(outcome);
            assert_eq!(
                r.local_path() == NO_LOCAL_PATH,
                r.download_status() != "success",
                "{r:?}"
            );
        }
    }

    #[test]
    fn test_serialized_shape() {
        let value = serde_json::to_value(record(DownloadOutcome::Failed)).unwrap();
        assert_eq!(
            value,
            json!({
                "filename": "LP-001",
                "file_url": "https://fatal5.com/files/1",
                "local_path": "N/A",
                "download_status": "download failed",
                "metadata": {
                    "fatal5": "Dropped object",
                    "activity": "",
                    "equipment": "",
                    "body_part": "",
                    "injury": "",
                    "area": "",
                    "country": "NO"
                }
            })
        );
    }
}

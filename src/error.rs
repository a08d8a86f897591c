use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to resolve {coordinate} ({extension}): {reason}")]
    Resolution {
        coordinate: String,
        extension: String,
        reason: String,
    },

    #[error("Failed to parse {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("Unrecognized issue system: {0:?}")]
    UnrecognizedIssueSystem(String),

    #[error("Broken parent chain for {coordinate}: {reason}")]
    Lineage { coordinate: String, reason: String },

    #[error("Scrape of {url} failed: {reason}")]
    Scrape { url: String, reason: String },
}

impl Error {
    pub fn parse(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Parse {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn scrape(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Scrape {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

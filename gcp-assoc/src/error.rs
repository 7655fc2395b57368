use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures surfaced by the association pipeline.
///
/// Catalog, selection, coordinate-export, tool-location and output-directory
/// failures are fatal to a run. The per-image and per-GCP conditions are
/// logged where they occur and the run continues with the next candidate.
#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed GCP catalog {path:?}: {reason}")]
    MalformedCatalog { path: PathBuf, reason: String },
    #[error("no images match pattern {0:?}")]
    NoMatchingImages(String),
    #[error("cannot export ground coordinates to {path:?}: {source}")]
    CoordinatesExport { path: PathBuf, source: io::Error },
    #[error("{0:?} is not a regular image file")]
    ImageUnreadable(PathBuf),
    #[error("cannot find the metadata tool at {0:?}")]
    MetadataToolUnavailable(PathBuf),
    #[error("missing orientation file {0:?}")]
    OrientationFileMissing(PathBuf),
    #[error("{tool} did not exit within {seconds}s")]
    ExternalToolTimeout { tool: String, seconds: u64 },
    #[error("no GCP was visible in any selected image")]
    EmptyAssociation,
    #[error("cannot create output directory {path:?}: {source}")]
    OutputDirUnavailable { path: PathBuf, source: io::Error },
    #[error("cannot write {path:?}: {source}")]
    OutputWriteFailed { path: PathBuf, source: io::Error },
    #[error("{image}: expected {expected} projected coordinate line(s), found {actual}")]
    ProjectionCountMismatch {
        image: String,
        expected: usize,
        actual: usize,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

use std::path::PathBuf;

use thiserror::Error;

/// A path that does not contain a tile id of the expected width.
///
/// The offending tile is skipped and reported; it never aborts discovery.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("No {width}-digit tile id in '{path}'")]
pub struct MalformedTileIdError {
    /// The path (or name) that failed to parse
    pub path: String,

    /// Id width the parser was looking for
    pub width: usize,
}

/// Errors that abort a run before any conversion starts
#[derive(Debug, Clone, Error)]
pub enum DiscoveryError {
    /// Input root does not exist
    #[error("Input root not found: {0}")]
    RootMissing(PathBuf),

    /// Input root exists but is not a directory
    #[error("Input root is not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Input root (or output tree) could not be listed
    #[error("Cannot read {path}: {message}")]
    Unreadable { path: PathBuf, message: String },

    /// The glob pattern failed to compile
    #[error("Invalid glob pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// Tile id width is odd, zero, or too wide for numeric rows
    #[error("Invalid tile id width {0}: must be an even number from 2 to 38")]
    InvalidIdWidth(usize),
}

/// Errors reading a written file back for validation
#[derive(Debug, Clone, Error)]
pub enum TiffError {
    /// I/O error while opening or reading the file
    #[error("I/O error: {0}")]
    Io(String),

    /// The file is not a TIFF the decoder can walk
    #[error("Decode error: {0}")]
    Decode(String),
}

impl From<std::io::Error> for TiffError {
    fn from(err: std::io::Error) -> Self {
        TiffError::Io(err.to_string())
    }
}

impl From<tiff::TiffError> for TiffError {
    fn from(err: tiff::TiffError) -> Self {
        match err {
            tiff::TiffError::IoError(e) => TiffError::Io(e.to_string()),
            other => TiffError::Decode(other.to_string()),
        }
    }
}

/// Errors raised by the raster codec
#[derive(Debug, Clone, Error)]
pub enum CodecError {
    /// GDAL failed to open, read or write a raster
    #[error("GDAL error on {path}: {message}")]
    Gdal { path: PathBuf, message: String },

    /// I/O error outside GDAL (e.g. sizing the written file)
    #[error("I/O error on {path}: {message}")]
    Io { path: PathBuf, message: String },

    /// Source or requested layout the codec cannot handle
    #[error("Unsupported layout: {0}")]
    UnsupportedLayout(String),

    /// Band buffer has the wrong number of samples
    #[error("Band {index} has {actual} samples, expected {expected}")]
    BandSize {
        index: usize,
        expected: usize,
        actual: usize,
    },

    /// Band index outside the dataset
    #[error("Band index {index} out of range (dataset has {bands} bands)")]
    BandIndex { index: usize, bands: usize },

    /// Operation called out of order (e.g. overviews before all bands)
    #[error("Invalid dataset state: {0}")]
    State(&'static str),
}

/// The output directory for a row could not be created
#[derive(Debug, Clone, Error)]
#[error("Cannot create target directory {path}: {message}")]
pub struct TargetDirectoryError {
    pub path: PathBuf,
    pub message: String,
}

/// Why a single tile failed to convert
#[derive(Debug, Clone, Error)]
pub enum FailureCause {
    /// The codec rejected the source or failed to write the target
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The row's target directory is unusable
    #[error(transparent)]
    TargetDirectory(#[from] TargetDirectoryError),

    /// The worker running the job panicked
    #[error("Worker panicked: {0}")]
    WorkerPanicked(String),

    /// The job could not be scheduled or its task was lost
    #[error("Dispatch error: {0}")]
    Dispatch(String),
}

/// A per-tile conversion failure.
///
/// Recorded in the run summary; never aborts sibling jobs or later rows.
#[derive(Debug, Clone, Error)]
#[error("Tile {tile_id} ({}) failed: {cause}", .path.display())]
pub struct ConversionFailure {
    /// Id of the tile that failed
    pub tile_id: String,

    /// Source path of the tile
    pub path: PathBuf,

    /// Underlying cause
    pub cause: FailureCause,
}

/// Errors from manifest handling and the remote asset catalog
#[derive(Debug, Clone, Error)]
pub enum RegistrationError {
    /// Transport-level HTTP failure
    #[error("HTTP error: {0}")]
    Http(String),

    /// Local file error (manifest or response log)
    #[error("I/O error on {path}: {message}")]
    Io { path: PathBuf, message: String },

    /// Manifest could not be parsed or built
    #[error("Manifest error: {0}")]
    Manifest(String),

    /// Endpoint URL could not be parsed or extended
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

impl From<reqwest::Error> for RegistrationError {
    fn from(err: reqwest::Error) -> Self {
        RegistrationError::Http(err.to_string())
    }
}

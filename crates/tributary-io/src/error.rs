//! I/O error types for tributary-io.

use std::path::PathBuf;

use chrono::NaiveDate;
use tributary_seq::ErrorKind;

/// Errors from file I/O, CSV parsing, the attribute store, and artifact serialization.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Returned when the input file does not exist or is unreadable.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the CSV parser encounters a malformed record.
    #[error("CSV parse error in {path} at byte offset {offset}")]
    CsvParse {
        /// Path to the CSV file.
        path: PathBuf,
        /// Byte offset where the error occurred.
        offset: u64,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when the CSV file contains a header but zero data rows.
    #[error("empty dataset (no data rows) in {path}")]
    EmptyDataset {
        /// Path to the CSV file.
        path: PathBuf,
    },

    /// Returned when a data row has a different number of columns than the header.
    #[error("inconsistent row length in {path}: row {row_index} has {got} columns, expected {expected}")]
    InconsistentRowLength {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Expected number of columns (from header).
        expected: usize,
        /// Actual number of columns in this row.
        got: usize,
    },

    /// Returned when a numeric cell is NaN, Inf, empty, or otherwise not a finite float.
    #[error("non-finite value in {path}: row {row_index}, column \"{column}\", raw value \"{raw}\"")]
    NonFiniteValue {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Header name of the offending column.
        column: String,
        /// The raw string value that failed to parse.
        raw: String,
    },

    /// Returned when a required column is absent from a file or store table.
    #[error("column \"{column}\" not found in {path}")]
    MissingColumn {
        /// File or store that was searched.
        path: PathBuf,
        /// The missing column name.
        column: String,
    },

    /// Returned when a requested attribute column is not present in the store.
    #[error("unknown attribute column \"{column}\" (available: {available:?})")]
    UnknownColumn {
        /// The requested column name.
        column: String,
        /// Columns present in the store.
        available: Vec<String>,
    },

    /// Returned when an identifier cannot be coerced to a 5-digit basin ID.
    #[error("invalid basin ID \"{raw}\": expected 1 to 5 decimal digits")]
    InvalidBasinId {
        /// The raw identifier.
        raw: String,
    },

    /// Returned when the same basin ID appears more than once where it must be unique.
    #[error("duplicate basin ID \"{basin_id}\" in {path}: first at row {first_row}, again at row {second_row}")]
    DuplicateBasinId {
        /// Path to the file.
        path: PathBuf,
        /// The duplicated basin ID.
        basin_id: String,
        /// Zero-based row index of the first occurrence.
        first_row: usize,
        /// Zero-based row index of the second occurrence.
        second_row: usize,
    },

    /// Returned when a date cell or date header cannot be parsed.
    #[error("invalid date \"{raw}\" in {path}")]
    InvalidDate {
        /// Path to the file.
        path: PathBuf,
        /// The raw date string.
        raw: String,
    },

    /// Returned when the same date appears twice in one series.
    #[error("duplicate date {date} in {path}")]
    DuplicateDate {
        /// Path to the file.
        path: PathBuf,
        /// The repeated date.
        date: NaiveDate,
    },

    /// Returned when a date range starts after it ends.
    #[error("invalid date range: start {start} is after end {end}")]
    InvalidDateRange {
        /// Requested start date.
        start: NaiveDate,
        /// Requested end date.
        end: NaiveDate,
    },

    /// Returned when a basin has no entry in the station mapping file.
    #[error("basin {basin_id} has no station in mapping file {path}")]
    StationNotMapped {
        /// The unmapped basin ID.
        basin_id: String,
        /// Mapping file that was read.
        path: PathBuf,
    },

    /// Returned when no forcing file matches a station name.
    #[error("no forcing file for station \"{station}\" (basin {basin_id}) in {dir}")]
    ForcingFileNotFound {
        /// Basin being loaded.
        basin_id: String,
        /// Station name the file stem must equal.
        station: String,
        /// Directory that was searched.
        dir: PathBuf,
    },

    /// Returned when more than one forcing file matches a station name.
    #[error("ambiguous forcing files for station \"{station}\" (basin {basin_id}): {candidates:?}")]
    AmbiguousForcingFile {
        /// Basin being loaded.
        basin_id: String,
        /// Station name the file stem must equal.
        station: String,
        /// Every matching file.
        candidates: Vec<PathBuf>,
    },

    /// Returned when a basin has no row in the discharge file.
    #[error("basin {basin_id} not found in discharge file {path}")]
    BasinNotFound {
        /// The missing basin ID.
        basin_id: String,
        /// Discharge file that was searched.
        path: PathBuf,
    },

    /// Returned when forcing and discharge share no dates (after range filtering).
    #[error("forcing and discharge for basin {basin_id} share no dates")]
    EmptyIntersection {
        /// Basin being aligned.
        basin_id: String,
    },

    /// Returned when the aligned dates skip one or more calendar days.
    #[error("aligned series for basin {basin_id} has a gap between {before} and {after}")]
    DateGap {
        /// Basin being aligned.
        basin_id: String,
        /// Last date before the gap.
        before: NaiveDate,
        /// First date after the gap.
        after: NaiveDate,
    },

    /// Returned when a dense numeric view is requested but a cell is missing.
    #[error("basin {basin_id} has no value for attribute \"{column}\"")]
    MissingAttribute {
        /// Basin whose row is incomplete.
        basin_id: String,
        /// Column with the missing cell.
        column: String,
    },

    /// Returned when the attribute store file does not exist.
    #[error("attribute store not found: {path}")]
    StoreNotFound {
        /// Path that was attempted.
        path: PathBuf,
    },

    /// Returned when the attribute table does not exist in the store.
    #[error("table \"{table}\" not found in attribute store {path}")]
    TableNotFound {
        /// Store path.
        path: PathBuf,
        /// Table name.
        table: String,
    },

    /// Wraps an SQLite failure from the attribute store.
    #[error("attribute store error at {path}")]
    Store {
        /// Store path.
        path: PathBuf,
        /// Underlying SQLite error.
        source: rusqlite::Error,
    },

    /// Returned when the experiment name contains characters outside `[a-zA-Z0-9_-]`.
    #[error("invalid experiment name \"{name}\": must match [a-zA-Z0-9_-]+")]
    InvalidExperimentName {
        /// The invalid name.
        name: String,
    },

    /// Returned when the output directory cannot be created.
    #[error("cannot create output directory {path}")]
    OutputDirCreate {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a result file cannot be written.
    #[error("cannot write file {path}")]
    WriteFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a JSON artifact cannot be encoded.
    #[error("cannot encode JSON artifact {path}")]
    EncodeJson {
        /// Artifact path.
        path: PathBuf,
        /// Underlying serde_json error.
        source: serde_json::Error,
    },

    /// Returned when a sample archive cannot be encoded.
    #[error("cannot encode sample archive")]
    SerializeArchive {
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when a sample archive cannot be decoded.
    #[error("cannot decode sample archive {path}")]
    DeserializeArchive {
        /// Archive path.
        path: PathBuf,
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when a sample archive was written by an incompatible format version.
    #[error("sample archive {path} has format version {found}, expected {expected}")]
    IncompatibleArchiveVersion {
        /// Version this build reads.
        expected: u32,
        /// Version found in the file.
        found: u32,
        /// Archive path.
        path: PathBuf,
    },
}

impl IoError {
    /// Return the failure category.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::FileNotFound { .. }
            | Self::StationNotMapped { .. }
            | Self::ForcingFileNotFound { .. }
            | Self::BasinNotFound { .. }
            | Self::StoreNotFound { .. }
            | Self::TableNotFound { .. } => ErrorKind::NotFound,

            Self::DuplicateBasinId { .. }
            | Self::DuplicateDate { .. }
            | Self::AmbiguousForcingFile { .. } => ErrorKind::Conflict,

            Self::EmptyDataset { .. }
            | Self::NonFiniteValue { .. }
            | Self::MissingColumn { .. }
            | Self::UnknownColumn { .. }
            | Self::InvalidBasinId { .. }
            | Self::InvalidDateRange { .. }
            | Self::EmptyIntersection { .. }
            | Self::DateGap { .. }
            | Self::MissingAttribute { .. }
            | Self::InvalidExperimentName { .. }
            | Self::IncompatibleArchiveVersion { .. } => ErrorKind::InvalidArgument,

            Self::CsvParse { .. }
            | Self::InconsistentRowLength { .. }
            | Self::InvalidDate { .. }
            | Self::DeserializeArchive { .. } => ErrorKind::Parse,

            Self::Store { .. } => ErrorKind::Store,

            Self::OutputDirCreate { .. }
            | Self::WriteFile { .. }
            | Self::EncodeJson { .. }
            | Self::SerializeArchive { .. } => ErrorKind::Io,
        }
    }
}

//! Error types for scaling and windowing.

/// Coarse classification of failures shared across the tributary crates.
///
/// Lets callers react to the category of a failure without matching every
/// structured variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A file, table, column value or basin that was required is absent.
    NotFound,
    /// A parameter or input shape violates the operation's contract.
    InvalidArgument,
    /// More than one candidate matched where exactly one was required.
    Conflict,
    /// Reading or writing a file failed.
    Io,
    /// A file was present but could not be parsed.
    Parse,
    /// The attribute store rejected a statement.
    Store,
}

/// Errors from scaler construction, scaling, and sequence windowing.
#[derive(Debug, thiserror::Error)]
pub enum SeqError {
    /// Returned when a variable name is neither `inputs` nor `output`.
    #[error("unknown variable type \"{name}\" (expected inputs or output)")]
    UnknownVariable {
        /// The name that was provided.
        name: String,
    },

    /// Returned when the input means and stds differ in length, or are empty.
    #[error("scaler has {n_means} input means but {n_stds} input stds")]
    ScalerShapeMismatch {
        /// Number of input means.
        n_means: usize,
        /// Number of input standard deviations.
        n_stds: usize,
    },

    /// Returned when a scaler mean is not finite or a std is not finite and positive.
    #[error("invalid scaler statistic {name}[{index}] = {value}")]
    InvalidScalerStatistic {
        /// Which statistic was rejected (`input_means`, `input_stds`, ...).
        name: &'static str,
        /// Position inside the statistic vector (0 for scalars).
        index: usize,
        /// The rejected value.
        value: f64,
    },

    /// Returned when an input array's last axis does not match the scaler width.
    #[error("expected {expected} input features on the last axis, got {got}")]
    FeatureCountMismatch {
        /// Number of features the scaler was built for.
        expected: usize,
        /// Number of features in the array.
        got: usize,
    },

    /// Returned when the sequence length is zero.
    #[error("sequence length must be at least 1, got {seq_length}")]
    InvalidSequenceLength {
        /// The invalid sequence length.
        seq_length: usize,
    },

    /// Returned when the sequence length exceeds the number of time steps.
    #[error("sequence length {seq_length} exceeds the {n_timesteps} available time steps")]
    SequenceTooLong {
        /// The requested sequence length.
        seq_length: usize,
        /// Number of rows in the feature matrix.
        n_timesteps: usize,
    },

    /// Returned when the feature and target arrays have different row counts.
    #[error("feature matrix has {x_rows} rows but target has {y_rows}")]
    LengthMismatch {
        /// Rows in `x`.
        x_rows: usize,
        /// Rows in `y`.
        y_rows: usize,
    },

    /// Returned when the target array is not a single column.
    #[error("target must have exactly 1 column, got {n_cols}")]
    TargetNotColumn {
        /// Number of columns in `y`.
        n_cols: usize,
    },
}

impl SeqError {
    /// Return the failure category. Every scaling and windowing error is an
    /// [`ErrorKind::InvalidArgument`].
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidArgument
    }
}

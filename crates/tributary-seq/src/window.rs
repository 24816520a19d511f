//! Many-to-one sequence windowing of aligned feature/target arrays.

use ndarray::{s, Array2, Array3, ArrayBase, Data, Ix2};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::SeqError;

/// Supervised samples produced by [`Windower::window`].
///
/// `x()` has shape `(n_samples, seq_length, n_features)` and `y()` has shape
/// `(n_samples, 1)`. Sample `i` covers time steps `[i, i + seq_length)` and
/// is labelled with the target at step `i + seq_length - 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowedSamples {
    x: Array3<f64>,
    y: Array2<f64>,
}

impl WindowedSamples {
    /// Return the windowed feature tensor.
    #[must_use]
    pub fn x(&self) -> &Array3<f64> {
        &self.x
    }

    /// Return the per-window targets.
    #[must_use]
    pub fn y(&self) -> &Array2<f64> {
        &self.y
    }

    /// Return the number of windows.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.x.dim().0
    }

    /// Return the window length.
    #[must_use]
    pub fn seq_length(&self) -> usize {
        self.x.dim().1
    }

    /// Return the number of features per time step.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.x.dim().2
    }

    /// Consume and return `(x, y)`.
    #[must_use]
    pub fn into_parts(self) -> (Array3<f64>, Array2<f64>) {
        (self.x, self.y)
    }
}

/// Immutable windowing configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Windower {
    seq_length: usize,
}

impl Windower {
    /// Create a windower producing sequences of `seq_length` time steps.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`SeqError::InvalidSequenceLength`] | `seq_length` is zero |
    pub fn new(seq_length: usize) -> Result<Self, SeqError> {
        if seq_length == 0 {
            return Err(SeqError::InvalidSequenceLength { seq_length });
        }
        Ok(Self { seq_length })
    }

    /// Return the configured sequence length.
    #[must_use]
    pub fn seq_length(&self) -> usize {
        self.seq_length
    }

    /// Number of windows produced from `n_timesteps` rows, or `None` if the
    /// series is shorter than one window.
    #[must_use]
    pub fn n_windows(&self, n_timesteps: usize) -> Option<usize> {
        (n_timesteps >= self.seq_length).then(|| n_timesteps - self.seq_length + 1)
    }

    /// Slice `x` of shape `(N, F)` and `y` of shape `(N, 1)` into overlapping windows.
    ///
    /// The first `seq_length - 1` time steps only serve as warm-up for the
    /// first window and get no target row of their own.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`SeqError::TargetNotColumn`] | `y` does not have exactly one column |
    /// | [`SeqError::LengthMismatch`] | `x` and `y` have different row counts |
    /// | [`SeqError::SequenceTooLong`] | `seq_length > N` |
    #[instrument(skip(x, y), fields(seq_length = self.seq_length, n_timesteps = x.nrows()))]
    pub fn window<S1, S2>(
        &self,
        x: &ArrayBase<S1, Ix2>,
        y: &ArrayBase<S2, Ix2>,
    ) -> Result<WindowedSamples, SeqError>
    where
        S1: Data<Elem = f64>,
        S2: Data<Elem = f64>,
    {
        if y.ncols() != 1 {
            return Err(SeqError::TargetNotColumn { n_cols: y.ncols() });
        }
        let (n_timesteps, n_features) = x.dim();
        if y.nrows() != n_timesteps {
            return Err(SeqError::LengthMismatch {
                x_rows: n_timesteps,
                y_rows: y.nrows(),
            });
        }
        let n_samples = self
            .n_windows(n_timesteps)
            .ok_or(SeqError::SequenceTooLong {
                seq_length: self.seq_length,
                n_timesteps,
            })?;

        let len = self.seq_length;
        let mut x_windowed = Array3::<f64>::zeros((n_samples, len, n_features));
        for (i, mut sample) in x_windowed.outer_iter_mut().enumerate() {
            sample.assign(&x.slice(s![i..i + len, ..]));
        }
        let y_windowed = y.slice(s![len - 1.., ..]).to_owned();

        debug!(n_samples, n_features, "windowed series");
        Ok(WindowedSamples {
            x: x_windowed,
            y: y_windowed,
        })
    }
}

/// Window `x` and `y` with the given sequence length.
///
/// Shorthand for `Windower::new(seq_length)?.window(x, y)`.
///
/// # Errors
///
/// See [`Windower::new`] and [`Windower::window`].
pub fn window<S1, S2>(
    x: &ArrayBase<S1, Ix2>,
    y: &ArrayBase<S2, Ix2>,
    seq_length: usize,
) -> Result<WindowedSamples, SeqError>
where
    S1: Data<Elem = f64>,
    S2: Data<Elem = f64>,
{
    Windower::new(seq_length)?.window(x, y)
}

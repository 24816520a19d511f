//! Feature scaling and sequence windowing for basin time series.
//!
//! Pure math library with zero I/O. Provides the affine input/output scaler
//! built from fixed reference statistics and the many-to-one windowing that
//! turns aligned `(N, F)` feature and `(N, 1)` target arrays into supervised
//! training samples.

mod error;
mod scaler;
mod window;

pub use error::{ErrorKind, SeqError};
pub use scaler::{Scaler, ScalerConstants, Variable};
pub use window::{window, WindowedSamples, Windower};

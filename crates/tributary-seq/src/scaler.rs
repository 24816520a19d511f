//! Affine input/output scaling with fixed reference statistics.

use std::fmt;
use std::str::FromStr;

use ndarray::{Array, Array1, ArrayBase, Axis, Data, Dimension};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::SeqError;

/// Which side of the model an array belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variable {
    /// Meteorological forcing features, scaled per feature on the last axis.
    Inputs,
    /// Discharge target, scaled with a single mean/std pair.
    Output,
}

impl Variable {
    /// Return the canonical lowercase name (`inputs` or `output`).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inputs => "inputs",
            Self::Output => "output",
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variable {
    type Err = SeqError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inputs" => Ok(Self::Inputs),
            "output" => Ok(Self::Output),
            other => Err(SeqError::UnknownVariable {
                name: other.to_string(),
            }),
        }
    }
}

/// Mean and standard deviation statistics used to build a [`Scaler`].
///
/// These are reference statistics supplied by the caller, never fitted from
/// the data being scaled. [`Default`] returns the published reference values
/// for the six forcing inputs and the discharge output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerConstants {
    /// Per-feature input means, in forcing column order.
    pub input_means: Vec<f64>,
    /// Per-feature input standard deviations, in forcing column order.
    pub input_stds: Vec<f64>,
    /// Output (discharge) mean.
    pub output_mean: f64,
    /// Output (discharge) standard deviation.
    pub output_std: f64,
}

impl Default for ScalerConstants {
    fn default() -> Self {
        Self {
            input_means: vec![59.58, 42.17, 71.14, 2.56, 29.92, 145.11],
            input_stds: vec![18.24, 19.42, 17.38, 3.23, 0.55, 75.52],
            output_mean: 11.587152,
            output_std: 79.574436,
        }
    }
}

/// Immutable affine scaler: `(v - mean) / std` and its inverse.
///
/// Construct via [`Scaler::new`] from a [`ScalerConstants`] value. The
/// scaler is cheap to clone and holds no mutable state.
#[derive(Debug, Clone, PartialEq)]
pub struct Scaler {
    input_means: Array1<f64>,
    input_stds: Array1<f64>,
    output_mean: f64,
    output_std: f64,
}

impl Scaler {
    /// Validate the constants and build a scaler.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`SeqError::ScalerShapeMismatch`] | Means and stds differ in length, or are empty |
    /// | [`SeqError::InvalidScalerStatistic`] | A mean is non-finite, or a std is non-finite or `<= 0` |
    pub fn new(constants: ScalerConstants) -> Result<Self, SeqError> {
        let n_means = constants.input_means.len();
        let n_stds = constants.input_stds.len();
        if n_means != n_stds || n_means == 0 {
            return Err(SeqError::ScalerShapeMismatch { n_means, n_stds });
        }

        check_means("input_means", &constants.input_means)?;
        check_stds("input_stds", &constants.input_stds)?;
        check_means("output_mean", &[constants.output_mean])?;
        check_stds("output_std", &[constants.output_std])?;

        Ok(Self::from_validated(constants))
    }

    fn from_validated(constants: ScalerConstants) -> Self {
        Self {
            input_means: Array1::from(constants.input_means),
            input_stds: Array1::from(constants.input_stds),
            output_mean: constants.output_mean,
            output_std: constants.output_std,
        }
    }

    /// Return the number of input features this scaler expects on the last axis.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.input_means.len()
    }

    /// Return the constants this scaler was built from.
    #[must_use]
    pub fn constants(&self) -> ScalerConstants {
        ScalerConstants {
            input_means: self.input_means.to_vec(),
            input_stds: self.input_stds.to_vec(),
            output_mean: self.output_mean,
            output_std: self.output_std,
        }
    }

    /// Normalize `values` to zero-centered, unit-scaled form.
    ///
    /// For [`Variable::Inputs`] the last axis must have exactly
    /// [`n_features`](Scaler::n_features) entries and each feature is scaled
    /// with its own statistics. For [`Variable::Output`] every element is
    /// scaled with the scalar output statistics, whatever the shape.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`SeqError::FeatureCountMismatch`] | `Inputs` array whose last axis is not the scaler width |
    #[instrument(skip(self, values), fields(shape = ?values.shape()))]
    pub fn normalize<S, D>(
        &self,
        values: &ArrayBase<S, D>,
        variable: Variable,
    ) -> Result<Array<f64, D>, SeqError>
    where
        S: Data<Elem = f64>,
        D: Dimension,
    {
        match variable {
            Variable::Inputs => self.map_inputs(values, |v, mean, std| (v - mean) / std),
            Variable::Output => {
                Ok(values.mapv(|v| (v - self.output_mean) / self.output_std))
            }
        }
    }

    /// Undo [`normalize`](Scaler::normalize) for the same variable.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`SeqError::FeatureCountMismatch`] | `Inputs` array whose last axis is not the scaler width |
    #[instrument(skip(self, values), fields(shape = ?values.shape()))]
    pub fn rescale<S, D>(
        &self,
        values: &ArrayBase<S, D>,
        variable: Variable,
    ) -> Result<Array<f64, D>, SeqError>
    where
        S: Data<Elem = f64>,
        D: Dimension,
    {
        match variable {
            Variable::Inputs => self.map_inputs(values, |v, mean, std| v * std + mean),
            Variable::Output => Ok(values.mapv(|v| v * self.output_std + self.output_mean)),
        }
    }

    fn map_inputs<S, D, F>(&self, values: &ArrayBase<S, D>, f: F) -> Result<Array<f64, D>, SeqError>
    where
        S: Data<Elem = f64>,
        D: Dimension,
        F: Fn(f64, f64, f64) -> f64,
    {
        let got = values.shape().last().copied().unwrap_or(0);
        if values.ndim() == 0 || got != self.n_features() {
            return Err(SeqError::FeatureCountMismatch {
                expected: self.n_features(),
                got,
            });
        }

        let last = Axis(values.ndim() - 1);
        let mut out = values.to_owned();
        for mut lane in out.lanes_mut(last) {
            for ((v, &mean), &std) in lane
                .iter_mut()
                .zip(&self.input_means)
                .zip(&self.input_stds)
            {
                *v = f(*v, mean, std);
            }
        }
        Ok(out)
    }
}

impl Default for Scaler {
    /// A scaler over the reference [`ScalerConstants`].
    fn default() -> Self {
        Self::from_validated(ScalerConstants::default())
    }
}

fn check_means(name: &'static str, values: &[f64]) -> Result<(), SeqError> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(SeqError::InvalidScalerStatistic {
            name,
            index,
            value: values[index],
        }),
        None => Ok(()),
    }
}

fn check_stds(name: &'static str, values: &[f64]) -> Result<(), SeqError> {
    match values.iter().position(|v| !v.is_finite() || *v <= 0.0) {
        Some(index) => Err(SeqError::InvalidScalerStatistic {
            name,
            index,
            value: values[index],
        }),
        None => Ok(()),
    }
}

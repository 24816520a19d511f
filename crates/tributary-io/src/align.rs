//! Date alignment of forcing rows with discharge observations.

use std::collections::HashMap;

use chrono::NaiveDate;
use ndarray::{Array2, Axis};
use tracing::{info, instrument, warn};

use crate::domain::{BasinId, DateRange};
use crate::reader::{DischargeSeries, ForcingTable};
use crate::IoError;

/// Forcing and discharge for one basin, restricted to their common dates.
///
/// `dates[t]` corresponds to row `t` of both `x` (shape `(N, F)`) and
/// `y` (shape `(N, 1)`). Dates are strictly increasing.
#[derive(Debug, Clone, PartialEq)]
pub struct BasinSeries {
    basin_id: BasinId,
    dates: Vec<NaiveDate>,
    feature_names: Vec<String>,
    x: Array2<f64>,
    y: Array2<f64>,
}

impl BasinSeries {
    /// Return the basin ID.
    #[must_use]
    pub fn basin_id(&self) -> &BasinId {
        &self.basin_id
    }

    /// Return the aligned dates.
    #[must_use]
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Return the forcing column names.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Return the `(N, F)` input matrix.
    #[must_use]
    pub fn x(&self) -> &Array2<f64> {
        &self.x
    }

    /// Return the `(N, 1)` target column.
    #[must_use]
    pub fn y(&self) -> &Array2<f64> {
        &self.y
    }

    #[must_use]
    pub fn n_timesteps(&self) -> usize {
        self.dates.len()
    }

    #[must_use]
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }
}

/// Inner-join forcing rows and discharge observations on date.
///
/// Rows are emitted in increasing date order. When `range` is given only
/// dates inside it (inclusive) are kept. Dates present on one side only
/// are dropped with a log message, as long as the surviving dates form one
/// run of consecutive days; windowing treats adjacent rows as adjacent
/// timesteps.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::EmptyIntersection`] | No date survives the join and range filter |
/// | [`IoError::DateGap`] | The surviving dates skip a calendar day |
#[instrument(skip_all, fields(basin = %discharge.basin_id(), n_forcing = forcing.n_timesteps(), n_discharge = discharge.len()))]
pub fn align(
    forcing: &ForcingTable,
    discharge: &DischargeSeries,
    range: Option<DateRange>,
) -> Result<BasinSeries, IoError> {
    let discharge_by_date: HashMap<NaiveDate, f64> = discharge
        .dates()
        .iter()
        .copied()
        .zip(discharge.values().iter().copied())
        .collect();

    let mut order: Vec<usize> = (0..forcing.n_timesteps()).collect();
    order.sort_by_key(|&i| forcing.dates()[i]);

    let mut rows = Vec::new();
    let mut dates = Vec::new();
    let mut targets = Vec::new();
    let mut n_out_of_range = 0usize;
    for i in order {
        let date = forcing.dates()[i];
        if range.is_some_and(|r| !r.contains(date)) {
            n_out_of_range += 1;
            continue;
        }
        if let Some(&q) = discharge_by_date.get(&date) {
            rows.push(i);
            dates.push(date);
            targets.push(q);
        }
    }

    if dates.is_empty() {
        return Err(IoError::EmptyIntersection {
            basin_id: discharge.basin_id().to_string(),
        });
    }

    if let Some(pair) = dates.windows(2).find(|pair| pair[0].succ_opt() != Some(pair[1])) {
        return Err(IoError::DateGap {
            basin_id: discharge.basin_id().to_string(),
            before: pair[0],
            after: pair[1],
        });
    }

    let n_unmatched_forcing = forcing.n_timesteps() - n_out_of_range - dates.len();
    if n_unmatched_forcing > 0 {
        warn!(n_unmatched_forcing, "dropped forcing rows without discharge");
    }
    let n_unmatched_discharge = discharge.len() - dates.len();
    if n_unmatched_discharge > 0 {
        info!(n_unmatched_discharge, "discharge dates outside aligned window");
    }

    let x = forcing.values().select(Axis(0), &rows);
    let n = targets.len();
    let y = Array2::from_shape_fn((n, 1), |(t, _)| targets[t]);

    info!(n_aligned = n, "alignment complete");
    Ok(BasinSeries {
        basin_id: discharge.basin_id().clone(),
        dates,
        feature_names: forcing.columns().to_vec(),
        x,
        y,
    })
}

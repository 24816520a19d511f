//! Domain types for tributary-io.

use chrono::NaiveDate;

use crate::IoError;

/// Width of a canonical basin identifier.
const BASIN_ID_WIDTH: usize = 5;

/// A basin identifier: exactly five ASCII digits, left-padded with `0`.
///
/// All per-basin lookups (attributes, station mapping, discharge rows) key on
/// this form, so every identifier read from a file goes through
/// [`BasinId::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BasinId(String);

impl BasinId {
    /// Parse a raw identifier, coercing it to the zero-padded 5-character form.
    ///
    /// Surrounding whitespace is ignored. Already-canonical input is returned
    /// unchanged, so parsing is idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidBasinId`] if the trimmed input is empty,
    /// longer than five characters, or contains a non-digit.
    pub fn parse(raw: &str) -> Result<Self, IoError> {
        let trimmed = raw.trim();
        if trimmed.is_empty()
            || trimmed.len() > BASIN_ID_WIDTH
            || !trimmed.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(IoError::InvalidBasinId {
                raw: raw.to_string(),
            });
        }
        Ok(Self(format!("{trimmed:0>width$}", width = BASIN_ID_WIDTH)))
    }

    /// Return the basin ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BasinId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for BasinId {
    type Err = IoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Name of the forcing-data station a basin maps to. Also the stem of the
/// basin's forcing file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StationName(String);

impl StationName {
    pub(crate) fn new(name: String) -> Self {
        Self(name)
    }

    /// Return the station name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StationName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated experiment name for output file naming.
///
/// Must match `[a-zA-Z0-9_-]+`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentName(String);

impl ExperimentName {
    /// Parse and validate an experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidExperimentName`] if the name is empty or
    /// contains characters outside `[a-zA-Z0-9_-]`.
    pub fn new(name: String) -> Result<Self, IoError> {
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(IoError::InvalidExperimentName { name });
        }
        Ok(Self(name))
    }

    /// Return the experiment name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ExperimentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Create a range covering `start..=end`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidDateRange`] if `start` is after `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, IoError> {
        if start > end {
            return Err(IoError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Return the first date in the range.
    #[must_use]
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Return the last date in the range.
    #[must_use]
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Return true if `date` lies within the range.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basin_id_pads_short_codes() {
        assert_eq!(BasinId::parse("1").unwrap().as_str(), "00001");
        assert_eq!(BasinId::parse("1001").unwrap().as_str(), "01001");
        assert_eq!(BasinId::parse(" 42 ").unwrap().as_str(), "00042");
    }

    #[test]
    fn basin_id_keeps_full_width_codes() {
        assert_eq!(BasinId::parse("36061").unwrap().as_str(), "36061");
        assert_eq!(BasinId::parse("00000").unwrap().as_str(), "00000");
    }

    #[test]
    fn basin_id_parse_is_idempotent() {
        for raw in ["7", "70", "700", "7000", "70000"] {
            let once = BasinId::parse(raw).unwrap();
            let twice = BasinId::parse(once.as_str()).unwrap();
            assert_eq!(once, twice);
            assert_eq!(once.as_str().len(), 5);
        }
    }

    #[test]
    fn basin_id_rejects_bad_input() {
        for raw in ["", "   ", "123456", "12a45", "-1", "1.0"] {
            let err = BasinId::parse(raw).unwrap_err();
            assert!(matches!(err, IoError::InvalidBasinId { .. }), "{raw:?}");
        }
    }

    #[test]
    fn experiment_name_valid() {
        let name = ExperimentName::new("seqlen14_seed11111".to_string());
        assert!(name.is_ok());
        assert_eq!(name.unwrap().as_str(), "seqlen14_seed11111");
    }

    #[test]
    fn experiment_name_rejects_special_chars() {
        let name = ExperimentName::new("run 1/2".to_string());
        assert!(matches!(name, Err(IoError::InvalidExperimentName { .. })));
        let name = ExperimentName::new(String::new());
        assert!(matches!(name, Err(IoError::InvalidExperimentName { .. })));
    }

    #[test]
    fn date_range_bounds_are_inclusive() {
        let start = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2020, 3, 31).unwrap();
        let range = DateRange::new(start, end).unwrap();
        assert!(range.contains(start));
        assert!(range.contains(end));
        assert!(!range.contains(end.succ_opt().unwrap()));
    }

    #[test]
    fn date_range_rejects_reversed_bounds() {
        let start = NaiveDate::from_ymd_opt(2020, 4, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
        assert!(matches!(
            DateRange::new(start, end),
            Err(IoError::InvalidDateRange { .. })
        ));
    }
}

//! Basin identifier to forcing-station name mapping.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{info, instrument};

use crate::csv_source::CsvSource;
use crate::domain::{BasinId, StationName};
use crate::IoError;

/// One-directional lookup from [`BasinId`] to [`StationName`].
///
/// Read from a two-column CSV (numeric code, station name). Nothing is cached
/// between reads: callers resolving many basins should read once and share
/// the map.
#[derive(Debug, Clone)]
pub struct StationMap {
    path: PathBuf,
    stations: HashMap<BasinId, StationName>,
}

impl StationMap {
    /// Read the mapping file at `path`.
    ///
    /// `code_column` holds the numeric basin code (coerced to a zero-padded
    /// [`BasinId`]); `station_column` holds the station name.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
    /// | [`IoError::MissingColumn`] | Either named column is absent |
    /// | [`IoError::CsvParse`] / [`IoError::InconsistentRowLength`] | Malformed rows |
    /// | [`IoError::InvalidBasinId`] | A code is not 1 to 5 digits |
    /// | [`IoError::DuplicateBasinId`] | A code appears twice |
    /// | [`IoError::EmptyDataset`] | Zero data rows |
    #[instrument(fields(path = %path.display()))]
    pub fn read(path: &Path, code_column: &str, station_column: &str) -> Result<Self, IoError> {
        let mut src = CsvSource::open(path)?;
        let code_idx = src.column_index(code_column)?;
        let station_idx = src.column_index(station_column)?;

        let mut stations = HashMap::new();
        let mut first_seen: HashMap<BasinId, usize> = HashMap::new();

        for row in src.records() {
            let (row_index, record) = row?;
            let basin_id = BasinId::parse(&record[code_idx])?;
            if let Some(&first_row) = first_seen.get(&basin_id) {
                return Err(IoError::DuplicateBasinId {
                    path: path.to_path_buf(),
                    basin_id: basin_id.to_string(),
                    first_row,
                    second_row: row_index,
                });
            }
            first_seen.insert(basin_id.clone(), row_index);
            stations.insert(basin_id, StationName::new(record[station_idx].to_string()));
        }

        if stations.is_empty() {
            return Err(IoError::EmptyDataset {
                path: path.to_path_buf(),
            });
        }

        info!(n_stations = stations.len(), "station mapping loaded");
        Ok(Self {
            path: path.to_path_buf(),
            stations,
        })
    }

    /// Return the station for `basin_id`, if mapped.
    #[must_use]
    pub fn station(&self, basin_id: &BasinId) -> Option<&StationName> {
        self.stations.get(basin_id)
    }

    /// Return the station for `basin_id`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::StationNotMapped`] if the basin has no entry.
    pub fn resolve(&self, basin_id: &BasinId) -> Result<&StationName, IoError> {
        self.station(basin_id).ok_or_else(|| IoError::StationNotMapped {
            basin_id: basin_id.to_string(),
            path: self.path.clone(),
        })
    }

    /// Return the number of mapped basins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stations.len()
    }

    /// Return true if no basins are mapped. Always `false` for a map built by
    /// [`StationMap::read`], which rejects empty files.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    /// Iterate over `(basin, station)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&BasinId, &StationName)> {
        self.stations.iter()
    }
}

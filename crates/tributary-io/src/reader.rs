//! Forcing and discharge time series readers with full input validation.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use ndarray::Array2;
use tracing::{debug, info, instrument};

use crate::csv_source::{parse_finite, CsvSource};
use crate::domain::{BasinId, StationName};
use crate::layout::DataLayout;
use crate::station_map::StationMap;
use crate::IoError;

/// Catchment area reported alongside forcing data. Discharge is not
/// area-normalized, so the value is a fixed placeholder.
const AREA_PLACEHOLDER: f64 = 1.0;

/// Length of the file extension (including the dot) stripped before
/// comparing a forcing file name with its station name.
const EXTENSION_LEN: usize = 4;

/// Parse a calendar date in `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS`, `M/D/YYYY`
/// or `M/D/YY` form.
#[must_use]
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(datetime) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(datetime.date());
    }
    let format = match raw.rsplit('/').next()?.len() {
        2 => "%m/%d/%y",
        4 => "%m/%d/%Y",
        _ => return None,
    };
    NaiveDate::parse_from_str(raw, format).ok()
}

/// Date-indexed meteorological forcing for one basin.
///
/// `values()` has shape `(n_timesteps, n_features)`; row `t` holds the
/// forcing observed on `dates()[t]`, columns follow `columns()`.
#[derive(Debug, Clone, PartialEq)]
pub struct ForcingTable {
    path: PathBuf,
    dates: Vec<NaiveDate>,
    columns: Vec<String>,
    values: Array2<f64>,
}

impl ForcingTable {
    /// Return the file the table was read from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Return the row dates, in file order.
    #[must_use]
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Return the forcing variable names.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Return the `(n_timesteps, n_features)` value matrix.
    #[must_use]
    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Return the number of rows.
    #[must_use]
    pub fn n_timesteps(&self) -> usize {
        self.dates.len()
    }
}

/// Forcing table plus the catchment area reported with it.
#[derive(Debug, Clone, PartialEq)]
pub struct Forcing {
    /// The forcing rows.
    pub table: ForcingTable,
    /// Catchment area. Always `1.0`; not used for normalization.
    pub area: f64,
}

/// Observed discharge for one basin, indexed by date.
#[derive(Debug, Clone, PartialEq)]
pub struct DischargeSeries {
    basin_id: BasinId,
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl DischargeSeries {
    /// Return the basin this series belongs to.
    #[must_use]
    pub fn basin_id(&self) -> &BasinId {
        &self.basin_id
    }

    /// Return the observation dates, in file column order.
    #[must_use]
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Return the observed values, parallel to `dates()`.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Return the number of observations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Return true if there are no observations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Loads per-basin forcing and discharge series from a [`DataLayout`].
///
/// Every call reads its files fresh; nothing is cached between calls.
#[derive(Debug, Clone)]
pub struct TimeSeriesLoader {
    layout: DataLayout,
    forcing_columns: Option<Vec<String>>,
}

impl TimeSeriesLoader {
    /// Create a loader over `layout`, reading every non-date forcing column.
    #[must_use]
    pub fn new(layout: DataLayout) -> Self {
        Self {
            layout,
            forcing_columns: None,
        }
    }

    /// Read only these forcing columns, in this order.
    #[must_use]
    pub fn with_forcing_columns(mut self, columns: Vec<String>) -> Self {
        self.forcing_columns = Some(columns);
        self
    }

    /// Return the layout.
    #[must_use]
    pub fn layout(&self) -> &DataLayout {
        &self.layout
    }

    /// Read the layout's basin-to-station mapping file.
    ///
    /// # Errors
    ///
    /// See [`StationMap::read`].
    pub fn read_station_map(&self) -> Result<StationMap, IoError> {
        StationMap::read(
            &self.layout.mapping_path(),
            self.layout.id_column(),
            self.layout.station_column(),
        )
    }

    /// Load the forcing table for `basin_id`, reading the station mapping first.
    ///
    /// Use [`load_forcing_with`](TimeSeriesLoader::load_forcing_with) to reuse
    /// one mapping across many basins.
    ///
    /// # Errors
    ///
    /// See [`StationMap::read`] and [`load_forcing_with`](TimeSeriesLoader::load_forcing_with).
    pub fn load_forcing(&self, basin_id: &BasinId) -> Result<Forcing, IoError> {
        let stations = self.read_station_map()?;
        self.load_forcing_with(&stations, basin_id)
    }

    /// Load the forcing table for `basin_id` using an already-read mapping.
    ///
    /// The forcing directory must contain exactly one file named after the
    /// basin's station plus a 4-character extension (e.g. `USW00013876.csv`).
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::StationNotMapped`] | Basin absent from the mapping |
    /// | [`IoError::FileNotFound`] | Forcing directory or file unreadable |
    /// | [`IoError::ForcingFileNotFound`] | No file matches the station |
    /// | [`IoError::AmbiguousForcingFile`] | Two or more files match the station |
    /// | [`IoError::MissingColumn`] | Date column or a selected forcing column absent |
    /// | [`IoError::InvalidDate`] | A date cell does not parse |
    /// | [`IoError::DuplicateDate`] | A date appears twice |
    /// | [`IoError::NonFiniteValue`] | A forcing cell is NaN, Inf, or not a number |
    /// | [`IoError::EmptyDataset`] | Zero data rows |
    #[instrument(skip(self, stations, basin_id), fields(basin = %basin_id))]
    pub fn load_forcing_with(
        &self,
        stations: &StationMap,
        basin_id: &BasinId,
    ) -> Result<Forcing, IoError> {
        let station = stations.resolve(basin_id)?;
        let path = self.find_forcing_file(basin_id, station)?;
        let table = self.read_forcing_file(&path)?;
        Ok(Forcing {
            table,
            area: AREA_PLACEHOLDER,
        })
    }

    fn find_forcing_file(
        &self,
        basin_id: &BasinId,
        station: &StationName,
    ) -> Result<PathBuf, IoError> {
        let dir = self.layout.forcing_dir();
        let entries = fs::read_dir(&dir).map_err(|e| IoError::FileNotFound {
            path: dir.clone(),
            source: e,
        })?;

        let mut candidates = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| IoError::FileNotFound {
                path: dir.clone(),
                source: e,
            })?;
            let path = entry.path();
            if path.is_file()
                && entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| stem_matches(name, station.as_str()))
            {
                candidates.push(path);
            }
        }
        candidates.sort();

        match candidates.len() {
            0 => Err(IoError::ForcingFileNotFound {
                basin_id: basin_id.to_string(),
                station: station.to_string(),
                dir,
            }),
            1 => Ok(candidates.remove(0)),
            _ => Err(IoError::AmbiguousForcingFile {
                basin_id: basin_id.to_string(),
                station: station.to_string(),
                candidates,
            }),
        }
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    fn read_forcing_file(&self, path: &Path) -> Result<ForcingTable, IoError> {
        let mut src = CsvSource::open(path)?;
        let date_idx = src.column_index(self.layout.date_column())?;

        let feature_idx: Vec<usize> = match &self.forcing_columns {
            Some(columns) => columns
                .iter()
                .map(|c| src.column_index(c))
                .collect::<Result<_, _>>()?,
            None => (0..src.headers().len()).filter(|&i| i != date_idx).collect(),
        };
        let columns: Vec<String> = feature_idx
            .iter()
            .map(|&i| src.headers()[i].clone())
            .collect();

        let mut dates = Vec::new();
        let mut seen = HashSet::new();
        let mut flat = Vec::new();

        for row in src.records() {
            let (row_index, record) = row?;
            let raw_date = &record[date_idx];
            let date = parse_date(raw_date).ok_or_else(|| IoError::InvalidDate {
                path: path.to_path_buf(),
                raw: raw_date.to_string(),
            })?;
            if !seen.insert(date) {
                return Err(IoError::DuplicateDate {
                    path: path.to_path_buf(),
                    date,
                });
            }
            for (&i, column) in feature_idx.iter().zip(&columns) {
                flat.push(parse_finite(path, row_index, column, &record[i])?);
            }
            dates.push(date);
        }

        if dates.is_empty() {
            return Err(IoError::EmptyDataset {
                path: path.to_path_buf(),
            });
        }

        let mut values = Array2::<f64>::zeros((dates.len(), columns.len()));
        if !columns.is_empty() {
            for (mut row, chunk) in values.rows_mut().into_iter().zip(flat.chunks(columns.len())) {
                row.assign(&ndarray::ArrayView1::from(chunk));
            }
        }

        info!(
            n_timesteps = dates.len(),
            n_features = columns.len(),
            "forcing loaded"
        );
        Ok(ForcingTable {
            path: path.to_path_buf(),
            dates,
            columns,
            values,
        })
    }

    /// Load the discharge series for `basin_id` from the wide discharge file.
    ///
    /// The file has one row per basin and one column per date; the
    /// identifier column is coerced to zero-padded form before matching.
    /// Columns whose header is not a date are ignored, as are rows whose
    /// identifier is not a valid basin code. `area` is accepted alongside
    /// the forcing output but discharge is returned in its native units.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::FileNotFound`] | Discharge file unreadable |
    /// | [`IoError::MissingColumn`] | Identifier column absent |
    /// | [`IoError::EmptyDataset`] | No date columns in the header |
    /// | [`IoError::DuplicateDate`] | Two header columns name the same date |
    /// | [`IoError::BasinNotFound`] | No row for `basin_id` |
    /// | [`IoError::DuplicateBasinId`] | Two rows for `basin_id` |
    /// | [`IoError::NonFiniteValue`] | A discharge cell is NaN, Inf, or not a number |
    #[instrument(skip(self, basin_id), fields(basin = %basin_id))]
    pub fn load_discharge(&self, basin_id: &BasinId, area: f64) -> Result<DischargeSeries, IoError> {
        let path = self.layout.discharge_path();
        let mut src = CsvSource::open(&path)?;
        let id_idx = src.column_index(self.layout.id_column())?;

        let mut date_columns: Vec<(usize, NaiveDate)> = Vec::new();
        let mut seen = HashSet::new();
        for (i, header) in src.headers().iter().enumerate() {
            if i == id_idx {
                continue;
            }
            match parse_date(header) {
                Some(date) => {
                    if !seen.insert(date) {
                        return Err(IoError::DuplicateDate { path, date });
                    }
                    date_columns.push((i, date));
                }
                None => debug!(column = %header, "skipping non-date discharge column"),
            }
        }
        if date_columns.is_empty() {
            return Err(IoError::EmptyDataset { path });
        }

        let mut found: Option<(usize, Vec<f64>)> = None;
        let mut n_skipped = 0usize;
        for row in src.records() {
            let (row_index, record) = row?;
            let Ok(row_basin) = BasinId::parse(&record[id_idx]) else {
                n_skipped += 1;
                continue;
            };
            if &row_basin != basin_id {
                continue;
            }
            if let Some((first_row, _)) = &found {
                return Err(IoError::DuplicateBasinId {
                    path,
                    basin_id: basin_id.to_string(),
                    first_row: *first_row,
                    second_row: row_index,
                });
            }
            let values = date_columns
                .iter()
                .map(|&(i, date)| parse_finite(&path, row_index, &date.to_string(), &record[i]))
                .collect::<Result<Vec<_>, _>>()?;
            found = Some((row_index, values));
        }
        if n_skipped > 0 {
            debug!(n_skipped, "skipped discharge rows without a valid basin code");
        }

        let (_, values) = found.ok_or_else(|| IoError::BasinNotFound {
            basin_id: basin_id.to_string(),
            path: path.clone(),
        })?;

        info!(n_timesteps = values.len(), area, "discharge loaded");
        Ok(DischargeSeries {
            basin_id: basin_id.clone(),
            dates: date_columns.into_iter().map(|(_, date)| date).collect(),
            values,
        })
    }
}

fn stem_matches(file_name: &str, station: &str) -> bool {
    let Some(split) = file_name.len().checked_sub(EXTENSION_LEN) else {
        return false;
    };
    file_name.is_char_boundary(split)
        && file_name[split..].starts_with('.')
        && &file_name[..split] == station
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    struct Fixture {
        dir: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            fs::create_dir(dir.path().join("envirodata")).unwrap();
            fs::write(
                dir.path().join("fips_stn.csv"),
                "FIPS,stn\n1001,ALPHA\n2002,BRAVO\n3003,CHARLIE\n",
            )
            .unwrap();
            fs::write(
                dir.path().join("dailycases.csv"),
                "FIPS,County,1/22/20,1/23/20,1/24/20\n\
                 1001,Autauga,1,2,4\n\
                 2002,Bravo,0,0,3.5\n\
                 Unassigned,None,9,9,9\n",
            )
            .unwrap();
            Self { dir }
        }

        fn forcing(&self, name: &str, content: &str) {
            fs::write(self.dir.path().join("envirodata").join(name), content).unwrap();
        }

        fn loader(&self) -> TimeSeriesLoader {
            TimeSeriesLoader::new(DataLayout::new(self.dir.path()))
        }
    }

    fn basin(raw: &str) -> BasinId {
        BasinId::parse(raw).unwrap()
    }

    #[test]
    fn parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2020, 1, 22).unwrap();
        assert_eq!(parse_date("2020-01-22"), Some(expected));
        assert_eq!(parse_date("2020-01-22 00:00:00"), Some(expected));
        assert_eq!(parse_date("1/22/2020"), Some(expected));
        assert_eq!(parse_date("1/22/20"), Some(expected));
        assert_eq!(parse_date("01/22/20"), Some(expected));
        assert_eq!(parse_date("County"), None);
        assert_eq!(parse_date("FIPS"), None);
        assert_eq!(parse_date("2020-13-01"), None);
    }

    #[test]
    fn stem_matching_requires_four_char_extension() {
        assert!(stem_matches("ALPHA.csv", "ALPHA"));
        assert!(stem_matches("ALPHA.txt", "ALPHA"));
        assert!(!stem_matches("ALPHA.xlsx", "ALPHA"));
        assert!(!stem_matches("ALPHA2.csv", "ALPHA"));
        assert!(!stem_matches("ALPHA", "ALPHA"));
        assert!(!stem_matches(".csv", "ALPHA"));
    }

    #[test]
    fn load_forcing_reads_matching_file() {
        let fx = Fixture::new();
        fx.forcing(
            "ALPHA.csv",
            "Date,prcp,tmax\n2020-01-22,1.0,10.0\n2020-01-23,2.0,11.0\n",
        );
        fx.forcing("BRAVO.csv", "Date,prcp,tmax\n2020-01-22,9.0,9.0\n");

        let forcing = fx.loader().load_forcing(&basin("1001")).unwrap();
        assert_eq!(forcing.area, 1.0);
        assert_eq!(forcing.table.columns(), &["prcp", "tmax"]);
        assert_eq!(forcing.table.n_timesteps(), 2);
        assert_eq!(
            forcing.table.values(),
            &ndarray::array![[1.0, 10.0], [2.0, 11.0]]
        );
        assert!(forcing.table.path().ends_with("ALPHA.csv"));
    }

    #[test]
    fn load_forcing_selects_columns_in_order() {
        let fx = Fixture::new();
        fx.forcing("ALPHA.csv", "prcp,Date,tmax\n1.0,2020-01-22,10.0\n");
        let loader = fx
            .loader()
            .with_forcing_columns(vec!["tmax".into(), "prcp".into()]);
        let forcing = loader.load_forcing(&basin("1001")).unwrap();
        assert_eq!(forcing.table.columns(), &["tmax", "prcp"]);
        assert_eq!(forcing.table.values(), &ndarray::array![[10.0, 1.0]]);
    }

    #[test]
    fn load_forcing_missing_selected_column() {
        let fx = Fixture::new();
        fx.forcing("ALPHA.csv", "Date,prcp\n2020-01-22,1.0\n");
        let loader = fx.loader().with_forcing_columns(vec!["srad".into()]);
        let err = loader.load_forcing(&basin("1001")).unwrap_err();
        assert!(matches!(err, IoError::MissingColumn { ref column, .. } if column == "srad"));
        assert_eq!(err.kind(), tributary_seq::ErrorKind::InvalidArgument);
    }

    #[test]
    fn load_forcing_no_file_is_not_found() {
        let fx = Fixture::new();
        fx.forcing("BRAVO.csv", "Date,prcp\n2020-01-22,1.0\n");
        let err = fx.loader().load_forcing(&basin("1001")).unwrap_err();
        assert!(matches!(err, IoError::ForcingFileNotFound { ref station, .. } if station == "ALPHA"));
        assert_eq!(err.kind(), tributary_seq::ErrorKind::NotFound);
    }

    #[test]
    fn load_forcing_two_files_is_conflict() {
        let fx = Fixture::new();
        fx.forcing("ALPHA.csv", "Date,prcp\n2020-01-22,1.0\n");
        fx.forcing("ALPHA.txt", "Date,prcp\n2020-01-22,1.0\n");
        let err = fx.loader().load_forcing(&basin("1001")).unwrap_err();
        match err {
            IoError::AmbiguousForcingFile { ref candidates, .. } => {
                assert_eq!(candidates.len(), 2);
            }
            ref other => panic!("expected AmbiguousForcingFile, got {other:?}"),
        }
        assert_eq!(err.kind(), tributary_seq::ErrorKind::Conflict);
    }

    #[test]
    fn load_forcing_unmapped_basin() {
        let fx = Fixture::new();
        let err = fx.loader().load_forcing(&basin("9999")).unwrap_err();
        assert!(matches!(err, IoError::StationNotMapped { .. }));
    }

    #[test]
    fn load_forcing_rejects_bad_rows() {
        let fx = Fixture::new();
        fx.forcing("ALPHA.csv", "Date,prcp\nyesterday,1.0\n");
        let err = fx.loader().load_forcing(&basin("1001")).unwrap_err();
        assert!(matches!(err, IoError::InvalidDate { .. }));

        fx.forcing("ALPHA.csv", "Date,prcp\n2020-01-22,1.0\n2020-01-22,2.0\n");
        let err = fx.loader().load_forcing(&basin("1001")).unwrap_err();
        assert!(matches!(err, IoError::DuplicateDate { .. }));

        fx.forcing("ALPHA.csv", "Date,prcp\n2020-01-22,NaN\n");
        let err = fx.loader().load_forcing(&basin("1001")).unwrap_err();
        assert!(matches!(err, IoError::NonFiniteValue { ref column, .. } if column == "prcp"));

        fx.forcing("ALPHA.csv", "Date,prcp\n");
        let err = fx.loader().load_forcing(&basin("1001")).unwrap_err();
        assert!(matches!(err, IoError::EmptyDataset { .. }));
    }

    #[test]
    fn load_discharge_selects_row_and_skips_non_dates() {
        let fx = Fixture::new();
        let series = fx.loader().load_discharge(&basin("01001"), 1.0).unwrap();
        assert_eq!(series.basin_id().as_str(), "01001");
        assert_eq!(series.values(), &[1.0, 2.0, 4.0]);
        assert_eq!(series.len(), 3);
        assert_eq!(
            series.dates()[2],
            NaiveDate::from_ymd_opt(2020, 1, 24).unwrap()
        );
    }

    #[test]
    fn load_discharge_missing_basin_is_not_found() {
        let fx = Fixture::new();
        let err = fx.loader().load_discharge(&basin("3003"), 1.0).unwrap_err();
        assert!(matches!(err, IoError::BasinNotFound { ref basin_id, .. } if basin_id == "03003"));
        assert_eq!(err.kind(), tributary_seq::ErrorKind::NotFound);
    }

    #[test]
    fn load_discharge_duplicate_rows_rejected() {
        let fx = Fixture::new();
        fs::write(
            fx.dir.path().join("dailycases.csv"),
            "FIPS,1/22/20\n1001,1\n01001,2\n",
        )
        .unwrap();
        let err = fx.loader().load_discharge(&basin("1001"), 1.0).unwrap_err();
        assert!(matches!(err, IoError::DuplicateBasinId { .. }));
    }

    #[test]
    fn load_discharge_missing_file() {
        let fx = Fixture::new();
        let loader = TimeSeriesLoader::new(
            DataLayout::new(fx.dir.path()).with_discharge_file("absent.csv"),
        );
        let err = loader.load_discharge(&basin("1001"), 1.0).unwrap_err();
        assert!(matches!(err, IoError::FileNotFound { .. }));
    }
}

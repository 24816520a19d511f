//! On-disk layout of a basin dataset.

use std::path::{Path, PathBuf};

/// Where the files of a basin dataset live, relative to a data root.
///
/// Construct via [`DataLayout::new`], then chain `with_*` methods to override defaults.
///
/// # Defaults
///
/// | Parameter         | Default          |
/// |-------------------|------------------|
/// | `forcing_dir`     | `envirodata`     |
/// | `discharge_file`  | `dailycases.csv` |
/// | `attributes_file` | `demo.csv`       |
/// | `mapping_file`    | `fips_stn.csv`   |
/// | `id_column`       | `FIPS`           |
/// | `station_column`  | `stn`            |
/// | `date_column`     | `Date`           |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLayout {
    root: PathBuf,
    forcing_dir: PathBuf,
    discharge_file: PathBuf,
    attributes_file: PathBuf,
    mapping_file: PathBuf,
    id_column: String,
    station_column: String,
    date_column: String,
}

impl DataLayout {
    /// Create a layout rooted at `root` with the default file names.
    #[must_use]
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            forcing_dir: PathBuf::from("envirodata"),
            discharge_file: PathBuf::from("dailycases.csv"),
            attributes_file: PathBuf::from("demo.csv"),
            mapping_file: PathBuf::from("fips_stn.csv"),
            id_column: "FIPS".to_string(),
            station_column: "stn".to_string(),
            date_column: "Date".to_string(),
        }
    }

    /// Set the forcing subdirectory (relative to the root unless absolute).
    #[must_use]
    pub fn with_forcing_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.forcing_dir = dir.into();
        self
    }

    /// Set the discharge file (relative to the root unless absolute).
    #[must_use]
    pub fn with_discharge_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.discharge_file = file.into();
        self
    }

    /// Set the attribute source file (relative to the root unless absolute).
    #[must_use]
    pub fn with_attributes_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.attributes_file = file.into();
        self
    }

    /// Set the basin-to-station mapping file (relative to the root unless absolute).
    #[must_use]
    pub fn with_mapping_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.mapping_file = file.into();
        self
    }

    /// Set the basin identifier column name used by the discharge and mapping files.
    #[must_use]
    pub fn with_id_column(mut self, column: impl Into<String>) -> Self {
        self.id_column = column.into();
        self
    }

    /// Set the station name column of the mapping file.
    #[must_use]
    pub fn with_station_column(mut self, column: impl Into<String>) -> Self {
        self.station_column = column.into();
        self
    }

    /// Set the date column of the forcing files.
    #[must_use]
    pub fn with_date_column(mut self, column: impl Into<String>) -> Self {
        self.date_column = column.into();
        self
    }

    /// Return the data root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Return the resolved forcing directory.
    #[must_use]
    pub fn forcing_dir(&self) -> PathBuf {
        self.root.join(&self.forcing_dir)
    }

    /// Return the resolved discharge file path.
    #[must_use]
    pub fn discharge_path(&self) -> PathBuf {
        self.root.join(&self.discharge_file)
    }

    /// Return the resolved attribute source path.
    #[must_use]
    pub fn attributes_path(&self) -> PathBuf {
        self.root.join(&self.attributes_file)
    }

    /// Return the resolved mapping file path.
    #[must_use]
    pub fn mapping_path(&self) -> PathBuf {
        self.root.join(&self.mapping_file)
    }

    /// Return the basin identifier column name.
    #[must_use]
    pub fn id_column(&self) -> &str {
        &self.id_column
    }

    /// Return the station name column name.
    #[must_use]
    pub fn station_column(&self) -> &str {
        &self.station_column
    }

    /// Return the forcing date column name.
    #[must_use]
    pub fn date_column(&self) -> &str {
        &self.date_column
    }
}

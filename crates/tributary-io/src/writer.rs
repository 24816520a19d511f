//! Experiment artifacts: per-basin sample archives plus JSON manifest and attributes.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info, instrument};
use tributary_seq::ScalerConstants;

use crate::align::BasinSeries;
use crate::archive::SampleArchive;
use crate::attribute_store::{AttributeColumn, AttributeTable, AttributeValue};
use crate::domain::ExperimentName;
use crate::IoError;

/// One basin's line in the experiment manifest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManifestEntry {
    /// Zero-padded basin ID.
    pub basin_id: String,
    /// Aligned timesteps before windowing.
    pub n_timesteps: usize,
    /// Windowed samples written to the archive.
    pub n_samples: usize,
    /// Forcing columns, in feature-axis order.
    pub feature_names: Vec<String>,
    /// Target date of the first window.
    pub first_target: Option<NaiveDate>,
    /// Target date of the last window.
    pub last_target: Option<NaiveDate>,
}

impl ManifestEntry {
    /// Summarize an archive cut from `series`.
    #[must_use]
    pub fn new(series: &BasinSeries, archive: &SampleArchive) -> Self {
        Self {
            basin_id: archive.basin_id().to_string(),
            n_timesteps: series.n_timesteps(),
            n_samples: archive.samples().n_samples(),
            feature_names: archive.feature_names().to_vec(),
            first_target: archive.target_dates().first().copied(),
            last_target: archive.target_dates().last().copied(),
        }
    }
}

/// Writes experiment artifacts into one output directory.
///
/// Creates the output directory on construction if it does not exist.
/// Output files are named `{experiment}_{basin}.bin`,
/// `{experiment}_manifest.json` and `{experiment}_attributes.json`.
pub struct SampleWriter {
    output_dir: PathBuf,
    experiment: ExperimentName,
}

impl SampleWriter {
    /// Create a new writer targeting the given directory and experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display(), experiment = %experiment))]
    pub fn new(output_dir: &Path, experiment: ExperimentName) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            experiment,
        })
    }

    /// Return the path the archive for `basin_id` is written to.
    #[must_use]
    pub fn archive_path(&self, basin_id: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}_{basin_id}.bin", self.experiment.as_str()))
    }

    /// Write a basin's samples to `{experiment}_{basin}.bin` and return the path.
    ///
    /// # Errors
    ///
    /// See [`SampleArchive::save`].
    pub fn write_samples(&self, archive: &SampleArchive) -> Result<PathBuf, IoError> {
        let path = self.archive_path(archive.basin_id());
        archive.save(&path)?;
        Ok(path)
    }

    /// Write the run manifest to `{experiment}_manifest.json`.
    ///
    /// Records the window length and scaler constants the archives were
    /// produced with, so a consumer can invert the output scaling.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::EncodeJson`] | JSON encoding failed |
    /// | [`IoError::WriteFile`] | file write failed |
    #[instrument(skip_all, fields(n_basins = entries.len()))]
    pub fn write_manifest(
        &self,
        entries: &[ManifestEntry],
        seq_length: usize,
        scaler: &ScalerConstants,
    ) -> Result<PathBuf, IoError> {
        let artifact = ManifestArtifact {
            experiment: self.experiment.as_str(),
            seq_length,
            n_basins: entries.len(),
            n_samples: entries.iter().map(|e| e.n_samples).sum(),
            scaler,
            basins: entries,
        };
        let path = self.write_json("manifest", &artifact)?;
        info!(path = %path.display(), "manifest written");
        Ok(path)
    }

    /// Write a loaded attribute table to `{experiment}_attributes.json`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::EncodeJson`] | JSON encoding failed |
    /// | [`IoError::WriteFile`] | file write failed |
    #[instrument(skip_all, fields(n_basins = table.n_basins(), n_columns = table.n_columns()))]
    pub fn write_attributes(&self, table: &AttributeTable) -> Result<PathBuf, IoError> {
        let names = table.column_names();
        let basins: BTreeMap<&str, BTreeMap<&str, &AttributeValue>> = table
            .basin_ids()
            .iter()
            .zip(table.rows())
            .map(|(id, row)| (id.as_str(), names.iter().copied().zip(row).collect()))
            .collect();

        let artifact = AttributesArtifact {
            experiment: self.experiment.as_str(),
            n_basins: table.n_basins(),
            columns: table.columns(),
            basins,
        };
        let path = self.write_json("attributes", &artifact)?;
        info!(path = %path.display(), "attributes written");
        Ok(path)
    }

    fn write_json<T: Serialize>(&self, suffix: &str, artifact: &T) -> Result<PathBuf, IoError> {
        let path = self
            .output_dir
            .join(format!("{}_{suffix}.json", self.experiment.as_str()));
        let json = serde_json::to_string_pretty(artifact).map_err(|e| IoError::EncodeJson {
            path: path.clone(),
            source: e,
        })?;
        fs::write(&path, &json).map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;
        Ok(path)
    }
}

#[derive(Serialize)]
struct ManifestArtifact<'a> {
    experiment: &'a str,
    seq_length: usize,
    n_basins: usize,
    n_samples: usize,
    scaler: &'a ScalerConstants,
    basins: &'a [ManifestEntry],
}

#[derive(Serialize)]
struct AttributesArtifact<'a> {
    experiment: &'a str,
    n_basins: usize,
    columns: &'a [AttributeColumn],
    basins: BTreeMap<&'a str, BTreeMap<&'a str, &'a AttributeValue>>,
}

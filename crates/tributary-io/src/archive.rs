//! Per-basin sample archives: bincode with a versioned envelope.

use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use tributary_seq::WindowedSamples;

use crate::align::BasinSeries;
use crate::IoError;

/// Current binary format version.
const FORMAT_VERSION: u32 = 1;

/// Windowed training samples for one basin, with the metadata needed to
/// interpret them.
///
/// `target_dates[i]` is the date of the last timestep of window `i`, i.e.
/// the date its target was observed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleArchive {
    basin_id: String,
    feature_names: Vec<String>,
    target_dates: Vec<NaiveDate>,
    samples: WindowedSamples,
}

#[derive(Serialize, Deserialize)]
struct ArchiveEnvelope {
    format_version: u32,
    archive: SampleArchive,
}

impl SampleArchive {
    /// Bundle windowed samples with the aligned series they were cut from.
    #[must_use]
    pub fn new(series: &BasinSeries, samples: WindowedSamples) -> Self {
        let target_dates = series
            .dates()
            .iter()
            .skip(samples.seq_length().saturating_sub(1))
            .take(samples.n_samples())
            .copied()
            .collect();
        Self {
            basin_id: series.basin_id().to_string(),
            feature_names: series.feature_names().to_vec(),
            target_dates,
            samples,
        }
    }

    #[must_use]
    pub fn basin_id(&self) -> &str {
        &self.basin_id
    }

    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Return the target date of each window.
    #[must_use]
    pub fn target_dates(&self) -> &[NaiveDate] {
        &self.target_dates
    }

    #[must_use]
    pub fn samples(&self) -> &WindowedSamples {
        &self.samples
    }

    /// Save the archive to a binary file.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::SerializeArchive`] | bincode encoding failed |
    /// | [`IoError::WriteFile`] | file write failed |
    #[instrument(skip(self), fields(path = %path.as_ref().display(), basin = %self.basin_id))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), IoError> {
        let path = path.as_ref();

        let envelope = ArchiveEnvelope {
            format_version: FORMAT_VERSION,
            archive: self.clone(),
        };
        let bytes = bincode::serialize(&envelope)
            .map_err(|e| IoError::SerializeArchive { source: e })?;

        std::fs::write(path, &bytes).map_err(|e| IoError::WriteFile {
            path: path.to_path_buf(),
            source: e,
        })?;

        info!(
            size_bytes = bytes.len(),
            n_samples = self.samples.n_samples(),
            "archive saved"
        );
        Ok(())
    }

    /// Load an archive from a binary file.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::FileNotFound`] | file read failed |
    /// | [`IoError::DeserializeArchive`] | bincode decoding failed |
    /// | [`IoError::IncompatibleArchiveVersion`] | format version mismatch |
    #[instrument(fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, IoError> {
        let path = path.as_ref();

        let bytes = std::fs::read(path).map_err(|e| IoError::FileNotFound {
            path: path.to_path_buf(),
            source: e,
        })?;

        let envelope: ArchiveEnvelope =
            bincode::deserialize(&bytes).map_err(|e| IoError::DeserializeArchive {
                path: path.to_path_buf(),
                source: e,
            })?;

        if envelope.format_version != FORMAT_VERSION {
            return Err(IoError::IncompatibleArchiveVersion {
                expected: FORMAT_VERSION,
                found: envelope.format_version,
                path: path.to_path_buf(),
            });
        }

        debug!(
            basin = %envelope.archive.basin_id,
            n_samples = envelope.archive.samples.n_samples(),
            "archive loaded"
        );
        Ok(envelope.archive)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;
    use tempfile::TempDir;
    use tributary_seq::{ErrorKind, Windower};

    use super::*;

    fn sample_archive() -> SampleArchive {
        let samples = Windower::new(2)
            .unwrap()
            .window(&array![[1.0], [2.0], [3.0]], &array![[10.0], [20.0], [30.0]])
            .unwrap();
        SampleArchive {
            basin_id: "01001".into(),
            feature_names: vec!["prcp".into()],
            target_dates: vec![
                NaiveDate::from_ymd_opt(2020, 1, 2).unwrap(),
                NaiveDate::from_ymd_opt(2020, 1, 3).unwrap(),
            ],
            samples,
        }
    }

    #[test]
    fn save_then_load_preserves_archive() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("exp_01001.bin");
        let archive = sample_archive();

        archive.save(&path).unwrap();
        let loaded = SampleArchive::load(&path).unwrap();

        assert_eq!(loaded, archive);
        assert_eq!(loaded.samples().y(), &array![[20.0], [30.0]]);
    }

    #[test]
    fn load_nonexistent_file_error() {
        let dir = TempDir::new().unwrap();
        let err = SampleArchive::load(dir.path().join("absent.bin")).unwrap_err();
        assert!(matches!(err, IoError::FileNotFound { .. }));
    }

    #[test]
    fn load_corrupt_file_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("corrupt.bin");
        std::fs::write(&path, b"not a valid bincode file").unwrap();
        let err = SampleArchive::load(&path).unwrap_err();
        assert!(matches!(err, IoError::DeserializeArchive { .. }));
    }

    #[test]
    fn load_rejects_other_format_version() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("future.bin");
        let envelope = ArchiveEnvelope {
            format_version: FORMAT_VERSION + 1,
            archive: sample_archive(),
        };
        std::fs::write(&path, bincode::serialize(&envelope).unwrap()).unwrap();

        let err = SampleArchive::load(&path).unwrap_err();
        assert!(matches!(
            err,
            IoError::IncompatibleArchiveVersion { expected: 1, found: 2, .. }
        ));
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }
}

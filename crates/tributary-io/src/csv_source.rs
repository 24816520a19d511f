//! Shared CSV plumbing: open with headers, locate columns, validate row widths.

use std::fs::File;
use std::path::{Path, PathBuf};

use csv::StringRecord;
use tracing::debug;

use crate::IoError;

/// A header-validated CSV file ready for row iteration.
pub(crate) struct CsvSource {
    path: PathBuf,
    reader: csv::Reader<File>,
    headers: Vec<String>,
}

impl CsvSource {
    /// Open `path` and read its header row.
    pub(crate) fn open(path: &Path) -> Result<Self, IoError> {
        let file = File::open(path).map_err(|e| IoError::FileNotFound {
            path: path.to_path_buf(),
            source: e,
        })?;

        // flexible(true) allows rows with varying column counts so that our own
        // InconsistentRowLength check fires instead of a low-level CsvParse error.
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| csv_error(path, e))?
            .iter()
            .map(String::from)
            .collect();
        debug!(path = %path.display(), n_columns = headers.len(), "read CSV header");

        Ok(Self {
            path: path.to_path_buf(),
            reader,
            headers,
        })
    }

    pub(crate) fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Return the position of `name` in the header row.
    pub(crate) fn column_index(&self, name: &str) -> Result<usize, IoError> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| IoError::MissingColumn {
                path: self.path.clone(),
                column: name.to_string(),
            })
    }

    /// Iterate data rows as `(row_index, record)`, rejecting rows whose width
    /// differs from the header.
    pub(crate) fn records(
        &mut self,
    ) -> impl Iterator<Item = Result<(usize, StringRecord), IoError>> + '_ {
        let expected = self.headers.len();
        let path = &self.path;
        self.reader
            .records()
            .enumerate()
            .map(move |(row_index, result)| {
                let record = result.map_err(|e| csv_error(path, e))?;
                if record.len() != expected {
                    return Err(IoError::InconsistentRowLength {
                        path: path.clone(),
                        row_index,
                        expected,
                        got: record.len(),
                    });
                }
                Ok((row_index, record))
            })
    }
}

/// Parse a cell that must hold a finite float.
pub(crate) fn parse_finite(
    path: &Path,
    row_index: usize,
    column: &str,
    raw: &str,
) -> Result<f64, IoError> {
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(IoError::NonFiniteValue {
            path: path.to_path_buf(),
            row_index,
            column: column.to_string(),
            raw: raw.to_string(),
        }),
    }
}

fn csv_error(path: &Path, e: csv::Error) -> IoError {
    IoError::CsvParse {
        path: path.to_path_buf(),
        offset: e.position().map_or(0, |p| p.byte()),
        source: e,
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn write_csv(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn headers_are_trimmed() {
        let f = write_csv(" FIPS , stn \n1001,A\n");
        let src = CsvSource::open(f.path()).unwrap();
        assert_eq!(src.headers(), &["FIPS", "stn"]);
        assert_eq!(src.column_index("stn").unwrap(), 1);
    }

    #[test]
    fn missing_column_reported() {
        let f = write_csv("FIPS,stn\n1001,A\n");
        let src = CsvSource::open(f.path()).unwrap();
        let err = src.column_index("Date").unwrap_err();
        assert!(matches!(err, IoError::MissingColumn { ref column, .. } if column == "Date"));
    }

    #[test]
    fn jagged_row_rejected() {
        let f = write_csv("a,b,c\n1,2,3\n4,5\n");
        let mut src = CsvSource::open(f.path()).unwrap();
        let rows: Vec<_> = src.records().collect();
        assert!(rows[0].is_ok());
        assert!(matches!(
            rows[1],
            Err(IoError::InconsistentRowLength { row_index: 1, expected: 3, got: 2, .. })
        ));
    }

    #[test]
    fn parse_finite_rejects_nan_inf_and_text() {
        let p = Path::new("x.csv");
        assert_eq!(parse_finite(p, 0, "a", "1.5").unwrap(), 1.5);
        for raw in ["NaN", "inf", "-Inf", "abc", ""] {
            assert!(matches!(
                parse_finite(p, 0, "a", raw),
                Err(IoError::NonFiniteValue { .. })
            ));
        }
    }

    #[test]
    fn missing_file_is_not_found() {
        let result = CsvSource::open(Path::new("/nonexistent/attributes.csv"));
        assert!(matches!(result, Err(IoError::FileNotFound { .. })));
    }
}

//! Catchment attribute ingestion into, and filtered reads from, an SQLite store.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use ndarray::Array2;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OpenFlags};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::csv_source::CsvSource;
use crate::domain::BasinId;
use crate::IoError;

/// Default name of the attribute table inside the store.
const DEFAULT_TABLE: &str = "basin_attributes";

/// Default name of the identifier column (source file and store).
const DEFAULT_ID_COLUMN: &str = "FIPS";

/// SQLite names for the implicit row id. A stored column of the same name
/// hides the alias.
const ROWID_ALIASES: [&str; 3] = ["rowid", "_rowid_", "oid"];

/// Storage class of an attribute column, decided once at ingest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnKind {
    /// Every non-empty cell is a finite float.
    Real,
    /// Free text (categorical attributes).
    Text,
}

impl ColumnKind {
    fn sql_type(self) -> &'static str {
        match self {
            Self::Real => "REAL",
            Self::Text => "TEXT",
        }
    }

    fn from_sql_type(decl: &str) -> Self {
        if decl.eq_ignore_ascii_case("REAL") {
            Self::Real
        } else {
            Self::Text
        }
    }
}

/// A named, typed attribute column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeColumn {
    /// Column name as it appears in the source header.
    pub name: String,
    /// Storage class.
    pub kind: ColumnKind,
}

/// A single attribute cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// Numeric attribute.
    Real(f64),
    /// Categorical attribute.
    Text(String),
    /// Empty in the source file, `NULL` in the store.
    Missing,
}

/// Attribute rows keyed by [`BasinId`].
///
/// Basin IDs and rows are stored in parallel vectors: `basin_ids[i]`
/// corresponds to `rows[i]`, and `rows[i][j]` is the value of `columns[j]`.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeTable {
    basin_ids: Vec<BasinId>,
    columns: Vec<AttributeColumn>,
    rows: Vec<Vec<AttributeValue>>,
}

impl AttributeTable {
    /// Read an attribute CSV whose `id_column` holds basin codes.
    ///
    /// Codes are coerced to zero-padded [`BasinId`]s. Every other column is
    /// typed [`ColumnKind::Real`] if all its non-empty cells are finite
    /// floats, else [`ColumnKind::Text`]. Empty cells become
    /// [`AttributeValue::Missing`].
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
    /// | [`IoError::MissingColumn`] | `id_column` is absent |
    /// | [`IoError::CsvParse`] / [`IoError::InconsistentRowLength`] | Malformed rows |
    /// | [`IoError::InvalidBasinId`] | A code is not 1 to 5 digits |
    /// | [`IoError::DuplicateBasinId`] | A code appears twice |
    /// | [`IoError::EmptyDataset`] | Zero data rows |
    #[instrument(fields(path = %path.display()))]
    pub fn read_csv(path: &Path, id_column: &str) -> Result<Self, IoError> {
        let mut src = CsvSource::open(path)?;
        let id_idx = src.column_index(id_column)?;
        let names: Vec<String> = src
            .headers()
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != id_idx)
            .map(|(_, h)| h.clone())
            .collect();

        let mut basin_ids = Vec::new();
        let mut raw_rows: Vec<Vec<String>> = Vec::new();
        let mut seen: HashMap<BasinId, usize> = HashMap::new();

        for row in src.records() {
            let (row_index, record) = row?;
            let basin_id = BasinId::parse(&record[id_idx])?;
            if let Some(&first_row) = seen.get(&basin_id) {
                return Err(IoError::DuplicateBasinId {
                    path: path.to_path_buf(),
                    basin_id: basin_id.to_string(),
                    first_row,
                    second_row: row_index,
                });
            }
            seen.insert(basin_id.clone(), row_index);

            let cells = record
                .iter()
                .enumerate()
                .filter(|&(i, _)| i != id_idx)
                .map(|(_, cell)| cell.to_string())
                .collect();
            basin_ids.push(basin_id);
            raw_rows.push(cells);
        }

        if basin_ids.is_empty() {
            return Err(IoError::EmptyDataset {
                path: path.to_path_buf(),
            });
        }

        let columns: Vec<AttributeColumn> = names
            .into_iter()
            .enumerate()
            .map(|(j, name)| {
                let numeric = raw_rows.iter().all(|row| {
                    row[j].is_empty() || row[j].parse::<f64>().is_ok_and(f64::is_finite)
                });
                let kind = if numeric { ColumnKind::Real } else { ColumnKind::Text };
                AttributeColumn { name, kind }
            })
            .collect();

        let rows = raw_rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .zip(&columns)
                    .map(|(cell, column)| typed_cell(cell, column.kind))
                    .collect()
            })
            .collect();

        let n_real = columns.iter().filter(|c| c.kind == ColumnKind::Real).count();
        info!(
            n_basins = basin_ids.len(),
            n_columns = columns.len(),
            n_real,
            "attribute source loaded"
        );

        Ok(Self {
            basin_ids,
            columns,
            rows,
        })
    }

    /// Return the basin IDs in row order.
    #[must_use]
    pub fn basin_ids(&self) -> &[BasinId] {
        &self.basin_ids
    }

    /// Return the column descriptors.
    #[must_use]
    pub fn columns(&self) -> &[AttributeColumn] {
        &self.columns
    }

    /// Return the column names.
    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Return all rows.
    #[must_use]
    pub fn rows(&self) -> &[Vec<AttributeValue>] {
        &self.rows
    }

    /// Return the row for `basin_id`, if present.
    #[must_use]
    pub fn row(&self, basin_id: &BasinId) -> Option<&[AttributeValue]> {
        self.basin_ids
            .iter()
            .position(|id| id == basin_id)
            .map(|i| self.rows[i].as_slice())
    }

    /// Return a single cell.
    #[must_use]
    pub fn get(&self, basin_id: &BasinId, column: &str) -> Option<&AttributeValue> {
        let j = self.columns.iter().position(|c| c.name == column)?;
        self.row(basin_id).map(|row| &row[j])
    }

    /// Return the number of basins.
    #[must_use]
    pub fn n_basins(&self) -> usize {
        self.basin_ids.len()
    }

    /// Return the number of attribute columns.
    #[must_use]
    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// Return the [`ColumnKind::Real`] columns as a dense `(n_basins, n_real)` matrix.
    ///
    /// Text columns are skipped. Returns the names of the selected columns
    /// alongside the matrix.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::MissingAttribute`] if a selected cell is missing.
    pub fn numeric_matrix(&self) -> Result<(Vec<String>, Array2<f64>), IoError> {
        let selected: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.kind == ColumnKind::Real)
            .map(|(j, _)| j)
            .collect();

        let mut matrix = Array2::<f64>::zeros((self.basin_ids.len(), selected.len()));
        for (i, row) in self.rows.iter().enumerate() {
            for (k, &j) in selected.iter().enumerate() {
                matrix[[i, k]] = match &row[j] {
                    AttributeValue::Real(v) => *v,
                    _ => {
                        return Err(IoError::MissingAttribute {
                            basin_id: self.basin_ids[i].to_string(),
                            column: self.columns[j].name.clone(),
                        });
                    }
                };
            }
        }

        let names = selected
            .iter()
            .map(|&j| self.columns[j].name.clone())
            .collect();
        Ok((names, matrix))
    }
}

fn typed_cell(cell: String, kind: ColumnKind) -> AttributeValue {
    if cell.is_empty() {
        return AttributeValue::Missing;
    }
    match kind {
        // Real columns were checked cell by cell during classification.
        ColumnKind::Real => cell
            .parse::<f64>()
            .map_or(AttributeValue::Missing, AttributeValue::Real),
        ColumnKind::Text => AttributeValue::Text(cell),
    }
}

/// Durable SQLite table of basin attributes.
///
/// The connection is opened per call and closed when the call returns, on
/// success or error. Concurrent ingests into the same store path are not
/// coordinated; callers must serialize them.
///
/// # Defaults
///
/// | Parameter | Default |
/// |---|---|
/// | `table` | `basin_attributes` |
/// | `id_column` | `FIPS` |
/// | `invalid_columns` | empty |
#[derive(Debug, Clone)]
pub struct AttributeStore {
    path: PathBuf,
    table: String,
    id_column: String,
    invalid_columns: Vec<String>,
}

impl AttributeStore {
    /// Create a handle for the store at `path`. Nothing is opened yet.
    #[must_use]
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            table: DEFAULT_TABLE.to_string(),
            id_column: DEFAULT_ID_COLUMN.to_string(),
            invalid_columns: Vec::new(),
        }
    }

    /// Set the table name.
    #[must_use]
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Set the identifier column name, used both in the source CSV and as the
    /// table's primary key.
    #[must_use]
    pub fn with_id_column(mut self, id_column: impl Into<String>) -> Self {
        self.id_column = id_column.into();
        self
    }

    /// Set the columns dropped by [`load`](AttributeStore::load) when no
    /// explicit column selection is given.
    #[must_use]
    pub fn with_invalid_columns(mut self, invalid_columns: Vec<String>) -> Self {
        self.invalid_columns = invalid_columns;
        self
    }

    /// Return the store path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Return the table name.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Read the attribute CSV at `source` and write it to the store,
    /// replacing any existing table of the same name.
    ///
    /// # Errors
    ///
    /// Any [`AttributeTable::read_csv`] error, plus [`IoError::Store`] if
    /// SQLite rejects a statement. A failed write leaves the previous table
    /// in place.
    #[instrument(skip(self), fields(source = %source.display(), store = %self.path.display()))]
    pub fn ingest(&self, source: &Path) -> Result<AttributeTable, IoError> {
        let table = AttributeTable::read_csv(source, &self.id_column)?;
        self.write(&table)?;
        Ok(table)
    }

    /// Write `table` to the store, replacing any existing table of the same name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Store`] if SQLite rejects a statement.
    #[instrument(skip_all, fields(store = %self.path.display(), n_basins = table.n_basins()))]
    pub fn write(&self, table: &AttributeTable) -> Result<(), IoError> {
        let mut conn = Connection::open(&self.path).map_err(|e| self.store_error(e))?;
        let tx = conn.transaction().map_err(|e| self.store_error(e))?;

        let quoted_table = quote_ident(&self.table);
        tx.execute(&format!("DROP TABLE IF EXISTS {quoted_table}"), [])
            .map_err(|e| self.store_error(e))?;

        let mut defs = vec![format!("{} TEXT PRIMARY KEY", quote_ident(&self.id_column))];
        defs.extend(
            table
                .columns
                .iter()
                .map(|c| format!("{} {}", quote_ident(&c.name), c.kind.sql_type())),
        );
        let create = format!("CREATE TABLE {quoted_table} ({})", defs.join(", "));
        debug!(sql = %create, "creating attribute table");
        tx.execute(&create, []).map_err(|e| self.store_error(e))?;

        {
            let placeholders: Vec<String> =
                (1..=table.columns.len() + 1).map(|i| format!("?{i}")).collect();
            let insert = format!(
                "INSERT INTO {quoted_table} VALUES ({})",
                placeholders.join(", ")
            );
            let mut stmt = tx.prepare(&insert).map_err(|e| self.store_error(e))?;
            for (basin_id, row) in table.basin_ids.iter().zip(&table.rows) {
                let values = std::iter::once(Value::Text(basin_id.to_string()))
                    .chain(row.iter().map(to_sql_value));
                stmt.execute(params_from_iter(values))
                    .map_err(|e| self.store_error(e))?;
            }
        }

        tx.commit().map_err(|e| self.store_error(e))?;
        info!(table = %self.table, n_basins = table.n_basins(), "attribute table stored");
        Ok(())
    }

    /// Read the attribute rows for `basin_ids`.
    ///
    /// Rows whose basin is not listed are dropped, and listed basins missing
    /// from the store are skipped without error. With `keep_columns`, exactly
    /// those columns are returned (in store order); otherwise every column
    /// except the configured invalid columns.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::StoreNotFound`] | No file at the store path |
    /// | [`IoError::TableNotFound`] | The store has no attribute table |
    /// | [`IoError::MissingColumn`] | The table lacks the identifier column |
    /// | [`IoError::UnknownColumn`] | A `keep_columns` entry is not in the table |
    /// | [`IoError::InvalidBasinId`] | A stored identifier is not a valid basin ID |
    /// | [`IoError::Store`] | SQLite failure |
    #[instrument(skip(self, basin_ids), fields(store = %self.path.display(), n_requested = basin_ids.len()))]
    pub fn load(
        &self,
        basin_ids: &[BasinId],
        keep_columns: Option<&[String]>,
    ) -> Result<AttributeTable, IoError> {
        if !self.path.is_file() {
            return Err(IoError::StoreNotFound {
                path: self.path.clone(),
            });
        }
        let conn = Connection::open_with_flags(&self.path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(|e| self.store_error(e))?;

        let stored = self.table_columns(&conn)?;
        if !stored.iter().any(|c| c.name == self.id_column) {
            return Err(IoError::MissingColumn {
                path: self.path.clone(),
                column: self.id_column.clone(),
            });
        }
        let order_by = ROWID_ALIASES
            .iter()
            .find(|alias| !stored.iter().any(|c| c.name.eq_ignore_ascii_case(alias)))
            .map_or_else(|| quote_ident(&self.id_column), |alias| (*alias).to_string());
        let attribute_columns: Vec<AttributeColumn> = stored
            .into_iter()
            .filter(|c| c.name != self.id_column)
            .collect();

        let columns: Vec<AttributeColumn> = match keep_columns {
            Some(keep) => {
                if let Some(unknown) = keep
                    .iter()
                    .find(|k| !attribute_columns.iter().any(|c| &c.name == *k))
                {
                    return Err(IoError::UnknownColumn {
                        column: unknown.clone(),
                        available: attribute_columns.iter().map(|c| c.name.clone()).collect(),
                    });
                }
                attribute_columns
                    .into_iter()
                    .filter(|c| keep.contains(&c.name))
                    .collect()
            }
            None => attribute_columns
                .into_iter()
                .filter(|c| !self.invalid_columns.contains(&c.name))
                .collect(),
        };

        let select_list: Vec<String> = std::iter::once(quote_ident(&self.id_column))
            .chain(columns.iter().map(|c| quote_ident(&c.name)))
            .collect();
        let query = format!(
            "SELECT {} FROM {} ORDER BY {order_by}",
            select_list.join(", "),
            quote_ident(&self.table)
        );
        let mut stmt = conn.prepare(&query).map_err(|e| self.store_error(e))?;
        let mut result_rows = stmt.query([]).map_err(|e| self.store_error(e))?;

        let wanted: HashSet<&BasinId> = basin_ids.iter().collect();
        let mut ids = Vec::new();
        let mut rows = Vec::new();
        let mut n_scanned = 0usize;

        while let Some(row) = result_rows.next().map_err(|e| self.store_error(e))? {
            n_scanned += 1;
            let raw_id: String = row.get(0).map_err(|e| self.store_error(e))?;
            let basin_id = BasinId::parse(&raw_id)?;
            if !wanted.contains(&basin_id) {
                continue;
            }
            let mut values = Vec::with_capacity(columns.len());
            for j in 0..columns.len() {
                let value: Value = row.get(j + 1).map_err(|e| self.store_error(e))?;
                values.push(from_sql_value(value));
            }
            ids.push(basin_id);
            rows.push(values);
        }

        let n_absent = wanted.len().saturating_sub(ids.len());
        if n_absent > 0 {
            warn!(n_absent, "requested basins not present in attribute store");
        }
        info!(
            n_scanned,
            n_basins = ids.len(),
            n_columns = columns.len(),
            "attributes loaded"
        );

        Ok(AttributeTable {
            basin_ids: ids,
            columns,
            rows,
        })
    }

    fn table_columns(&self, conn: &Connection) -> Result<Vec<AttributeColumn>, IoError> {
        let pragma = format!("PRAGMA table_info({})", quote_ident(&self.table));
        let mut stmt = conn.prepare(&pragma).map_err(|e| self.store_error(e))?;
        let columns = stmt
            .query_map([], |row| {
                let name: String = row.get(1)?;
                let decl: String = row.get(2)?;
                Ok(AttributeColumn {
                    name,
                    kind: ColumnKind::from_sql_type(&decl),
                })
            })
            .map_err(|e| self.store_error(e))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| self.store_error(e))?;

        if columns.is_empty() {
            return Err(IoError::TableNotFound {
                path: self.path.clone(),
                table: self.table.clone(),
            });
        }
        Ok(columns)
    }

    fn store_error(&self, source: rusqlite::Error) -> IoError {
        IoError::Store {
            path: self.path.clone(),
            source,
        }
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn to_sql_value(value: &AttributeValue) -> Value {
    match value {
        AttributeValue::Real(v) => Value::Real(*v),
        AttributeValue::Text(s) => Value::Text(s.clone()),
        AttributeValue::Missing => Value::Null,
    }
}

fn from_sql_value(value: Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Missing,
        Value::Integer(i) => AttributeValue::Real(i as f64),
        Value::Real(v) => AttributeValue::Real(v),
        Value::Text(s) => AttributeValue::Text(s),
        Value::Blob(b) => AttributeValue::Text(String::from_utf8_lossy(&b).into_owned()),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::{NamedTempFile, TempDir};

    use super::*;

    fn write_csv(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    fn ids(raw: &[&str]) -> Vec<BasinId> {
        raw.iter().map(|r| BasinId::parse(r).unwrap()).collect()
    }

    fn ingested_store(dir: &TempDir, csv: &str) -> AttributeStore {
        let source = write_csv(csv);
        let store = AttributeStore::new(&dir.path().join("attributes.db"));
        store.ingest(source.path()).unwrap();
        store
    }

    const THREE_BASINS: &str =
        "FIPS,area,density,region\n1,100.0,5.5,north\n2,200.0,,south\n3,300.0,7.25,north\n";

    #[test]
    fn read_csv_types_columns() {
        let f = write_csv(THREE_BASINS);
        let table = AttributeTable::read_csv(f.path(), "FIPS").unwrap();
        assert_eq!(table.n_basins(), 3);
        assert_eq!(table.column_names(), vec!["area", "density", "region"]);
        assert_eq!(table.columns()[0].kind, ColumnKind::Real);
        assert_eq!(table.columns()[1].kind, ColumnKind::Real);
        assert_eq!(table.columns()[2].kind, ColumnKind::Text);
        assert_eq!(table.basin_ids()[1].as_str(), "00002");
        assert_eq!(table.rows()[1][1], AttributeValue::Missing);
    }

    #[test]
    fn read_csv_id_column_anywhere() {
        let f = write_csv("name,FIPS,area\nAutauga,1001,1543.7\n");
        let table = AttributeTable::read_csv(f.path(), "FIPS").unwrap();
        assert_eq!(table.column_names(), vec!["name", "area"]);
        let id = BasinId::parse("01001").unwrap();
        assert_eq!(
            table.get(&id, "name"),
            Some(&AttributeValue::Text("Autauga".into()))
        );
    }

    #[test]
    fn read_csv_rejects_duplicate_ids() {
        let f = write_csv("FIPS,area\n1,1.0\n00001,2.0\n");
        let err = AttributeTable::read_csv(f.path(), "FIPS").unwrap_err();
        assert!(matches!(err, IoError::DuplicateBasinId { .. }));
        assert_eq!(err.kind(), tributary_seq::ErrorKind::Conflict);
    }

    #[test]
    fn ingest_missing_source_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = AttributeStore::new(&dir.path().join("attributes.db"));
        let err = store.ingest(&dir.path().join("demo.csv")).unwrap_err();
        assert!(matches!(err, IoError::FileNotFound { .. }));
        assert_eq!(err.kind(), tributary_seq::ErrorKind::NotFound);
    }

    #[test]
    fn load_filters_rows_and_drops_absent_ids() {
        let dir = TempDir::new().unwrap();
        let store = ingested_store(&dir, THREE_BASINS);
        let table = store.load(&ids(&["00001", "00003", "00009"]), None).unwrap();
        assert_eq!(table.basin_ids(), ids(&["00001", "00003"]).as_slice());
        assert_eq!(table.n_columns(), 3);
        assert_eq!(
            table.get(&ids(&["3"])[0], "area"),
            Some(&AttributeValue::Real(300.0))
        );
    }

    #[test]
    fn load_round_trips_missing_and_text() {
        let dir = TempDir::new().unwrap();
        let store = ingested_store(&dir, THREE_BASINS);
        let table = store.load(&ids(&["1", "2", "3"]), None).unwrap();
        let original = AttributeTable::read_csv(write_csv(THREE_BASINS).path(), "FIPS").unwrap();
        assert_eq!(table, original);
    }

    #[test]
    fn load_keeps_ingest_order_with_rowid_column() {
        let dir = TempDir::new().unwrap();
        let store = ingested_store(&dir, "FIPS,rowid,area\n3,2,30.0\n1,1,10.0\n");
        let table = store.load(&ids(&["1", "3"]), None).unwrap();
        assert_eq!(table.basin_ids(), ids(&["00003", "00001"]).as_slice());
        assert_eq!(table.column_names(), vec!["rowid", "area"]);
    }

    #[test]
    fn load_keep_columns_selects_exactly() {
        let dir = TempDir::new().unwrap();
        let store = ingested_store(&dir, THREE_BASINS);
        let keep = vec!["region".to_string(), "area".to_string()];
        let table = store.load(&ids(&["1"]), Some(&keep)).unwrap();
        assert_eq!(table.column_names(), vec!["area", "region"]);
    }

    #[test]
    fn load_unknown_keep_column_rejected() {
        let dir = TempDir::new().unwrap();
        let store = ingested_store(&dir, THREE_BASINS);
        let keep = vec!["slope".to_string()];
        let err = store.load(&ids(&["1"]), Some(&keep)).unwrap_err();
        assert!(matches!(err, IoError::UnknownColumn { ref column, .. } if column == "slope"));
        assert_eq!(err.kind(), tributary_seq::ErrorKind::InvalidArgument);
    }

    #[test]
    fn load_drops_invalid_columns_by_default() {
        let dir = TempDir::new().unwrap();
        let store = ingested_store(&dir, THREE_BASINS)
            .with_invalid_columns(vec!["density".to_string()]);
        let table = store.load(&ids(&["1"]), None).unwrap();
        assert_eq!(table.column_names(), vec!["area", "region"]);
    }

    #[test]
    fn ingest_overwrites_existing_table() {
        let dir = TempDir::new().unwrap();
        let store = ingested_store(&dir, THREE_BASINS);
        let replacement = write_csv("FIPS,slope\n4,0.1\n");
        store.ingest(replacement.path()).unwrap();

        let table = store.load(&ids(&["1", "4"]), None).unwrap();
        assert_eq!(table.basin_ids(), ids(&["4"]).as_slice());
        assert_eq!(table.column_names(), vec!["slope"]);
    }

    #[test]
    fn load_missing_store_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = AttributeStore::new(&dir.path().join("missing.db"));
        let err = store.load(&ids(&["1"]), None).unwrap_err();
        assert!(matches!(err, IoError::StoreNotFound { .. }));
        assert!(!dir.path().join("missing.db").exists());
    }

    #[test]
    fn load_missing_table_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = ingested_store(&dir, THREE_BASINS).with_table("other_table");
        let err = store.load(&ids(&["1"]), None).unwrap_err();
        assert!(matches!(err, IoError::TableNotFound { .. }));
    }

    #[test]
    fn numeric_matrix_skips_text_and_rejects_missing() {
        let dir = TempDir::new().unwrap();
        let store = ingested_store(&dir, THREE_BASINS);

        let complete = store.load(&ids(&["1", "3"]), None).unwrap();
        let (names, matrix) = complete.numeric_matrix().unwrap();
        assert_eq!(names, vec!["area", "density"]);
        assert_eq!(matrix, ndarray::array![[100.0, 5.5], [300.0, 7.25]]);

        let gappy = store.load(&ids(&["2"]), None).unwrap();
        let err = gappy.numeric_matrix().unwrap_err();
        assert!(matches!(err, IoError::MissingAttribute { ref column, .. } if column == "density"));
    }

    #[test]
    fn values_serialize_untagged() {
        let values = vec![
            AttributeValue::Real(1.5),
            AttributeValue::Text("north".into()),
            AttributeValue::Missing,
        ];
        let json = serde_json::to_string(&values).unwrap();
        assert_eq!(json, r#"[1.5,"north",null]"#);
    }
}

//! Workbook Loader Module
//! Reads Excel sheets into row tables and caches them per file.

use super::{date_column, float_column, text_column, CellValue, TableSchema};
use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, Range, Reader, Sheets};
use polars::prelude::*;
use rayon::prelude::*;
use std::collections::HashMap;
use std::fmt;
use std::io::{self, Read, Seek};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("{} not found! Please ensure the file exists in the project folder.", .0.display())]
    FileNotFound(PathBuf),
    #[error("Sheet '{sheet}' not found (available: {})", .available.join(", "))]
    SheetNotFound {
        sheet: String,
        available: Vec<String>,
    },
    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
    #[error("Workbook contains no sheets")]
    EmptyWorkbook,
    #[error("Error loading file: {0}")]
    Workbook(#[from] calamine::Error),
    #[error("Error loading file: {0}")]
    Io(#[from] io::Error),
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
}

/// Which sheet of a workbook to read.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum SheetSelector {
    /// The first (default) sheet
    #[default]
    First,
    Named(String),
}

impl fmt::Display for SheetSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetSelector::First => write!(f, "<first sheet>"),
            SheetSelector::Named(name) => write!(f, "{name}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    path: PathBuf,
    sheet: SheetSelector,
    schema: String,
}

struct CacheEntry {
    modified: SystemTime,
    table: Arc<DataFrame>,
}

/// Loaded tables keyed by canonical path, sheet and schema.
///
/// An entry is only reused while the file's modification time is unchanged.
/// Entries are replaced wholesale, never mutated.
#[derive(Default)]
pub struct WorkbookCache {
    entries: HashMap<CacheKey, CacheEntry>,
}

impl WorkbookCache {
    /// Return the cached table or build it with `load`.
    pub fn get_or_load<F>(
        &mut self,
        path: &Path,
        sheet: &SheetSelector,
        schema: &str,
        load: F,
    ) -> Result<Arc<DataFrame>, LoadError>
    where
        F: FnOnce(&Path) -> Result<DataFrame, LoadError>,
    {
        let canonical = canonicalize(path)?;
        let modified = modified_time(&canonical)?;
        let key = CacheKey {
            path: canonical.clone(),
            sheet: sheet.clone(),
            schema: schema.to_string(),
        };

        if let Some(entry) = self.entries.get(&key) {
            if entry.modified == modified {
                debug!(path = %canonical.display(), %sheet, "workbook cache hit");
                return Ok(Arc::clone(&entry.table));
            }
            debug!(path = %canonical.display(), %sheet, "workbook changed on disk");
        }

        let table = Arc::new(load(&canonical)?);
        self.entries.insert(
            key,
            CacheEntry {
                modified,
                table: Arc::clone(&table),
            },
        );
        Ok(table)
    }

    /// Drop every entry for `path`. Returns how many were removed.
    pub fn invalidate(&mut self, path: &Path) -> usize {
        let target = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let before = self.entries.len();
        self.entries.retain(|key, _| key.path != target);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

fn not_found_as_load_error(path: &Path, err: io::Error) -> LoadError {
    if err.kind() == io::ErrorKind::NotFound {
        LoadError::FileNotFound(path.to_path_buf())
    } else {
        LoadError::Io(err)
    }
}

fn canonicalize(path: &Path) -> Result<PathBuf, LoadError> {
    path.canonicalize()
        .map_err(|e| not_found_as_load_error(path, e))
}

fn modified_time(path: &Path) -> Result<SystemTime, LoadError> {
    std::fs::metadata(path)
        .and_then(|meta| meta.modified())
        .map_err(|e| not_found_as_load_error(path, e))
}

/// Handles workbook loading with an explicit per-file cache.
#[derive(Default)]
pub struct DataLoader {
    cache: WorkbookCache,
}

impl DataLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a sheet, check the schema's required columns and coerce them.
    pub fn load(
        &mut self,
        path: &Path,
        sheet: &SheetSelector,
        schema: &TableSchema,
    ) -> Result<Arc<DataFrame>, LoadError> {
        let table = self.cache.get_or_load(path, sheet, &schema.name, |resolved| {
            info!(path = %resolved.display(), %sheet, "reading workbook");
            let mut workbook = open_workbook_auto(resolved)?;
            Self::read_workbook(&mut workbook, sheet, schema)
        })?;
        info!(rows = table.height(), columns = table.width(), "table ready");
        Ok(table)
    }

    /// Load from any reader without touching the cache. The format
    /// (xlsx, xlsb, xls, ods) is detected from the content.
    pub fn load_from_reader<R: Read + Seek + Clone>(
        reader: R,
        sheet: &SheetSelector,
        schema: &TableSchema,
    ) -> Result<DataFrame, LoadError> {
        let mut workbook = open_workbook_auto_from_rs(reader)?;
        Self::read_workbook(&mut workbook, sheet, schema)
    }

    fn read_workbook<R: Read + Seek>(
        workbook: &mut Sheets<R>,
        sheet: &SheetSelector,
        schema: &TableSchema,
    ) -> Result<DataFrame, LoadError> {
        let raw = Self::read_sheet(workbook, sheet)?;
        Self::conform(&raw, schema)
    }

    /// Explicit reload: forget everything cached for `path`.
    pub fn invalidate(&mut self, path: &Path) -> usize {
        self.cache.invalidate(path)
    }

    pub fn cached_tables(&self) -> usize {
        self.cache.len()
    }

    fn conform(raw: &DataFrame, schema: &TableSchema) -> Result<DataFrame, LoadError> {
        let missing = schema.missing_columns(raw);
        if !missing.is_empty() {
            return Err(LoadError::MissingColumns(missing));
        }
        if schema.is_passthrough() {
            return Ok(raw.clone());
        }
        Ok(schema.apply(raw)?)
    }

    /// Read one sheet verbatim.
    fn read_sheet<R: Read + Seek>(
        workbook: &mut Sheets<R>,
        sheet: &SheetSelector,
    ) -> Result<DataFrame, LoadError> {
        let names = workbook.sheet_names();
        let name = match sheet {
            SheetSelector::First => names.first().cloned().ok_or(LoadError::EmptyWorkbook)?,
            SheetSelector::Named(wanted) => {
                if !names.iter().any(|n| n == wanted) {
                    return Err(LoadError::SheetNotFound {
                        sheet: wanted.clone(),
                        available: names,
                    });
                }
                wanted.clone()
            }
        };

        let range = workbook.worksheet_range(&name)?;
        Ok(range_to_frame(&range)?)
    }
}

fn cell_from_data(cell: &Data) -> CellValue {
    match cell {
        Data::Int(v) => CellValue::Number(*v as f64),
        Data::Float(v) => CellValue::Number(*v),
        Data::String(s) if s.is_empty() => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        Data::DateTime(dt) if dt.is_duration() => CellValue::Number(dt.as_f64()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(value) => CellValue::Date(value.date()),
            None => CellValue::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) => match super::parse_date(s) {
            Some(d) => CellValue::Date(d),
            None => CellValue::Text(s.clone()),
        },
        Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(_) | Data::Empty => CellValue::Empty,
    }
}

fn header_names(header: &[Data]) -> Vec<String> {
    let mut names: Vec<String> = Vec::with_capacity(header.len());
    for (idx, cell) in header.iter().enumerate() {
        let base = cell_from_data(cell)
            .to_text()
            .unwrap_or_else(|| format!("Unnamed: {idx}"));
        let mut name = base.clone();
        let mut suffix = 1;
        while names.contains(&name) {
            name = format!("{base}.{suffix}");
            suffix += 1;
        }
        names.push(name);
    }
    names
}

/// Build a column from its cells, picking the narrowest kind that fits.
fn build_column(name: &str, cells: Vec<CellValue>) -> PolarsResult<Column> {
    let has_values = cells.iter().any(|c| !c.is_empty());

    if has_values && cells.iter().all(|c| matches!(c, CellValue::Empty | CellValue::Number(_))) {
        let values = cells
            .iter()
            .map(|c| match c {
                CellValue::Number(v) => Some(*v),
                _ => None,
            })
            .collect();
        return Ok(float_column(name, values));
    }

    if has_values && cells.iter().all(|c| matches!(c, CellValue::Empty | CellValue::Date(_))) {
        let values: Vec<_> = cells
            .iter()
            .map(|c| match c {
                CellValue::Date(d) => Some(*d),
                _ => None,
            })
            .collect();
        return date_column(name, &values);
    }

    Ok(text_column(
        name,
        cells.iter().map(CellValue::to_text).collect(),
    ))
}

/// Convert a sheet range into a row table. The first non-blank row is the header.
fn range_to_frame(range: &Range<Data>) -> PolarsResult<DataFrame> {
    let is_blank = |row: &&[Data]| row.iter().all(|c| cell_from_data(c).is_empty());
    let mut rows = range.rows().skip_while(is_blank);

    let Some(header) = rows.next() else {
        return Ok(DataFrame::default());
    };
    let names = header_names(header);
    let mut cells: Vec<Vec<CellValue>> = vec![Vec::new(); names.len()];

    for row in rows {
        if is_blank(&row) {
            continue;
        }
        for (idx, column) in cells.iter_mut().enumerate() {
            column.push(row.get(idx).map(cell_from_data).unwrap_or(CellValue::Empty));
        }
    }

    let columns = names
        .par_iter()
        .zip(cells.into_par_iter())
        .map(|(name, column)| build_column(name, column))
        .collect::<PolarsResult<Vec<_>>>()?;
    debug!(rows = columns.first().map(|c| c.len()).unwrap_or(0), "sheet parsed");
    DataFrame::new(columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{read_dates, read_numbers, sales_columns, XlsxExporter};
    use chrono::NaiveDate;
    use std::io::Cursor;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    fn sales_frame() -> DataFrame {
        let d = |m, day| NaiveDate::from_ymd_opt(2024, m, day);
        DataFrame::new(vec![
            date_column("Date", &[d(1, 5), d(1, 20), d(2, 3)]).unwrap(),
            text_column(
                "Product",
                vec![Some("WidgetA".into()), Some("WidgetB".into()), Some("WidgetA".into())],
            ),
            float_column("Quantity", vec![Some(10.0), Some(5.0), Some(2.0)]),
            float_column("Unit Price", vec![Some(2.0), Some(3.0), Some(2.0)]),
            float_column("Total", vec![Some(20.0), Some(15.0), Some(4.0)]),
        ])
        .unwrap()
    }

    fn write_workbook(df: &DataFrame, sheet: &str) -> NamedTempFile {
        let file = tempfile::Builder::new().suffix(".xlsx").tempfile().unwrap();
        XlsxExporter::export_to_file(df, sheet, file.path()).unwrap();
        file
    }

    #[test]
    fn missing_file_is_reported_as_not_found() {
        let mut loader = DataLoader::new();
        let err = loader
            .load(
                Path::new("definitely/not/here.xlsx"),
                &SheetSelector::First,
                &TableSchema::passthrough(),
            )
            .unwrap_err();
        assert!(matches!(err, LoadError::FileNotFound(_)));
    }

    #[test]
    fn loads_sales_sheet_with_typed_columns() {
        let file = write_workbook(&sales_frame(), "Sales Data");
        let mut loader = DataLoader::new();
        let table = loader
            .load(
                file.path(),
                &SheetSelector::Named("Sales Data".into()),
                &TableSchema::sales(),
            )
            .unwrap();

        assert_eq!(table.height(), 3);
        let names: Vec<String> = table
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(names, sales_columns::ALL);
        assert_eq!(
            read_dates(&table, "Date").unwrap()[2],
            NaiveDate::from_ymd_opt(2024, 2, 3)
        );
        assert_eq!(
            read_numbers(&table, "Total").unwrap(),
            vec![Some(20.0), Some(15.0), Some(4.0)]
        );
    }

    #[test]
    fn reload_without_changes_is_identical_and_cached() {
        let file = write_workbook(&sales_frame(), "Sales Data");
        let sheet = SheetSelector::Named("Sales Data".into());
        let mut loader = DataLoader::new();

        let first = loader.load(file.path(), &sheet, &TableSchema::sales()).unwrap();
        let second = loader.load(file.path(), &sheet, &TableSchema::sales()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(loader.cached_tables(), 1);

        assert_eq!(loader.invalidate(file.path()), 1);
        assert_eq!(loader.cached_tables(), 0);
        let third = loader.load(file.path(), &sheet, &TableSchema::sales()).unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert!(first.equals_missing(&third));
    }

    #[test]
    fn edited_file_is_reread_without_reload() {
        let file = write_workbook(&sales_frame(), "Sales Data");
        let sheet = SheetSelector::Named("Sales Data".into());
        let mut loader = DataLoader::new();

        let first = loader.load(file.path(), &sheet, &TableSchema::sales()).unwrap();
        assert_eq!(first.height(), 3);

        XlsxExporter::export_to_file(&sales_frame().head(Some(2)), "Sales Data", file.path()).unwrap();
        std::fs::File::options()
            .write(true)
            .open(file.path())
            .unwrap()
            .set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000))
            .unwrap();

        let second = loader.load(file.path(), &sheet, &TableSchema::sales()).unwrap();
        assert_eq!(second.height(), 2);
        assert_eq!(loader.cached_tables(), 1);
    }

    #[test]
    fn invalidate_drops_every_entry_for_the_file() {
        let file = write_workbook(&sales_frame(), "Sales Data");
        let mut loader = DataLoader::new();
        loader
            .load(file.path(), &SheetSelector::First, &TableSchema::passthrough())
            .unwrap();
        loader
            .load(
                file.path(),
                &SheetSelector::Named("Sales Data".into()),
                &TableSchema::sales(),
            )
            .unwrap();
        assert_eq!(loader.cached_tables(), 2);

        assert_eq!(loader.invalidate(file.path()), 2);
        assert_eq!(loader.cached_tables(), 0);
    }

    #[test]
    fn unknown_sheet_lists_available_names() {
        let file = write_workbook(&sales_frame(), "Sheet1");
        let mut loader = DataLoader::new();
        let err = loader
            .load(
                file.path(),
                &SheetSelector::Named("Sales Data".into()),
                &TableSchema::sales(),
            )
            .unwrap_err();
        match err {
            LoadError::SheetNotFound { available, .. } => assert_eq!(available, vec!["Sheet1"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_columns_fail_the_load() {
        let df = sales_frame().drop("Total").unwrap();
        let bytes = XlsxExporter::export_to_bytes(&df, "Sales Data").unwrap();
        let err = DataLoader::load_from_reader(
            Cursor::new(bytes),
            &SheetSelector::First,
            &TableSchema::sales(),
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::MissingColumns(cols) if cols == vec!["Total"]));
    }

    #[test]
    fn unrecognised_bytes_are_a_workbook_error() {
        let err = DataLoader::load_from_reader(
            Cursor::new(b"not a spreadsheet".to_vec()),
            &SheetSelector::First,
            &TableSchema::passthrough(),
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::Workbook(_)));
    }

    #[test]
    fn mixed_columns_load_as_text() {
        let df = DataFrame::new(vec![
            text_column("Category", vec![Some("a".into()), Some("b".into())]),
            text_column("Value", vec![Some("12".into()), Some("abc".into())]),
        ])
        .unwrap();
        let bytes = XlsxExporter::export_to_bytes(&df, "Sheet1").unwrap();
        let loaded = DataLoader::load_from_reader(
            Cursor::new(bytes),
            &SheetSelector::First,
            &TableSchema::passthrough(),
        )
        .unwrap();
        assert_eq!(loaded.column("Value").unwrap().dtype(), &DataType::String);
        assert!(loaded.equals_missing(&df));
    }

    #[test]
    fn duplicate_and_blank_headers_get_names() {
        let header = vec![
            Data::String("A".into()),
            Data::Empty,
            Data::String("A".into()),
        ];
        assert_eq!(header_names(&header), vec!["A", "Unnamed: 1", "A.1"]);
    }
}

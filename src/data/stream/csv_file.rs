//! Plain CSV/TSV files as row sources and sinks.

use super::{RowReader, RowSink, RowSource};
use crate::data::{RowId, Schema, Value};
use crate::error::{OpencleanError, Result, ResultExt as _};
use std::fs::File;
use std::path::{Path, PathBuf};

/// A delimited text file.
///
/// Cells are read as strings. Unless a header is supplied the first line of
/// the file holds the column names. Row identifiers are the zero-based
/// number of the data row.
#[derive(Debug, Clone)]
pub struct CsvFile {
    path: PathBuf,
    header: Option<Vec<String>>,
    delimiter: u8,
}

impl CsvFile {
    /// Open a file, inferring the delimiter from the extension (`.tsv` means
    /// tab, anything else comma).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let delimiter = infer_delimiter(&path);
        Self {
            path,
            header: None,
            delimiter,
        }
    }

    /// Use the given column names; the file itself has no header line.
    pub fn with_header<I, S>(mut self, header: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.header = Some(header.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn reader(&self) -> Result<csv::Reader<File>> {
        csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(self.header.is_none())
            .from_path(&self.path)
            .with_context(|| format!("Failed to open {}", self.path.display()))
    }

    /// Create (or truncate) the file for writing.
    pub fn writer(&self) -> Result<CsvWriter> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let inner = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_path(&self.path)
            .with_context(|| format!("Failed to create {}", self.path.display()))?;
        Ok(CsvWriter {
            inner,
            header: self.header.is_none(),
        })
    }
}

impl RowSource for CsvFile {
    fn columns(&self) -> Result<Schema> {
        if let Some(header) = &self.header {
            return Schema::new(header.iter().cloned());
        }
        let mut reader = self.reader()?;
        let headers = reader.headers()?;
        Schema::new(headers.iter())
    }

    /// Stream the data rows. A record whose width differs from
    /// [`RowSource::columns`] fails with [`OpencleanError::Malformed`].
    fn open(&self) -> Result<RowReader<'_>> {
        let width = self.columns()?.len();
        let reader = self.reader()?;
        Ok(Box::new(reader.into_records().zip(RowId::MIN..).map(
            move |(record, rowid)| {
                let record = record?;
                if record.len() != width {
                    return Err(OpencleanError::Malformed {
                        row: rowid,
                        expected: width,
                        actual: record.len(),
                    });
                }
                Ok((rowid, record.iter().map(Value::from).collect()))
            },
        )))
    }
}

fn infer_delimiter(path: &Path) -> u8 {
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_lowercase();
    if name.ends_with(".tsv") || name.ends_with(".tab") {
        b'\t'
    } else {
        b','
    }
}

/// Sink writing rows to a delimited file.
pub struct CsvWriter {
    inner: csv::Writer<File>,
    header: bool,
}

impl RowSink for CsvWriter {
    fn write_header(&mut self, schema: &Schema) -> Result<()> {
        if self.header {
            self.inner.write_record(schema.iter())?;
        }
        Ok(())
    }

    fn write(&mut self, row: &[Value]) -> Result<()> {
        self.inner.write_record(row.iter().map(Value::to_text))?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_infer_delimiter() {
        assert_eq!(infer_delimiter(Path::new("data/people.tsv")), b'\t');
        assert_eq!(infer_delimiter(Path::new("people.CSV")), b',');
    }

    #[test]
    fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let file = CsvFile::new(dir.path().join("people.tsv"));
        let schema = Schema::new(["Name", "Age"]).unwrap();

        let mut writer = file.writer().unwrap();
        writer.write_header(&schema).unwrap();
        writer.write(&["Alice".into(), 32.into()]).unwrap();
        writer.write(&["Bob, Jr.".into(), Value::Null]).unwrap();
        writer.finish().unwrap();

        assert_eq!(file.columns().unwrap(), schema);
        let rows: Vec<_> = file.open().unwrap().collect::<Result<_>>().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].0, 0);
        assert_eq!(rows[0].1, vec![Value::from("Alice"), Value::from("32")]);
        assert_eq!(rows[1].1, vec![Value::from("Bob, Jr."), Value::from("")]);
    }

    #[test]
    fn test_read_without_header_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("raw.csv");
        std::fs::write(&path, "a,1\nb,2\nc,3\n").unwrap();

        let file = CsvFile::new(&path).with_header(["Key", "Count"]);
        assert_eq!(file.columns().unwrap().names(), ["Key", "Count"]);
        assert_eq!(file.open().unwrap().count(), 3);
    }

    #[test]
    fn test_short_record_under_supplied_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("keys.csv");
        std::fs::write(&path, "a\nb\n").unwrap();

        let file = CsvFile::new(&path).with_header(["Key", "Count"]);
        let first = file.open().unwrap().next().unwrap();
        assert!(matches!(
            first,
            Err(OpencleanError::Malformed {
                row: 0,
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = CsvFile::new("/nonexistent/openclean.csv")
            .columns()
            .unwrap_err();
        assert!(err.to_string().contains("Failed to open"));
    }
}

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use seedwork_core::Record;

use crate::errors::GenerationError;
use crate::sink::StorageSink;

/// Write one table as CSV in the given column order; returns bytes written.
pub fn write_table_csv(
    path: &Path,
    columns: &[&str],
    records: &[Record],
) -> Result<u64, csv::Error> {
    let writer = BufWriter::new(File::create(path).map_err(csv::Error::from)?);
    let counting = CountingWriter::new(writer);
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(counting);

    writer.write_record(columns)?;

    for record in records {
        let row: Vec<String> = columns
            .iter()
            .map(|column| {
                record
                    .get(column)
                    .map(|value| value.render())
                    .unwrap_or_default()
            })
            .collect();
        writer.write_record(&row)?;
    }

    writer.flush()?;
    let counting = writer.into_inner().map_err(|err| err.into_error())?;
    Ok(counting.bytes_written())
}

/// Summary of one CSV file produced by [`CsvSink`].
#[derive(Debug, Clone, Serialize)]
pub struct CsvTableOutput {
    pub table: String,
    pub file: String,
    pub rows: u64,
    pub bytes: u64,
}

/// Writes each table to `<staging>/<table>.csv` and publishes the directory
/// with a single rename on commit.
#[derive(Debug)]
pub struct CsvSink {
    target: PathBuf,
    staging: PathBuf,
    outputs: Vec<CsvTableOutput>,
    committed: bool,
}

impl CsvSink {
    /// Prepare a sink publishing into `target`, which must not exist yet.
    pub fn create(target: &Path) -> Result<Self, GenerationError> {
        if target.exists() {
            return Err(GenerationError::Io(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("output directory {} already exists", target.display()),
            )));
        }

        let name = target
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "data".to_string());
        let staging = target.with_file_name(format!(".{name}.staging"));
        if staging.exists() {
            fs::remove_dir_all(&staging)?;
        }
        fs::create_dir_all(&staging)?;

        Ok(Self {
            target: target.to_path_buf(),
            staging,
            outputs: Vec::new(),
            committed: false,
        })
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn outputs(&self) -> &[CsvTableOutput] {
        &self.outputs
    }

    pub fn bytes_written(&self) -> u64 {
        self.outputs.iter().map(|output| output.bytes).sum()
    }
}

impl StorageSink for CsvSink {
    fn append(
        &mut self,
        table: &str,
        columns: &[&str],
        records: Vec<Record>,
    ) -> Result<(), GenerationError> {
        if self.committed {
            return Err(GenerationError::Io(std::io::Error::other(
                "csv sink already committed",
            )));
        }
        let file = format!("{table}.csv");
        let bytes = write_table_csv(&self.staging.join(&file), columns, &records)?;
        debug!(table = %table, rows = records.len(), bytes, "csv table staged");
        self.outputs.push(CsvTableOutput {
            table: table.to_string(),
            file,
            rows: records.len() as u64,
            bytes,
        });
        Ok(())
    }

    fn commit(&mut self) -> Result<(), GenerationError> {
        if self.committed {
            return Ok(());
        }
        if let Some(parent) = self.target.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::rename(&self.staging, &self.target)?;
        self.committed = true;
        Ok(())
    }

    fn abort(&mut self) -> Result<(), GenerationError> {
        if !self.committed && self.staging.exists() {
            fs::remove_dir_all(&self.staging)?;
        }
        self.outputs.clear();
        Ok(())
    }
}

struct CountingWriter<W: Write> {
    inner: W,
    bytes: u64,
}

impl<W: Write> CountingWriter<W> {
    fn new(inner: W) -> Self {
        Self { inner, bytes: 0 }
    }

    fn bytes_written(&self) -> u64 {
        self.bytes
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let size = self.inner.write(buf)?;
        self.bytes = self.bytes.saturating_add(size as u64);
        Ok(size)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

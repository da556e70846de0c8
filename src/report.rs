//! CSV output for simulation results.
//!
//! Any serializable row type can be written with [`write_rows`]; the header is derived from the
//! row's field names. Output goes either to an arbitrary writer (e.g. stdout) or to a file laid
//! out by [`ReportOptions`].
use std::fs::{create_dir_all, File};
use std::io::Write;
use std::path::PathBuf;

use csv::Writer;
use log::{info, trace};
use serde::Serialize;

use crate::error::SirError;
use crate::time_series::TimeSeries;

/// Where report files go and what they are called: `<directory>/<file_prefix><name>.csv`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportOptions {
    pub file_prefix: String,
    pub directory: PathBuf,
    pub overwrite: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        ReportOptions {
            file_prefix: String::new(),
            directory: PathBuf::from("."),
            overwrite: false,
        }
    }
}

impl ReportOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file_prefix(&mut self, file_prefix: String) -> &mut Self {
        self.file_prefix = file_prefix;
        self
    }

    pub fn directory(&mut self, directory: PathBuf) -> &mut Self {
        self.directory = directory;
        self
    }

    pub fn overwrite(&mut self, overwrite: bool) -> &mut Self {
        self.overwrite = overwrite;
        self
    }

    #[must_use]
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.directory
            .join(format!("{}{}.csv", self.file_prefix, name))
    }

    /// Creates the file for the report `name`, creating the output directory if needed.
    ///
    /// # Errors
    ///
    /// Returns a `SirError::ReportError` if the file exists and `overwrite` is not set, or a
    /// `SirError::IoError` if the file cannot be created.
    pub fn create_report_file(&self, name: &str) -> Result<File, SirError> {
        let path = self.path_for(name);
        if path.exists() && !self.overwrite {
            return Err(SirError::ReportError(format!(
                "File already exists: {}. Please set `overwrite` to true in the file configuration and rerun.",
                path.display()
            )));
        }
        create_dir_all(&self.directory)?;
        trace!("creating report file {}", path.display());
        Ok(File::create(path)?)
    }
}

/// Serializes `rows` as CSV into `writer`, with a header row.
///
/// # Errors
///
/// Returns a `SirError::CsvError` if serialization or writing fails.
pub fn write_rows<T, I, W>(writer: W, rows: I) -> Result<(), SirError>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
    W: Write,
{
    let mut csv_writer = Writer::from_writer(writer);
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Writes a time series as CSV with columns `time,S,I,R,new_infections,new_recoveries`.
///
/// # Errors
///
/// Returns a `SirError::CsvError` if writing fails.
pub fn write_time_series<W: Write>(writer: W, series: &TimeSeries) -> Result<(), SirError> {
    write_rows(writer, series.iter())
}

/// Writes `rows` to the report file `name` described by `options`.
///
/// # Errors
///
/// Returns a `SirError` if the file cannot be created or written.
pub fn write_report<T, I>(options: &ReportOptions, name: &str, rows: I) -> Result<PathBuf, SirError>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    let file = options.create_report_file(name)?;
    write_rows(file, rows)?;
    let path = options.path_for(name);
    info!("wrote report {}", path.display());
    Ok(path)
}

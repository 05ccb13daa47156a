//! Writes exported rows to CSV files and the model document to disk.

use std::fs::{self, File};
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info};

use crate::error::{ExportError, ExportResult};
use crate::extract::RowSink;
use crate::model::{ImportModel, MODEL_FILE_NAME};

/// [`RowSink`] writing one CSV file per exported label or pattern.
pub struct CsvPackager {
    dir: PathBuf,
    writer: Option<csv::Writer<File>>,
    files: Vec<PathBuf>,
}

impl CsvPackager {
    /// Create the output directory if needed.
    pub fn create(dir: impl Into<PathBuf>) -> ExportResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            writer: None,
            files: Vec::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Every file written so far, model included.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Serialize the model next to the CSV files.
    pub fn write_model(&mut self, model: &ImportModel) -> ExportResult<PathBuf> {
        let path = self.dir.join(MODEL_FILE_NAME);
        fs::write(&path, model.to_json_pretty()?)?;
        info!(path = %path.display(), version = %model.version, "Import model written");
        self.files.push(path.clone());
        Ok(path)
    }
}

impl RowSink for CsvPackager {
    fn begin_file(&mut self, name: &str, header: &[String]) -> ExportResult<()> {
        if self.writer.is_some() {
            return Err(ExportError::Output(format!(
                "cannot start '{}' while another file is open",
                name
            )));
        }
        if !is_plain_file_name(name) {
            return Err(ExportError::Output(format!(
                "'{}' is not a plain file name",
                name
            )));
        }
        let path = self.dir.join(name);
        debug!(path = %path.display(), "Writing file");
        let mut writer = csv::Writer::from_path(&path)?;
        writer.write_record(header)?;
        self.writer = Some(writer);
        self.files.push(path);
        Ok(())
    }

    fn write_row(&mut self, row: &[String]) -> ExportResult<()> {
        match self.writer.as_mut() {
            Some(writer) => Ok(writer.write_record(row)?),
            None => Err(ExportError::Output("row written before any file was started".to_string())),
        }
    }

    fn finish_file(&mut self) -> ExportResult<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        Ok(())
    }
}

/// Exactly one normal path component, so the file lands inside the output directory.
fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

//! CSV output: one directory per partition, one file per section.

use std::path::{Path, PathBuf};

use crate::error::OutputResult;
use crate::types::DataSet;

use super::{ArtifactNamer, Artifact, ArtifactSink};

/// Writes `<dir>/<partition>/<section>.csv`.
///
/// Every file starts with a header row of column names. Nulls are written as empty fields.
/// Sections are staged in a hidden `.<partition>.partial` directory that is renamed into place
/// once every file is written, so a failed artifact leaves nothing behind.
#[derive(Debug)]
pub struct CsvSink {
    dir: PathBuf,
    namer: ArtifactNamer,
}

impl CsvSink {
    /// Create a sink rooted at `dir` (created on first write).
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            namer: ArtifactNamer::new(),
        }
    }
}

impl ArtifactSink for CsvSink {
    fn write_artifact(&mut self, artifact: &Artifact) -> OutputResult<PathBuf> {
        let name = self.namer.name_for(&artifact.key);
        let dir = self.dir.join(&name);
        let staging = self.dir.join(format!(".{name}.partial"));

        let written = write_sections(&staging, artifact).and_then(|()| publish(&staging, &dir));
        if let Err(e) = written {
            let _ = std::fs::remove_dir_all(&staging);
            return Err(e);
        }
        Ok(dir)
    }
}

fn write_sections(staging: &Path, artifact: &Artifact) -> OutputResult<()> {
    if staging.exists() {
        std::fs::remove_dir_all(staging)?;
    }
    std::fs::create_dir_all(staging)?;
    for section in &artifact.sections {
        write_csv_section(&staging.join(format!("{}.csv", section.name)), &section.data)?;
    }
    Ok(())
}

/// Replace `dir` with the fully written `staging` directory.
fn publish(staging: &Path, dir: &Path) -> OutputResult<()> {
    if dir.exists() {
        std::fs::remove_dir_all(dir)?;
    }
    std::fs::rename(staging, dir)?;
    Ok(())
}

fn write_csv_section(path: &Path, data: &DataSet) -> OutputResult<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(data.schema.field_names())?;
    for row in &data.rows {
        wtr.write_record(row.iter().map(|v| v.to_string()))?;
    }
    wtr.flush()?;
    Ok(())
}

#![cfg(feature = "excel")]

use std::path::{Path, PathBuf};

use rust_xlsxwriter::{Workbook, Worksheet, XlsxError};

use crate::error::OutputResult;
use crate::types::{DataSet, Value};

use super::{ArtifactNamer, Artifact, ArtifactSink};

/// Writes one `<dir>/<partition><suffix>.xlsx` workbook per partition.
///
/// Each section becomes a worksheet named after the section. Row 1 holds the column names;
/// integers and floats are written as numbers, bools as booleans, nulls as blank cells.
#[derive(Debug)]
pub struct XlsxSink {
    dir: PathBuf,
    suffix: String,
    namer: ArtifactNamer,
}

impl XlsxSink {
    /// Create a sink rooted at `dir` with the default `_filtered` file suffix.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            suffix: "_filtered".to_string(),
            namer: ArtifactNamer::new(),
        }
    }

    /// Replace the text appended to each partition name before `.xlsx`.
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }
}

impl ArtifactSink for XlsxSink {
    fn write_artifact(&mut self, artifact: &Artifact) -> OutputResult<PathBuf> {
        let name = self.namer.name_for(&artifact.key);
        let path = self.dir.join(format!("{name}{}.xlsx", self.suffix));
        std::fs::create_dir_all(&self.dir)?;

        let mut wb = Workbook::new();
        for section in &artifact.sections {
            let ws = wb.add_worksheet();
            ws.set_name(section.name.as_str())?;
            write_sheet(ws, &section.data)?;
        }
        wb.save(&path)?;
        Ok(path)
    }
}

fn write_sheet(ws: &mut Worksheet, data: &DataSet) -> Result<(), XlsxError> {
    for (col, name) in data.schema.field_names().enumerate() {
        ws.write_string(0, col_num(col)?, name)?;
    }

    for (idx0, row) in data.rows.iter().enumerate() {
        // Row 0 is the header.
        let r = u32::try_from(idx0 + 1).map_err(|_| XlsxError::RowColumnLimitError)?;
        for (col, value) in row.iter().enumerate() {
            let c = col_num(col)?;
            match value {
                Value::Null => {}
                Value::Int64(v) => {
                    ws.write_number(r, c, *v as f64)?;
                }
                Value::Float64(v) => {
                    ws.write_number(r, c, *v)?;
                }
                Value::Bool(v) => {
                    ws.write_boolean(r, c, *v)?;
                }
                Value::Utf8(s) => {
                    ws.write_string(r, c, s.as_str())?;
                }
            }
        }
    }
    Ok(())
}

fn col_num(col: usize) -> Result<u16, XlsxError> {
    u16::try_from(col).map_err(|_| XlsxError::RowColumnLimitError)
}

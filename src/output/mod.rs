//! Artifacts and the sinks that persist them.
//!
//! A run produces one [`Artifact`] per partition: a `"raw"` section with the full partition and
//! one `"group N"` section per successfully evaluated filter group. An [`ArtifactSink`] turns an
//! artifact into files:
//!
//! - [`XlsxSink`]: one workbook per partition, one worksheet per section (feature `excel`)
//! - [`CsvSink`]: one directory per partition, one CSV file per section
//! - [`MemorySink`]: keeps artifacts in memory
//!
//! File-based sinks derive file names from partition keys with an [`ArtifactNamer`], which
//! replaces characters that are not allowed in file names and de-duplicates keys that sanitize to
//! the same name.

use std::collections::HashSet;
use std::path::PathBuf;

use crate::error::OutputResult;
use crate::types::{DataSet, Value};

pub mod csv;
#[cfg(feature = "excel")]
pub mod xlsx;

pub use self::csv::CsvSink;
#[cfg(feature = "excel")]
pub use self::xlsx::XlsxSink;

/// Name of the section holding the unfiltered partition.
pub const RAW_SECTION: &str = "raw";

/// Name of the section holding the result of the 1-based group `group`.
pub fn group_section_name(group: usize) -> String {
    format!("group {group}")
}

/// One named block of rows inside an artifact (a worksheet, a CSV file, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    /// Section name, e.g. `"raw"` or `"group 2"`.
    pub name: String,
    /// Rows, with the source dataset's column order.
    pub data: DataSet,
}

/// Everything written for one partition.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    /// Split-column value of the partition.
    pub key: Value,
    /// Sections in write order.
    pub sections: Vec<Section>,
}

impl Artifact {
    /// An artifact with no sections.
    pub fn new(key: Value) -> Self {
        Self {
            key,
            sections: Vec::new(),
        }
    }

    /// Append a section.
    pub fn push(&mut self, name: impl Into<String>, data: DataSet) {
        self.sections.push(Section {
            name: name.into(),
            data,
        });
    }

    /// Find a section by name.
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// Section names in write order.
    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|s| s.name.as_str())
    }
}

/// Persistence collaborator for a run.
///
/// Writes happen one artifact at a time, in partition order. An error only affects the artifact
/// being written; the engine keeps going with the next partition.
pub trait ArtifactSink {
    /// Persist `artifact` and return where it went.
    fn write_artifact(&mut self, artifact: &Artifact) -> OutputResult<PathBuf>;
}

impl<S: ArtifactSink + ?Sized> ArtifactSink for &mut S {
    fn write_artifact(&mut self, artifact: &Artifact) -> OutputResult<PathBuf> {
        (**self).write_artifact(artifact)
    }
}

impl<S: ArtifactSink + ?Sized> ArtifactSink for Box<S> {
    fn write_artifact(&mut self, artifact: &Artifact) -> OutputResult<PathBuf> {
        (**self).write_artifact(artifact)
    }
}

/// Collects artifacts in memory. Useful for tests and for callers that render results
/// themselves.
#[derive(Debug, Default)]
pub struct MemorySink {
    /// Artifacts in write order.
    pub artifacts: Vec<Artifact>,
    namer: ArtifactNamer,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Find a written artifact by partition key.
    pub fn get(&self, key: &Value) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| &a.key == key)
    }
}

impl ArtifactSink for MemorySink {
    fn write_artifact(&mut self, artifact: &Artifact) -> OutputResult<PathBuf> {
        let name = self.namer.name_for(&artifact.key);
        self.artifacts.push(artifact.clone());
        Ok(PathBuf::from(name))
    }
}

/// Derives stable, collision-free file names from partition keys.
///
/// Names are handed out in call order; the first key to claim a name keeps it and later keys that
/// sanitize to the same name (compared case-insensitively) get a ` (2)`, ` (3)`, ... suffix.
#[derive(Debug, Default)]
pub struct ArtifactNamer {
    used: HashSet<String>,
}

impl ArtifactNamer {
    /// Create a namer with no names claimed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a file-name-safe name for `key`.
    pub fn name_for(&mut self, key: &Value) -> String {
        let base = sanitize_key(key);
        let mut candidate = base.clone();
        let mut n = 1usize;
        while !self.used.insert(candidate.to_lowercase()) {
            n += 1;
            candidate = format!("{base} ({n})");
        }
        candidate
    }
}

const RESERVED_NAMES: [&str; 22] = [
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// File-name-safe form of a partition key (without de-duplication).
///
/// Path separators, `: * ? " < > |` and control characters become `_`; leading/trailing
/// whitespace and trailing dots are dropped. A null key is `null`, a key with nothing left is
/// `empty`, and device names such as `CON` get a leading `_`.
pub fn sanitize_key(key: &Value) -> String {
    if key.is_null() {
        return "null".to_string();
    }
    let raw = key.to_string();
    let replaced: String = raw
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let trimmed = replaced.trim().trim_end_matches('.').trim_end();
    if trimmed.is_empty() {
        return "empty".to_string();
    }
    if RESERVED_NAMES
        .iter()
        .any(|r| r.eq_ignore_ascii_case(trimmed))
    {
        return format!("_{trimmed}");
    }
    trimmed.to_string()
}

//! On-disk outputs of a run and the shared run log.

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use csv::WriterBuilder;
use log::info;
use serde_json::Value;
use std::{
    fs::{self, File, OpenOptions},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};

use crate::{
    chart::ChartRenderer,
    model::{ReconciledRecord, RunArtifacts},
};

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    RawJson,
    SelectedTable,
    TemperaturePlot,
}

impl ArtifactKind {
    pub fn stem(&self) -> &'static str {
        match self {
            ArtifactKind::RawJson => "data_raw",
            ArtifactKind::SelectedTable => "data_selected",
            ArtifactKind::TemperaturePlot => "temperature_plot",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactKind::RawJson => "json",
            ArtifactKind::SelectedTable => "csv",
            ArtifactKind::TemperaturePlot => "png",
        }
    }
}

/// Names every file of one run.
///
/// Resolution is one second: two runs for the same place within the same
/// second get the same names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunStamp {
    pub safe_place: String,
    pub timestamp: String,
}

impl RunStamp {
    pub fn new(place: &str, at: NaiveDateTime) -> Self {
        let safe_place = place.replace([' ', '/', '\\'], "_");
        Self { safe_place, timestamp: at.format(TIMESTAMP_FORMAT).to_string() }
    }
}

/// Writes a run's raw response, selected table and chart under one directory.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    output_dir: PathBuf,
}

impl ArtifactWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self { output_dir: output_dir.into() }
    }

    /// `{output_dir}/{safe_place}_{kind}_{timestamp}.{ext}`
    pub fn path_for(&self, stamp: &RunStamp, kind: ArtifactKind) -> PathBuf {
        self.output_dir.join(format!(
            "{}_{}_{}.{}",
            stamp.safe_place,
            kind.stem(),
            stamp.timestamp,
            kind.extension()
        ))
    }

    fn create(&self, stamp: &RunStamp, kind: ArtifactKind) -> Result<(PathBuf, File)> {
        fs::create_dir_all(&self.output_dir).with_context(|| {
            format!("Failed to create output directory: {}", self.output_dir.display())
        })?;

        let path = self.path_for(stamp, kind);
        let file = File::create(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        Ok((path, file))
    }

    pub fn write_raw(&self, stamp: &RunStamp, raw: &Value) -> Result<PathBuf> {
        let (path, file) = self.create(stamp, ArtifactKind::RawJson)?;

        let mut out = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut out, raw)
            .map_err(anyhow::Error::from)
            .and_then(|()| out.flush().map_err(anyhow::Error::from))
            .with_context(|| format!("Failed to write raw response: {}", path.display()))?;

        info!("Saved raw response to {}", path.display());
        Ok(path)
    }

    pub fn write_table(&self, stamp: &RunStamp, records: &[ReconciledRecord]) -> Result<PathBuf> {
        let (path, file) = self.create(stamp, ArtifactKind::SelectedTable)?;

        let mut wtr = csv::Writer::from_writer(file);
        for record in records {
            wtr.serialize(record)
                .with_context(|| format!("Failed to write row to {}", path.display()))?;
        }
        // No rows means serialize never emitted the header.
        if records.is_empty() {
            wtr.write_record(["date", "weather", "temperature"])?;
        }
        wtr.flush()
            .with_context(|| format!("Failed to flush {}", path.display()))?;

        info!("Saved {} selected rows to {}", records.len(), path.display());
        Ok(path)
    }

    pub fn write_chart(
        &self,
        stamp: &RunStamp,
        records: &[ReconciledRecord],
        renderer: &dyn ChartRenderer,
    ) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir).with_context(|| {
            format!("Failed to create output directory: {}", self.output_dir.display())
        })?;

        let path = self.path_for(stamp, ArtifactKind::TemperaturePlot);
        renderer
            .render(records, &path)
            .with_context(|| format!("Failed to render chart: {}", path.display()))?;

        info!("Saved chart to {}", path.display());
        Ok(path)
    }
}

/// Reads a selected table back.
pub fn read_table(path: &Path) -> Result<Vec<ReconciledRecord>> {
    let mut rdr = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    rdr.deserialize()
        .collect::<Result<Vec<ReconciledRecord>, _>>()
        .with_context(|| format!("Failed to read {}", path.display()))
}

/// Append-only CSV with one row per run.
///
/// Appends from one process are serialized through the internal lock; share
/// one `RunLog` (e.g. in an `Arc`) between pipelines. Separate processes
/// writing the same file are not coordinated.
#[derive(Debug)]
pub struct RunLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl RunLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one row, writing the header first only if the file is new.
    pub fn append(&self, entry: &RunArtifacts) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create run log directory: {}", parent.display())
            })?;
        }

        let write_header = !self.path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open run log: {}", self.path.display()))?;

        let mut wtr = WriterBuilder::new().has_headers(write_header).from_writer(file);
        wtr.serialize(entry)
            .with_context(|| format!("Failed to append to run log: {}", self.path.display()))?;
        wtr.flush()
            .with_context(|| format!("Failed to flush run log: {}", self.path.display()))?;

        info!("Logged run {} to {}", entry.timestamp, self.path.display());
        Ok(())
    }

    /// Every logged run, oldest first. A missing file is an empty log.
    pub fn entries(&self) -> Result<Vec<RunArtifacts>> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let mut rdr = csv::Reader::from_path(&self.path)
            .with_context(|| format!("Failed to open run log: {}", self.path.display()))?;

        rdr.deserialize()
            .collect::<Result<Vec<RunArtifacts>, _>>()
            .with_context(|| format!("Failed to read run log: {}", self.path.display()))
    }
}

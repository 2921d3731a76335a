use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use log::info;
use std::sync::Arc;

use crate::{
    artifact::{ArtifactWriter, RunLog, RunStamp},
    chart::{ChartRenderer, PlottersRenderer},
    config::Config,
    model::{Coordinate, DateRange, RunArtifacts},
    provider::{ArchiveSource, OpenMeteoArchive},
    series::ArchiveSeries,
};

/// fetch → persist raw → reconcile → persist table and chart → log.
///
/// Files written before a failure are left on disk.
#[derive(Debug)]
pub struct Pipeline {
    source: Box<dyn ArchiveSource>,
    writer: ArtifactWriter,
    renderer: Box<dyn ChartRenderer>,
    run_log: Arc<RunLog>,
}

impl Pipeline {
    pub fn new(
        source: Box<dyn ArchiveSource>,
        writer: ArtifactWriter,
        renderer: Box<dyn ChartRenderer>,
        run_log: Arc<RunLog>,
    ) -> Self {
        Self { source, writer, renderer, run_log }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let source = OpenMeteoArchive::new(config.archive_url.clone(), config.timeout())
            .context("Failed to build archive HTTP client")?;

        Ok(Self::new(
            Box::new(source),
            ArtifactWriter::new(config.output_dir.clone()),
            Box::new(PlottersRenderer::new(config.chart.clone())),
            Arc::new(RunLog::new(config.run_log.clone())),
        ))
    }

    pub fn run_log(&self) -> &Arc<RunLog> {
        &self.run_log
    }

    pub async fn run(&self, at: Coordinate, place: &str) -> Result<RunArtifacts> {
        self.run_at(at, place, Local::now()).await
    }

    /// Like [`Pipeline::run`] with an explicit clock: `now` picks both the
    /// date window and the file timestamp.
    pub async fn run_at(
        &self,
        at: Coordinate,
        place: &str,
        now: DateTime<Local>,
    ) -> Result<RunArtifacts> {
        let range = DateRange::ending_yesterday(now.date_naive());

        let raw = self
            .source
            .fetch_archive(at, range)
            .await
            .with_context(|| format!("Failed to fetch weather archive for {place}"))?;

        let stamp = RunStamp::new(place, now.naive_local());
        let raw_json = self.writer.write_raw(&stamp, &raw)?;

        let records = ArchiveSeries::from_raw(&raw)
            .and_then(|series| series.reconcile())
            .with_context(|| {
                format!("Unexpected archive response, kept in {}", raw_json.display())
            })?;

        let selected_csv = self.writer.write_table(&stamp, &records)?;
        let plot_image = self.writer.write_chart(&stamp, &records, self.renderer.as_ref())?;

        let artifacts = RunArtifacts {
            timestamp: stamp.timestamp,
            place: place.to_string(),
            latitude: at.latitude(),
            longitude: at.longitude(),
            selected_csv,
            plot_image,
            raw_json,
        };
        self.run_log.append(&artifacts)?;

        info!("Run {} for {place} complete", artifacts.timestamp);
        Ok(artifacts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        artifact::read_table,
        error::{DataShapeError, FetchError},
        model::ReconciledRecord,
    };
    use async_trait::async_trait;
    use chrono::{NaiveDate, TimeZone};
    use serde_json::{Value, json};
    use std::{fs, path::Path, sync::Mutex};
    use tempfile::TempDir;

    #[derive(Debug)]
    struct FakeArchive {
        reply: Option<Value>,
        requested: Arc<Mutex<Vec<DateRange>>>,
    }

    #[async_trait]
    impl ArchiveSource for FakeArchive {
        async fn fetch_archive(
            &self,
            _at: Coordinate,
            range: DateRange,
        ) -> Result<Value, FetchError> {
            self.requested.lock().expect("requested lock").push(range);
            match &self.reply {
                Some(body) => Ok(body.clone()),
                None => Err(FetchError::Status {
                    status: reqwest::StatusCode::BAD_GATEWAY,
                    body: "upstream down".into(),
                }),
            }
        }
    }

    /// Writes a placeholder instead of rasterizing.
    #[derive(Debug)]
    struct StubRenderer;

    impl ChartRenderer for StubRenderer {
        fn render(&self, records: &[ReconciledRecord], path: &Path) -> Result<()> {
            fs::write(path, format!("{} points", records.len()))?;
            Ok(())
        }
    }

    fn two_day_response() -> Value {
        json!({
            "latitude": 28.625,
            "daily": { "time": ["2024-01-01", "2024-01-02"], "weather_code": [1, 3] },
            "hourly": {
                "time": ["2024-01-01T00:00", "2024-01-01T12:00", "2024-01-02T06:00"],
                "temperature_2m": [10.0, 20.0, 5.0]
            }
        })
    }

    fn pipeline(dir: &TempDir, reply: Option<Value>) -> Pipeline {
        Pipeline::new(
            Box::new(FakeArchive { reply, requested: Arc::default() }),
            ArtifactWriter::new(dir.path().join("plots")),
            Box::new(StubRenderer),
            Arc::new(RunLog::new(dir.path().join("saved_data_log.csv"))),
        )
    }

    fn now(s: u32) -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2024, 1, 8, 10, 30, s)
            .single()
            .expect("unambiguous local time")
    }

    fn delhi() -> Coordinate {
        Coordinate::new(28.6519, 77.2315).expect("valid coordinate")
    }

    #[tokio::test]
    async fn run_writes_every_artifact_and_logs_once() {
        let dir = TempDir::new().expect("temp dir");
        let pipeline = pipeline(&dir, Some(two_day_response()));

        let out = pipeline
            .run_at(delhi(), "New Delhi, India", now(0))
            .await
            .expect("run succeeds");

        assert_eq!(out.timestamp, "20240108_103000");
        assert_eq!(out.place, "New Delhi, India");
        assert!(out.raw_json.ends_with("New_Delhi,_India_data_raw_20240108_103000.json"));
        assert!(out.selected_csv.exists());
        assert!(out.plot_image.exists());

        let raw: Value =
            serde_json::from_str(&fs::read_to_string(&out.raw_json).expect("raw readable"))
                .expect("raw is JSON");
        assert_eq!(raw, two_day_response());

        let rows = read_table(&out.selected_csv).expect("table readable");
        assert_eq!(
            rows,
            vec![
                ReconciledRecord {
                    date: NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date"),
                    weather_code: Some(1),
                    temperature: Some(15.0),
                },
                ReconciledRecord {
                    date: NaiveDate::from_ymd_opt(2024, 1, 2).expect("valid date"),
                    weather_code: Some(3),
                    temperature: Some(5.0),
                },
            ]
        );

        assert_eq!(pipeline.run_log().entries().expect("log readable"), vec![out]);
    }

    #[tokio::test]
    async fn requests_the_week_ending_yesterday() {
        let dir = TempDir::new().expect("temp dir");
        let requested = Arc::new(Mutex::new(Vec::new()));
        let source = FakeArchive {
            reply: Some(two_day_response()),
            requested: Arc::clone(&requested),
        };
        let pipeline = Pipeline::new(
            Box::new(source),
            ArtifactWriter::new(dir.path()),
            Box::new(StubRenderer),
            Arc::new(RunLog::new(dir.path().join("log.csv"))),
        );

        pipeline.run_at(delhi(), "x", now(0)).await.expect("run succeeds");

        let ranges = requested.lock().expect("requested lock").clone();
        assert_eq!(
            ranges,
            vec![DateRange {
                start: NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date"),
                end: NaiveDate::from_ymd_opt(2024, 1, 7).expect("valid date"),
            }]
        );
    }

    #[tokio::test]
    async fn consecutive_runs_keep_separate_files() {
        let dir = TempDir::new().expect("temp dir");
        let pipeline = pipeline(&dir, Some(two_day_response()));

        let first = pipeline.run_at(delhi(), "Delhi", now(0)).await.expect("first run");
        let second = pipeline.run_at(delhi(), "Delhi", now(1)).await.expect("second run");

        assert_ne!(first.raw_json, second.raw_json);
        assert_ne!(first.selected_csv, second.selected_csv);
        assert_ne!(first.plot_image, second.plot_image);
        assert!(first.raw_json.exists() && second.raw_json.exists());
        assert_eq!(pipeline.run_log().entries().expect("log readable").len(), 2);
    }

    #[tokio::test]
    async fn fetch_failure_writes_nothing() {
        let dir = TempDir::new().expect("temp dir");
        let pipeline = pipeline(&dir, None);

        let err = pipeline.run_at(delhi(), "Delhi", now(0)).await.unwrap_err();

        assert!(matches!(err.downcast_ref::<FetchError>(), Some(FetchError::Status { .. })));
        assert!(!dir.path().join("plots").exists());
        assert!(!pipeline.run_log().path().exists());
    }

    #[tokio::test]
    async fn malformed_response_keeps_raw_backup_only() {
        let dir = TempDir::new().expect("temp dir");
        let reply = json!({
            "daily": { "time": ["2024-01-01", "2024-01-02"], "weather_code": [1] }
        });
        let pipeline = pipeline(&dir, Some(reply));

        let err = pipeline.run_at(delhi(), "Delhi", now(0)).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<DataShapeError>(),
            Some(DataShapeError::LengthMismatch { .. })
        ));
        let written: Vec<_> = fs::read_dir(dir.path().join("plots"))
            .expect("plots dir exists")
            .map(|e| e.expect("dir entry").file_name().into_string().expect("utf-8 name"))
            .collect();
        assert_eq!(written, vec!["Delhi_data_raw_20240108_103000.json".to_string()]);
        assert!(!pipeline.run_log().path().exists());
    }
}

use anyhow::{Result, anyhow};
use chrono::{Days, NaiveDate};
use plotters::{prelude::*, style::register_font};
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, ops::Range, path::Path, sync::OnceLock};

use crate::model::ReconciledRecord;

/// Family every chart text uses; backed by the bundled DejaVu Sans.
const FONT_FAMILY: &str = "sans-serif";
const FONT_BYTES: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");

/// Registers the bundled font with plotters once per process, so rendering
/// never depends on fonts installed on the host.
fn ensure_font() -> Result<()> {
    static REGISTERED: OnceLock<bool> = OnceLock::new();

    let ok = *REGISTERED
        .get_or_init(|| register_font(FONT_FAMILY, FontStyle::Normal, FONT_BYTES).is_ok());
    if ok { Ok(()) } else { Err(anyhow!("Bundled chart font could not be loaded")) }
}

/// Image settings handed to a renderer when it is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self { width: 1000, height: 500, title: "Daily Average Temperature".to_string() }
    }
}

/// Writes a temperature chart for a run's records to an image file.
pub trait ChartRenderer: Send + Sync + Debug {
    fn render(&self, records: &[ReconciledRecord], path: &Path) -> Result<()>;
}

/// Headless PNG renderer backed by plotters' bitmap backend.
#[derive(Debug, Clone, Default)]
pub struct PlottersRenderer {
    config: RendererConfig,
}

impl PlottersRenderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }
}

impl ChartRenderer for PlottersRenderer {
    fn render(&self, records: &[ReconciledRecord], path: &Path) -> Result<()> {
        ensure_font()?;

        let size = (self.config.width, self.config.height);
        let root = BitMapBackend::new(path, size).into_drawing_area();
        root.fill(&WHITE).map_err(draw_err)?;

        let Some(x_range) = date_range(records) else {
            root.titled(&self.config.title, (FONT_FAMILY, 24)).map_err(draw_err)?;
            return root.present().map_err(draw_err);
        };
        let ranged_date: RangedDate<NaiveDate> = x_range.into();

        let mut chart = ChartBuilder::on(&root)
            .caption(&self.config.title, (FONT_FAMILY, 24))
            .margin(20)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(ranged_date, temperature_range(records))
            .map_err(draw_err)?;

        chart
            .configure_mesh()
            .x_desc("Date")
            .y_desc("Temperature (°C)")
            .x_label_formatter(&|d: &NaiveDate| d.format("%Y-%m-%d").to_string())
            .draw()
            .map_err(draw_err)?;

        // A null temperature breaks the line.
        for run in records.split(|r| r.temperature.is_none()) {
            let points = run.iter().filter_map(point);
            chart.draw_series(LineSeries::new(points, &BLUE)).map_err(draw_err)?;
        }

        chart
            .draw_series(
                records
                    .iter()
                    .filter_map(point)
                    .map(|p| Circle::new(p, 4, BLUE.filled())),
            )
            .map_err(draw_err)?;

        let label_style = (FONT_FAMILY, 12)
            .into_font()
            .transform(FontTransform::Rotate270)
            .color(&BLACK);

        chart
            .draw_series(records.iter().filter_map(|r| {
                let label = r.weather_code.map_or_else(|| "n/a".to_string(), |c| c.to_string());
                point(r).map(|p| {
                    EmptyElement::at(p) + Text::new(label, (-6, -10), label_style.clone())
                })
            }))
            .map_err(draw_err)?;

        root.present().map_err(draw_err)
    }
}

fn point(record: &ReconciledRecord) -> Option<(NaiveDate, f64)> {
    record.temperature.map(|t| (record.date, t))
}

fn date_range(records: &[ReconciledRecord]) -> Option<Range<NaiveDate>> {
    let start = records.iter().map(|r| r.date).min()?;
    let end = records.iter().map(|r| r.date).max()?;

    if start == end {
        Some(start - Days::new(1)..end + Days::new(1))
    } else {
        Some(start..end)
    }
}

fn temperature_range(records: &[ReconciledRecord]) -> Range<f64> {
    let temps = records.iter().filter_map(|r| r.temperature);
    let (min, max) = temps.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), t| {
        (lo.min(t), hi.max(t))
    });

    if min > max {
        return 0.0..1.0;
    }
    let pad = ((max - min) * 0.1).max(1.0);
    (min - pad)..(max + pad)
}

fn draw_err<E: std::error::Error + Send + Sync>(err: DrawingAreaErrorKind<E>) -> anyhow::Error {
    anyhow!("Failed to draw chart: {err}")
}

use anyhow::Context;
use clap::{Parser, Subcommand};
use inquire::Text;
use std::path::PathBuf;
use weather_archive_core::{
    Config, Coordinate, GeoResolver, Outcome, Pipeline, ReconciledRecord, Resolution,
    RunArtifacts, artifact::{RunLog, read_table},
};

const PREVIEW_ROWS: usize = 10;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-archive", version, about = "Last week's weather for a place")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch the last seven days for a place and save table, chart and raw data.
    Fetch {
        /// Place name; prompted for when absent.
        place: Option<String>,

        /// Skip geocoding and use this latitude (requires --lon).
        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<f64>,

        /// Skip geocoding and use this longitude (requires --lat).
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<f64>,
    },

    /// Interactively set output locations and the default place.
    Configure,

    /// Show recent runs from the run log.
    History {
        /// Number of most recent runs to show.
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let config = Config::load()?;

        match self.command {
            Command::Fetch { place, lat, lon } => fetch(&config, place, lat.zip(lon)).await,
            Command::Configure => configure(config),
            Command::History { limit } => history(&config, limit),
        }
    }
}

async fn fetch(
    config: &Config,
    place: Option<String>,
    coords: Option<(f64, f64)>,
) -> anyhow::Result<()> {
    let (at, display) = match coords {
        Some((lat, lon)) => {
            let at = Coordinate::new(lat, lon)?;
            (at, place.unwrap_or_else(|| "Unknown".to_string()))
        }
        None => {
            let place = match place {
                Some(p) => p,
                None => Text::new("Enter place name:")
                    .with_default(&config.default_place)
                    .prompt()
                    .context("Failed to read place name")?,
            };

            let resolver = GeoResolver::from_config(config)?;
            let resolution = resolver.resolve_detailed(&place).await;
            print_resolution(&resolution);
            (resolution.place.coordinate, resolution.place.display_name)
        }
    };

    let pipeline = Pipeline::from_config(config)?;
    let out = pipeline.run(at, &display).await?;

    println!(
        "Saved: {}, {}, {}",
        out.selected_csv.display(),
        out.plot_image.display(),
        out.raw_json.display()
    );

    let rows = read_table(&out.selected_csv)?;
    print_preview(&out, &rows);

    Ok(())
}

fn print_resolution(res: &Resolution) {
    match &res.outcome {
        Outcome::Geocoded => println!(
            "Geocoded '{}' -> {} ({},{})",
            res.query,
            res.place.display_name,
            res.place.coordinate.latitude(),
            res.place.coordinate.longitude()
        ),
        Outcome::NoMatch => {
            println!("No geocoding results for '{}'. Using default coordinates.", res.query)
        }
        Outcome::Failed(reason) => {
            println!("Geocoding failed ({reason}). Using default coordinates.")
        }
    }
}

fn print_preview(out: &RunArtifacts, rows: &[ReconciledRecord]) {
    println!();
    println!("{} ({}, {})", out.place, out.latitude, out.longitude);
    println!("{:<12} {:>8} {:>12}", "date", "weather", "temperature");

    for row in rows.iter().take(PREVIEW_ROWS) {
        let code = row.weather_code.map(|c| c.to_string()).unwrap_or_default();
        let temp = row.temperature.map(|t| format!("{t:.1}")).unwrap_or_default();
        println!("{:<12} {:>8} {:>12}", row.date.to_string(), code, temp);
    }
}

fn configure(mut config: Config) -> anyhow::Result<()> {
    let output_dir = Text::new("Output directory:")
        .with_default(&config.output_dir.display().to_string())
        .prompt()?;
    let run_log = Text::new("Run log file:")
        .with_default(&config.run_log.display().to_string())
        .prompt()?;
    let default_place = Text::new("Default place:")
        .with_default(&config.default_place)
        .prompt()?;

    config.output_dir = PathBuf::from(output_dir);
    config.run_log = PathBuf::from(run_log);
    config.default_place = default_place;

    let path = config.save()?;
    println!("Configuration saved to {}", path.display());
    Ok(())
}

fn history(config: &Config, limit: usize) -> anyhow::Result<()> {
    let entries = RunLog::new(config.run_log.clone()).entries()?;
    if entries.is_empty() {
        println!("No runs logged in {}", config.run_log.display());
        return Ok(());
    }

    let skip = entries.len().saturating_sub(limit);
    for entry in &entries[skip..] {
        println!(
            "{}  {} ({}, {})\n    {}\n    {}\n    {}",
            entry.timestamp,
            entry.place,
            entry.latitude,
            entry.longitude,
            entry.selected_csv.display(),
            entry.plot_image.display(),
            entry.raw_json.display()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_accepts_negative_coordinates() {
        let cli = Cli::try_parse_from([
            "weather-archive", "fetch", "Lima", "--lat", "-12.05", "--lon", "-77.04",
        ])
        .expect("negative coordinates parse");

        match cli.command {
            Command::Fetch { place, lat, lon } => {
                assert_eq!(place.as_deref(), Some("Lima"));
                assert_eq!(lat.zip(lon), Some((-12.05, -77.04)));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn lat_without_lon_is_rejected() {
        assert!(Cli::try_parse_from(["weather-archive", "fetch", "--lat", "10"]).is_err());
    }

    #[test]
    fn history_defaults_to_ten() {
        let cli = Cli::try_parse_from(["weather-archive", "history"]).expect("history parses");
        assert!(matches!(cli.command, Command::History { limit: 10 }));
    }
}

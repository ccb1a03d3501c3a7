use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use skypass::predict::{ObserverLocation, PassFinder, PredictionSettings, TleCatalog, TleFetcher};
use skypass::report::build_report;
use skypass::web::{self, Config};

#[derive(Parser)]
#[command(name = "skypass")]
#[command(about = "Satellite pass predictions for fixed and custom observing sites")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Predict passes of one satellite from a TLE file and print them as JSON
    Predict(PredictArgs),
    /// Write passes-<slug>.json for every configured location
    Generate {
        #[arg(long)]
        config: String,
        #[arg(long)]
        out: PathBuf,
    },
    /// Serve the pass prediction API
    Serve {
        #[arg(long)]
        config: String,
    },
}

#[derive(Args)]
struct PredictArgs {
    /// File holding one or more two- or three-line element sets
    #[arg(long, required_unless_present = "norad")]
    tle: Option<PathBuf>,
    /// NORAD id to pick from the file, or to download from Celestrak when no file is given
    #[arg(long)]
    norad: Option<u32>,
    #[arg(long, allow_hyphen_values = true)]
    lat: f64,
    #[arg(long, allow_hyphen_values = true)]
    lon: f64,
    /// Altitude above the ellipsoid in meters
    #[arg(long, allow_hyphen_values = true)]
    alt: Option<f64>,
    #[arg(long, default_value_t = 7, allow_hyphen_values = true)]
    days: i64,
    /// Window start (RFC3339), defaults to now
    #[arg(long)]
    start: Option<String>,
    /// Scan step, e.g. 60s or 30s
    #[arg(long, default_value = "60s")]
    step: String,
    /// Drop passes peaking below this elevation in degrees
    #[arg(long, allow_hyphen_values = true)]
    min_elevation: Option<f64>,
    /// Emit passes still in progress when the window ends
    #[arg(long)]
    include_truncated: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Predict(args) => match predict(args) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Error: {}", e);
                ExitCode::FAILURE
            }
        },
        Commands::Generate { config, out } => generate(&config, &out),
        Commands::Serve { config } => serve(&config),
    }
}

fn predict(args: PredictArgs) -> Result<(), String> {
    let observer = ObserverLocation::new(args.lat, args.lon, args.alt).map_err(|e| e.to_string())?;
    let start = parse_start(args.start.as_deref())?;
    let step = humantime::parse_duration(&args.step)
        .map_err(|e| format!("step: {}", e))
        .and_then(|d| chrono::Duration::from_std(d).map_err(|e| format!("step: {}", e)))?;

    let entry = match (&args.tle, args.norad) {
        (Some(path), norad) => {
            let mut catalog = TleCatalog::new(None);
            catalog
                .load_file(path)
                .map_err(|e| format!("{}: {}", path.display(), e))?;
            match norad {
                Some(id) => catalog
                    .get(id)
                    .ok_or_else(|| format!("NORAD {} not found in {}", id, path.display()))?,
                None => catalog
                    .satellites()
                    .into_iter()
                    .next()
                    .ok_or_else(|| format!("no element sets in {}", path.display()))?,
            }
        }
        (None, Some(id)) => {
            let fetcher = TleFetcher::celestrak().map_err(|e| e.to_string())?;
            let runtime = tokio::runtime::Runtime::new().map_err(|e| e.to_string())?;
            let mut catalog = TleCatalog::new(None);
            runtime.block_on(catalog.refresh(&fetcher, &[id]));
            catalog
                .get(id)
                .ok_or_else(|| format!("could not download elements for NORAD {}", id))?
        }
        (None, None) => return Err("either --tle or --norad is required".into()),
    };

    let finder = PassFinder::new(PredictionSettings {
        step,
        include_truncated_passes: args.include_truncated,
        ..Default::default()
    });
    let mut passes = finder
        .find_passes(&entry.elements, &observer, start, args.days)
        .map_err(|e| e.to_string())?;
    if let Some(min) = args.min_elevation {
        passes.retain(|p| p.max_elevation_deg >= min);
    }

    log::info!(
        "{}: {} passes in {} days from {}",
        entry.info.name,
        passes.len(),
        args.days,
        start
    );
    let json = serde_json::to_string_pretty(&passes).map_err(|e| e.to_string())?;
    println!("{}", json);
    Ok(())
}

fn generate(config_path: &str, out: &Path) -> ExitCode {
    let config = match Config::from_file(config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let settings = match config.prediction.settings() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Config error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let finder = PassFinder::new(settings);

    let mut catalog = TleCatalog::new(Some(config.tle_folder.clone()));
    if let Err(e) = catalog.load_all() {
        log::warn!("Failed to load cached TLEs: {}", e);
    }

    match config.tle_fetch.fetcher() {
        Ok(Some(fetcher)) => {
            let runtime = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    eprintln!("Error starting runtime: {}", e);
                    return ExitCode::FAILURE;
                }
            };
            let ids: Vec<u32> = config.satellites.iter().map(|s| s.norad_id).collect();
            runtime.block_on(catalog.refresh(&fetcher, &ids));
        }
        Ok(None) => {}
        Err(e) => {
            eprintln!("Config error: {}", e);
            return ExitCode::FAILURE;
        }
    }

    if let Err(e) = fs::create_dir_all(out) {
        eprintln!("Error creating {}: {}", out.display(), e);
        return ExitCode::FAILURE;
    }

    let start = Utc::now();
    let mut failed = false;
    for location in &config.locations {
        let result = location
            .observer()
            .map_err(|e| e.to_string())
            .and_then(|observer| {
                build_report(
                    &finder,
                    &catalog,
                    &config.satellites,
                    &observer,
                    Some(location.name.as_str()),
                    start,
                    config.prediction.days,
                )
                .map_err(|e| e.to_string())
            })
            .and_then(|report| {
                let path = out.join(format!("passes-{}.json", location.slug));
                let json = serde_json::to_string_pretty(&report).map_err(|e| e.to_string())?;
                fs::write(&path, json).map_err(|e| format!("{}: {}", path.display(), e))?;
                Ok((path, report.pass_count()))
            });

        match result {
            Ok((path, count)) => log::info!("Wrote {} passes to {}", count, path.display()),
            Err(e) => {
                log::error!("Location {}: {}", location.slug, e);
                failed = true;
            }
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn serve(config_path: &str) -> ExitCode {
    let config = match Config::from_file(config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error starting runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(web::run_server(config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Server error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn parse_start(start: Option<&str>) -> Result<DateTime<Utc>, String> {
    match start {
        Some(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| format!("start: {}", e)),
        None => Ok(Utc::now()),
    }
}

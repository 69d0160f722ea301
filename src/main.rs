//! moba-stats - Match statistics from MOBA result screenshots
//!
//! Reads a post-match screenshot (or already recognized text), extracts the
//! match data and prints it as JSON on stdout. Logs go to stderr.

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::convert::Infallible;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use moba_stats::analysis::{analyze_text, MatchRecord, TeamSplit, TextAnalysis};
use moba_stats::capture::load_image;
use moba_stats::config::{self, AppConfig};
use moba_stats::vision::{default_engine, GameProfile, ImageOpsReadiness, OcrProgress, VisionPipeline};

/// moba-stats - Extract match statistics from MOBA result screenshots
#[derive(Parser, Debug)]
#[command(name = "moba-stats")]
#[command(about = "Extract match statistics from MOBA result screenshots")]
struct Args {
    /// Screenshot of the post-match result screen
    #[arg(required_unless_present_any = ["from_text", "list_games"])]
    image: Option<PathBuf>,

    /// Game profile (auto, onmyoji, honor, wildrift, ml)
    #[arg(short, long)]
    game: Option<GameProfile>,

    /// Config file to use instead of the default location
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Skip OCR and parse text from this file ("-" reads stdin)
    #[arg(long, conflicts_with = "image")]
    from_text: Option<PathBuf>,

    /// Include per-team totals in the output
    #[arg(long)]
    teams: bool,

    /// Include raw and normalized text in the output
    #[arg(long)]
    text: bool,

    /// List supported game profiles and exit
    #[arg(long)]
    list_games: bool,

    /// More logging (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// JSON document printed on stdout
#[derive(Serialize)]
struct Report<'a> {
    game: GameProfile,
    #[serde(flatten)]
    record: &'a MatchRecord,
    mvp_kda: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    teams: Option<TeamSplit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    raw_text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    normalized_text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    processing_time_ms: Option<u64>,
    degraded: bool,
}

/// What the selected input produced
struct Extraction {
    raw_text: String,
    analysis: TextAnalysis,
    processing_time_ms: Option<u64>,
    degraded: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose)?;

    // List games mode
    if args.list_games {
        println!("Supported game profiles:");
        for profile in GameProfile::ALL {
            println!("  {:<10} {}", profile.id(), profile.display_name());
        }
        return Ok(());
    }

    let config = load_or_create_config(args.config.as_deref())?;
    let profile = args.game.unwrap_or(config.general.default_game);

    let extraction = match (&args.from_text, &args.image) {
        (Some(text_path), _) => extract_from_text(text_path, profile)?,
        (None, Some(image_path)) => extract_from_image(image_path, profile, &config)?,
        (None, None) => anyhow::bail!("No input given; pass an image path or --from-text"),
    };

    let include_text = args.text || config.output.include_text;
    let include_teams = args.teams || config.output.include_teams;
    let record = &extraction.analysis.record;

    let report = Report {
        game: profile,
        record,
        mvp_kda: record.mvp_player().map(|p| p.kda()),
        teams: include_teams.then(|| record.team_split()),
        raw_text: include_text.then_some(extraction.raw_text.as_str()),
        normalized_text: include_text.then_some(extraction.analysis.normalized.as_str()),
        processing_time_ms: extraction.processing_time_ms,
        degraded: extraction.degraded,
    };

    let json = if config.output.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{}", json);

    Ok(())
}

/// Log to stderr; RUST_LOG wins over the verbosity flag
fn init_logging(verbose: u8) -> Result<()> {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Load configuration from file or create default
fn load_or_create_config(explicit: Option<&Path>) -> Result<AppConfig> {
    if let Some(path) = explicit {
        let config = config::load_config(path)?;
        info!("Loaded configuration from {:?}", path);
        return Ok(config);
    }

    let Ok(config_path) = config::default_config_path() else {
        info!("Using default configuration");
        return Ok(AppConfig::default());
    };

    if config_path.exists() {
        match config::load_config(&config_path) {
            Ok(config) => {
                info!("Loaded configuration from {:?}", config_path);
                return Ok(config);
            }
            Err(e) => warn!("Ignoring broken config: {:#}", e),
        }
        return Ok(AppConfig::default());
    }

    let config = AppConfig::default();
    let written = config_path
        .parent()
        .map(std::fs::create_dir_all)
        .transpose()
        .map_err(anyhow::Error::from)
        .and_then(|_| config::save_config(&config, &config_path));
    match written {
        Ok(()) => info!("Created default configuration at {:?}", config_path),
        Err(e) => warn!("Could not write default config: {:#}", e),
    }
    Ok(config)
}

fn extract_from_text(path: &Path, profile: GameProfile) -> Result<Extraction> {
    let raw_text = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read text from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path).with_context(|| format!("Failed to read text file: {:?}", path))?
    };

    info!("Parsing {} chars of text as {}", raw_text.chars().count(), profile.display_name());
    let analysis = analyze_text(&raw_text, profile);

    Ok(Extraction {
        raw_text,
        analysis,
        processing_time_ms: None,
        degraded: false,
    })
}

fn extract_from_image(path: &Path, profile: GameProfile, config: &AppConfig) -> Result<Extraction> {
    let image = load_image(path)?;
    let engine = default_engine(&config.ocr)?;

    // Image operations are in-process, so they are usable immediately
    let pipeline = VisionPipeline::from_config(config, engine, ImageOpsReadiness::ready());

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let result = runtime.block_on(pipeline.process(image, profile, log_progress))?;

    Ok(Extraction {
        raw_text: result.text.text,
        analysis: result.analysis,
        processing_time_ms: Some(result.processing_time_ms),
        degraded: result.degraded,
    })
}

fn log_progress(progress: OcrProgress) -> Result<(), Infallible> {
    info!("OCR {}: {:.0}%", progress.status.label(), progress.progress * 100.0);
    Ok(())
}

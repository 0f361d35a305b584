use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use feedqueue::chapters::{
    build_timeline, parse_description_chapters, validate_timeline, Chapter, ChapterTimeline,
    NativeChapter, SegmentResponse,
};
use feedqueue::{ChapterPipeline, Config, FixtureSource, StateManager};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "feedqueue")]
#[command(about = "Chapter and skip-segment merging for a video queue")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to the usual search paths)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the state directory
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge native chapters with raw skip segments and print the timeline
    Merge {
        /// JSON array of {"title", "start_time"} chapters
        #[arg(long)]
        native: Option<PathBuf>,
        /// JSON array of raw skip-segment records
        #[arg(long)]
        segments: Option<PathBuf>,
        /// Total video duration in seconds
        #[arg(long)]
        duration: Option<f64>,
        /// Boundary tolerance in seconds
        #[arg(long)]
        tolerance: Option<f64>,
    },
    /// Extract chapters from a description text file
    ParseDescription {
        file: PathBuf,
    },
    /// Refresh chapters for videos served from a fixture directory
    Refresh {
        video_ids: Vec<String>,
        /// Directory of <video_id>.json fixtures
        #[arg(long)]
        fixtures: PathBuf,
        /// Ignore the staleness policy
        #[arg(long)]
        force: bool,
    },
    /// Inspect or reset persisted per-video state
    State {
        #[command(subcommand)]
        command: StateCommands,
    },
}

#[derive(Subcommand)]
enum StateCommands {
    /// List all videos with state
    List,
    /// Show the record for one video
    Show { video_id: String },
    /// Forget everything about one video
    Reset { video_id: String },
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load().unwrap_or_else(|e| {
            eprintln!("Failed to load config, using defaults: {}", e);
            Config::default()
        }),
    };
    if let Some(state_dir) = &cli.state_dir {
        config.state.state_dir = state_dir.clone();
    }
    config.validate()?;
    Ok(config)
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| anyhow!("Cannot read {}: {}", path.display(), e))?;
    Ok(serde_json::from_str(&content)?)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let level = if cli.verbose { "debug" } else { config.logging.level.as_str() };
    let default_filter = format!("feedqueue={},warn", level);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();
    debug!("{}", config.summary());

    match cli.command {
        Commands::Merge {
            native,
            segments,
            duration,
            tolerance,
        } => {
            let tolerance = tolerance.unwrap_or(config.chapters.tolerance_seconds);

            let native: Vec<Chapter> = match native {
                Some(path) => read_json::<Vec<NativeChapter>>(&path)
                    .await?
                    .into_iter()
                    .map(Chapter::from)
                    .collect(),
                None => Vec::new(),
            };
            let response = match segments {
                Some(path) => SegmentResponse::from_segments(read_json(&path).await?),
                None => SegmentResponse::default(),
            };
            let duration = duration.or(response.video_duration);

            let chapters = build_timeline(native, response.into_chapters(), duration, tolerance);
            if let Err(problem) = validate_timeline(&chapters, duration, tolerance) {
                warn!("⚠️ Timeline check failed: {}", problem);
            }
            let timeline = ChapterTimeline::new(chapters);
            info!(
                "✅ {} chapters, {:.0}s skippable",
                timeline.len(),
                timeline.skippable_seconds()
            );
            if let Some(highlight) = timeline.highlight() {
                info!("⭐ Highlight at {:.1}s", highlight);
            }
            println!("{}", serde_json::to_string_pretty(timeline.chapters())?);
        }
        Commands::ParseDescription { file } => {
            let text = tokio::fs::read_to_string(&file).await?;
            let chapters = parse_description_chapters(&text);
            info!("📚 Extracted {} chapters", chapters.len());
            println!("{}", serde_json::to_string_pretty(&chapters)?);
        }
        Commands::Refresh {
            video_ids,
            fixtures,
            force,
        } => {
            if video_ids.is_empty() {
                return Err(anyhow!("No video ids given"));
            }
            let source = Arc::new(FixtureSource::new(fixtures));
            let state = StateManager::new(config.state.state_dir.clone()).await?;
            let pipeline = ChapterPipeline::from_config(&config, source.clone(), source, state)?;

            let mut failed = 0;
            for (video_id, result) in pipeline.refresh_many(&video_ids, force).await {
                match result {
                    Ok(refresh) => println!("{}", serde_json::to_string_pretty(&refresh)?),
                    Err(e) => {
                        failed += 1;
                        warn!("❌ {}: {}", video_id, e);
                    }
                }
            }
            if failed > 0 {
                return Err(anyhow!("{} of {} refreshes failed", failed, video_ids.len()));
            }
        }
        Commands::State { command } => {
            let state = StateManager::new(config.state.state_dir.clone()).await?;
            match command {
                StateCommands::List => {
                    let records = state.list_records().await;
                    if records.is_empty() {
                        info!("📭 No video state found");
                    }
                    for record in records {
                        let checked = record
                            .last_skip_segment_check
                            .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
                            .unwrap_or_else(|| "never".to_string());
                        println!(
                            "{}\t{} chapters\tchecked {}",
                            record.video_id,
                            record.chapters.len(),
                            checked
                        );
                    }
                }
                StateCommands::Show { video_id } => match state.get_record(&video_id).await {
                    Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
                    None => warn!("No state for {}", video_id),
                },
                StateCommands::Reset { video_id } => {
                    if state.reset_record(&video_id).await? {
                        info!("✅ Reset state for {}", video_id);
                    } else {
                        warn!("No state for {}", video_id);
                    }
                }
            }
        }
    }

    Ok(())
}

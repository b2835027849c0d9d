//! narrate - Convert text documents into per-chapter audiobook files

mod config;
mod input;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use config::AppConfig;
use indicatif::{ProgressBar, ProgressStyle};
use input::LoadOptions;
use narrator_core::pipeline::FailureKind;
use narrator_core::{
    CommandSpeechEngine, Document, EngineKind, FfmpegTranscoder, Pipeline, PipelineEvent, PipelineOptions,
    PipelineOutcome, SoxConcatenator, TargetFormat, VoiceSettings,
};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "narrate")]
#[command(about = "Convert text documents into per-chapter audiobook files", long_about = None)]
#[command(version)]
struct Args {
    /// Path to the text file
    input: Option<PathBuf>,

    /// Output directory (default: ./audiobook_output)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Speech engine voice
    #[arg(long)]
    voice: Option<String>,

    /// Speed multiplier (0.5-2.0)
    #[arg(long)]
    speed: Option<f32>,

    /// Output format (mp3, m4b, aiff)
    #[arg(long)]
    format: Option<TargetFormat>,

    /// Speech engine (say, espeak)
    #[arg(long)]
    engine: Option<EngineKind>,

    /// Maximum characters per synthesis chunk
    #[arg(long)]
    max_chars: Option<usize>,

    /// Treat the whole text as a single chapter
    #[arg(long)]
    no_detect: bool,

    /// Skip text cleaning
    #[arg(long)]
    no_clean: bool,

    /// Show detected chapters and exit
    #[arg(long)]
    list_chapters: bool,

    /// Write a JSON run report to this path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Config file (default: <config dir>/narrator/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Check that the external tools can be found
    Check,
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Set default voice
    SetVoice {
        /// Voice name as understood by the engine
        voice: String,
    },
    /// Set default speed
    SetSpeed {
        /// Value (0.5-2.0)
        value: f32,
    },
    /// Set default output format
    SetFormat {
        /// mp3, m4b or aiff
        format: TargetFormat,
    },
    /// Set default speech engine
    SetEngine {
        /// say or espeak
        engine: EngineKind,
    },
}

/// JSON written by `--report`.
#[derive(Serialize)]
struct RunReport<'a> {
    title: &'a str,
    input: &'a Path,
    format: TargetFormat,
    generated_at: DateTime<Utc>,
    #[serde(flatten)]
    outcome: &'a PipelineOutcome,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = AppConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    init_logging(args.verbose, &config.logging.level);

    match &args.command {
        Some(Commands::Config { action }) => {
            return handle_config_command(action, args.config.as_deref());
        }
        Some(Commands::Check) => {
            return check_tools(&config);
        }
        None => {}
    }

    let input_path = args
        .input
        .clone()
        .ok_or_else(|| anyhow::anyhow!("Input file path is required. Run 'narrate --help' for usage."))?;

    if !input_path.exists() {
        anyhow::bail!("Input file not found: {}", input_path.display());
    }

    let config = apply_overrides(config, &args);

    let load_options = LoadOptions {
        detect_chapters: config.processing.detect_chapters,
        clean_text: config.processing.clean_text,
        chapter_patterns: config.processing.chapter_patterns.clone(),
    };
    eprintln!("Reading: {}", input_path.display());
    let document = input::load_document(&input_path, &load_options).context("Failed to load document")?;

    eprintln!(
        "Book: \"{}\" by {}",
        document.title,
        document.author.as_deref().unwrap_or("Unknown")
    );
    eprintln!(
        "Chapters: {}, Words: ~{}",
        document.chapters.len(),
        document.total_words()
    );

    if args.list_chapters {
        print_chapter_summary(&document);
        return Ok(());
    }

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} chunks ({eta}) {msg}")?
            .progress_chars("#>-"),
    );

    let pipeline = build_pipeline(&config).with_progress({
        let pb = pb.clone();
        move |event| match event {
            PipelineEvent::ChapterStarted { chapter, title, chunks } => {
                pb.inc_length(*chunks as u64);
                pb.set_message(format!("ch {}: {}", chapter, title));
            }
            PipelineEvent::ChunkFinished { .. } => pb.inc(1),
            PipelineEvent::ChapterFinished { chapter, produced } => {
                if !produced {
                    pb.println(format!("Chapter {} produced no audio", chapter));
                }
            }
        }
    });

    let outcome = tokio::select! {
        result = pipeline.process_document(&document) => result.context("Audio generation failed")?,
        _ = tokio::signal::ctrl_c() => {
            pb.abandon_with_message("Interrupted");
            anyhow::bail!("Interrupted; temporary files removed, finished chapters kept");
        }
    };

    pb.finish_with_message("Done");

    print_outcome(&outcome);

    if let Some(report_path) = &args.report {
        write_report(report_path, &document, &input_path, config.audio.format, &outcome)?;
        eprintln!("Report: {}", report_path.display());
    }

    if outcome.files.is_empty() {
        anyhow::bail!("No audio files generated");
    }

    Ok(())
}

fn init_logging(verbose: bool, level: &str) {
    let level = if verbose { "debug" } else { level };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

/// Layer command-line flags over the loaded configuration.
fn apply_overrides(mut config: AppConfig, args: &Args) -> AppConfig {
    if let Some(output) = &args.output {
        config.output_dir = Some(output.clone());
    }
    if let Some(voice) = &args.voice {
        config.audio.voice = Some(voice.clone());
    }
    if let Some(speed) = args.speed {
        config.audio.speed = speed;
    }
    if let Some(format) = args.format {
        config.audio.format = format;
    }
    if let Some(engine) = args.engine {
        config.audio.engine = engine;
    }
    if let Some(max_chars) = args.max_chars {
        config.processing.max_chunk_chars = max_chars;
    }
    if args.no_detect {
        config.processing.detect_chapters = false;
    }
    if args.no_clean {
        config.processing.clean_text = false;
    }
    config.normalized()
}

fn build_pipeline(config: &AppConfig) -> Pipeline {
    let engine_kind = config.audio.engine;
    let engine = CommandSpeechEngine::new(engine_kind, config.tools.engine_program(engine_kind));
    let tool_timeout = Some(config.performance.tool_timeout());
    let combiner = SoxConcatenator::new(config.tools.sox.clone(), tool_timeout);
    let transcoder = FfmpegTranscoder::new(config.tools.ffmpeg.clone(), tool_timeout);

    let mut voice = VoiceSettings::new().with_speed(config.audio.speed);
    voice.voice = config.audio.voice.clone();

    let mut options = PipelineOptions::new(config.output_dir());
    options.format = config.audio.format;
    options.bitrate_kbps = config.audio.bitrate_kbps;
    options.voice = voice;
    options.max_chunk_chars = config.processing.max_chunk_chars;
    options.synthesis = config.performance.synthesis_policy();
    options.chapter_workers = config.performance.chapter_workers;
    options.chunk_workers = config.performance.chunk_workers;
    options.synthesis_workers = config.performance.synthesis_workers;
    options.workspace_root = config.temp_dir.clone();

    Pipeline::new(Box::new(engine), Box::new(combiner), Box::new(transcoder), options)
}

fn print_chapter_summary(document: &Document) {
    println!();
    println!("Title: {}", document.title);
    if let Some(author) = &document.author {
        println!("Author: {}", author);
    }
    println!("Characters: {}", document.content.chars().count());

    if document.chapters.is_empty() {
        println!("No chapters detected; the whole text becomes one file.");
        return;
    }

    println!("Chapters:");
    for chapter in &document.chapters {
        println!(
            "  {:>3}. {} ({} chars)",
            chapter.number,
            chapter.title,
            chapter.char_count()
        );
    }
}

fn print_outcome(outcome: &PipelineOutcome) {
    eprintln!();
    for file in &outcome.files {
        println!("{}", file.path.display());
    }

    for failure in &outcome.failures {
        match &failure.kind {
            FailureKind::Partial {
                failed_chunks,
                total_chunks,
            } => eprintln!(
                "  Chapter {} \"{}\": incomplete, {}/{} chunks failed",
                failure.chapter,
                failure.title,
                failed_chunks.len(),
                total_chunks
            ),
            FailureKind::Dropped { reason } => eprintln!(
                "  Chapter {} \"{}\": skipped - {}",
                failure.chapter, failure.title, reason
            ),
        }
    }

    eprintln!(
        "\nCompleted: {}, Incomplete: {}, Failed: {}",
        outcome.files.len(),
        outcome.partial_chapters().count(),
        outcome.dropped_chapters().count()
    );
}

fn write_report(
    path: &Path,
    document: &Document,
    input: &Path,
    format: TargetFormat,
    outcome: &PipelineOutcome,
) -> Result<()> {
    let report = RunReport {
        title: &document.title,
        input,
        format,
        generated_at: Utc::now(),
        outcome,
    };
    let json = serde_json::to_string_pretty(&report)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write report: {}", path.display()))?;
    Ok(())
}

fn check_tools(config: &AppConfig) -> Result<()> {
    let engine = config.audio.engine;
    let tools = [
        (
            engine.default_program(),
            config
                .tools
                .engine_program(engine)
                .unwrap_or_else(|| PathBuf::from(engine.default_program())),
        ),
        ("sox", config.tools.sox.clone().unwrap_or_else(|| PathBuf::from("sox"))),
        (
            "ffmpeg",
            config.tools.ffmpeg.clone().unwrap_or_else(|| PathBuf::from("ffmpeg")),
        ),
    ];

    let mut missing = 0;
    for (name, program) in &tools {
        match which::which(program) {
            Ok(found) => println!("  {:<10} {}", name, found.display()),
            Err(_) => {
                println!("  {:<10} NOT FOUND ({})", name, program.display());
                missing += 1;
            }
        }
    }

    if missing > 0 {
        anyhow::bail!("{} required tool(s) missing", missing);
    }
    println!("All tools available.");
    Ok(())
}

fn handle_config_command(action: &ConfigAction, path: Option<&Path>) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = AppConfig::load(path)?;
            let location = match path {
                Some(p) => p.to_path_buf(),
                None => AppConfig::config_path()?,
            };
            println!("Configuration file: {:?}", location);
            println!();
            print!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigAction::SetVoice { voice } => {
            let mut config = AppConfig::load(path)?;
            config.audio.voice = Some(voice.clone());
            config.save(path)?;
            println!("Default voice set to: {}", voice);
        }
        ConfigAction::SetSpeed { value } => {
            let mut config = AppConfig::load(path)?;
            config.audio.speed = value.clamp(0.5, 2.0);
            config.save(path)?;
            println!("Default speed set to: {}", config.audio.speed);
        }
        ConfigAction::SetFormat { format } => {
            let mut config = AppConfig::load(path)?;
            config.audio.format = *format;
            config.save(path)?;
            println!("Default format set to: {}", format);
        }
        ConfigAction::SetEngine { engine } => {
            let mut config = AppConfig::load(path)?;
            config.audio.engine = *engine;
            config.save(path)?;
            println!("Default engine set to: {}", engine);
        }
    }
    Ok(())
}

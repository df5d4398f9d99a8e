use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hitmeter::audio::wav;
use hitmeter::config::AppConfig;
use hitmeter::mastering::{CompressionLevel, EqPreset, LoudnessTarget, MasteringConfig};
use hitmeter::scoring::{self, ScoreReport, TrackMetadata};
use hitmeter::{AnalysisReport, ExtractorConfig, SUPPORTED_EXTENSIONS};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "hitmeter", version, about = "Automated mastering and hit-potential scoring")]
struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Master a WAV file and report levels of the result
    Master {
        /// Raw mix (WAV)
        input: PathBuf,

        /// Where to write the mastered 32-bit float WAV
        output: PathBuf,

        /// Loudness target in LUFS (-20 to -8)
        #[arg(short, long, allow_negative_numbers = true, conflicts_with = "platform")]
        target_loudness: Option<f64>,

        /// Use a platform loudness target (spotify, apple-music, youtube, soundcloud, cd)
        #[arg(short, long)]
        platform: Option<LoudnessTarget>,

        /// Compression level (light, medium, heavy, limiting)
        #[arg(short, long)]
        compression: Option<CompressionLevel>,

        /// EQ preset (balanced, bright, warm, bass-boost)
        #[arg(short, long)]
        eq: Option<EqPreset>,

        /// Stereo width multiplier (0 = mono, 1 = unchanged, 2 = double side)
        #[arg(short, long)]
        width: Option<f64>,

        /// Print the analysis as JSON
        #[arg(long)]
        json: bool,
    },

    /// Score WAV files (or directories of them) for hit potential
    Score {
        /// Files or directories to score
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Track title (single file only; defaults to the file name)
        #[arg(long)]
        title: Option<String>,

        /// Genre tag, carried into the report metadata
        #[arg(long)]
        genre: Option<String>,

        /// Number of parallel workers (0 = auto-detect from config)
        #[arg(short = 'j', long, default_value = "0")]
        jobs: usize,

        /// Coarser hop and approximate harmonic ratio, for slow machines
        #[arg(long)]
        lightweight: bool,

        /// Print reports as JSON
        #[arg(long)]
        json: bool,
    },

    /// Measure loudness, peak, crest factor and stereo width of a WAV file
    Analyze {
        input: PathBuf,

        /// Print the analysis as JSON
        #[arg(long)]
        json: bool,
    },

    /// List EQ presets, compression levels and platform loudness targets
    Presets,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load config file (optional, defaults if missing)
    let config = AppConfig::load();

    match cli.command {
        Commands::Master {
            input,
            output,
            target_loudness,
            platform,
            compression,
            eq,
            width,
            json,
        } => {
            // CLI > config > built-in defaults
            let defaults = &config.mastering;
            let target = platform
                .map(|p| p.lufs())
                .or(target_loudness)
                .unwrap_or(defaults.target_loudness);
            let mastering = MasteringConfig::new(
                target,
                compression.unwrap_or(defaults.compression),
                eq.unwrap_or(defaults.eq_preset),
                width.unwrap_or(defaults.stereo_width),
            )
            .context("Invalid mastering settings")?;

            let raw = wav::load_wav(&input)
                .with_context(|| format!("Failed to load {}", input.display()))?;
            let mastered = hitmeter::master(&raw, &mastering).context("Mastering failed")?;
            wav::write_wav(&output, &mastered)
                .with_context(|| format!("Failed to write {}", output.display()))?;

            let report = hitmeter::analyze(&mastered).context("Analysis failed")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "Mastered {} -> {} ({} LUFS, {} compression, {} EQ, width {})",
                    input.display(),
                    output.display(),
                    mastering.target_loudness(),
                    mastering.compression(),
                    mastering.eq_preset(),
                    mastering.stereo_width()
                );
                println!();
                print_analysis(&report);
            }
        }

        Commands::Score {
            paths,
            title,
            genre,
            jobs,
            lightweight,
            json,
        } => {
            let files = collect_audio_files(&paths);
            if files.is_empty() {
                anyhow::bail!("No WAV files found in the given paths.");
            }
            if title.is_some() && files.len() > 1 {
                anyhow::bail!("--title can only be used when scoring a single file.");
            }

            let extractor = if lightweight {
                ExtractorConfig::lightweight()
            } else {
                config.analysis.extractor_config()
            };
            let workers = if jobs > 0 { jobs } else { config.resolve_workers() };
            log::info!("Scoring {} files with {} workers", files.len(), workers);

            let results = score_files(&files, title.as_deref(), genre.as_deref(), &extractor, workers)?;

            let mut reports = Vec::new();
            let mut failed = 0usize;
            for (path, result) in results {
                match result {
                    Ok(report) => reports.push(report),
                    Err(e) => {
                        eprintln!("Failed to score {}: {:#}", path.display(), e);
                        failed += 1;
                    }
                }
            }
            if reports.is_empty() {
                anyhow::bail!("All {} files failed to score", failed);
            }

            if json {
                if let [report] = reports.as_slice() {
                    println!("{}", serde_json::to_string_pretty(report)?);
                } else {
                    println!("{}", serde_json::to_string_pretty(&reports)?);
                }
            } else if let [report] = reports.as_slice() {
                print_score_report(report);
            } else {
                for report in &reports {
                    print_score_report(report);
                    println!();
                }
                print_score_table(&mut reports);
            }
            if failed > 0 {
                eprintln!("{} scored, {} failed", reports.len(), failed);
            }
        }

        Commands::Analyze { input, json } => {
            let audio = wav::load_wav(&input)
                .with_context(|| format!("Failed to load {}", input.display()))?;
            let report = hitmeter::analyze(&audio).context("Analysis failed")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", input.display());
                println!();
                print_analysis(&report);
            }
        }

        Commands::Presets => print_presets(),
    }

    Ok(())
}

/// Expand directories into the WAV files beneath them, sorted for stable output.
fn collect_audio_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_file() {
            files.push(path.clone());
            continue;
        }
        for entry in WalkDir::new(path).follow_links(true).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let ext = entry
                .path()
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("")
                .to_lowercase();
            if SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
                files.push(entry.into_path());
            }
        }
    }
    files.sort();
    files.dedup();
    files
}

fn score_files(
    files: &[PathBuf],
    title: Option<&str>,
    genre: Option<&str>,
    extractor: &ExtractorConfig,
    workers: usize,
) -> Result<Vec<(PathBuf, Result<ScoreReport>)>> {
    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} tracks ({eta} remaining)",
        )
        .context("Invalid progress bar template")?
        .progress_chars("=>-"),
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .context("Failed to build worker pool")?;

    let results: Vec<(PathBuf, Result<ScoreReport>)> = pool.install(|| {
        files
            .par_iter()
            .map(|path| {
                let metadata = TrackMetadata {
                    title: title.map_or_else(|| track_title(path), str::to_string),
                    genre: genre.map(str::to_string),
                    duration: None,
                };
                let result = wav::load_wav(path)
                    .with_context(|| format!("Failed to load {}", path.display()))
                    .and_then(|audio| {
                        scoring::score_with(&audio, &metadata, extractor).context("Scoring failed")
                    });
                pb.inc(1);
                (path.clone(), result)
            })
            .collect()
    });

    pb.finish_and_clear();
    Ok(results)
}

fn track_title(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() > width {
        let head: String = s.chars().take(width - 3).collect();
        format!("{}...", head)
    } else {
        s.to_string()
    }
}

/// Print one score report: category breakdown, insights, recommendations.
fn print_score_report(report: &ScoreReport) {
    println!("{}", report.title);
    println!("{}", "=".repeat(report.title.chars().count().max(20)));
    println!("Hit score: {:.2}", report.overall_score);
    println!();

    for (category, value) in report.category_scores.iter() {
        println!("  {:<20} {:>6.2}", category.label(), value);
    }
    println!();

    println!("Insights:");
    for line in &report.insights {
        println!("  {}", line);
    }
    println!();

    println!("Recommendations:");
    for line in &report.recommendations {
        println!("  {}", line);
    }
    println!();

    let f = &report.features;
    println!(
        "Features: {:.1}s, {:.1} BPM ({} beats), {:.2} LUFS, DR {:.2} dB, centroid {:.0} Hz, harmonic {:.2}{}",
        f.duration,
        f.tempo,
        f.beat_count,
        f.loudness,
        f.dynamic_range,
        f.spectral_centroid,
        f.harmonic_ratio,
        if f.harmonic_mode.is_approximate() { " (estimated)" } else { "" },
    );
}

/// Print a batch summary ranked by overall score.
fn print_score_table(reports: &mut [ScoreReport]) {
    reports.sort_by(|a, b| b.overall_score.total_cmp(&a.overall_score));

    println!(
        "{:<30} {:>7}  {:>6} {:>6} {:>6} {:>6} {:>6}",
        "Track", "Score", "Prod", "Comm", "Innov", "Emot", "Radio"
    );
    println!("{}", "-".repeat(77));

    for r in reports.iter() {
        let s = &r.category_scores;
        println!(
            "{:<30} {:>7.2}  {:>6.2} {:>6.2} {:>6.2} {:>6.2} {:>6.2}",
            truncate(&r.title, 30),
            r.overall_score,
            s.production_quality,
            s.commercial_appeal,
            s.innovation,
            s.emotional_impact,
            s.radio_readiness,
        );
    }

    println!();
    println!("Prod=Production Quality  Comm=Commercial Appeal  Innov=Innovation");
    println!("Emot=Emotional Impact  Radio=Radio Readiness");
}

fn print_analysis(r: &AnalysisReport) {
    println!("Loudness:       {:>8.2} LUFS", r.loudness_lufs);
    println!("Peak level:     {:>8.2} dBFS", r.peak_level_db);
    println!("RMS level:      {:>8.2} dBFS", r.rms_level_db);
    println!("Crest factor:   {:>8.2} dB", r.dynamic_range_db);
    println!("Centroid:       {:>8.0} Hz", r.spectral_centroid);
    println!("Stereo width:   {:>8.2}", r.stereo_width);
    println!(
        "Format:         {} ch @ {} Hz, {:.2}s",
        r.channels, r.sample_rate, r.duration
    );
}

fn print_presets() {
    println!("EQ presets:");
    for p in EqPreset::ALL {
        println!("  {:<12} {:<12} {}", p.id(), p.name(), p.description());
    }
    println!();

    println!("Compression levels:");
    println!(
        "  {:<12} {:>9} {:>6} {:>9} {:>9}",
        "", "Threshold", "Ratio", "Attack", "Release"
    );
    for c in CompressionLevel::ALL {
        let p = c.params();
        println!(
            "  {:<12} {:>9.2} {:>6.1} {:>8.4}s {:>8.3}s",
            c.id(),
            p.threshold,
            p.ratio,
            p.attack_secs,
            p.release_secs
        );
    }
    println!();

    println!("Platform loudness targets:");
    for t in LoudnessTarget::ALL {
        println!("  {:<12} {:>6.1} LUFS", t.id(), t.lufs());
    }
}

//! Align track files (beats + frame features JSON) in parallel
//!
//! Usage:
//!   canon-align [--jobs N] [--output-dir DIR] [--config FILE] <track1.json> <track2.json> ...
//!
//! Notes:
//! - Parallelism is across tracks (batch-level). Each alignment is still single-threaded.
//! - Default workers: (available CPU threads - 1), keeping one core free for the system.
//! - Each alignment is written to `<stem>.canon.json` next to its input or in `--output-dir`.

use canon_align::canon::loop_graph::bar_aligned_share;
use canon_align::io::{load_track_file, write_alignment};
use canon_align::{analyze_batch, AnalysisError, CanonConfig, TrackInput};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Debug, Parser)]
#[command(name = "canon-align", version, about = "Beat-synchronous canon alignment")]
struct Cli {
    /// Track files (JSON with beats, duration and frame features)
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Directory for the `.canon.json` outputs (default: next to each input)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// JSON configuration file; flags below override its values
    #[arg(long, env = "CANON_ALIGN_CONFIG")]
    config: Option<PathBuf>,

    /// Beats per bar
    #[arg(long)]
    beats_per_bar: Option<usize>,

    /// Context window (beats)
    #[arg(long)]
    context_window: Option<usize>,

    /// Similarity threshold
    #[arg(long)]
    similarity_threshold: Option<f32>,

    /// Minimum phase alignment
    #[arg(long)]
    min_phase_alignment: Option<f32>,

    /// Minimum pairs per offset/run
    #[arg(long)]
    min_pairs: Option<usize>,

    /// Ranked offsets handed to candidate collection
    #[arg(long)]
    top_candidates: Option<usize>,

    /// Maximum loop edges per beat
    #[arg(long)]
    max_neighbors: Option<usize>,

    /// Parallel workers (default: CPU-1)
    #[arg(long)]
    jobs: Option<usize>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn default_jobs() -> usize {
    let n = std::thread::available_parallelism().map(|v| v.get()).unwrap_or(1);
    std::cmp::max(1, n.saturating_sub(1))
}

fn build_config(cli: &Cli) -> Result<CanonConfig, AnalysisError> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| AnalysisError::Io { context: "reading config file", source: e })?;
            serde_json::from_str(&text)
                .map_err(|e| AnalysisError::Json { context: "parsing config file", source: e })?
        }
        None => CanonConfig::default(),
    };

    if let Some(v) = cli.beats_per_bar {
        config.beats_per_bar = v;
    }
    if let Some(v) = cli.context_window {
        config.context_window = v;
    }
    if let Some(v) = cli.similarity_threshold {
        config.similarity_threshold = v;
    }
    if let Some(v) = cli.min_phase_alignment {
        config.min_phase_alignment = v;
    }
    if let Some(v) = cli.min_pairs {
        config.min_pairs = v;
    }
    if let Some(v) = cli.top_candidates {
        config.top_candidates = v;
    }
    if let Some(v) = cli.max_neighbors {
        config.max_neighbors = v;
    }

    config.validate()?;
    Ok(config)
}

fn output_path(input: &Path, output_dir: Option<&Path>) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "track".to_string());
    let name = format!("{}.canon.json", stem);
    match output_dir {
        Some(dir) => dir.join(name),
        None => input.with_file_name(name),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = build_config(&cli)?;
    if let Some(dir) = &cli.output_dir {
        std::fs::create_dir_all(dir)?;
    }

    let jobs = cli.jobs.map(|j| std::cmp::max(1, j)).unwrap_or_else(default_jobs);
    eprintln!("Batch: {} tracks, jobs={}", cli.inputs.len(), jobs);

    let t0 = Instant::now();

    // Load everything up front; unreadable tracks are reported and skipped
    let mut paths = Vec::new();
    let mut tracks = Vec::new();
    let mut failures = 0usize;
    for path in &cli.inputs {
        match load_track_file(path).and_then(|t| {
            let features = t.features.into_features()?;
            Ok(TrackInput {
                beats: t.beats,
                duration: t.duration,
                features,
            })
        }) {
            Ok(track) => {
                paths.push(path.as_path());
                tracks.push(track);
            }
            Err(e) => {
                failures += 1;
                eprintln!("{}: load failed: {}", path.display(), e);
            }
        }
    }

    let pool = rayon::ThreadPoolBuilder::new().num_threads(jobs).build()?;
    let results = pool.install(|| analyze_batch(&tracks, &config));

    for (path, result) in paths.iter().zip(results) {
        match result {
            Ok(Some(alignment)) => {
                let out = output_path(path, cli.output_dir.as_deref());
                if let Err(e) = write_alignment(&out, &alignment) {
                    failures += 1;
                    eprintln!("{}: write failed: {}", path.display(), e);
                    continue;
                }
                println!(
                    "{}: offset={} segments={} coverage={:.3} loop_edges={} bar_aligned={:.2}{}",
                    path.display(),
                    alignment.offset,
                    alignment.segments.len(),
                    alignment.coverage.ratio,
                    alignment.loop_candidates.len(),
                    bar_aligned_share(&alignment.loop_candidates, alignment.beats_per_bar),
                    if alignment.is_sequential_fallback() { " (sequential fallback)" } else { "" }
                );
            }
            Ok(None) => println!("{}: not enough beats, skipped", path.display()),
            Err(e) => {
                failures += 1;
                eprintln!("{}: alignment failed: {}", path.display(), e);
            }
        }
    }

    eprintln!(
        "Done: {} tracks in {:.2}s ({} failed)",
        cli.inputs.len(),
        t0.elapsed().as_secs_f32(),
        failures
    );

    if failures > 0 {
        std::process::exit(1);
    }
    Ok(())
}

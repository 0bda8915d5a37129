// Hindemith melody generator: CLI entry point.
//
// Enumerates every melody the chapter-one rules allow, writes one LilyPond
// score per (direction changes, length) subset, and optionally records a MIDI
// preview of the exported melodies.
//
// Usage:
//   hindemith [--config FILE] generate [--out-dir DIR] [--max-intervals N]
//     [--seed N] [--no-shuffle] [--voice NAME] [--preview out.mid] [--realtime]
//     [--json]
//   hindemith check 2 3 -4 -1
//   hindemith ranges
//
// Log verbosity follows RUST_LOG (default: info).

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use hindemith_melody::buckets::ClassificationGrid;
use hindemith_melody::config::{GeneratorConfig, VocalRange};
use hindemith_melody::generator::Generator;
use hindemith_melody::intervals::{FIRST_INTERVALS, Interval, successors};
use hindemith_melody::lilypond::{select_melodies, write_scores};
use hindemith_melody::melody::Melody;
use hindemith_melody::midi::{MidiRecorder, NotePlayer, PacedPlayer, play_melodies};
use hindemith_melody::rules::first_violation;
use hindemith_prng::MelodyRng;
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hindemith")]
#[command(about = "Generate melodies that follow Hindemith's chapter-one rules")]
#[command(version)]
struct Cli {
    /// JSON config file. Flags override its values.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full search and write LilyPond scores
    Generate(GenerateArgs),

    /// Check one interval sequence against the rules
    Check(CheckArgs),

    /// List the configured vocal ranges
    Ranges,
}

#[derive(Args)]
struct GenerateArgs {
    /// Directory for the .ly files
    #[arg(short, long, default_value = "out")]
    out_dir: PathBuf,

    #[arg(long)]
    min_intervals: Option<usize>,

    #[arg(long)]
    max_intervals: Option<usize>,

    #[arg(long)]
    max_height: Option<i16>,

    #[arg(long)]
    max_direction_changes: Option<usize>,

    /// Melodies kept per final-interval group
    #[arg(long)]
    cap: Option<usize>,

    /// Shuffle seed (default: derived from the clock)
    #[arg(long)]
    seed: Option<u64>,

    /// Keep discovery order instead of shuffling over-full groups
    #[arg(long)]
    no_shuffle: bool,

    /// Only export melodies inside this vocal range
    #[arg(long)]
    voice: Option<String>,

    /// Record the exported melodies to this MIDI file
    #[arg(long)]
    preview: Option<PathBuf>,

    /// Preview note length in milliseconds
    #[arg(long, default_value_t = 500)]
    hold_ms: u64,

    /// Preview gap between melodies in milliseconds
    #[arg(long, default_value_t = 2000)]
    pause_ms: u64,

    /// Play the preview at listening speed, logging each note at debug level
    #[arg(long, requires = "preview")]
    realtime: bool,

    /// Print the subset summary as JSON on stdout
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct CheckArgs {
    /// Signed semitone steps from the start pitch, e.g. 2 3 -4 -1
    #[arg(required = true, allow_negative_numbers = true)]
    intervals: Vec<Interval>,
}

fn main() -> Result<()> {
    setup_tracing()?;
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => GeneratorConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => GeneratorConfig::default(),
    };

    match cli.command {
        Commands::Generate(args) => generate(config, args),
        Commands::Check(args) => check(&config, &args),
        Commands::Ranges => {
            for (name, range) in &config.vocal_ranges {
                println!("{:<14} {:>4} {:>4} {:>4}", name, range.low, range.mid, range.high);
            }
            Ok(())
        }
    }
}

fn setup_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err: Box<dyn std::error::Error + Send + Sync>| {
            anyhow!("failed to initialise tracing: {err}")
        })?;
    Ok(())
}

fn apply_overrides(config: &mut GeneratorConfig, args: &GenerateArgs) {
    if let Some(n) = args.min_intervals {
        config.min_melody_intervals = n;
    }
    if let Some(n) = args.max_intervals {
        config.max_melody_intervals = n;
    }
    if let Some(h) = args.max_height {
        config.max_melody_height = h;
    }
    if let Some(n) = args.max_direction_changes {
        config.max_direction_changes = n;
    }
    if let Some(cap) = args.cap {
        config.max_melodies_per_final_interval_subset = cap;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    if args.no_shuffle {
        config.shuffle = false;
    }
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

fn generate(mut config: GeneratorConfig, args: GenerateArgs) -> Result<()> {
    apply_overrides(&mut config, &args);
    config.validate().context("invalid generator settings")?;
    let voice = match &args.voice {
        Some(name) => Some(config.vocal_range(name)?.clone()),
        None => None,
    };

    let seed = config.seed.unwrap_or_else(clock_seed);
    info!(seed, "Seeded shuffle");
    let cap = config.max_melodies_per_final_interval_subset;

    let mut generator = Generator::new(config, MelodyRng::new(seed));
    let summary = generator.generate();
    let grid = generator.into_grid();

    let written = write_scores(&grid, cap, voice.as_ref(), &args.out_dir)
        .with_context(|| format!("failed to write scores to {}", args.out_dir.display()))?;
    info!(files = written.len(), dir = %args.out_dir.display(), "Scores written");

    if let Some(path) = &args.preview {
        let mut recorder = MidiRecorder::new();
        let hold = Duration::from_millis(args.hold_ms);
        let pause = Duration::from_millis(args.pause_ms);
        let played = if args.realtime {
            let mut paced = PacedPlayer::new(&mut recorder);
            play_grid(&mut paced, &grid, cap, voice.as_ref(), hold, pause)?
        } else {
            play_grid(&mut recorder, &grid, cap, voice.as_ref(), hold, pause)?
        };
        recorder
            .write(path)
            .with_context(|| format!("failed to write preview {}", path.display()))?;
        info!(path = %path.display(), melodies = played, "Preview written");
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }
    Ok(())
}

/// Play every exported melody of `grid`, subset by subset.
fn play_grid<P: NotePlayer>(
    player: &mut P,
    grid: &ClassificationGrid,
    cap: usize,
    voice: Option<&VocalRange>,
    hold: Duration,
    pause: Duration,
) -> Result<usize> {
    let mut played = 0;
    for subset in grid.non_empty_subsets() {
        let melodies = select_melodies(subset, cap, voice)?;
        played += play_melodies(player, melodies, hold, pause)?;
    }
    Ok(played)
}

fn check(config: &GeneratorConfig, args: &CheckArgs) -> Result<()> {
    let limits = config.rule_limits();
    let mut melody = Melody::new(config.start_tone());
    // Walk it the way the search would: each step must be a permitted
    // successor and every prefix must pass the rules.
    for &interval in &args.intervals {
        let reachable = match melody.last_interval() {
            Some(previous) => successors(previous).contains(&interval),
            None => FIRST_INTERVALS.contains(&interval),
        };
        if !reachable {
            println!("{}: illegal, {} cannot follow here", melody.label(), interval);
            return Ok(());
        }
        melody.push_interval(interval);
        if let Some(rule) = first_violation(&melody, &limits) {
            println!("{}: illegal, {}", melody.label(), rule);
            return Ok(());
        }
    }
    let status = if melody.is_closed() { "closed" } else { "open" };
    println!("{}: legal, {}", melody.label(), status);
    Ok(())
}

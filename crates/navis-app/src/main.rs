//! NAVIS command-line tool
//!
//! Inspect, convert and transform recordings from neuromorphic auditory
//! sensors.
//!
//! # Usage
//!
//! ```bash
//! # Event count and time span of a stereo recording
//! navis --layout stereo info recording.aedat
//!
//! # Structural checks with a JSON configuration
//! navis --config nas64.json check recording.aedat
//!
//! # Copy raw device ticks into CSV
//! navis convert recording.aedat --output out/rec --to csv --raw
//!
//! # Sonogram counts as CSV
//! navis --bin-size 10000 sonogram recording.aedat --output sonogram.csv
//!
//! # Synthetic sweep
//! navis generate sweep --output sweep --freq 5 --length-us 1000000
//! ```

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use navis_core::config::{AddressSize, MonoStereo, OnOffBoth, RecordingConfig};
use navis_core::normalize::normalize;
use navis_core::transform::{self, PhaseLockMode};
use navis_core::validate::validate;
use navis_core::{generate, views, OutputFormat, Side, SpikeStream};
use navis_native::config::load_recording_config;
use navis_native::loaders::{load_any, InputFormat};
use navis_native::savers::save_as;

/// NAVIS command-line tool
#[derive(Parser, Debug)]
#[command(name = "navis")]
#[command(author, version, about = "Neuromorphic auditory AEDAT toolkit", long_about = None)]
struct Cli {
    /// Logging verbosity level
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    #[command(flatten)]
    recording: RecordingArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Recording topology, either from a JSON file or individual flags.
///
/// Flags override values read from `--config`.
#[derive(Args, Debug)]
struct RecordingArgs {
    /// JSON recording configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Frequency channels per ear
    #[arg(long, global = true)]
    channels: Option<u32>,

    /// Ear layout: mono or stereo
    #[arg(long, global = true)]
    layout: Option<LayoutArg>,

    /// AEDAT address width in bytes (2 or 4)
    #[arg(long, global = true)]
    address_size: Option<u8>,

    /// Microseconds per raw timestamp tick
    #[arg(long, global = true)]
    tick: Option<f64>,

    /// Aggregation window in microseconds
    #[arg(long, global = true)]
    bin_size: Option<u64>,

    /// Polarity layout
    #[arg(long, global = true)]
    polarity: Option<PolarityArg>,

    /// Keep raw timestamps instead of zero-basing them
    #[arg(long, global = true)]
    no_reset: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum LayoutArg {
    Mono,
    Stereo,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum PolarityArg {
    Single,
    Both,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SideArg {
    Left,
    Right,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum GenerateKind {
    /// Up-and-down sweep over every address
    Sweep,
    /// Each address in turn
    Shift,
    /// Uniformly random addresses
    Random,
}

/// Input recording shared by every stream command
#[derive(Args, Debug)]
struct InputArgs {
    /// Recording file (for TXT pairs, the base name or either file)
    input: PathBuf,

    /// Input format (inferred from the extension when omitted)
    #[arg(short, long)]
    format: Option<InputFormat>,
}

/// Destination of a transformed stream
#[derive(Args, Debug)]
struct OutputArgs {
    /// Output base path; the format's suffix is appended
    #[arg(short, long)]
    output: PathBuf,

    /// Output format: aedat, csv, txt or txt_rel
    #[arg(long, default_value = "aedat")]
    to: OutputFormat,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print event count, time span and inter-spike statistics
    Info {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Run the structural checks and fail if any does not pass
    Check {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Re-encode a recording in another format
    Convert {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        output: OutputArgs,

        /// Keep raw device ticks: no normalization and no tick scaling
        #[arg(long)]
        raw: bool,
    },

    /// Write the per-address, per-bin counts as CSV
    Sonogram {
        #[command(flatten)]
        input: InputArgs,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Start the first bin at time 0 instead of the first event
        #[arg(long)]
        start_at_zero: bool,
    },

    /// Collapse ON/OFF pairs into phase-locked events
    PhaseLock {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        output: OutputArgs,

        /// Also emit on ON-to-OFF transitions
        #[arg(long)]
        both_edges: bool,
    },

    /// Duplicate a mono recording into both ears
    MonoToStereo {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        output: OutputArgs,

        /// Right-ear delay in microseconds (may be negative)
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        delay: i64,

        /// Seed for ordering simultaneous events
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Keep one ear of a stereo recording
    StereoToMono {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        output: OutputArgs,

        /// Ear to keep
        #[arg(long, value_enum, default_value = "left")]
        side: SideArg,
    },

    /// Keep the events in `[start, end)` microseconds
    Split {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        output: OutputArgs,

        /// First kept timestamp
        #[arg(long)]
        start: i64,

        /// First excluded timestamp (defaults past the last event)
        #[arg(long)]
        end: Option<i64>,

        /// Shift the kept events so the window starts at 0
        #[arg(long)]
        rezero: bool,
    },

    /// Keep the events of selected addresses
    Extract {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        output: OutputArgs,

        /// Comma-separated addresses
        #[arg(long, value_delimiter = ',', required = true)]
        addresses: Vec<i64>,

        /// Renumber from the smallest selected address
        #[arg(long)]
        rebase: bool,
    },

    /// Drop isolated events with a sliding-window density check
    Segment {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        output: OutputArgs,

        /// Events in the sliding window
        #[arg(long, default_value_t = 10)]
        window: usize,

        /// Maximum window span in microseconds
        #[arg(long)]
        bin_width: i64,
    },

    /// Write a synthetic stream
    Generate {
        /// Stream shape
        #[arg(value_enum)]
        kind: GenerateKind,

        #[command(flatten)]
        output: OutputArgs,

        /// Spikes per address step (sweep, shift) or per second (random)
        #[arg(long, default_value_t = 1)]
        freq: u64,

        /// Sweep repetitions
        #[arg(long, default_value_t = 1)]
        cycles: u64,

        /// Stream length in microseconds
        #[arg(long, default_value_t = 1_000_000)]
        length_us: u64,

        /// Seed for the random stream
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    debug!("NAVIS v{}", env!("CARGO_PKG_VERSION"));

    let config = recording_config(&cli.recording)?;
    debug!(?config, "Recording configuration");

    match cli.command {
        Commands::Info { input } => run_info(&input, &config),
        Commands::Check { input } => run_check(&input, &config),
        Commands::Convert { input, output, raw } => run_convert(&input, &output, raw, &config),
        Commands::Sonogram { input, output, start_at_zero } => {
            run_sonogram(&input, output.as_deref(), start_at_zero, &config)
        }
        Commands::PhaseLock { input, output, both_edges } => {
            let mode = if both_edges { PhaseLockMode::BothEdges } else { PhaseLockMode::OnToOff };
            let locked = transform::phase_lock(&load(&input, &config, false)?, &config, mode)?;
            write(&locked, &output, &config.as_single_polarity())
        }
        Commands::MonoToStereo { input, output, delay, seed } => {
            let mut rng = seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
            let stream = load(&input, &config, false)?;
            let stereo = transform::mono_to_stereo(&stream, &config, delay, &mut rng)?;
            write(&stereo, &output, &config.as_stereo())
        }
        Commands::StereoToMono { input, output, side } => {
            let side = match side {
                SideArg::Left => Side::Left,
                SideArg::Right => Side::Right,
            };
            let mono = transform::stereo_to_mono(&load(&input, &config, false)?, &config, side)?;
            write(&mono, &output, &config.as_mono())
        }
        Commands::Split { input, output, start, end, rezero } => {
            let stream = load(&input, &config, false)?;
            write(&transform::split_time_range(&stream, start, end, rezero)?, &output, &config)
        }
        Commands::Extract { input, output, addresses, rebase } => {
            let stream = load(&input, &config, false)?;
            write(&transform::extract_channels(&stream, &addresses, rebase)?, &output, &config)
        }
        Commands::Segment { input, output, window, bin_width } => {
            let stream = load(&input, &config, false)?;
            let kept = transform::segment(&stream, window, bin_width)?;
            info!(kept = kept.len(), dropped = stream.len() - kept.len(), "Segmented stream");
            write(&kept, &output, &config)
        }
        Commands::Generate { kind, output, freq, cycles, length_us, seed } => {
            let addresses = config.num_addresses() as u64;
            let stream = match kind {
                GenerateKind::Sweep => generate::sweep(freq, cycles, addresses, length_us)?,
                GenerateKind::Shift => generate::shift(freq, addresses, length_us)?,
                GenerateKind::Random => {
                    let mut rng = seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
                    generate::random_addresses(freq, addresses, length_us, &mut rng)?
                }
            };
            write(&stream, &output, &config)
        }
    }
}

/// Build the recording configuration from `--config` and the override flags.
fn recording_config(args: &RecordingArgs) -> anyhow::Result<RecordingConfig> {
    let mut config = match &args.config {
        Some(path) => load_recording_config(path)?,
        None => RecordingConfig::default(),
    };

    if let Some(channels) = args.channels {
        config.num_channels = channels;
    }
    if let Some(layout) = args.layout {
        config.mono_stereo = match layout {
            LayoutArg::Mono => MonoStereo::Mono,
            LayoutArg::Stereo => MonoStereo::Stereo,
        };
    }
    if let Some(size) = args.address_size {
        config.address_size = AddressSize::try_from(size)?;
    }
    if let Some(tick) = args.tick {
        config.timestamp_tick = tick;
    }
    if let Some(bin_size) = args.bin_size {
        config.bin_size = bin_size;
    }
    if let Some(polarity) = args.polarity {
        config.on_off_both = match polarity {
            PolarityArg::Single => OnOffBoth::Single,
            PolarityArg::Both => OnOffBoth::Both,
        };
    }
    if args.no_reset {
        config.reset_timestamp = false;
    }

    config.validate()?;
    Ok(config)
}

/// Load and, unless `raw`, normalize a recording.
fn load(args: &InputArgs, config: &RecordingConfig, raw: bool) -> anyhow::Result<SpikeStream> {
    let format = match args.format {
        Some(format) => format,
        None => InputFormat::from_path(&args.input).with_context(|| {
            format!("cannot infer the format of {}; pass --format", args.input.display())
        })?,
    };
    let mut stream = load_any(&args.input, format, config)?;
    if !raw {
        let normalization = normalize(&mut stream, config);
        debug!(?normalization, "Normalized timestamps");
    }
    Ok(stream)
}

fn write(stream: &SpikeStream, output: &OutputArgs, config: &RecordingConfig) -> anyhow::Result<()> {
    let paths = save_as(stream, &output.output, output.to, config)?;
    for path in &paths {
        info!("Wrote {} events to {}", stream.len(), path.display());
    }
    Ok(())
}

/// Re-encode a recording. Raw streams keep their device ticks.
fn run_convert(
    input: &InputArgs,
    output: &OutputArgs,
    raw: bool,
    config: &RecordingConfig,
) -> anyhow::Result<()> {
    let stream = load(input, config, raw)?;
    let target = if raw { config.as_raw_ticks() } else { *config };
    write(&stream, output, &target)
}

fn run_info(input: &InputArgs, config: &RecordingConfig) -> anyhow::Result<()> {
    let stream = load(input, config, false)?;
    info!("{}", stream.summary());

    let intervals = stream.inter_spike_intervals();
    if let (Some(min), Some(max)) = (intervals.iter().min(), intervals.iter().max()) {
        let mean = intervals.iter().sum::<i64>() as f64 / intervals.len() as f64;
        info!("Inter-spike interval: min {min} us, mean {mean:.2} us, max {max} us");
    }
    Ok(())
}

fn run_check(input: &InputArgs, config: &RecordingConfig) -> anyhow::Result<()> {
    let stream = load(input, config, false)?;
    let report = validate(&stream, config);

    info!("Timestamps non-negative: {}", report.timestamps_nonnegative);
    info!("Timestamps ordered: {}", report.timestamps_ordered);
    info!("Addresses in range: {}", report.addresses_in_range);

    if report.is_valid() {
        info!("All checks passed");
        return Ok(());
    }
    for diagnostic in report.diagnostics() {
        warn!("{diagnostic}");
    }
    let offending = report.offending_addresses();
    if !offending.is_empty() {
        warn!("Offending addresses: {offending:?}");
    }
    bail!("{} failed validation", input.input.display())
}

fn run_sonogram(
    input: &InputArgs,
    output: Option<&Path>,
    start_at_zero: bool,
    config: &RecordingConfig,
) -> anyhow::Result<()> {
    let stream = load(input, config, false)?;
    let matrix = views::sonogram(&stream, config, start_at_zero)?;
    info!(
        addresses = matrix.num_addresses(),
        bins = matrix.num_bins(),
        origin = matrix.origin(),
        "Computed sonogram"
    );

    let mut csv = String::new();
    for row in matrix.rows() {
        let line: Vec<String> = row.iter().map(u32::to_string).collect();
        writeln!(csv, "{}", line.join(","))?;
    }

    match output {
        Some(path) => {
            fs::write(path, csv).with_context(|| format!("failed to write {}", path.display()))?;
            info!("Wrote sonogram to {}", path.display());
        }
        None => print!("{csv}"),
    }
    Ok(())
}

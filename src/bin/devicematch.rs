mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::{
    cmd_batch, cmd_build, cmd_detect, cmd_device_id, cmd_inspect, cmd_profiles, cmd_validate,
    MatchArgs,
};

#[derive(Parser)]
#[command(name = "devicematch")]
#[command(
    about = "Device detection from HTTP User-Agent strings",
    long_about = "devicematch - Classify HTTP User-Agents into device, platform and browser profiles\n\n\
    Compile a JSON device description into a snapshot, then match User-Agents and \n\
    related headers against it. Every request resolves to a profile per component, \n\
    degrading to nearest or default matches for input never seen before.\n\n\
    Examples:\n\
      devicematch build devices.json -o devices.dmt\n\
      devicematch detect devices.dmt 'Mozilla/5.0 (iPhone; CPU iPhone OS 7_1 like Mac OS X)'\n\
      devicematch batch devices.dmt access.log --format csv -p IsMobile -p HardwareVendor\n\
      devicematch profiles devices.dmt HardwareVendor Apple\n\
      devicematch device-id devices.dmt 1-2-1-1\n\
      devicematch validate devices.dmt"
)]
#[command(version)]
struct Cli {
    /// Log verbosity (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a JSON description into a snapshot
    Build {
        /// JSON source file
        #[arg(value_name = "SOURCE")]
        source: PathBuf,

        /// Output snapshot file (.dmt extension)
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// Compress the snapshot with gzip
        #[arg(short = 'z', long)]
        gzip: bool,

        /// Output the build summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Classify one User-Agent
    Detect {
        /// Snapshot file (.dmt, optionally gzipped)
        #[arg(value_name = "DATASET")]
        dataset: PathBuf,

        /// User-Agent string; omit to match on headers alone
        #[arg(value_name = "USER_AGENT")]
        user_agent: Option<String>,

        /// Extra header as "Name: Value" (repeatable)
        #[arg(short = 'H', long = "header", value_name = "HEADER")]
        headers: Vec<String>,

        /// Only report these properties (repeatable)
        #[arg(short = 'p', long = "property", value_name = "NAME")]
        properties: Vec<String>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,

        #[command(flatten)]
        matching: MatchArgs,
    },

    /// Classify every line of a file or stdin
    Batch {
        /// Snapshot file (.dmt, optionally gzipped)
        #[arg(value_name = "DATASET")]
        dataset: PathBuf,

        /// File with one User-Agent per line, or "-" for stdin
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output format: json (NDJSON) or csv
        #[arg(long, default_value = "json")]
        format: String,

        /// Only report these properties (repeatable, default: all)
        #[arg(short = 'p', long = "property", value_name = "NAME")]
        properties: Vec<String>,

        /// Number of worker threads (default: all cores)
        #[arg(short = 'j', long)]
        threads: Option<usize>,

        /// LRU cache capacity (0 disables)
        #[arg(long, default_value = "10000")]
        cache_size: usize,

        /// Print match statistics to stderr
        #[arg(short, long)]
        stats: bool,

        #[command(flatten)]
        matching: MatchArgs,
    },

    /// Show dataset metadata, components and properties
    Inspect {
        /// Snapshot file (.dmt, optionally gzipped)
        #[arg(value_name = "DATASET")]
        dataset: PathBuf,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,

        /// List the property catalog
        #[arg(short, long)]
        properties: bool,
    },

    /// Find profiles holding a property value
    Profiles {
        /// Snapshot file (.dmt, optionally gzipped)
        #[arg(value_name = "DATASET")]
        dataset: PathBuf,

        /// Property name
        #[arg(value_name = "PROPERTY")]
        property: String,

        /// Value to look for
        #[arg(value_name = "VALUE")]
        value: String,

        /// Narrow further with PROPERTY=VALUE (repeatable)
        #[arg(long = "and", value_name = "PROPERTY=VALUE")]
        and: Vec<String>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Decode a device id back into its properties
    DeviceId {
        /// Snapshot file (.dmt, optionally gzipped)
        #[arg(value_name = "DATASET")]
        dataset: PathBuf,

        /// Device id, e.g. 1-2-1-1
        #[arg(value_name = "ID")]
        id: String,

        /// The id holds profile ids rather than profile indices
        #[arg(long)]
        stable: bool,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Check that a snapshot loads and is internally consistent
    Validate {
        /// Snapshot file (.dmt, optionally gzipped)
        #[arg(value_name = "DATASET")]
        dataset: PathBuf,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

fn init_logging(verbose: u8) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout carries results; logs go to stderr
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Build {
            source,
            output,
            gzip,
            json,
        } => cmd_build(source, output, gzip, json),
        Commands::Detect {
            dataset,
            user_agent,
            headers,
            properties,
            json,
            matching,
        } => cmd_detect(dataset, user_agent, headers, properties, json, matching),
        Commands::Batch {
            dataset,
            input,
            format,
            properties,
            threads,
            cache_size,
            stats,
            matching,
        } => cmd_batch(
            dataset, input, format, properties, threads, cache_size, stats, matching,
        ),
        Commands::Inspect {
            dataset,
            json,
            properties,
        } => cmd_inspect(dataset, json, properties),
        Commands::Profiles {
            dataset,
            property,
            value,
            and,
            json,
        } => cmd_profiles(dataset, property, value, and, json),
        Commands::DeviceId {
            dataset,
            id,
            stable,
            json,
        } => cmd_device_id(dataset, id, stable, json),
        Commands::Validate { dataset, json } => cmd_validate(dataset, json),
    }
}

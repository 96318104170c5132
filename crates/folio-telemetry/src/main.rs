//! folio-telemetry - performance telemetry harness
//!
//! Drives the adaptive-quality monitor with synthetic frame profiles, reads
//! the live activity feed, and prints the effective configuration.

#![deny(static_mut_refs)]
#![deny(unused_must_use)]
#![deny(clippy::unwrap_used)]

mod output;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use folio_activity::{ActivityFeedClient, ActivityQuery};
use folio_perf::{NoHeapProbe, ProcessHeapProbe, SharedHeapProbe};
use folio_scheduler::{ManualClock, TokioClock};
use folio_telemetry::{
    ConfigFormat, DEFAULT_SIMULATED_FRAMES, FrameProfile, TelemetryConfig, TelemetryRuntime,
    init_logging, run_simulation,
};

#[derive(Parser)]
#[command(name = "folio-telemetry")]
#[command(about = "Performance telemetry harness - simulate frame profiles and inspect feeds")]
#[command(version)]
struct Cli {
    /// Output in JSON format for machine parsing
    #[arg(long, global = true)]
    json: bool,

    /// Verbose logging (repeat for more)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Config file (.yaml, .yml or .json)
    #[arg(long, global = true, env = "FOLIO_TELEMETRY_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Drive the monitor with a synthetic frame-time profile
    Simulate {
        /// Frame-time profile
        #[arg(long, value_enum, default_value_t = FrameProfile::Degrading)]
        profile: FrameProfile,

        /// Number of frames to simulate
        #[arg(long, default_value_t = DEFAULT_SIMULATED_FRAMES)]
        frames: u64,

        /// Read heap usage from this process instead of reporting it unknown
        #[arg(long)]
        process_heap: bool,
    },

    /// Fetch and print the live activity feed
    Activity {
        /// Maximum number of activities
        #[arg(long)]
        limit: Option<usize>,

        /// Feed API root, overriding the config
        #[arg(long, env = "FOLIO_ACTIVITY_URL")]
        base_url: Option<String>,
    },

    /// Print the effective configuration
    Config {
        /// Output format; --json implies json
        #[arg(long, value_enum, default_value_t = ConfigFormat::Yaml)]
        format: ConfigFormat,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = TelemetryConfig::load_or_default(cli.config.as_deref()).and_then(|config| {
        init_logging(&config.logging, cli.verbose)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to start tokio runtime")?;
        runtime.block_on(execute_command(&cli, config))
    });

    if let Err(e) = result {
        if cli.json {
            output::print_error_json(&e);
        } else {
            output::print_error_human(&e);
        }
        std::process::exit(1);
    }
}

async fn execute_command(cli: &Cli, config: TelemetryConfig) -> Result<()> {
    match &cli.command {
        Commands::Simulate {
            profile,
            frames,
            process_heap,
        } => simulate(&config, *profile, *frames, *process_heap, cli.json).await,
        Commands::Activity { limit, base_url } => {
            activity(&config, *limit, base_url.as_deref(), cli.json).await
        }
        Commands::Config { format } => {
            let format = if cli.json { ConfigFormat::Json } else { *format };
            println!("{}", config.render(format)?);
            Ok(())
        }
    }
}

async fn simulate(
    config: &TelemetryConfig,
    profile: FrameProfile,
    frames: u64,
    process_heap: bool,
    json: bool,
) -> Result<()> {
    let probe: SharedHeapProbe = if process_heap {
        Arc::new(ProcessHeapProbe::new())
    } else {
        Arc::new(NoHeapProbe)
    };
    let clock = ManualClock::new(0);
    let runtime = TelemetryRuntime::build(config, probe, clock.shared())?;

    let summary = run_simulation(&runtime, &clock, profile, frames);
    runtime.shutdown().await;

    output::print_simulation(&summary, json);
    Ok(())
}

async fn activity(
    config: &TelemetryConfig,
    limit: Option<usize>,
    base_url: Option<&str>,
    json: bool,
) -> Result<()> {
    let base_url = base_url
        .or(config.activity.base_url.as_deref())
        .ok_or_else(|| anyhow!("No activity feed URL; pass --base-url or set activity.base_url"))?;
    let fetcher = config.activity.fetcher;
    let feed = ActivityFeedClient::new(base_url, Duration::from_millis(fetcher.timeout_ms))?
        .into_feed(fetcher, TokioClock::shared())?;

    let query = ActivityQuery::with_limit(limit.unwrap_or(config.activity.default_limit));
    let outcome = feed.get(&query).await;
    output::print_activities(&outcome, json);

    match outcome.error {
        Some(reason) => Err(anyhow!("Activity feed unavailable: {reason}")),
        None => Ok(()),
    }
}

// scalelink test application -- CLI tool for exercising the scale
// acquisition library from the command line. This build links no vendor
// bridge driver, so every command that opens a session runs against the
// simulated bridge and requires --mock.
//
// Usage:
//   scalelink-test-app list
//   scalelink-test-app --mock monitor
//   scalelink-test-app --mock monitor --duration 0 --interval-ms 250
//   scalelink-test-app --mock --fail-opens 2 --retry-wait-ms 200 monitor
//   scalelink-test-app --mock soak
//   scalelink-test-app --mock soak --phases delivery,shutdown --count 500

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use rand::Rng;
use rand::SeedableRng;

use scalelink::Scale;
use scalelink::ftdi::models;
use scalelink::ftdi::{FtdiScale, FtdiScaleBuilder};
use scalelink_test_harness::MockBridge;

mod soak;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// scalelink test application -- exercises the scale library from the
/// command line.
#[derive(Parser)]
#[command(name = "scalelink-test-app", version, about)]
struct Cli {
    /// Bridge model: FT232R, FT230X, FT245R.
    #[arg(long, default_value = "FT232R")]
    model: String,

    /// Override the USB product description matched during enumeration.
    /// Defaults to the model's factory description.
    #[arg(long)]
    signature: Option<String>,

    /// Serial number reported by the simulated device.
    #[arg(long, default_value = "A5XK3RJT")]
    serial: String,

    /// Run against the simulated bridge. Required for `monitor` and `soak`:
    /// this build links no vendor driver.
    #[arg(long)]
    mock: bool,

    /// Fail the first N open attempts, to exercise the retry loop.
    #[arg(long, default_value_t = 0)]
    fail_opens: u32,

    /// Override the connect retry threshold (default 3).
    #[arg(long)]
    retry_threshold: Option<u32>,

    /// Override the wait between connect attempts, in milliseconds
    /// (default 5000).
    #[arg(long)]
    retry_wait_ms: Option<u64>,

    /// Override the latency timer programmed during connect, in milliseconds.
    #[arg(long)]
    latency_ms: Option<u8>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List all supported bridge models.
    List,

    /// Connect to the scale and print readings in real time.
    Monitor {
        /// Duration in seconds (0 = run until Ctrl-C).
        #[arg(long, default_value_t = 10)]
        duration: u64,

        /// Interval between simulated readings, in milliseconds.
        #[arg(long, default_value_t = 500)]
        interval_ms: u64,
    },

    /// Soak test: delivery correctness, throughput, and shutdown phases.
    Soak {
        /// Comma-separated phases to run: delivery, throughput, shutdown,
        /// or "all".
        #[arg(long, default_value = "all")]
        phases: String,

        /// Readings pushed during the delivery phase.
        #[arg(long, default_value_t = 200)]
        count: u32,

        /// Duration of the throughput phase in seconds.
        #[arg(long, default_value_t = 5)]
        duration: u64,
    },
}

// ---------------------------------------------------------------------------
// Model lookup
// ---------------------------------------------------------------------------

/// Look up a bridge model by name (case-insensitive, hyphen-insensitive).
fn lookup_bridge_model(name: &str) -> Result<models::BridgeModel> {
    let norm = name.to_lowercase().replace('-', "");
    let result = match norm.as_str() {
        "ft232r" => models::ft232r(),
        "ft230x" => models::ft230x(),
        "ft245r" => models::ft245r(),
        _ => {
            let known: Vec<&str> = models::all_bridge_models()
                .iter()
                .map(|m| m.name)
                .collect();
            bail!(
                "unknown bridge model '{}'. Supported models: {}",
                name,
                known.join(", ")
            );
        }
    };
    Ok(result)
}

// ---------------------------------------------------------------------------
// List command
// ---------------------------------------------------------------------------

fn cmd_list() -> Result<()> {
    let bridge_models = models::all_bridge_models();

    // Calculate column widths for alignment.
    let name_width = bridge_models
        .iter()
        .map(|m| m.name.len())
        .max()
        .unwrap_or(8)
        .max(8);
    let sig_width = bridge_models
        .iter()
        .map(|m| m.device_signature.len())
        .max()
        .unwrap_or(20)
        .max(20);

    println!(
        "{:<name_width$}  {:<sig_width$}  Min Latency",
        "Model", "Device Signature",
    );
    println!(
        "{:<name_width$}  {:<sig_width$}  -----------",
        "-".repeat(name_width),
        "-".repeat(sig_width),
    );

    for m in &bridge_models {
        println!(
            "{:<name_width$}  {:<sig_width$}  {:>8} ms",
            m.name, m.device_signature, m.min_latency_ms,
        );
    }

    println!();
    println!("{} bridge models total.", bridge_models.len());

    Ok(())
}

// ---------------------------------------------------------------------------
// Scale construction
// ---------------------------------------------------------------------------

/// Construct a scale from CLI arguments, wired to a freshly scripted mock
/// bridge. Returns the scale together with a second handle to the mock so
/// commands can feed simulated readings through it.
fn build_scale(cli: &Cli) -> Result<(FtdiScale, MockBridge)> {
    if !cli.mock {
        bail!(
            "this build links no vendor bridge driver; pass --mock to run \
             against the simulated bridge"
        );
    }

    let model = lookup_bridge_model(&cli.model)?;
    let signature = cli
        .signature
        .clone()
        .unwrap_or_else(|| model.device_signature.to_string());

    let bridge = MockBridge::new();
    bridge.add_device(&signature, &cli.serial);
    if cli.fail_opens > 0 {
        bridge.fail_open_times(cli.fail_opens);
    }

    let mut builder = FtdiScaleBuilder::new(model).device_signature(&signature);
    if let Some(threshold) = cli.retry_threshold {
        builder = builder.retry_threshold(threshold);
    }
    if let Some(ms) = cli.retry_wait_ms {
        builder = builder.retry_wait(Duration::from_millis(ms));
    }
    if let Some(ms) = cli.latency_ms {
        builder = builder.latency_ms(ms);
    }

    let scale = builder
        .build_with_bridge(bridge.clone())
        .context("failed to build the scale")?;
    Ok((scale, bridge))
}

// ---------------------------------------------------------------------------
// Monitor command
// ---------------------------------------------------------------------------

async fn cmd_monitor(
    mut scale: FtdiScale,
    bridge: MockBridge,
    duration_secs: u64,
    interval_ms: u64,
) -> Result<()> {
    let start = Instant::now();
    let delivered = Arc::new(AtomicU64::new(0));

    let count = delivered.clone();
    scale.register_observer(Box::new(move |reading| {
        let t = start.elapsed();
        println!(
            "[{:>6}.{:03}s] {}: {}",
            t.as_secs(),
            t.subsec_millis(),
            reading.device_id,
            reading.payload
        );
        count.fetch_add(1, Ordering::Relaxed);
    }));

    scale
        .connect_with_retry()
        .await
        .context("could not connect to the scale")?;
    println!("Connected (mock bridge) -- {}", scale.info());
    if scale.retry_count() > 0 {
        println!("(recovered after {} failed attempts)", scale.retry_count());
    }

    // Feeder task: simulates the scale head transmitting a drifting weight.
    let feeder_bridge = bridge.clone();
    let feeder = tokio::spawn(async move {
        let mut rng = rand::rngs::StdRng::from_entropy();
        let mut grams: i64 = 1500;
        let mut interval = tokio::time::interval(Duration::from_millis(interval_ms));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            grams = (grams + rng.gen_range(-25..=25)).max(0);
            let frame = format!("{:.3} kg\r\n", grams as f64 / 1000.0);
            feeder_bridge.push_reading(frame.as_bytes());
        }
    });

    let window = Instant::now();
    if duration_secs > 0 {
        println!("Monitoring readings for {duration_secs} seconds...");
        tokio::time::sleep(Duration::from_secs(duration_secs)).await;
    } else {
        println!("Monitoring readings (Ctrl-C to stop)...");
        tokio::signal::ctrl_c()
            .await
            .context("failed to wait for Ctrl-C")?;
    }

    feeder.abort();
    scale.dispose().await;

    let elapsed = window.elapsed().as_secs_f64();
    let total = delivered.load(Ordering::Relaxed);
    let rate = if elapsed > 0.0 {
        total as f64 / elapsed
    } else {
        0.0
    };
    println!();
    println!("{total} readings in {elapsed:.1}s ({rate:.1}/s)");

    Ok(())
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // The `list` command does not require a bridge session.
    if matches!(&cli.command, Command::List) {
        return cmd_list();
    }

    match &cli.command {
        Command::Monitor {
            duration,
            interval_ms,
        } => {
            let (scale, bridge) = build_scale(&cli)?;
            cmd_monitor(scale, bridge, *duration, *interval_ms).await
        }
        Command::Soak {
            phases,
            count,
            duration,
        } => {
            let phases = soak::parse_phases(phases)?;
            let (scale, bridge) = build_scale(&cli)?;
            let opts = soak::SoakOptions {
                phase_duration: *duration,
                reading_count: *count,
                phases,
            };
            soak::cmd_soak(scale, bridge, opts).await
        }
        Command::List => unreachable!("list handled above"),
    }
}

// Soak subcommand -- validation harness for the acquisition path. Drives
// scripted frames through the mock bridge and checks delivery correctness,
// sustained end-to-end throughput, and graceful teardown mid-stream.

use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use scalelink::Scale;
use scalelink::ftdi::FtdiScale;
use scalelink_test_harness::MockBridge;

// ---------------------------------------------------------------------------
// CLI options (passed from main.rs)
// ---------------------------------------------------------------------------

pub struct SoakOptions {
    pub phase_duration: u64,
    pub reading_count: u32,
    pub phases: Vec<Phase>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Delivery,
    Throughput,
    Shutdown,
}

const ALL_PHASES: &[Phase] = &[Phase::Delivery, Phase::Throughput, Phase::Shutdown];

pub fn parse_phases(s: &str) -> Result<Vec<Phase>> {
    if s.eq_ignore_ascii_case("all") {
        return Ok(ALL_PHASES.to_vec());
    }
    let mut phases = Vec::new();
    for part in s.split(',') {
        let p = match part.trim().to_lowercase().as_str() {
            "delivery" => Phase::Delivery,
            "throughput" => Phase::Throughput,
            "shutdown" => Phase::Shutdown,
            other => bail!(
                "unknown phase '{}'. Valid: delivery, throughput, shutdown, all",
                other
            ),
        };
        phases.push(p);
    }
    Ok(phases)
}

fn phase_label(p: Phase) -> &'static str {
    match p {
        Phase::Delivery => "delivery",
        Phase::Throughput => "throughput",
        Phase::Shutdown => "shutdown",
    }
}

// ---------------------------------------------------------------------------
// Latency statistics
// ---------------------------------------------------------------------------

/// Push-to-observer delivery latencies for one phase.
struct LatencyStats {
    samples: Vec<Duration>,
}

struct ComputedStats {
    n: usize,
    min: Duration,
    avg: Duration,
    p50: Duration,
    p95: Duration,
    max: Duration,
}

impl LatencyStats {
    fn new() -> Self {
        Self {
            samples: Vec::new(),
        }
    }

    fn record(&mut self, d: Duration) {
        self.samples.push(d);
    }

    fn compute(&mut self) -> Option<ComputedStats> {
        let n = self.samples.len();
        if n == 0 {
            return None;
        }
        self.samples.sort();
        let sum: Duration = self.samples.iter().sum();
        let avg = sum / n as u32;
        Some(ComputedStats {
            n,
            min: self.samples[0],
            avg,
            p50: self.samples[n * 50 / 100],
            p95: self.samples[(n * 95 / 100).min(n - 1)],
            max: self.samples[n - 1],
        })
    }
}

impl ComputedStats {
    fn fmt_line(&self) -> String {
        format!(
            "latency: n={}  min={:.2}ms  avg={:.2}ms  p50={:.2}ms  p95={:.2}ms  max={:.2}ms",
            self.n,
            self.min.as_secs_f64() * 1000.0,
            self.avg.as_secs_f64() * 1000.0,
            self.p50.as_secs_f64() * 1000.0,
            self.p95.as_secs_f64() * 1000.0,
            self.max.as_secs_f64() * 1000.0,
        )
    }
}

// ---------------------------------------------------------------------------
// Phase result
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Pass,
    Fail,
}

struct PhaseResult {
    phase: Phase,
    outcome: Outcome,
    detail: String,
}

fn print_results(model_name: &str, results: &[PhaseResult]) {
    println!();
    println!("============================================================");
    println!("  Soak Results -- {}", model_name);
    println!("============================================================");
    println!();

    for r in results {
        let tag = match r.outcome {
            Outcome::Pass => "[PASS]",
            Outcome::Fail => "[FAIL]",
        };
        println!("{} {}", tag, phase_label(r.phase));
        for line in r.detail.lines() {
            println!("  {}", line);
        }
        println!();
    }

    let pass_count = results
        .iter()
        .filter(|r| r.outcome == Outcome::Pass)
        .count();
    println!("------------------------------------------------------------");
    println!("  {}/{} phases passed", pass_count, results.len());
    println!("============================================================");
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Discard every payload currently queued in the capture channel and return
/// how many there were.
fn drain(readings: &mut mpsc::UnboundedReceiver<String>) -> u64 {
    let mut n = 0;
    while readings.try_recv().is_ok() {
        n += 1;
    }
    n
}

// ---------------------------------------------------------------------------
// Phase 1: delivery -- every pushed frame arrives, normalized and in order
// ---------------------------------------------------------------------------

async fn phase_delivery(
    bridge: &MockBridge,
    readings: &mut mpsc::UnboundedReceiver<String>,
    opts: &SoakOptions,
) -> PhaseResult {
    println!("  running delivery ({} readings)...", opts.reading_count);

    drain(readings);

    let mut stats = LatencyStats::new();
    let mut delivered: u32 = 0;
    let mut mismatched: u32 = 0;

    for i in 0..opts.reading_count {
        // Monotonic weight sequence, so an out-of-order delivery shows up
        // as a payload mismatch.
        let grams = 1000 + u64::from(i);
        let frame = format!("{:.3} kg\r\n", grams as f64 / 1000.0);
        let expected = format!("{:.3}kg", grams as f64 / 1000.0);

        let t = Instant::now();
        bridge.push_reading(frame.as_bytes());

        match tokio::time::timeout(Duration::from_secs(1), readings.recv()).await {
            Ok(Some(payload)) => {
                stats.record(t.elapsed());
                delivered += 1;
                if payload != expected {
                    mismatched += 1;
                    if mismatched <= 3 {
                        eprintln!(
                            "  mismatch at reading {i}: pushed {expected:?}, delivered {payload:?}"
                        );
                    }
                }
            }
            Ok(None) => break,
            Err(_) => {
                eprintln!("  reading {i} not delivered within 1s");
                break;
            }
        }
    }

    let pass = delivered == opts.reading_count && mismatched == 0;
    let mut detail = format!(
        "{}/{} readings delivered in push order, {} mismatched\n",
        delivered, opts.reading_count, mismatched,
    );
    if let Some(s) = stats.compute() {
        detail.push_str(&s.fmt_line());
    }

    PhaseResult {
        phase: Phase::Delivery,
        outcome: if pass { Outcome::Pass } else { Outcome::Fail },
        detail,
    }
}

// ---------------------------------------------------------------------------
// Phase 2: throughput -- sustained push/deliver rate
// ---------------------------------------------------------------------------

async fn phase_throughput(
    bridge: &MockBridge,
    readings: &mut mpsc::UnboundedReceiver<String>,
    opts: &SoakOptions,
) -> PhaseResult {
    println!("  running throughput ({} seconds)...", opts.phase_duration);

    drain(readings);

    let mut stats = LatencyStats::new();
    let mut delivered: u64 = 0;
    let mut lost: u64 = 0;
    let start = Instant::now();
    let deadline = start + Duration::from_secs(opts.phase_duration);
    let mut grams: u64 = 0;

    // Each frame waits for its delivery before the next push, so the rate
    // measures the full signal -> read -> normalize -> dispatch path.
    while Instant::now() < deadline {
        grams += 1;
        let frame = format!("{:.3} kg\r\n", grams as f64 / 1000.0);

        let t = Instant::now();
        bridge.push_reading(frame.as_bytes());
        match tokio::time::timeout(Duration::from_secs(1), readings.recv()).await {
            Ok(Some(_)) => {
                stats.record(t.elapsed());
                delivered += 1;
            }
            Ok(None) => break,
            Err(_) => {
                lost += 1;
                break;
            }
        }
    }

    let elapsed = start.elapsed().as_secs_f64();
    let rate = delivered as f64 / elapsed;

    let mut detail = format!(
        "{} readings in {:.1}s ({:.0} readings/s), {} lost\n",
        delivered, elapsed, rate, lost,
    );
    if let Some(s) = stats.compute() {
        detail.push_str(&s.fmt_line());
    }

    PhaseResult {
        phase: Phase::Throughput,
        outcome: Outcome::Pass, // informational only
        detail,
    }
}

// ---------------------------------------------------------------------------
// Phase 3: shutdown -- dispose under load tears down cleanly
// ---------------------------------------------------------------------------

async fn phase_shutdown(
    scale: &mut FtdiScale,
    bridge: &MockBridge,
    readings: &mut mpsc::UnboundedReceiver<String>,
) -> PhaseResult {
    println!("  running shutdown (2s feed, then dispose mid-stream)...");

    drain(readings);

    let cancel = CancellationToken::new();
    let feeder_bridge = bridge.clone();
    let feeder_cancel = cancel.clone();
    let feeder = tokio::spawn(async move {
        let mut pushed: u64 = 0;
        let mut interval = tokio::time::interval(Duration::from_millis(5));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                biased;
                _ = feeder_cancel.cancelled() => break,
                _ = interval.tick() => {}
            }
            pushed += 1;
            let frame = format!("{:.3} kg\r\n", pushed as f64 / 1000.0);
            feeder_bridge.push_reading(frame.as_bytes());
        }
        pushed
    });

    tokio::time::sleep(Duration::from_secs(2)).await;

    // Dispose while the feeder is still pushing.
    scale.dispose().await;
    let closes_after_dispose = bridge.close_count();

    cancel.cancel();
    let pushed = feeder.await.unwrap_or(0);

    // Whatever was already dispatched is allowed through; once the queue
    // has gone quiet nothing further may arrive.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let in_flight = drain(readings);
    tokio::time::sleep(Duration::from_millis(100)).await;
    let after_quiesce = drain(readings);

    // Disposing again must not close the bridge a second time.
    scale.dispose().await;
    let closes_after_second = bridge.close_count();

    let clean = after_quiesce == 0 && closes_after_dispose == 1 && closes_after_second == 1;
    let detail = format!(
        "{} frames pushed, {} delivered in flight at dispose, {} after quiesce\n\
         bridge closed {} time(s); second dispose closed {} more",
        pushed,
        in_flight,
        after_quiesce,
        closes_after_dispose,
        closes_after_second - closes_after_dispose,
    );

    PhaseResult {
        phase: Phase::Shutdown,
        outcome: if clean { Outcome::Pass } else { Outcome::Fail },
        detail,
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub async fn cmd_soak(mut scale: FtdiScale, bridge: MockBridge, opts: SoakOptions) -> Result<()> {
    // The shutdown phase disposes the scale, so nothing can run after it.
    if let Some(pos) = opts.phases.iter().position(|&p| p == Phase::Shutdown) {
        if pos + 1 != opts.phases.len() {
            bail!("the shutdown phase disposes the scale and must come last");
        }
    }

    let model_name = scale.info().to_string();

    let (tx, mut readings) = mpsc::unbounded_channel();
    scale.register_observer(Box::new(move |reading| {
        let _ = tx.send(reading.payload.clone());
    }));

    scale
        .connect_with_retry()
        .await
        .context("could not connect to the scale")?;

    println!();
    println!("Soak -- {}", model_name);
    println!();

    let mut results = Vec::new();
    for &phase in &opts.phases {
        let result = match phase {
            Phase::Delivery => phase_delivery(&bridge, &mut readings, &opts).await,
            Phase::Throughput => phase_throughput(&bridge, &mut readings, &opts).await,
            Phase::Shutdown => phase_shutdown(&mut scale, &bridge, &mut readings).await,
        };
        results.push(result);
    }

    // No-op when the shutdown phase already ran.
    scale.dispose().await;

    print_results(&model_name, &results);

    let any_failed = results.iter().any(|r| r.outcome == Outcome::Fail);
    if any_failed {
        std::process::exit(1);
    }

    Ok(())
}

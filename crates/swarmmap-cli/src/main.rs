//! swarmmap
//!
//! Reads swarm telemetry captures, builds the relay graph, and prints which
//! units must move so that every unit has a second route.
//!
//! Exit codes: 0 on success, 1 on usage or input errors, 2 when a unit
//! reports the same payload twice.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use swarmmap_capture::{CaptureReader, Error as CaptureError, FrameBody};
use swarmmap_graph::{Error as GraphError, Graph, GraphConfig};
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "swarmmap=warn,swarmmap_graph=warn,swarmmap_capture=warn";
const VERBOSE_FILTER: &str = "swarmmap=debug,swarmmap_graph=debug,swarmmap_capture=debug";

#[derive(Parser)]
#[command(name = "swarmmap")]
#[command(author, version, about = "Find swarm units without a redundant relay route", long_about = None)]
struct Cli {
    /// Report units at or below this health percentage
    #[arg(short, long, default_value_t = 10.0, value_parser = parse_threshold)]
    threshold: f64,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Capture files, read in order
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

fn parse_threshold(raw: &str) -> Result<f64, String> {
    let value: f64 = raw.parse().map_err(|_| format!("`{raw}` is not a number"))?;
    if !(0.0..=100.0).contains(&value) {
        return Err(format!("{value} is not a percentage"));
    }
    Ok(value)
}

#[derive(Debug, Default)]
struct Tally {
    frames: usize,
    skipped: usize,
    dropped: usize,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(1),
            };
        }
    };

    let default_filter = if cli.verbose { VERBOSE_FILTER } else { DEFAULT_FILTER };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("swarmmap: {e:#}");
            ExitCode::from(exit_status(&e))
        }
    }
}

fn exit_status(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<GraphError>() {
        Some(GraphError::DuplicateId { .. }) => 2,
        _ => 1,
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = GraphConfig::from_env().context("reading configuration")?;
    let mut graph = Graph::with_config(config);

    for path in &cli.files {
        let tally = ingest(&mut graph, path)?;
        info!(
            file = %path.display(),
            frames = tally.frames,
            skipped = tally.skipped,
            dropped = tally.dropped,
            "capture read"
        );
    }

    let pruned = graph.prune();
    debug!(pruned, nodes = graph.total_nodes(), "pruned units without position");

    graph.analyze();
    print!("{}", graph.report());

    let low = graph.low_status_report(cli.threshold);
    if !low.is_empty() {
        print!("{low}");
    }
    Ok(())
}

/// Feed every telemetry frame of one capture into the graph.
///
/// Out-of-range records are dropped with a warning. A duplicate record
/// stops the whole run.
fn ingest(graph: &mut Graph, path: &Path) -> Result<Tally> {
    let reader = CaptureReader::open(path)
        .with_context(|| format!("cannot read capture {}", path.display()))?;
    let mut tally = Tally::default();

    for (packet, item) in reader.frames().enumerate() {
        let decoded = match item {
            Ok(decoded) => decoded,
            Err(e @ CaptureError::Truncated { .. }) => {
                warn!(file = %path.display(), error = %e, "capture ends early, keeping records read so far");
                break;
            }
            Err(e) => {
                return Err(e).with_context(|| format!("cannot read capture {}", path.display()))
            }
        };
        let frame = match decoded {
            Ok(frame) => frame,
            Err(reason) => {
                warn!(file = %path.display(), packet = packet + 1, %reason, "skipping packet");
                tally.skipped += 1;
                continue;
            }
        };

        let id = frame.source();
        let inserted = match frame.body {
            FrameBody::Position(position) => graph.insert_position(id, position),
            FrameBody::Status { status, .. } => graph.insert_status(id, status),
            FrameBody::Other(_) => continue,
        };
        tally.frames += 1;

        match inserted {
            Ok(()) => {}
            Err(e @ GraphError::OutOfRange { .. }) => {
                warn!(file = %path.display(), error = %e, "dropped record");
                tally.dropped += 1;
            }
            Err(e) => return Err(e).with_context(|| format!("in capture {}", path.display())),
        }
    }
    Ok(tally)
}

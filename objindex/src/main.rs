use clap::Parser;
use std::path::PathBuf;
use std::process::exit;

use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use objindex::analysis::ObjectIndexAnalysis;
use objindex::config::TrackerConfig;
use objindex::id::{ProgramPointId, ACCESS_POINT};
use objindex::location::LocationTable;
use objindex::report::Provenance;
use objindex::shadow::ShadowTable;

#[derive(Debug, Clone, clap::ValueEnum)]
enum EmitFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(
    name = "objindex",
    version,
    about = "objindex — replays an event trace and reports context-sensitive object counts"
)]
struct Cli {
    /// Recorded event trace
    trace: PathBuf,

    /// JSON map from program point id to source location
    #[arg(short, long)]
    locations: Option<PathBuf>,

    /// Report format
    #[arg(long, value_enum, default_value_t = EmitFormat::Text)]
    emit: EmitFormat,

    /// Write the report here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Program point id sampled on every access
    #[arg(long, default_value_t = ACCESS_POINT.0)]
    access_pid: u32,

    /// Remove a reclaimed object's count from the report
    #[arg(long)]
    evict_on_reclaim: bool,

    /// Debug-level logging (overrides RUST_LOG)
    #[arg(long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let access_point = ProgramPointId(cli.access_pid);
    let config = TrackerConfig::default()
        .with_access_point(access_point)
        .with_eviction(cli.evict_on_reclaim);

    // ── Load location map ──
    let locations = match &cli.locations {
        Some(path) => match LocationTable::load(path) {
            Ok(table) => {
                info!(entries = table.len(), path = %path.display(), "location map loaded");
                table
            }
            Err(e) => {
                eprintln!("objindex: error: {}", e);
                exit(2);
            }
        },
        None => LocationTable::new(),
    }
    .with_access_point(access_point);

    // ── Read and parse trace ──
    let source = match std::fs::read_to_string(&cli.trace) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("objindex: error: {}: {}", cli.trace.display(), e);
            exit(2);
        }
    };

    let origin = cli.trace.display().to_string();
    let parse_result = objindex::parser::parse(&source);
    if !parse_result.diagnostics.is_empty() {
        for diag in &parse_result.diagnostics {
            eprintln!("{}", diag.render(&origin, &source));
        }
        exit(1);
    }
    let trace = match parse_result.trace {
        Some(t) => t,
        None => {
            eprintln!("objindex: parse failed with no output");
            exit(1);
        }
    };
    info!(events = trace.len(), "trace parsed");

    // ── Replay ──
    let mut analysis = ObjectIndexAnalysis::new(ShadowTable::new(), locations, config);
    let report = match objindex::replay::replay(&trace, &mut analysis) {
        Ok(report) => report.with_provenance(&Provenance::of_trace(&source)),
        Err(e) => {
            eprintln!("objindex: error: {}: {}", origin, e);
            exit(if e.is_protocol_violation() { 3 } else { 2 });
        }
    };
    info!(
        tracked = report.summary.tracked_objects,
        nodes = report.summary.trie_nodes,
        "report ready"
    );

    // ── Emit ──
    let rendered = match cli.emit {
        EmitFormat::Text => report.render_text(),
        EmitFormat::Json => match report.render_json() {
            Ok(mut json) => {
                json.push('\n');
                json
            }
            Err(e) => {
                eprintln!("objindex: error: {}", e);
                exit(2);
            }
        },
    };

    match &cli.output {
        Some(path) => {
            if let Err(e) = std::fs::write(path, rendered) {
                eprintln!("objindex: error: {}: {}", path.display(), e);
                exit(2);
            }
        }
        None => print!("{}", rendered),
    }
}

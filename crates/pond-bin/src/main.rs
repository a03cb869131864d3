//! Nanopond entrypoint: configuration, logging, observer wiring.
use anyhow::{Context, Result};
use clap::Parser;
use core_engine::{Engine, Observer};
use core_render::ColorScheme;
use core_report::{CsvReporter, GenomeDumper};
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

mod view;

use view::TerminalView;

/// CLI arguments. Anything not covered here comes from `nanopond.toml`.
#[derive(Parser, Debug)]
#[command(name = "nanopond", version, about = "Evolvable artificial-life pond")]
struct Args {
    /// Optional configuration file path (overrides discovery of
    /// `nanopond.toml`).
    #[arg(long)]
    config: Option<PathBuf>,
    /// PRNG seed override (wall clock when neither this nor the config
    /// provides one).
    #[arg(long)]
    seed: Option<u32>,
    /// Stop after this many ticks.
    #[arg(long)]
    stop_at: Option<u64>,
    /// Directory for `<tick>.dump.csv` genome dumps.
    #[arg(long, default_value = ".")]
    dump_dir: PathBuf,
    /// Write the CSV statistics stream here instead of stdout.
    #[arg(long)]
    stats: Option<PathBuf>,
    /// Render the pond in the terminal at every refresh boundary
    /// (q/Esc quits, c cycles the color scheme).
    #[arg(long)]
    view: bool,
    /// Initial color scheme for the terminal view.
    #[arg(long, default_value = "kinship")]
    color_scheme: ColorScheme,
}

fn configure_logging() -> Result<WorkerGuard> {
    let log_path = Path::new("nanopond.log");
    if log_path.exists() {
        let _ = std::fs::remove_file(log_path);
    }
    let appender = tracing_appender::rolling::never(".", "nanopond.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Ok(guard)
}

fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        tracing::error!(target: "runtime", %panic_info, "panic");
        default_hook(panic_info);
    }));
}

fn main() -> Result<()> {
    let args = Args::parse();
    let _log_guard = configure_logging()?;
    install_panic_hook();
    info!(target: "runtime", "startup");

    let mut config = core_config::load_from(args.config.clone())?;
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if let Some(stop_at) = args.stop_at {
        config.schedule.stop_at = Some(stop_at);
    }

    let mut engine = Engine::new(config);
    info!(
        target: "runtime.startup",
        seed = engine.seed(),
        stop_at = engine.config().schedule.stop_at,
        dump_dir = %args.dump_dir.display(),
        view = args.view,
        "bootstrap_complete"
    );

    let mut observers: Vec<Box<dyn Observer>> = Vec::new();

    // With the terminal view active, stdout belongs to the alternate
    // screen; an unrouted stats stream falls back to a file.
    let stats_path = match (&args.stats, args.view) {
        (Some(path), _) => Some(path.clone()),
        (None, true) => Some(PathBuf::from("nanopond.stats.csv")),
        (None, false) => None,
    };
    match &stats_path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("creating stats file {}", path.display()))?;
            info!(target: "runtime", stats = %path.display(), "stats_to_file");
            observers.push(Box::new(CsvReporter::new(BufWriter::new(file))));
        }
        None => observers.push(Box::new(CsvReporter::new(io::stdout()))),
    }
    observers.push(Box::new(GenomeDumper::new(&args.dump_dir)));
    if args.view {
        observers.push(Box::new(TerminalView::new(args.color_scheme)?));
    }

    engine.run(&mut observers);
    drop(observers);

    info!(target: "runtime", clock = engine.clock(), "shutdown");
    Ok(())
}

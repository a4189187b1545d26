use clap::{Parser, Subcommand, ValueEnum};
use qr_scout::detector::scorer::PatternScorer;
use qr_scout::scheduler::{Backoff, CycleReport, LoopExit, MonitorOnly, ScanLoop};
use qr_scout::tools::{FileFrameSource, LoadError, expand_inputs, grayscale_stats, load_luma};
use qr_scout::{
    LumaImage, Rect, RegionDetector, ScanConfig, ScanError, ScanReport, ScanStrategy, Scanner,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::mpsc;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "scantool", version, about = "QR candidate-region and live-scan tools")]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    Heuristic,
    Direct,
}

impl From<StrategyArg> for ScanStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Heuristic => ScanStrategy::HeuristicOnly,
            StrategyArg::Direct => ScanStrategy::DirectThenHeuristic,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Print candidate regions for an image
    Regions {
        #[arg(long)]
        image: PathBuf,
        #[arg(long)]
        grid: Option<usize>,
        #[arg(long)]
        threshold: Option<f32>,
        /// Skip the grid search and print fallback tiles
        #[arg(long)]
        no_heuristic: bool,
    },
    /// Print the score breakdown of one square window
    Score {
        #[arg(long)]
        image: PathBuf,
        #[arg(long)]
        x: usize,
        #[arg(long)]
        y: usize,
        #[arg(long)]
        size: usize,
    },
    /// Detect and decode codes in one or more images or directories
    Scan {
        #[arg(long = "image", required = true, num_args = 1..)]
        images: Vec<PathBuf>,
        #[arg(long, value_enum)]
        strategy: Option<StrategyArg>,
        /// Decode at most this many regions
        #[arg(long)]
        max_regions: Option<usize>,
    },
    /// Replay a directory of images as a live source
    Watch {
        #[arg(long)]
        dir: PathBuf,
        #[arg(long)]
        interval_ms: Option<u64>,
        /// Stop after this many cycles
        #[arg(long)]
        cycles: Option<u64>,
        /// Lengthen the interval while cycles run over budget
        #[arg(long)]
        backoff: bool,
        /// Loop over the directory instead of stopping at the end
        #[arg(long)]
        repeat: bool,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error("failed to load {path}: {source}")]
    Load { path: PathBuf, source: LoadError },
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error("no images found under {0}")]
    EmptyDir(PathBuf),
    #[error("{failed} of {total} images could not be loaded")]
    Partial { failed: usize, total: usize },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Command::Regions {
            image,
            grid,
            threshold,
            no_heuristic,
        } => regions_cmd(&image, grid, threshold, no_heuristic),
        Command::Score { image, x, y, size } => score_cmd(&image, Rect::square(x, y, size)),
        Command::Scan {
            images,
            strategy,
            max_regions,
        } => scan_cmd(&images, strategy, max_regions),
        Command::Watch {
            dir,
            interval_ms,
            cycles,
            backoff,
            repeat,
        } => watch_cmd(&dir, interval_ms, cycles, backoff, repeat),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn load(path: &Path) -> Result<LumaImage, CliError> {
    load_luma(path).map_err(|source| CliError::Load {
        path: path.to_path_buf(),
        source,
    })
}

fn regions_cmd(
    image: &Path,
    grid: Option<usize>,
    threshold: Option<f32>,
    no_heuristic: bool,
) -> Result<(), CliError> {
    let luma = load(image)?;
    let mut config = ScanConfig::global().detector.clone().with_heuristic(!no_heuristic);
    if let Some(grid) = grid {
        config = config.with_grid_size(grid);
    }
    if let Some(threshold) = threshold {
        config = config.with_confidence_threshold(threshold);
    }
    config.validate().map_err(ScanError::from)?;

    let detection = RegionDetector::new(config).detect(&luma);
    println!("Image: {} ({}x{})", image.display(), luma.width(), luma.height());
    println!(
        "Raw candidates: {}, kept: {}, fallback: {}",
        detection.raw_candidates,
        detection.regions.len(),
        detection.used_fallback
    );
    for (i, region) in detection.regions.iter().enumerate() {
        println!(
            "  {:>3}: x={} y={} w={} h={} confidence={:.3} kind={}",
            i,
            region.rect.x,
            region.rect.y,
            region.rect.width,
            region.rect.height,
            region.confidence,
            region.kind.as_str()
        );
    }
    Ok(())
}

fn score_cmd(image: &Path, rect: Rect) -> Result<(), CliError> {
    let luma = load(image)?;
    let stats = grayscale_stats(luma.data());
    println!("Image: {} ({}x{})", image.display(), luma.width(), luma.height());
    println!("Luma range: {}-{}, average: {}", stats.min, stats.max, stats.avg);

    let b = PatternScorer::breakdown(&luma, &rect);
    println!("Window: x={} y={} size={}", rect.x, rect.y, rect.width);
    println!("  finder top-left:    {:.3}", b.top_left);
    println!("  finder top-right:   {:.3}", b.top_right);
    println!("  finder bottom-left: {:.3}", b.bottom_left);
    println!("  quiet zone:         {:.3}", b.quiet_zone);
    println!("  data variation:     {:.3}", b.variation);
    println!("  confidence:         {:.3}", b.confidence());
    Ok(())
}

fn scan_cmd(
    inputs: &[PathBuf],
    strategy: Option<StrategyArg>,
    max_regions: Option<usize>,
) -> Result<(), CliError> {
    let paths = expand_inputs(inputs).map_err(CliError::EmptyDir)?;

    let mut config = ScanConfig::global().clone();
    if let Some(strategy) = strategy {
        config = config.with_strategy(strategy.into());
    }
    if max_regions.is_some() {
        config = config.with_max_regions(max_regions);
    }
    let scanner = Scanner::with_rqrr(config).map_err(ScanError::from)?;

    let mut failed = 0;
    for path in &paths {
        match load(path) {
            Ok(luma) => print_scan(path, &luma, &scanner.scan(&luma)),
            Err(err) => {
                warn!(error = %err, "skipping image");
                failed += 1;
            }
        }
    }
    if failed > 0 {
        return Err(CliError::Partial {
            failed,
            total: paths.len(),
        });
    }
    Ok(())
}

fn print_scan(path: &Path, luma: &LumaImage, report: &ScanReport) {
    println!("Image: {} ({}x{})", path.display(), luma.width(), luma.height());
    println!(
        "Regions: {} (fallback: {}), time: {:.2} ms",
        report.regions.len(),
        report.used_fallback,
        report.elapsed.as_secs_f64() * 1000.0
    );
    println!("Found {} codes", report.codes.len());
    for (i, code) in report.codes.iter().enumerate() {
        let origin = match code.source_region() {
            Some(region) => format!(
                "region {}@({},{})",
                region.kind.as_str(),
                region.rect.x,
                region.rect.y
            ),
            None => "full frame".to_string(),
        };
        println!(
            "  {}: \"{}\" via {} confidence={:.3} top-left=({:.1}, {:.1})",
            i,
            code.payload,
            origin,
            code.confidence,
            code.corners.top_left.x,
            code.corners.top_left.y
        );
    }
}

fn print_cycle(report: &CycleReport) {
    let mean = report
        .mean
        .map(|m| format!("{:.1} ms", m.as_secs_f64() * 1000.0))
        .unwrap_or_else(|| "-".to_string());
    println!(
        "cycle {:>4}: {:>7.2} ms  mean {:>9}  next {:>4} ms  codes {}{}",
        report.cycle,
        report.elapsed.as_secs_f64() * 1000.0,
        mean,
        report.next_interval.as_millis(),
        report.scan.codes.len(),
        if report.overrun { "  OVER BUDGET" } else { "" }
    );
    for code in &report.scan.codes {
        println!("            \"{}\"", code.payload);
    }
}

fn watch_cmd(
    dir: &Path,
    interval_ms: Option<u64>,
    cycles: Option<u64>,
    backoff: bool,
    repeat: bool,
) -> Result<(), CliError> {
    let source = FileFrameSource::from_dir(dir, repeat);
    if source.is_empty() {
        return Err(CliError::EmptyDir(dir.to_path_buf()));
    }

    let mut config = ScanConfig::global().clone();
    if config.max_regions.is_none() {
        config = config.with_max_regions(ScanConfig::live().max_regions);
    }
    if let Some(ms) = interval_ms {
        config = config.with_interval(Duration::from_millis(ms.max(1)));
    }
    let scanner = Scanner::with_rqrr(config.clone()).map_err(ScanError::from)?;

    let (done_tx, done_rx) = mpsc::channel::<()>();
    let on_cycle = move |report: CycleReport| {
        print_cycle(&report);
        if cycles.is_some_and(|limit| report.cycle >= limit) {
            let _ = done_tx.send(());
        }
    };

    let mut scan_loop = ScanLoop::new(config);
    if backoff {
        scan_loop.start(source, scanner, Backoff::default(), on_cycle)?;
    } else {
        scan_loop.start(source, scanner, MonitorOnly, on_cycle)?;
    }

    // Either the cycle limit fires, or the worker drops the sender on exit
    let _ = done_rx.recv();
    let exit = scan_loop.stop();
    match exit {
        Some(LoopExit::SourceFailed(e)) => Err(ScanError::from(e).into()),
        _ => Ok(()),
    }
}

//! pagediff CLI — compare a candidate capture against a reference rendering.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use pagediff::{CompareConfig, Comparator, Tolerance};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "pagediff")]
#[command(about = "Visual-diff a screenshot against a reference: alignment, SSIM scoring, classified difference regions")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare two PNG captures and write diff artifacts.
    Compare(CliCompareArgs),

    /// Print the region-detection thresholds of each tolerance preset.
    Presets,
}

#[derive(Debug, Clone, Args)]
struct CliCompareArgs {
    /// Path to the reference (baseline) PNG.
    #[arg(long)]
    reference: PathBuf,

    /// Path to the candidate capture PNG.
    #[arg(long)]
    candidate: PathBuf,

    /// Directory for rendered artifacts (created if missing).
    #[arg(long)]
    out_dir: PathBuf,

    /// Path to write the comparison result (JSON). Defaults to
    /// <out-dir>/result.json.
    #[arg(long)]
    json: Option<PathBuf>,

    /// Noise-tolerance preset.
    #[arg(long, value_enum, default_value_t = ToleranceArg::Medium)]
    tolerance: ToleranceArg,

    /// Explicit sensitivity percentage (0-100, higher = more sensitive).
    /// Overrides --tolerance.
    #[arg(long)]
    sensitivity: Option<u8>,

    /// Ignore color differences (forces grayscale scoring).
    #[arg(long)]
    no_colors: bool,

    /// Drop content/text difference regions from the result.
    #[arg(long)]
    no_content: bool,

    /// Drop layout/spacing difference regions from the result.
    #[arg(long)]
    no_layout: bool,

    /// Skip rendering the red-wash overlay artifact.
    #[arg(long)]
    no_overlay: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ToleranceArg {
    Strict,
    Medium,
    Relaxed,
}

impl ToleranceArg {
    fn to_core(self) -> Tolerance {
        match self {
            Self::Strict => Tolerance::Strict,
            Self::Medium => Tolerance::Medium,
            Self::Relaxed => Tolerance::Relaxed,
        }
    }
}

impl CliCompareArgs {
    fn to_config(&self) -> CliResult<CompareConfig> {
        let tolerance = match self.sensitivity {
            Some(p) if p > 100 => {
                return Err(format!("--sensitivity must be in 0..=100, got {}", p).into())
            }
            Some(p) => Tolerance::Percent(p),
            None => self.tolerance.to_core(),
        };

        let mut config = CompareConfig::with_tolerance(tolerance);
        config.check_colors = !self.no_colors;
        config.check_content = !self.no_content;
        config.check_layout = !self.no_layout;
        config.render_overlay = !self.no_overlay;
        Ok(config)
    }
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Compare(args) => run_compare(&args),
        Commands::Presets => run_presets(),
    }
}

// ── presets ────────────────────────────────────────────────────────────

fn run_presets() -> CliResult<()> {
    println!("pagediff tolerance presets");
    for (name, tolerance) in [
        ("strict", Tolerance::Strict),
        ("medium", Tolerance::Medium),
        ("relaxed", Tolerance::Relaxed),
    ] {
        let p = tolerance.region_params();
        println!(
            "  {:<8} severity_min={:<4} min_area={:<4} dilate={:<2} highlight_thresh={}",
            name, p.severity_min, p.min_area, p.dilate_iter, p.highlight_thresh
        );
    }
    Ok(())
}

// ── compare ────────────────────────────────────────────────────────────

fn run_compare(args: &CliCompareArgs) -> CliResult<()> {
    tracing::info!(
        "Comparing {} against {}",
        args.candidate.display(),
        args.reference.display()
    );

    let config = args.to_config()?;
    let comparator = Comparator::with_config(config);
    let result = comparator.compare_files(&args.reference, &args.candidate, &args.out_dir)?;

    tracing::info!(
        "Score {:.4}, change ratio {:.4}, {} regions",
        result.score,
        result.change_ratio,
        result.num_regions(),
    );
    for region in &result.regions {
        tracing::info!(
            "Issue #{}: {} at {} ({})",
            region.id,
            region.description,
            region.location,
            region.dims,
        );
    }

    let json_path = args
        .json
        .clone()
        .unwrap_or_else(|| args.out_dir.join("result.json"));
    let json = serde_json::to_string_pretty(&result)?;
    std::fs::write(&json_path, &json)?;
    tracing::info!("Results written to {}", json_path.display());

    Ok(())
}

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use env_logger::{Builder, Env};
use log::{info, warn};
use regression_vision::config::ComparisonConfig;
use regression_vision::core_modules::diff_renderer::HeatmapStyle;
use regression_vision::core_modules::history::{
    ComparisonHistory, DEFAULT_HISTORY_CAPACITY, HistoryEntry,
};
use regression_vision::core_modules::utils::image_helper;
use regression_vision::parallel_pipeline::{ComparisonJob, ComparisonWorkerPool};
use regression_vision::{ComparisonResult, RgbFrame, Verdict, compare};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

const FAIL_EXIT_CODE: u8 = 2;
const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

#[derive(Parser)]
#[command(name = "regression_tester")]
#[command(version, about = "Visual regression comparison of a baseline and a candidate image", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare one baseline image with one candidate image
    Compare {
        /// Reference image
        #[arg(value_name = "BASELINE")]
        baseline: PathBuf,

        /// Image to check against the baseline
        #[arg(value_name = "CANDIDATE")]
        candidate: PathBuf,

        #[command(flatten)]
        settings: SettingsArgs,

        /// Output directory for differences.png and heatmap.png
        #[arg(short, long, value_name = "DIR", default_value = ".")]
        out: PathBuf,

        /// JSON history file to append this comparison to (kept to the 10 most recent)
        #[arg(long, value_name = "FILE")]
        history: Option<PathBuf>,

        /// JSON array of annotation objects to store with the history entry
        #[arg(long, value_name = "FILE", requires = "history")]
        annotations: Option<PathBuf>,
    },

    /// Compare every image in BASELINE_DIR with the same-named image in CANDIDATE_DIR
    Batch {
        #[arg(value_name = "BASELINE_DIR")]
        baseline_dir: PathBuf,

        #[arg(value_name = "CANDIDATE_DIR")]
        candidate_dir: PathBuf,

        #[command(flatten)]
        settings: SettingsArgs,

        /// Output directory for the per-image renderings
        #[arg(short, long, value_name = "DIR", default_value = ".")]
        out: PathBuf,

        /// Number of comparison workers (default: number of CPUs)
        #[arg(short = 'j', long, value_name = "N")]
        workers: Option<usize>,
    },
}

#[derive(Args)]
struct SettingsArgs {
    /// JSON config file; flags below override its values
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Largest luma difference (0-255) that still counts as unchanged
    #[arg(short, long, value_name = "0-255")]
    tolerance: Option<u8>,

    /// Enable pass/fail classification
    #[arg(long)]
    thresholds: bool,

    /// Pass at or below this percentage (implies --thresholds)
    #[arg(long, value_name = "PERCENT")]
    pass: Option<f64>,

    /// Fail at or above this percentage (implies --thresholds)
    #[arg(long, value_name = "PERCENT")]
    fail: Option<f64>,

    /// Heatmap rendering
    #[arg(long, value_enum, value_name = "STYLE")]
    heatmap: Option<HeatmapArg>,

    /// Only report regions that are not enclosed by another region
    #[arg(long)]
    outer_only: bool,

    /// Drop regions whose bounding box is smaller than this many pixels
    #[arg(long, value_name = "PIXELS")]
    min_area: Option<u64>,
}

#[derive(Clone, Copy, ValueEnum)]
enum HeatmapArg {
    Raw,
    Grayscale,
    Thermal,
}

impl From<HeatmapArg> for HeatmapStyle {
    fn from(arg: HeatmapArg) -> Self {
        match arg {
            HeatmapArg::Raw => HeatmapStyle::Raw,
            HeatmapArg::Grayscale => HeatmapStyle::Grayscale,
            HeatmapArg::Thermal => HeatmapStyle::Thermal,
        }
    }
}

impl SettingsArgs {
    fn resolve(&self) -> Result<ComparisonConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                ComparisonConfig::from_json(&json)
                    .with_context(|| format!("parsing config {}", path.display()))?
            }
            None => ComparisonConfig::default(),
        };

        if let Some(tolerance) = self.tolerance {
            config.tolerance = tolerance;
        }
        if self.thresholds || self.pass.is_some() || self.fail.is_some() {
            config.use_thresholds = true;
        }
        if let Some(pass) = self.pass {
            config.pass_threshold = pass;
        }
        if let Some(fail) = self.fail {
            config.fail_threshold = fail;
        }
        if let Some(style) = self.heatmap {
            config.heatmap_style = style.into();
        }
        if self.outer_only {
            config.outer_regions_only = true;
        }
        if let Some(min_area) = self.min_area {
            config.min_region_area = min_area;
        }

        config.validate().context("invalid comparison settings")?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let verdicts = match cli.command {
        Commands::Compare {
            baseline,
            candidate,
            settings,
            out,
            history,
            annotations,
        } => {
            let config = settings.resolve()?;
            let verdict = run_compare(
                &baseline,
                &candidate,
                config,
                &out,
                history.as_deref(),
                annotations.as_deref(),
            )?;
            vec![verdict]
        }
        Commands::Batch {
            baseline_dir,
            candidate_dir,
            settings,
            out,
            workers,
        } => {
            let config = settings.resolve()?;
            run_batch(&baseline_dir, &candidate_dir, config, &out, workers).await?
        }
    };

    if verdicts.iter().any(Verdict::is_failure) {
        Ok(ExitCode::from(FAIL_EXIT_CODE))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn run_compare(
    baseline_path: &Path,
    candidate_path: &Path,
    config: ComparisonConfig,
    out: &Path,
    history_path: Option<&Path>,
    annotations_path: Option<&Path>,
) -> Result<Verdict> {
    let baseline = image_helper::open(baseline_path)
        .with_context(|| format!("loading baseline {}", baseline_path.display()))?;
    let candidate = image_helper::open(candidate_path)
        .with_context(|| format!("loading candidate {}", candidate_path.display()))?;

    let result = compare(baseline.clone(), candidate.clone(), config)
        .context("comparison failed")?;

    println!("{}", result.summary());
    print_regions(&result);
    write_renderings(&result, out, "")?;

    if let Some(history_path) = history_path {
        let annotations = match annotations_path {
            Some(path) => load_annotations(path)?,
            None => Vec::new(),
        };
        append_history(history_path, &baseline, &candidate, &result, annotations)?;
    }

    Ok(result.verdict())
}

async fn run_batch(
    baseline_dir: &Path,
    candidate_dir: &Path,
    config: ComparisonConfig,
    out: &Path,
    workers: Option<usize>,
) -> Result<Vec<Verdict>> {
    let pairs = matching_pairs(baseline_dir, candidate_dir)?;
    if pairs.is_empty() {
        bail!(
            "no same-named images found in {} and {}",
            baseline_dir.display(),
            candidate_dir.display()
        );
    }

    let mut names = Vec::with_capacity(pairs.len());
    let mut jobs = Vec::with_capacity(pairs.len());
    for (name, baseline_path, candidate_path) in pairs {
        let baseline = image_helper::open(&baseline_path)
            .with_context(|| format!("loading baseline {}", baseline_path.display()))?;
        let candidate = image_helper::open(&candidate_path)
            .with_context(|| format!("loading candidate {}", candidate_path.display()))?;
        names.push(name);
        jobs.push(ComparisonJob {
            baseline,
            candidate,
            config: config.clone(),
        });
    }

    let pool = match workers {
        Some(n) => ComparisonWorkerPool::with_workers(n),
        None => ComparisonWorkerPool::new(),
    };
    info!("comparing {} pair(s) on {} worker(s)", jobs.len(), pool.size());
    let results = pool.compare_many(jobs).await;

    let mut verdicts = Vec::with_capacity(results.len());
    for (name, outcome) in names.iter().zip(results) {
        match outcome {
            Ok(result) => {
                println!(
                    "{name}: {}% changed, {} region(s), {}",
                    result.diff_percent(),
                    result.regions().len(),
                    result.verdict()
                );
                for warning in result.warnings() {
                    warn!("{name}: {warning}");
                }
                let stem = Path::new(name)
                    .file_stem()
                    .map(|s| format!("{}_", s.to_string_lossy()))
                    .unwrap_or_default();
                write_renderings(&result, out, &stem)?;
                verdicts.push(result.verdict());
            }
            Err(e) => {
                eprintln!("{name}: comparison failed: {e}");
                verdicts.push(Verdict::Fail);
            }
        }
    }
    Ok(verdicts)
}

/// Same-named image files present in both directories, sorted by name.
fn matching_pairs(baseline_dir: &Path, candidate_dir: &Path) -> Result<Vec<(String, PathBuf, PathBuf)>> {
    let entries = std::fs::read_dir(baseline_dir)
        .with_context(|| format!("reading {}", baseline_dir.display()))?;

    let mut pairs = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let is_image = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if !is_image {
            continue;
        }
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        let candidate = candidate_dir.join(&name);
        if candidate.is_file() {
            pairs.push((name, path, candidate));
        } else {
            warn!("{name}: no candidate in {}", candidate_dir.display());
        }
    }
    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(pairs)
}

fn print_regions(result: &ComparisonResult) {
    for (i, region) in result.regions().iter().enumerate() {
        println!(
            "  region {i}: x={} y={} w={} h={} ({} px)",
            region.x, region.y, region.width, region.height, region.pixel_count
        );
    }
}

fn write_renderings(result: &ComparisonResult, out: &Path, prefix: &str) -> Result<()> {
    std::fs::create_dir_all(out).with_context(|| format!("creating {}", out.display()))?;
    let differences = out.join(format!("{prefix}differences.png"));
    let heatmap = out.join(format!("{prefix}heatmap.png"));
    image_helper::save_png(result.highlighted(), &differences)
        .with_context(|| format!("writing {}", differences.display()))?;
    image_helper::save_png(result.heatmap(), &heatmap)
        .with_context(|| format!("writing {}", heatmap.display()))?;
    info!("wrote {} and {}", differences.display(), heatmap.display());
    Ok(())
}

fn load_annotations(path: &Path) -> Result<Vec<serde_json::Value>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading annotations {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("parsing annotations {}", path.display()))
}

fn append_history(
    path: &Path,
    baseline: &RgbFrame,
    candidate: &RgbFrame,
    result: &ComparisonResult,
    annotations: Vec<serde_json::Value>,
) -> Result<()> {
    let mut history = if path.exists() {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading history {}", path.display()))?;
        ComparisonHistory::from_json(&json, DEFAULT_HISTORY_CAPACITY)
            .with_context(|| format!("parsing history {}", path.display()))?
    } else {
        ComparisonHistory::new()
    };

    history.push(HistoryEntry::from_result(baseline, candidate, result, annotations)?);
    std::fs::write(path, history.to_json()?)
        .with_context(|| format!("writing history {}", path.display()))?;
    info!("history now holds {} entr(ies)", history.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> SettingsArgs {
        SettingsArgs {
            config: None,
            tolerance: None,
            thresholds: false,
            pass: None,
            fail: None,
            heatmap: None,
            outer_only: false,
            min_area: None,
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn tolerance_help_describes_the_inclusive_limit() {
        use clap::CommandFactory;
        let command = Cli::command();
        let subcommand = command.find_subcommand("compare").unwrap();
        let tolerance = subcommand
            .get_arguments()
            .find(|arg| arg.get_id() == "tolerance")
            .unwrap();
        let help = tolerance.get_help().unwrap().to_string();
        assert!(help.starts_with("Largest"), "{help}");

        // A difference exactly at the tolerance stays unchanged.
        let baseline = RgbFrame::filled(2, 1, [0, 0, 0]).unwrap();
        let mut candidate = baseline.clone();
        candidate.put(0, 0, [40, 40, 40]);
        let config = ComparisonConfig {
            tolerance: 40,
            ..ComparisonConfig::default()
        };
        assert!(compare(baseline, candidate, config).unwrap().is_identical());
    }

    #[test]
    fn pass_or_fail_flags_turn_thresholds_on() {
        let args = SettingsArgs {
            pass: Some(5.0),
            ..settings()
        };
        let config = args.resolve().unwrap();
        assert!(config.use_thresholds);
        assert_eq!(config.pass_threshold, 5.0);
        assert_eq!(config.fail_threshold, 70.0);
    }

    #[test]
    fn inverted_thresholds_are_rejected() {
        let args = SettingsArgs {
            pass: Some(80.0),
            fail: Some(20.0),
            ..settings()
        };
        assert!(args.resolve().is_err());
    }

    #[test]
    fn parses_compare_subcommand() {
        let cli = Cli::try_parse_from([
            "regression_tester",
            "compare",
            "a.png",
            "b.png",
            "--tolerance",
            "0",
            "--heatmap",
            "thermal",
            "--outer-only",
        ])
        .unwrap();
        let Commands::Compare { settings, .. } = cli.command else {
            panic!("expected compare");
        };
        let config = settings.resolve().unwrap();
        assert_eq!(config.tolerance, 0);
        assert_eq!(config.heatmap_style, HeatmapStyle::Thermal);
        assert!(config.outer_regions_only);
        assert!(!config.use_thresholds);
    }

    #[test]
    fn tolerance_above_255_is_a_parse_error() {
        assert!(
            Cli::try_parse_from(["regression_tester", "compare", "a.png", "b.png", "-t", "256"])
                .is_err()
        );
    }
}

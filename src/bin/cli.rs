//! Gamma Levels CLI
//!
//! Reads an option chain export and prints gamma levels, overlay text or the
//! level table.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use gamma_levels::prelude::*;

/// Gamma flip and put/call wall levels from option chain spreadsheets
#[derive(Parser)]
#[command(name = "gamma-cli", version, about)]
struct Cli {
    /// Log debug output from every pipeline stage
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print derived levels and a dataset summary
    Analyze {
        #[command(flatten)]
        input: InputArgs,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,

        /// Also print the net gamma profile per strike
        #[arg(long)]
        profile: bool,

        /// Lowest strike shown with --profile
        #[arg(long)]
        min_strike: Option<f64>,

        /// Highest strike shown with --profile
        #[arg(long)]
        max_strike: Option<f64>,

        /// Print the effective configuration as JSON first
        #[arg(long)]
        show_config: bool,
    },

    /// Print chart script overlay assignments
    Overlay {
        #[command(flatten)]
        input: InputArgs,

        /// Leading comment line
        #[arg(long)]
        title: Option<String>,

        /// Decimal places for strikes
        #[arg(long, default_value = "2")]
        decimals: usize,

        /// Text placed before each assignment, e.g. "float "
        #[arg(long, default_value = "")]
        prefix: String,
    },

    /// Write the Level,Strike table
    Export {
        #[command(flatten)]
        input: InputArgs,

        /// Output file (default: stdout); .tsv writes tab-delimited
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Decimal places for strikes
        #[arg(long, default_value = "2")]
        decimals: usize,
    },
}

#[derive(Args)]
struct InputArgs {
    /// Path to the CSV/TSV chain export
    file: PathBuf,

    /// JSON configuration file; flags below override it
    #[arg(long, conflicts_with = "preset")]
    config: Option<PathBuf>,

    /// Named configuration preset; flags below override it
    #[arg(long, value_enum)]
    preset: Option<PresetArg>,

    /// Header row: 0, 1 or auto
    #[arg(long, value_parser = parse_header_row)]
    header_row: Option<HeaderRow>,

    /// Call/put split rule
    #[arg(long, value_enum)]
    split: Option<SplitArg>,

    /// Strike pivot for --split threshold
    #[arg(long)]
    threshold: Option<f64>,

    /// Gamma sign convention
    #[arg(long, value_enum)]
    sign: Option<SignArg>,

    /// Weight gamma by open interest times this contract multiplier
    #[arg(long)]
    multiplier: Option<f64>,

    /// Which contracts enter the profile
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,
}

#[derive(Clone, Copy, ValueEnum)]
enum PresetArg {
    DealerStandard,
    AsReported,
    OiWeighted,
}

#[derive(Clone, Copy, ValueEnum)]
enum SplitArg {
    Auto,
    Positional,
    Side,
    Median,
    Threshold,
}

#[derive(Clone, Copy, ValueEnum)]
enum SignArg {
    Auto,
    AsReported,
    NegatePuts,
    NegateCalls,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Net,
    Calls,
    Puts,
}

fn parse_header_row(value: &str) -> Result<HeaderRow, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "auto" => Ok(HeaderRow::Auto),
        other => other
            .parse::<usize>()
            .map(HeaderRow::Index)
            .map_err(|_| format!("expected 0, 1 or auto, got '{}'", value)),
    }
}

impl InputArgs {
    fn config(&self) -> anyhow::Result<GammaConfig> {
        let mut config = match (&self.config, self.preset) {
            (Some(path), _) => GammaConfig::from_json_file(path)
                .with_context(|| format!("reading config {}", path.display()))?,
            (None, Some(PresetArg::DealerStandard)) => GammaConfig::dealer_standard(),
            (None, Some(PresetArg::AsReported)) => GammaConfig::as_reported(),
            (None, Some(PresetArg::OiWeighted)) => GammaConfig::open_interest_weighted(),
            (None, None) => GammaConfig::default(),
        };

        if let Some(header_row) = self.header_row {
            config.normalize.header_row = header_row;
        }

        if let Some(split) = self.split {
            config.split.policy = match split {
                SplitArg::Auto => SplitPolicy::Auto,
                SplitArg::Positional => SplitPolicy::Positional,
                SplitArg::Side => SplitPolicy::SideColumn,
                SplitArg::Median => SplitPolicy::MedianStrike,
                SplitArg::Threshold => match self.threshold {
                    Some(t) => SplitPolicy::StrikeThreshold(t),
                    None => bail!("--split threshold requires --threshold"),
                },
            };
        } else if let Some(t) = self.threshold {
            config.split.policy = SplitPolicy::StrikeThreshold(t);
        }

        if let Some(sign) = self.sign {
            config.profile.sign = match sign {
                SignArg::Auto => GammaSign::Auto,
                SignArg::AsReported => GammaSign::AsReported,
                SignArg::NegatePuts => GammaSign::NegatePuts,
                SignArg::NegateCalls => GammaSign::NegateCalls,
            };
        }

        if let Some(multiplier) = self.multiplier {
            config.profile.weight = ExposureWeight::OpenInterest { multiplier };
        }

        if let Some(mode) = self.mode {
            config.profile.mode = match mode {
                ModeArg::Net => AnalysisMode::Net,
                ModeArg::Calls => AnalysisMode::CallsOnly,
                ModeArg::Puts => AnalysisMode::PutsOnly,
            };
        }

        Ok(config)
    }

    fn analyze(&self) -> anyhow::Result<ChainAnalysis> {
        let config = self.config()?;
        let table = read_table_from_path(&self.file, None)
            .with_context(|| format!("reading {}", self.file.display()))?;
        info!(rows = table.len(), file = %self.file.display(), "loaded table");

        let analysis = GammaPipeline::with_config(config)
            .analyze(&table)
            .with_context(|| format!("analyzing {}", self.file.display()))?;

        for warning in &analysis.warnings {
            warn!("{}", warning.message());
        }
        Ok(analysis)
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_summary(analysis: &ChainAnalysis) {
    let summary = analysis.summary();
    println!("Header row:   {}", summary.header_row);
    println!("Calls/Puts:   {} / {}", summary.calls, summary.puts);
    println!("Strikes:      {}", summary.strikes);
    println!(
        "Split:        {:?}{}",
        summary.split_method,
        if summary.approximate_split { " (approximate)" } else { "" }
    );
    println!("Sign:         {:?}", summary.sign);
    println!("Net gamma:    {:+.6}", summary.net_gamma_total);
    if summary.dropped_rows > 0 || summary.invalid_cells > 0 {
        println!(
            "Dropped rows: {}, invalid cells: {}",
            summary.dropped_rows, summary.invalid_cells
        );
    }
    println!();

    match analysis.levels() {
        Ok(levels) => {
            match levels.gamma_flip {
                Some(flip) => println!("Gamma flip:   {:.2}", flip),
                None => println!("Gamma flip:   {}", levels.describe_flip()),
            }
            println!("Put wall:     {:.2}", levels.put_wall);
            println!("Call wall:    {:.2}", levels.call_wall);
        }
        Err(e) => println!("Levels unavailable: {}", e),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Analyze {
            input,
            json,
            profile,
            min_strike,
            max_strike,
            show_config,
        } => {
            if show_config {
                let text = input.config()?.to_json_string().context("serializing config")?;
                println!("{}", text);
            }
            let analysis = input.analyze()?;
            if json {
                let text = serde_json::to_string_pretty(&analysis.summary())
                    .context("serializing summary")?;
                println!("{}", text);
            } else {
                print_summary(&analysis);
            }
            if profile {
                println!("\nStrike,NetGamma");
                let window = analysis.net_series().filter_range(
                    min_strike.unwrap_or(f64::NEG_INFINITY),
                    max_strike.unwrap_or(f64::INFINITY),
                );
                for point in window.points() {
                    println!("{},{}", point.strike, point.net_gamma);
                }
            }
        }
        Command::Overlay {
            input,
            title,
            decimals,
            prefix,
        } => {
            let analysis = input.analyze()?;
            let levels = analysis.levels()?;
            let mut config = OverlayConfig {
                decimals,
                ..OverlayConfig::default()
            }
            .with_prefix(prefix);
            if let Some(title) = title {
                config = config.with_title(title);
            }
            print!("{}", render_overlay(levels, &config));
        }
        Command::Export {
            input,
            output,
            decimals,
        } => {
            let analysis = input.analyze()?;
            let levels = analysis.levels()?;
            match output {
                Some(path) => {
                    write_level_table_file(&path, levels, decimals)
                        .with_context(|| format!("writing {}", path.display()))?;
                    info!(path = %path.display(), "level table written");
                }
                None => write_level_table(std::io::stdout().lock(), levels, b',', decimals)?,
            }
        }
    }

    Ok(())
}

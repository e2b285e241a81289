use clap::{Args, Parser, Subcommand};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use motevo_rs::config::{BackgroundFrequencies, Mode, MotevoConfig, Retry, UfeLength};
use motevo_rs::error::MotevoError;
use motevo_rs::{parse, plot, run};
use polars::prelude::*;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_log::AsTrace as _;
use tracing_subscriber::EnvFilter;

#[derive(thiserror::Error, Debug)]
pub enum CliError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),

    #[error("{0}")]
    Motevo(#[from] MotevoError),

    #[error("MotEvo did not produce its sites and priors, see {}", .0.display())]
    RunFailed(PathBuf),

    #[error("{} does not hold three valid prior rows", .0.display())]
    NoPriors(PathBuf),

    #[error("Unsupported output format `{0}`, expected csv or parquet")]
    UnsupportedFormat(String),
}

#[derive(Parser)]
#[command(
    name = "motevo-wrapper",
    about = "Runs MotEvo binding site predictions and tabulates its output",
    long_about = "A wrapper around MotEvo, which predicts transcription factor binding sites \
                  in multi-species alignments. It writes MotEvo's parameter file, runs MotEvo \
                  and runUFE, and converts the sites and priors files into tables.",
    version,
    after_help = "Example usage:\n    \
                  motevo-wrapper run alignments.aln REST.wm out --tree '(a:0.1,b:0.2);' --ref-species a\n    \
                  motevo-wrapper sites out/sites_REST.wm -o sites.csv",
    color = clap::ColorChoice::Always
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    verbose: Verbosity<WarnLevel>,
}

#[derive(Subcommand)]
enum Command {
    /// Run MotEvo on an alignment file with one weight matrix
    Run(RunArgs),
    /// Estimate a UFE background model with runUFE
    Ufe(UfeArgs),
    /// Tabulate a MotEvo sites file
    Sites(TableArgs),
    /// Tabulate a MotEvo priors file
    Priors(TableArgs),
    /// Draw a histogram of site posteriors as SVG
    Plot(PlotArgs),
}

#[derive(Args)]
struct BackgroundArgs {
    /// Background frequency of A
    #[arg(long, default_value_t = 0.25)]
    bg_a: f64,

    /// Background frequency of C
    #[arg(long, default_value_t = 0.25)]
    bg_c: f64,

    /// Background frequency of G
    #[arg(long, default_value_t = 0.25)]
    bg_g: f64,

    /// Background frequency of T
    #[arg(long, default_value_t = 0.25)]
    bg_t: f64,
}

impl BackgroundArgs {
    fn frequencies(&self) -> BackgroundFrequencies {
        BackgroundFrequencies::new(self.bg_a, self.bg_c, self.bg_g, self.bg_t)
    }
}

#[derive(Args)]
struct RunArgs {
    /// Alignment file handed to MotEvo
    #[arg(value_name = "SEQUENCES")]
    sequences: PathBuf,

    /// Weight matrix file of the motif to scan
    #[arg(value_name = "WM_FILE")]
    wm: PathBuf,

    /// Directory MotEvo runs in and writes its output to
    #[arg(value_name = "WORKING_DIR")]
    working_directory: PathBuf,

    /// Phylogenetic tree in Newick format
    #[arg(long)]
    tree: String,

    /// Reference species of the alignments
    #[arg(long)]
    ref_species: String,

    /// TFBS or WMREF
    #[arg(long, default_value = "TFBS")]
    mode: Mode,

    /// Keep the priors fixed instead of estimating them with EM
    #[arg(long)]
    no_em_prior: bool,

    /// EM convergence threshold on the priors
    #[arg(long)]
    prior_diff: Option<f64>,

    /// Prior of the UFE weight matrix
    #[arg(long)]
    ufe_wm_prior: Option<f64>,

    /// UFE model file, as written by the `ufe` command
    #[arg(long)]
    ufe_wm_file: Option<PathBuf>,

    /// Length of the UFE weight matrix, or `auto` for the motif length
    #[arg(long)]
    ufe_wm_len: Option<UfeLength>,

    /// Report UFE sites
    #[arg(long)]
    ufe_print: bool,

    /// Order of the background Markov model
    #[arg(long)]
    markov_order_bg: Option<u32>,

    /// Prior of the background model
    #[arg(long)]
    background_prior: Option<f64>,

    #[command(flatten)]
    background: BackgroundArgs,

    /// Restrict parses
    #[arg(long)]
    restrict_parses: bool,

    /// Name of the sites file (default: sites_<WM_FILE name>)
    #[arg(long)]
    sites_file: Option<String>,

    /// Name of the priors file (default: priors_<WM_FILE name>)
    #[arg(long)]
    priors_file: Option<String>,

    /// Do not print the aligned sequences of each site
    #[arg(long)]
    no_site_alignments: bool,

    /// Minimum posterior of reported sites
    #[arg(long)]
    min_posterior: Option<f64>,

    /// Minimum posterior used for weight matrix refinement
    #[arg(long)]
    min_posterior_wm: Option<f64>,

    /// Re-run MotEvo until it succeeds
    #[arg(long)]
    retry: bool,

    /// MotEvo executable
    #[arg(long, default_value = run::MOTEVO)]
    motevo: PathBuf,
}

impl RunArgs {
    fn config(&self) -> MotevoConfig {
        MotevoConfig {
            tree: self.tree.clone(),
            ref_species: self.ref_species.clone(),
            mode: self.mode,
            em_prior: !self.no_em_prior,
            prior_diff: self.prior_diff,
            ufe_wm_prior: self.ufe_wm_prior,
            ufe_wm_file: self.ufe_wm_file.clone(),
            ufe_wm_len: self.ufe_wm_len,
            ufe_print: self.ufe_print.then_some(true),
            markov_order_bg: self.markov_order_bg,
            background_prior: self.background_prior,
            background: self.background.frequencies(),
            restrict_parses: self.restrict_parses.then_some(true),
            sites_file: self.sites_file.clone(),
            priors_file: self.priors_file.clone(),
            print_site_als: !self.no_site_alignments,
            min_posterior: self.min_posterior,
            min_posterior_wm: self.min_posterior_wm,
            retry: if self.retry {
                Retry::UntilSuccess
            } else {
                Retry::Once
            },
            executable: self.motevo.clone(),
        }
    }
}

#[derive(Args)]
struct UfeArgs {
    /// Tree file handed to runUFE
    #[arg(value_name = "TREE_FILE")]
    tree_file: PathBuf,

    /// Where to write the model
    #[arg(short, long, default_value = run::DEFAULT_UFE_MODEL)]
    output: PathBuf,

    #[command(flatten)]
    background: BackgroundArgs,

    /// runUFE executable
    #[arg(long, default_value = run::RUN_UFE)]
    run_ufe: PathBuf,
}

#[derive(Args)]
struct TableArgs {
    /// MotEvo output file
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Write the table here (.csv or .parquet) instead of printing it
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct PlotArgs {
    /// MotEvo sites file
    #[arg(value_name = "SITES_FILE")]
    sites: PathBuf,

    /// SVG file to draw
    #[arg(value_name = "OUTPUT_SVG")]
    output: PathBuf,

    /// Number of posterior bins
    #[arg(long, default_value_t = 20)]
    bins: usize,
}

fn write_table(df: &mut DataFrame, path: &Path) -> Result<(), CliError> {
    let parquet = match path.extension().and_then(|e| e.to_str()) {
        Some("parquet") => true,
        Some("csv") | None => false,
        Some(other) => return Err(CliError::UnsupportedFormat(other.to_string())),
    };

    // Create output directory if it doesn't exist
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut file = File::create(path)?;
    if parquet {
        ParquetWriter::new(&mut file).finish(df)?;
    } else {
        CsvWriter::new(&mut file).finish(df)?;
    }

    info!(path = %path.display(), rows = df.height(), "wrote table");
    Ok(())
}

fn emit_table(mut df: DataFrame, output: Option<&Path>) -> Result<(), CliError> {
    match output {
        Some(path) => write_table(&mut df, path),
        None => {
            println!("{}", df);
            Ok(())
        }
    }
}

fn execute(command: Command) -> Result<(), CliError> {
    match command {
        Command::Run(args) => {
            let output = run::run_motevo(
                &args.sequences,
                &args.wm,
                &args.working_directory,
                &args.config(),
            )?;
            if !output.succeeded {
                return Err(CliError::RunFailed(output.report));
            }
            println!("{}", output.sites.display());
            println!("{}", output.priors.display());
        }
        Command::Ufe(args) => {
            let model = run::run_ufe_with(
                &args.run_ufe,
                &args.tree_file,
                &args.background.frequencies(),
                &args.output,
            )?;
            println!("{}", model.display());
        }
        Command::Sites(args) => {
            let df = parse::parse_sites(&args.input)?;
            emit_table(df, args.output.as_deref())?;
        }
        Command::Priors(args) => {
            let df = parse::parse_priors(&args.input)?
                .ok_or_else(|| CliError::NoPriors(args.input.clone()))?;
            emit_table(df, args.output.as_deref())?;
        }
        Command::Plot(args) => {
            let records = parse::read_site_records(&args.sites)?;
            plot::plot_posteriors(&records, &args.output, args.bins)?;
        }
    }

    Ok(())
}

fn main() -> Result<(), CliError> {
    let start_time = std::time::Instant::now();

    let cli = Cli::parse();

    match std::env::var("RUST_LOG") {
        Ok(_) => tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .init(),
        Err(_) => tracing_subscriber::fmt()
            .with_max_level(cli.verbose.log_level_filter().as_trace())
            .with_writer(std::io::stderr)
            .init(),
    };

    execute(cli.command)?;

    info!(seconds = start_time.elapsed().as_secs_f64(), "finished");
    Ok(())
}

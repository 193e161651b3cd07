use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use env_logger::Env;
use log::info;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use dualguide::design::{
    Cas12aConfig, Cas12aDesign, DualConfig, DualNucleaseDesign, ASCAS12A_DIRECT_REPEAT,
};
use dualguide::gene_pairs::all_by_all;
use dualguide::guide::NON_TARGETING;
use dualguide::output::TsvSink;
use dualguide::overlap::{OverlapChecker, DEFAULT_OVERLAP_THRESHOLD};
use dualguide::processor::{GenePairProcessor, LibraryDesign};
use dualguide::table::{self, ControlTable};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Paired guide library designer for dual-targeting CRISPR screens"
)]
struct Cli {
    /// Increase verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only report warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Cas12a arrays: guide pairs joined by the Cas12a direct repeat
    Cas12a(Cas12aArgs),
    /// SpCas9 + SaCas9 guide pairs
    Dual(DualArgs),
    /// Write every pair of listed genes, plus self pairs, as a GP gene pair table
    GenePairs(GenePairArgs),
}

/// Options shared by both library designs
#[derive(Args)]
struct CommonArgs {
    /// File with required gene pairs
    #[arg(long = "gene-pairs")]
    gene_pairs: PathBuf,

    /// Length of overlap to be avoided
    #[arg(long = "overlap-check", default_value_t = DEFAULT_OVERLAP_THRESHOLD)]
    overlap_check: usize,

    /// Number of control-control combinations
    #[arg(long = "ctrl-ctrl", default_value_t = 100)]
    ctrl_ctrl: usize,

    /// Seed for control sampling (random if omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Output file name
    #[arg(short, long)]
    outputfile: PathBuf,

    /// Also write pairs rejected by the overlap check to this file
    #[arg(long = "rejected-output")]
    rejected_output: Option<PathBuf>,
}

#[derive(Args)]
struct Cas12aArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// File with guide picks for all genes
    #[arg(long = "sg-picks")]
    sg_picks: PathBuf,

    /// File with list of no-site controls
    #[arg(long = "no-site")]
    no_site: PathBuf,

    /// File with list of intergenic controls
    #[arg(long)]
    intergenic: PathBuf,

    /// Number of no-site and intergenic controls to pair each guide with
    #[arg(long = "num-ctrls", default_value_t = 5)]
    num_ctrls: usize,

    /// Direct repeat placed between the two guides
    #[arg(long = "direct-repeat", default_value = ASCAS12A_DIRECT_REPEAT)]
    direct_repeat: String,
}

#[derive(Args)]
struct DualArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// File with S.pyogenes guide designs
    #[arg(long = "sp-input-file")]
    sp_input_file: PathBuf,

    /// File with S.aureus guide designs
    #[arg(long = "sa-input-file")]
    sa_input_file: PathBuf,

    /// File with S.pyogenes control guides
    #[arg(long = "sp-ctrls-file")]
    sp_ctrls_file: PathBuf,

    /// File with S.aureus control guides
    #[arg(long = "sa-ctrls-file")]
    sa_ctrls_file: PathBuf,

    /// Lines to skip before the header of the S.pyogenes control file
    #[arg(long = "sp-ctrls-skip-rows", default_value_t = 0)]
    sp_ctrls_skip_rows: usize,

    /// Lines to skip before the header of the S.aureus control file
    #[arg(long = "sa-ctrls-skip-rows", default_value_t = 1)]
    sa_ctrls_skip_rows: usize,

    /// Sequence column of the control files (default: "sgRNA Sequence" or "sgRNA Seq")
    #[arg(long = "ctrls-column")]
    ctrls_column: Option<String>,

    /// Number of controls paired with each guide
    #[arg(long = "ctrls-per-guide", default_value_t = 1)]
    ctrls_per_guide: usize,
}

#[derive(Args)]
struct GenePairArgs {
    /// Tab-separated file with a "Gene Symbol" column
    #[arg(long = "gene-list")]
    gene_list: PathBuf,

    /// Output file name
    #[arg(short, long, default_value = "gene_pairs.txt")]
    output: PathBuf,
}

fn create_output(path: &Path) -> Result<Box<dyn Write>> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create output file {}", path.display()))?;
    Ok(Box::new(BufWriter::new(file)))
}

fn seeded_rng(seed: Option<u64>) -> SmallRng {
    let seed = seed.unwrap_or_else(|| rand::rng().random());
    info!("Sampling controls with seed {}", seed);
    SmallRng::seed_from_u64(seed)
}

/// Run a design over the gene pair table and write the library.
fn write_library<D: LibraryDesign>(design: D, common: &CommonArgs) -> Result<()> {
    let specs = table::read_gene_pairs_from_path(&common.gene_pairs).with_context(|| {
        format!("Failed to read gene pairs from {}", common.gene_pairs.display())
    })?;

    let processor = GenePairProcessor::new(design, OverlapChecker::new(common.overlap_check));
    let header = processor.header();

    let mut sink = TsvSink::new(create_output(&common.outputfile)?, header)?;
    if let Some(path) = &common.rejected_output {
        sink = sink.with_rejected(create_output(path)?, header)?;
    }

    let summary = processor.run(&specs, &mut sink)?;
    sink.into_inner()?.flush()?;

    info!(
        "Wrote {} pair(s) to {}",
        summary.accepted,
        common.outputfile.display()
    );
    Ok(())
}

fn run_cas12a(args: Cas12aArgs) -> Result<()> {
    let guides = table::read_guides_from_path(&args.sg_picks)
        .with_context(|| format!("Failed to read guide picks from {}", args.sg_picks.display()))?;
    let controls = ControlTable::new(NON_TARGETING);
    let no_site = controls.read_path(&args.no_site).with_context(|| {
        format!("Failed to read no-site controls from {}", args.no_site.display())
    })?;
    let intergenic = controls.read_path(&args.intergenic).with_context(|| {
        format!("Failed to read intergenic controls from {}", args.intergenic.display())
    })?;

    let config = Cas12aConfig {
        controls_per_gene: args.num_ctrls,
        control_pairs: args.common.ctrl_ctrl,
        direct_repeat: args.direct_repeat,
    };
    let rng = seeded_rng(args.common.seed);
    let design = Cas12aDesign::new(guides, no_site, intergenic, config, rng)?;
    write_library(design, &args.common)
}

fn run_dual(args: DualArgs) -> Result<()> {
    let sp_guides = table::read_guides_from_path(&args.sp_input_file).with_context(|| {
        format!("Failed to read SpCas9 guides from {}", args.sp_input_file.display())
    })?;
    let sa_guides = table::read_guides_from_path(&args.sa_input_file).with_context(|| {
        format!("Failed to read SaCas9 guides from {}", args.sa_input_file.display())
    })?;

    let sp_controls = ControlTable::new(NON_TARGETING)
        .skip_rows(args.sp_ctrls_skip_rows)
        .sequence_column(args.ctrls_column.clone())
        .read_path(&args.sp_ctrls_file)
        .with_context(|| {
            format!("Failed to read SpCas9 controls from {}", args.sp_ctrls_file.display())
        })?;
    let sa_controls = ControlTable::new(NON_TARGETING)
        .skip_rows(args.sa_ctrls_skip_rows)
        .sequence_column(args.ctrls_column.clone())
        .read_path(&args.sa_ctrls_file)
        .with_context(|| {
            format!("Failed to read SaCas9 controls from {}", args.sa_ctrls_file.display())
        })?;

    let config = DualConfig {
        controls_per_guide: args.ctrls_per_guide,
        control_pairs: args.common.ctrl_ctrl,
    };
    let design = DualNucleaseDesign::new(
        sp_guides,
        sa_guides,
        sp_controls,
        sa_controls,
        config,
        seeded_rng(args.common.seed),
    );
    write_library(design, &args.common)
}

fn run_gene_pairs(args: GenePairArgs) -> Result<()> {
    let genes = table::read_gene_list(table::open_input(&args.gene_list)?)
        .with_context(|| format!("Failed to read gene list from {}", args.gene_list.display()))?;
    let specs = all_by_all(&genes);

    let mut out = create_output(&args.output)?;
    table::write_gene_pairs(&mut out, &specs)?;
    out.flush()?;

    info!(
        "Wrote {} gene pair(s) for {} gene(s) to {}",
        specs.len(),
        genes.len(),
        args.output.display()
    );
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match (cli.quiet, cli.verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    match cli.command {
        Command::Cas12a(args) => run_cas12a(args),
        Command::Dual(args) => run_dual(args),
        Command::GenePairs(args) => run_gene_pairs(args),
    }
}

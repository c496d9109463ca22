use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "AmberMD Contributors",
    version,
    about = "AmberMD CLI - Generate AMBER &cntrl input files for minimization and molecular-dynamics protocols.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write every stage of a TOML protocol file as an AMBER input file.
    Write(WriteArgs),
    /// Write the standard ten-stage equilibration and production protocol.
    Equil(EquilArgs),
}

/// Arguments for the `write` subcommand.
#[derive(Args, Debug)]
pub struct WriteArgs {
    /// Path to the protocol file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    /// Directory receiving the `<stage>.in` files. Defaults to the current directory.
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Set a system value, overriding the config file.
    /// Can be used multiple times. Example: -S system.protein=250
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `equil` subcommand.
#[derive(Args, Debug)]
pub struct EquilArgs {
    /// Directory receiving the `<stage>.in` files. Defaults to the current directory.
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    #[command(flatten)]
    pub system: SystemArgs,

    /// Restraint mask for the strongly restrained stages (e.g. solute heavy atoms).
    #[arg(long, required = true, value_name = "MASK")]
    pub heavy_mask: String,

    /// Restraint mask for the weakly restrained stages (e.g. protein backbone).
    #[arg(long, required = true, value_name = "MASK")]
    pub backbone_mask: String,

    /// Additional selection OR-ed into both restraint masks (e.g. a ligand).
    #[arg(long, value_name = "MASK")]
    pub add_mask: Option<String>,

    /// Simulation temperature in kelvin.
    #[arg(short, long, value_name = "KELVIN")]
    pub temp: Option<f64>,

    /// Length of the production run in nanoseconds.
    #[arg(short, long, value_name = "NS")]
    pub ns: Option<u64>,
}

/// Describes the simulated system either by file or by residue counts.
#[derive(Args, Debug, Clone)]
pub struct SystemArgs {
    /// Path to a TOML system summary (residue counts and water model).
    #[arg(short, long, value_name = "PATH", conflicts_with_all = ["protein", "dna", "rna", "lipid", "carbohydrate"])]
    pub system: Option<PathBuf>,

    /// Number of protein residues.
    #[arg(long, value_name = "INT")]
    pub protein: Option<usize>,

    /// Number of DNA residues.
    #[arg(long, value_name = "INT")]
    pub dna: Option<usize>,

    /// Number of RNA residues.
    #[arg(long, value_name = "INT")]
    pub rna: Option<usize>,

    /// Number of lipid residues.
    #[arg(long, value_name = "INT")]
    pub lipid: Option<usize>,

    /// Number of carbohydrate residues.
    #[arg(long, value_name = "INT")]
    pub carbohydrate: Option<usize>,

    /// The solvent uses CHARMM TIP3P atom names.
    #[arg(long)]
    pub charmm_water: bool,
}

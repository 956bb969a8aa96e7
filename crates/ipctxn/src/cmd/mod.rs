use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod bench;
pub mod script;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run begin/finalize cycles and report slot reuse.
    Bench(BenchArgs),
    /// Run a JSON script of transaction steps.
    Script(ScriptArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Bench(args) => bench::run(args, format),
        Command::Script(args) => script::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum BenchTarget {
    /// Drive a pending transaction set directly.
    Set,
    /// Put and get through a portal pair.
    Portal,
}

#[derive(Args, Debug)]
pub struct BenchArgs {
    /// Number of rounds.
    #[arg(long, default_value = "100000")]
    pub iterations: u64,
    /// Transactions kept outstanding per round.
    #[arg(long, default_value = "1")]
    pub depth: usize,
    /// Parcel capacity in bytes.
    #[arg(long, default_value = "64")]
    pub capacity: usize,
    /// What to drive.
    #[arg(long, value_enum, default_value = "set")]
    pub target: BenchTarget,
}

#[derive(Args, Debug)]
pub struct ScriptArgs {
    /// Script file (JSON array of steps), or `-` for stdin.
    pub file: PathBuf,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

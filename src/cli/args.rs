//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum, ValueHint};

use crate::config::OpKind;

/// Structure-preserving perturbations of SWC neuron reconstructions
#[derive(Parser, Debug)]
#[command(name = "morphaug")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-d info, -dd debug, -ddd trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub debug: u8,

    /// Directory holding a local .morphaug.toml (default: cwd)
    #[arg(short = 'c', long, global = true, value_hint = ValueHint::DirPath)]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Operator selectable on the command line.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    /// Jitter a random subset of node positions
    Point,
    /// Remove whole branches, favoring short ones
    Drop,
    /// Rigid random rotation about the root
    Rotate,
}

impl From<Op> for OpKind {
    fn from(op: Op) -> Self {
        match op {
            Op::Point => OpKind::Point,
            Op::Drop => OpKind::Drop,
            Op::Rotate => OpKind::Rotate,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply the pipeline once to a single reconstruction
    Perturb {
        /// Input SWC file
        #[arg(value_hint = ValueHint::FilePath)]
        input: PathBuf,
        /// Output file (default: <stem>_perturbed.swc beside the input)
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        output: Option<PathBuf>,
        /// Operators in order (default: configured pipeline)
        #[arg(long = "op", value_enum, num_args = 1..)]
        ops: Vec<Op>,
        /// RNG seed (default: configured seed, else random)
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Write augmented views for a file or every .swc below a directory
    Views {
        /// SWC file or directory
        #[arg(value_hint = ValueHint::AnyPath)]
        path: PathBuf,
        /// Views per reconstruction
        #[arg(short = 'n', long)]
        count: Option<usize>,
        /// Batch seed
        #[arg(long)]
        seed: Option<u64>,
        /// Output directory (mirrors the input layout)
        #[arg(short, long, value_hint = ValueHint::DirPath)]
        output_dir: Option<PathBuf>,
    },

    /// Validate a reconstruction and summarize it
    Inspect {
        /// Input SWC file
        #[arg(value_hint = ValueHint::FilePath)]
        input: PathBuf,
        /// Print the branch outline
        #[arg(long)]
        tree: bool,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Create config template
    Init {
        /// Create global config
        #[arg(short, long)]
        global: bool,
    },

    /// Show config paths
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn given_repeated_op_flags_when_parsing_then_order_is_kept() {
        let cli = Cli::parse_from([
            "morphaug", "-dd", "perturb", "n1.swc", "--op", "rotate", "--op", "point", "--seed",
            "3",
        ]);

        assert_eq!(cli.debug, 2);
        match cli.command {
            Some(Commands::Perturb { ops, seed, .. }) => {
                assert_eq!(ops, vec![Op::Rotate, Op::Point]);
                assert_eq!(seed, Some(3));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}

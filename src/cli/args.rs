//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

/// Convert, run and check waldiez flows
#[derive(Parser, Debug)]
#[command(name = "waldiez")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export a flow to a Python script, a Jupyter notebook or a flow file
    Convert {
        /// Flow file (.waldiez)
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// Output path; the extension selects the format (.py, .ipynb, .waldiez)
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        output: Option<PathBuf>,
        /// Overwrite the output if it exists
        #[arg(long)]
        force: bool,
    },

    /// Run a flow with the configured Python interpreter
    Run {
        /// Flow file (.waldiez)
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// Also export the flow here and keep the run artifacts next to it
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        output: Option<PathBuf>,
        /// Overwrite the output if it exists
        #[arg(long)]
        force: bool,
        /// Dotenv file with variables for the workflow
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        env_file: Option<PathBuf>,
    },

    /// Validate a flow without running it
    Check {
        /// Flow file (.waldiez)
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// Show agents, models, tools and chats as a tree
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
    /// Show effective settings
    Show,
    /// Show config file locations
    Path,
    /// Create a commented global config file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
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
    fn given_repeated_verbose_when_parsed_then_counts() {
        let cli = Cli::try_parse_from(["waldiez", "-vv", "check", "--file", "f.waldiez"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Some(Commands::Check { tree: false, .. })));
    }

    #[test]
    fn given_run_without_file_when_parsed_then_fails() {
        assert!(Cli::try_parse_from(["waldiez", "run"]).is_err());
    }
}

//! Command handlers and dispatch
//!
//! `dispatch` never exits the process; it returns an [`Outcome`] and leaves
//! the exit to `main`.

use std::ffi::OsString;
use std::io::{self, IsTerminal};
use std::path::Path;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use clap_complete::{generate, Shell};
use tracing::{debug, instrument};

use crate::application::services::{flow_tree, ExportService, RunOptions};
use crate::application::{ApplicationError, IoResultExt};
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, local_config_path, Settings};
use crate::exitcode;
use crate::infrastructure::ServiceContainer;

/// Result of one invocation: exit code plus a one-line status message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub code: i32,
    pub message: String,
}

impl Outcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            code: exitcode::OK,
            message: message.into(),
        }
    }

    pub fn failure(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == exitcode::OK
    }
}

/// Parse arguments. Help and version requests are printed here and come
/// back as a successful `Outcome`; other parse errors as a usage failure.
pub fn parse<I, T>(args: I) -> Result<Cli, Outcome>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Cli::try_parse_from(args).map_err(|e| {
        // clap writes help/version to stdout and errors to stderr
        let _ = e.print();
        match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => Outcome::success(""),
            kind => Outcome::failure(exitcode::USAGE, kind.to_string()),
        }
    })
}

/// Parse and dispatch in one go.
pub fn run<I, T>(args: I) -> Outcome
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match parse(args) {
        Ok(cli) => dispatch(&cli),
        Err(outcome) => outcome,
    }
}

/// Run the selected subcommand and report errors on stderr.
pub fn dispatch(cli: &Cli) -> Outcome {
    let Some(command) = &cli.command else {
        output::info(&Cli::command().render_help());
        return Outcome::failure(exitcode::USAGE, "no command given");
    };

    match execute(command) {
        Ok(message) => Outcome::success(message),
        Err(e) => {
            report(&e);
            Outcome::failure(e.exit_code(), e.to_string())
        }
    }
}

fn report(e: &CliError) {
    output::error(e);
    for diagnostic in e.diagnostics() {
        output::problem(diagnostic);
    }
}

fn execute(command: &Commands) -> CliResult<String> {
    match command {
        Commands::Convert {
            file,
            output,
            force,
        } => cmd_convert(file, output.as_deref(), *force),
        Commands::Run {
            file,
            output,
            force,
            env_file,
        } => cmd_run(file, output.as_deref(), *force, env_file.as_deref()),
        Commands::Check { file, tree } => cmd_check(file, *tree),
        Commands::Config { command } => cmd_config(command),
        Commands::Completion { shell } => cmd_completion(*shell),
    }
}

/// Container with settings layered for the directory of `file`.
fn container_for(file: &Path) -> CliResult<ServiceContainer> {
    let flow_dir = file.parent().filter(|p| !p.as_os_str().is_empty());
    let settings = Settings::load(flow_dir)?;
    debug!("settings: {:?}", settings);
    Ok(ServiceContainer::new(settings))
}

#[instrument]
fn cmd_convert(file: &Path, output: Option<&Path>, force: bool) -> CliResult<String> {
    let container = container_for(file)?;
    let flow = container.flow_service().load_valid(file)?;

    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| ExportService::default_output(file));
    let written = container.export_service().export(&flow, &output, force)?;

    output::action("Generated", &written.display());
    Ok(format!("Generated: {}", written.display()))
}

#[instrument]
fn cmd_run(
    file: &Path,
    output: Option<&Path>,
    force: bool,
    env_file: Option<&Path>,
) -> CliResult<String> {
    let container = container_for(file)?;
    let flow = container.flow_service().load_valid(file)?;

    if flow.requires_human_input() && !io::stdin().is_terminal() {
        output::warning("the flow asks for human input but stdin is not a terminal");
    }

    output::status("Starting workflow...");
    let options = RunOptions {
        output: output.map(Path::to_path_buf),
        force,
        env_file: env_file.map(Path::to_path_buf),
    };
    let report = container.run_service().run(&flow, file, &options)?;

    if let Some(path) = &report.output {
        output::action("Generated", &path.display());
    }
    if let Some(dir) = &report.artifacts_dir {
        output::detail(&format!("run artifacts: {}", dir.display()));
    }
    match report.chat_count() {
        Some(count) => output::detail(&format!("{count} chat result(s) stored")),
        None => debug!("run {} produced no results file", report.run_id),
    }
    output::status("Workflow finished");
    Ok("Workflow finished".into())
}

#[instrument]
fn cmd_check(file: &Path, tree: bool) -> CliResult<String> {
    // settings do not affect validation
    let container = ServiceContainer::new(Settings::default());
    let report = container.flow_service().check(file)?;

    output::success("Waldiez flow seems valid");
    output::detail(&report.summary);
    if tree {
        output::info(&flow_tree(&report.flow));
    }
    Ok("Waldiez flow seems valid".into())
}

#[instrument]
fn cmd_config(command: &ConfigCommands) -> CliResult<String> {
    let cwd = std::env::current_dir().ok();
    match command {
        ConfigCommands::Show => {
            let settings = Settings::load(cwd.as_deref())?;
            output::info(&settings.to_toml()?);
            Ok("config shown".into())
        }
        ConfigCommands::Path => {
            output::header("Config files");
            let exists = |p: &Path| if p.exists() { "" } else { " (not found)" };
            match global_config_path() {
                Some(path) => output::detail(&format!("global: {}{}", path.display(), exists(&path))),
                None => output::detail(&"global: (no home directory)"),
            }
            if let Some(dir) = &cwd {
                let path = local_config_path(dir);
                output::detail(&format!("local:  {}{}", path.display(), exists(&path)));
            }
            Ok("config paths shown".into())
        }
        ConfigCommands::Init { force } => {
            let path = global_config_path().ok_or_else(|| ApplicationError::Config {
                message: "cannot determine config directory".into(),
            })?;
            let container = ServiceContainer::new(Settings::default());
            if container.fs.exists(&path) && !force {
                return Err(ApplicationError::OutputExists(path).into());
            }
            container
                .fs
                .ensure_parent(&path)
                .with_path_context("create config directory", &path)?;
            container
                .fs
                .write(&path, &Settings::template())
                .with_path_context("write config", &path)?;
            output::action("Created", &path.display());
            Ok(format!("Created: {}", path.display()))
        }
    }
}

fn cmd_completion(shell: Shell) -> CliResult<String> {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
    Ok(String::new())
}

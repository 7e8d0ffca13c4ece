//! Run service: export a flow to a temporary script and execute it
//!
//! The multi-agent runtime lives in Python; this service only prepares the
//! script, hands it to the configured interpreter and collects the results.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::application::services::exporter::{ExportFormat, ExportService};
use crate::application::{ApplicationError, IoResultExt};
use crate::config::Settings;
use crate::domain::{parse_dotenv, Flow};
use crate::infrastructure::traits::{CommandRunner, FileSystem, Invocation};
use crate::infrastructure::{InfraError, InfraResult};

/// File the generated script writes its chat results to.
pub const RESULTS_FILE: &str = "results.json";

/// Name of the script inside the run directory. Fixed so that a flow
/// called e.g. `autogen` cannot shadow a module the script imports.
pub const SCRIPT_FILE: &str = "waldiez_flow.py";

/// Options of a single run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Also export the flow here and keep the run artifacts next to it
    pub output: Option<PathBuf>,
    /// Overwrite `output` if it exists
    pub force: bool,
    /// Dotenv file whose variables are passed to the interpreter
    pub env_file: Option<PathBuf>,
}

/// What a finished run left behind.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: String,
    /// Content of `results.json`, if the script wrote one
    pub results: Option<Value>,
    pub output: Option<PathBuf>,
    /// Copy of the run directory
    pub artifacts_dir: Option<PathBuf>,
}

impl RunReport {
    /// Number of chat results the script stored, if it stored any.
    pub fn chat_count(&self) -> Option<usize> {
        self.results
            .as_ref()
            .and_then(|r| r.get("results"))
            .and_then(Value::as_array)
            .map(Vec::len)
    }
}

/// Service executing flows with an external Python interpreter.
pub struct RunService {
    fs: Arc<dyn FileSystem>,
    cmd: Arc<dyn CommandRunner>,
    settings: Arc<Settings>,
    exporter: ExportService,
}

impl RunService {
    /// Create a new run service.
    pub fn new(
        fs: Arc<dyn FileSystem>,
        cmd: Arc<dyn CommandRunner>,
        settings: Arc<Settings>,
        exporter: ExportService,
    ) -> Self {
        Self {
            fs,
            cmd,
            settings,
            exporter,
        }
    }

    /// Run a (validated) flow loaded from `flow_path`.
    #[instrument(skip(self, flow), fields(flow = %flow.name))]
    pub fn run(&self, flow: &Flow, flow_path: &Path, options: &RunOptions) -> InfraResult<RunReport> {
        let run_id = Uuid::new_v4().to_string();
        debug!("run: id={} path={}", run_id, flow_path.display());

        if let Some(output) = &options.output {
            ExportFormat::from_path(output).map_err(ApplicationError::from)?;
            if self.fs.exists(output) && !options.force {
                return Err(ApplicationError::OutputExists(output.clone()).into());
            }
        }
        let env = match &options.env_file {
            Some(path) => self.load_env_file(path)?,
            None => BTreeMap::new(),
        };

        let run_dir = tempfile::Builder::new()
            .prefix("waldiez-")
            .tempdir()
            .map_err(|e| InfraError::io("create run directory", e))?;
        let script_path = run_dir.path().join(SCRIPT_FILE);
        let script = self.exporter.render(flow, ExportFormat::Python)?;
        self.fs
            .write(&script_path, &script)
            .with_path_context("write script", &script_path)?;

        if self.settings.install_requirements {
            self.install_requirements(flow)?;
        }

        info!("running {} in {}", SCRIPT_FILE, run_dir.path().display());
        let invocation = Invocation {
            program: &self.settings.python,
            args: vec!["-u".into(), SCRIPT_FILE.into()],
            cwd: Some(run_dir.path()),
            env,
        };
        let status = self
            .cmd
            .run_attached(&invocation)
            .map_err(|e| self.spawn_error(e))?;
        if !status.success() {
            return Err(InfraError::Execution {
                message: format!("{} exited with {}", self.settings.python, status),
                exit_code: status.code(),
            });
        }

        let results = self.read_results(&run_dir.path().join(RESULTS_FILE));

        let mut report = RunReport {
            run_id,
            results,
            output: None,
            artifacts_dir: None,
        };
        if let Some(output) = &options.output {
            report.output = Some(self.exporter.export(flow, output, options.force)?);
            report.artifacts_dir =
                Some(self.keep_artifacts(run_dir.path(), flow_path, output, &report.run_id)?);
        }
        Ok(report)
    }

    fn load_env_file(&self, path: &Path) -> InfraResult<BTreeMap<String, String>> {
        let content = self
            .fs
            .read_to_string(path)
            .with_path_context("read env file", path)?;
        let variables = parse_dotenv(&content).map_err(ApplicationError::from)?;
        debug!("load_env_file: {} variable(s) from {}", variables.len(), path.display());
        Ok(variables)
    }

    fn install_requirements(&self, flow: &Flow) -> InfraResult<()> {
        let requirements = self.exporter.requirements(flow);
        info!("installing {} requirement(s)", requirements.len());
        let mut args: Vec<String> = ["-m", "pip", "install", "-qq"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        args.extend(requirements);

        let invocation = Invocation {
            program: &self.settings.python,
            args,
            ..Invocation::default()
        };
        let status = self
            .cmd
            .run_attached(&invocation)
            .map_err(|e| self.spawn_error(e))?;
        if !status.success() {
            return Err(InfraError::Execution {
                message: "installing requirements failed".into(),
                exit_code: status.code(),
            });
        }
        Ok(())
    }

    fn spawn_error(&self, e: io::Error) -> InfraError {
        if e.kind() == io::ErrorKind::NotFound {
            InfraError::InterpreterNotFound {
                program: self.settings.python.clone(),
            }
        } else {
            InfraError::io(format!("start {}", self.settings.python), e)
        }
    }

    fn read_results(&self, path: &Path) -> Option<Value> {
        if !self.fs.exists(path) {
            debug!("read_results: no {}", path.display());
            return None;
        }
        let parsed = self
            .fs
            .read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|content| serde_json::from_str(&content).map_err(|e| e.to_string()));
        match parsed {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("ignoring unreadable {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Copy the run directory to `<dir of output>/<output_dir_name>/<timestamp>_<run>/`.
    fn keep_artifacts(
        &self,
        run_dir: &Path,
        flow_path: &Path,
        output: &Path,
        run_id: &str,
    ) -> InfraResult<PathBuf> {
        let base = output
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let target = base
            .join(&self.settings.output_dir_name)
            .join(artifacts_dir_name(&Local::now().format("%Y%m%d%H%M%S").to_string(), run_id));

        self.fs
            .copy_dir(run_dir, &target)
            .map_err(|e| InfraError::io(format!("copy run directory to {}", target.display()), e))?;
        if let Some(name) = flow_path.file_name() {
            let flow_copy = target.join(name);
            self.fs
                .copy(flow_path, &flow_copy)
                .with_path_context("copy flow", &flow_copy)?;
        }
        debug!("keep_artifacts: {}", target.display());
        Ok(target)
    }
}

/// `<timestamp>_<first group of the run id>`; runs within the same second
/// still get their own directory.
fn artifacts_dir_name(timestamp: &str, run_id: &str) -> String {
    let short = run_id.split('-').next().unwrap_or(run_id);
    format!("{timestamp}_{short}")
}

//! Export service: flow -> script, notebook or flow file

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::application::services::flow::to_json;
use crate::application::{notebook, script, ApplicationError, ApplicationResult, IoResultExt};
use crate::config::Settings;
use crate::domain::{DomainError, Flow};
use crate::infrastructure::traits::FileSystem;

/// Output format, chosen by the output file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Python,
    Notebook,
    Waldiez,
}

impl ExportFormat {
    pub fn from_path(path: &Path) -> Result<Self, DomainError> {
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "py" => Ok(Self::Python),
            "ipynb" => Ok(Self::Notebook),
            "waldiez" => Ok(Self::Waldiez),
            _ => Err(DomainError::UnsupportedFormat(path.display().to_string())),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Python => "py",
            Self::Notebook => "ipynb",
            Self::Waldiez => "waldiez",
        }
    }
}

/// Service turning flows into files.
pub struct ExportService {
    fs: Arc<dyn FileSystem>,
    settings: Arc<Settings>,
}

impl ExportService {
    /// Create a new export service.
    pub fn new(fs: Arc<dyn FileSystem>, settings: Arc<Settings>) -> Self {
        Self { fs, settings }
    }

    /// Output path used when none is given: the input with a `.py` extension.
    pub fn default_output(input: &Path) -> PathBuf {
        input.with_extension(ExportFormat::Python.extension())
    }

    /// Pip requirements of a flow, including configured extras.
    pub fn requirements(&self, flow: &Flow) -> Vec<String> {
        flow.requirements(&self.settings.ag2_package, &self.settings.extra_requirements)
    }

    /// Render a flow in the given format.
    pub fn render(&self, flow: &Flow, format: ExportFormat) -> ApplicationResult<String> {
        let requirements = self.requirements(flow);
        match format {
            ExportFormat::Python => Ok(script::render_script(flow, &requirements)),
            ExportFormat::Notebook => notebook::render_notebook(flow, &requirements).map_err(|e| {
                ApplicationError::OperationFailed {
                    context: "serialize notebook".into(),
                    source: Box::new(e),
                }
            }),
            ExportFormat::Waldiez => to_json(flow),
        }
    }

    /// Write a flow to `output`, refusing to overwrite unless `force`.
    ///
    /// The flow is expected to be valid already.
    pub fn export(&self, flow: &Flow, output: &Path, force: bool) -> ApplicationResult<PathBuf> {
        let format = ExportFormat::from_path(output)?;
        debug!("export: output={} format={:?} force={}", output.display(), format, force);

        if self.fs.exists(output) && !force {
            return Err(ApplicationError::OutputExists(output.to_path_buf()));
        }

        let content = self.render(flow, format)?;
        self.fs
            .ensure_parent(output)
            .with_path_context("create output directory", output)?;
        self.fs
            .write(output, &content)
            .with_path_context("write output", output)?;

        info!("exported {} to {}", flow.name, output.display());
        Ok(output.to_path_buf())
    }
}

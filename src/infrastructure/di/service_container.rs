//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;

use crate::application::services::{ExportService, FlowService, RunService};
use crate::config::Settings;
use crate::infrastructure::traits::{CommandRunner, FileSystem, RealCommandRunner, RealFileSystem};

/// Container holding the I/O boundaries and settings shared by all services.
///
/// Services are cheap to build (they only clone `Arc`s), so each accessor
/// returns a fresh instance.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    /// Command runner abstraction
    pub cmd: Arc<dyn CommandRunner>,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> Self {
        Self::with_deps(
            settings,
            Arc::new(RealFileSystem),
            Arc::new(RealCommandRunner),
        )
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(
        settings: Settings,
        fs: Arc<dyn FileSystem>,
        cmd: Arc<dyn CommandRunner>,
    ) -> Self {
        let settings = Arc::new(settings);

        Self { settings, fs, cmd }
    }

    /// Loading, checking and saving flows.
    pub fn flow_service(&self) -> FlowService {
        FlowService::new(self.fs.clone())
    }

    /// Exporting flows to scripts, notebooks and flow files.
    pub fn export_service(&self) -> ExportService {
        ExportService::new(self.fs.clone(), self.settings.clone())
    }

    /// Running flows with the configured interpreter.
    pub fn run_service(&self) -> RunService {
        RunService::new(
            self.fs.clone(),
            self.cmd.clone(),
            self.settings.clone(),
            self.export_service(),
        )
    }
}

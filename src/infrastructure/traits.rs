//! I/O boundary traits for testability
//!
//! These traits abstract external I/O operations, allowing services
//! to be tested with mock implementations.

use std::collections::BTreeMap;
use std::io;
use std::path::Path;
use std::process::ExitStatus;

/// Filesystem abstraction for testability.
pub trait FileSystem: Send + Sync {
    /// Read file contents to string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Write string content to file.
    fn write(&self, path: &Path, content: &str) -> io::Result<()>;

    /// Check if path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Check if path is a file.
    fn is_file(&self, path: &Path) -> bool;

    /// Create directory and all parent directories.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Copy file from source to destination.
    fn copy(&self, from: &Path, to: &Path) -> io::Result<u64>;

    /// Copy directory recursively from source to destination.
    fn copy_dir(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Create parent directories if needed.
    fn ensure_parent(&self, path: &Path) -> io::Result<()>;
}

/// One invocation of an external program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation<'a> {
    pub program: &'a str,
    pub args: Vec<String>,
    /// Working directory (inherits the current one if None)
    pub cwd: Option<&'a Path>,
    /// Variables added to the inherited environment
    pub env: BTreeMap<String, String>,
}

/// External command runner abstraction.
pub trait CommandRunner: Send + Sync {
    /// Run a command attached to the terminal (stdio inherited).
    /// Blocks until the command exits.
    fn run_attached(&self, invocation: &Invocation<'_>) -> io::Result<ExitStatus>;
}

// ============================================================
// REAL IMPLEMENTATIONS
// ============================================================

/// Real filesystem implementation.
#[derive(Debug, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        std::fs::write(path, content)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn copy(&self, from: &Path, to: &Path) -> io::Result<u64> {
        std::fs::copy(from, to)
    }

    fn copy_dir(&self, from: &Path, to: &Path) -> io::Result<()> {
        use walkdir::WalkDir;

        std::fs::create_dir_all(to)?;
        for entry in WalkDir::new(from).into_iter().filter_map(|e| e.ok()) {
            let rel_path = entry
                .path()
                .strip_prefix(from)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;
            let target = to.join(rel_path);

            if entry.file_type().is_dir() {
                std::fs::create_dir_all(&target)?;
            } else {
                std::fs::copy(entry.path(), &target)?;
            }
        }
        Ok(())
    }

    fn ensure_parent(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                self.create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}

/// Real command runner implementation.
#[derive(Debug, Default)]
pub struct RealCommandRunner;

impl CommandRunner for RealCommandRunner {
    fn run_attached(&self, invocation: &Invocation<'_>) -> io::Result<ExitStatus> {
        let mut command = std::process::Command::new(invocation.program);
        command.args(&invocation.args).envs(&invocation.env);
        if let Some(cwd) = invocation.cwd {
            command.current_dir(cwd);
        }
        command.status()
    }
}

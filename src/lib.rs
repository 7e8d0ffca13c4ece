//! waldiez: convert, run and check multi-agent flows
//!
//! Layers, from the outside in:
//! - `cli`: argument parsing, dispatch, terminal output
//! - `infrastructure`: I/O implementations and service wiring
//! - `application`: services and rendering (script, notebook)
//! - `domain`: flow entities, validation, naming

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;

/// Version of this tool, also written into generated scripts.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on I/O boundary traits (FileSystem, CommandRunner)
//! but are themselves concrete structs, not traits.

mod exporter;
mod flow;
mod runner;

pub use exporter::{ExportFormat, ExportService};
pub use flow::{flow_tree, to_json, CheckReport, FlowService, FlowSummary};
pub use runner::{RunOptions, RunReport, RunService, RESULTS_FILE, SCRIPT_FILE};

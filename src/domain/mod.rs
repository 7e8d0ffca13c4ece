//! Domain layer: flow entities and business rules
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod dotenv;
pub mod error;
pub mod flow;
pub mod naming;
pub mod validation;

pub use dotenv::{expand_env_vars, parse_dotenv};
pub use error::{Diagnostic, DomainError};
pub use flow::*;
pub use naming::InstanceNames;
pub use validation::{ensure_valid, validate};

//! Python identifier naming for exported flows

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::domain::flow::Flow;

/// Longest identifier the exporter emits.
pub const MAX_VARIABLE_LENGTH: usize = 64;

/// Prefix used to repair names that are not valid identifiers.
pub const DEFAULT_PREFIX: &str = "w";

fn invalid_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-z0-9_]").expect("static regex"))
}

/// Turn an arbitrary display name into a lowercase Python identifier.
///
/// `A->B` / `A=>B` become `atob`, `A<-B` / `A<=B` become `afromb`,
/// everything outside `[a-z0-9_]` becomes `_`. Names that would start
/// with a digit get `{prefix}_`, names starting with `_` get `{prefix}`.
pub fn python_variable_name(name: &str, prefix: &str, max_length: usize) -> String {
    let truncated: String = name.chars().take(max_length).collect();
    let replaced = truncated
        .replace("->", "to")
        .replace("=>", "to")
        .replace("<-", "from")
        .replace("<=", "from")
        .to_lowercase();
    let cleaned = invalid_chars().replace_all(&replaced, "_");
    let cleaned = cleaned.trim_end_matches('_');

    let name = if cleaned.is_empty() {
        format!("{prefix}_")
    } else if cleaned.starts_with(|c: char| c.is_ascii_digit()) {
        format!("{prefix}_{cleaned}")
    } else if cleaned.starts_with('_') {
        format!("{prefix}{cleaned}")
    } else {
        cleaned.to_string()
    };
    name.chars().take(max_length).collect()
}

/// Register a unique identifier for `(id, name)` in `names`.
///
/// Existing ids are left untouched. On a name clash the name is prefixed
/// with `{prefix}_`; if that clashes too, `_1`, `_2`, ... is appended.
pub fn register_instance_name(
    names: &mut BTreeMap<String, String>,
    id: &str,
    name: &str,
    prefix: &str,
    max_length: usize,
) {
    if names.contains_key(id) {
        return;
    }
    let base = python_variable_name(name, prefix, max_length);
    let taken = |candidate: &str, names: &BTreeMap<String, String>| {
        names.values().any(|existing| existing == candidate)
    };

    let mut candidate = base.clone();
    if taken(&candidate, names) {
        candidate = format!("{prefix}_{base}");
    }
    let mut index = 1;
    while taken(&candidate, names) {
        candidate = format!("{prefix}_{base}_{index}");
        index += 1;
    }
    names.insert(id.to_string(), candidate);
}

/// Identifiers for every agent, model, tool and chat of a flow.
///
/// All kinds share one namespace, so a model and an agent with the same
/// display name still get distinct identifiers.
#[derive(Debug, Clone, Default)]
pub struct InstanceNames {
    names: BTreeMap<String, String>,
}

impl InstanceNames {
    pub fn from_flow(flow: &Flow) -> Self {
        let mut names = BTreeMap::new();
        for agent in flow.data.agents.iter() {
            register_instance_name(&mut names, &agent.id, &agent.name, DEFAULT_PREFIX, MAX_VARIABLE_LENGTH);
        }
        for model in &flow.data.models {
            register_instance_name(&mut names, &model.id, &model.name, DEFAULT_PREFIX, MAX_VARIABLE_LENGTH);
        }
        for tool in &flow.data.tools {
            register_instance_name(&mut names, &tool.id, &tool.name, DEFAULT_PREFIX, MAX_VARIABLE_LENGTH);
        }
        for chat in &flow.data.chats {
            let name = if chat.data.name.is_empty() {
                &chat.id
            } else {
                &chat.data.name
            };
            register_instance_name(&mut names, &chat.id, name, DEFAULT_PREFIX, MAX_VARIABLE_LENGTH);
        }
        Self { names }
    }

    /// Identifier for an id; unknown ids are sanitized on the fly.
    pub fn get(&self, id: &str) -> String {
        self.names
            .get(id)
            .cloned()
            .unwrap_or_else(|| python_variable_name(id, DEFAULT_PREFIX, MAX_VARIABLE_LENGTH))
    }
}

//! Flow loading, checking and saving

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use termtree::Tree;
use tracing::{debug, warn};

use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::domain::{ensure_valid, Flow};
use crate::infrastructure::traits::FileSystem;

/// Counts shown after a successful check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowSummary {
    pub name: String,
    pub agents: usize,
    pub models: usize,
    pub tools: usize,
    pub chats: usize,
    pub requires_human_input: bool,
}

impl FlowSummary {
    pub fn of(flow: &Flow) -> Self {
        Self {
            name: flow.name.clone(),
            agents: flow.data.agents.len(),
            models: flow.data.models.len(),
            tools: flow.data.tools.len(),
            chats: flow.data.chats.len(),
            requires_human_input: flow.requires_human_input(),
        }
    }
}

impl fmt::Display for FlowSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} agent(s), {} model(s), {} tool(s), {} chat(s)",
            self.name, self.agents, self.models, self.tools, self.chats
        )?;
        if self.requires_human_input {
            write!(f, ", requires human input")?;
        }
        Ok(())
    }
}

/// Result of `check`.
#[derive(Debug, Clone)]
pub struct CheckReport {
    pub flow: Flow,
    pub summary: FlowSummary,
}

/// Service for reading and writing `.waldiez` files.
pub struct FlowService {
    fs: Arc<dyn FileSystem>,
}

impl FlowService {
    /// Create a new flow service.
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// Read and parse a flow file without semantic validation.
    pub fn load(&self, path: &Path) -> ApplicationResult<Flow> {
        debug!("load: path={}", path.display());
        if !self.fs.is_file(path) {
            return Err(ApplicationError::FlowNotFound(path.to_path_buf()));
        }
        let content = self
            .fs
            .read_to_string(path)
            .with_path_context("read flow", path)?;

        serde_json::from_str(&content).map_err(|e| ApplicationError::InvalidJson {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Read, parse and validate a flow file.
    pub fn load_valid(&self, path: &Path) -> ApplicationResult<Flow> {
        let flow = self.load(path)?;
        if let Err(e) = ensure_valid(&flow) {
            warn!("load_valid: {} rejected: {}", path.display(), e);
            return Err(e.into());
        }
        Ok(flow)
    }

    /// Validate a flow file. No side effects.
    pub fn check(&self, path: &Path) -> ApplicationResult<CheckReport> {
        let flow = self.load_valid(path)?;
        let summary = FlowSummary::of(&flow);
        debug!("check: {}", summary);
        Ok(CheckReport { flow, summary })
    }

    /// Write a flow as pretty-printed JSON.
    pub fn save(&self, flow: &Flow, path: &Path) -> ApplicationResult<()> {
        debug!("save: path={}", path.display());
        self.fs
            .write(path, &to_json(flow)?)
            .with_path_context("write flow", path)
    }
}

/// Flow document as pretty-printed JSON with a trailing newline.
pub fn to_json(flow: &Flow) -> ApplicationResult<String> {
    let mut text = serde_json::to_string_pretty(flow).map_err(|e| {
        ApplicationError::OperationFailed {
            context: "serialize flow".into(),
            source: Box::new(e),
        }
    })?;
    text.push('\n');
    Ok(text)
}

/// Agents, models, tools and chats of a flow as a tree.
pub fn flow_tree(flow: &Flow) -> Tree<String> {
    let agents = flow
        .data
        .agents
        .iter()
        .map(|a| Tree::new(format!("{} ({}) [{}]", a.name, a.agent_type.label(), a.id)));
    let models = flow
        .data
        .models
        .iter()
        .map(|m| Tree::new(format!("{} ({}) [{}]", m.name, m.data.api_type(), m.id)));
    let tools = flow
        .data
        .tools
        .iter()
        .map(|t| Tree::new(format!("{} [{}]", t.name, t.id)));
    let chats = flow.data.chats.iter().map(|c| {
        let name = |id: &str| {
            flow.agent(id)
                .map(|a| a.name.clone())
                .unwrap_or_else(|| id.to_string())
        };
        Tree::new(format!("{} => {} [{}]", name(&c.source), name(&c.target), c.id))
    });

    Tree::new(flow.name.clone()).with_leaves([
        Tree::new("agents".to_string()).with_leaves(agents),
        Tree::new("models".to_string()).with_leaves(models),
        Tree::new("tools".to_string()).with_leaves(tools),
        Tree::new("chats".to_string()).with_leaves(chats),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::traits::RealFileSystem;
    use tempfile::TempDir;

    const SIMPLE: &str = include_str!("../../../tests/fixtures/simple.waldiez");

    #[test]
    fn given_simple_flow_when_summarized_then_counts_parts() {
        let flow: Flow = serde_json::from_str(SIMPLE).unwrap();
        let summary = FlowSummary::of(&flow);
        assert_eq!(
            summary.to_string(),
            "Simple flow: 2 agent(s), 0 model(s), 0 tool(s), 1 chat(s)"
        );
    }

    #[test]
    fn given_simple_flow_when_tree_then_lists_chat_between_agent_names() {
        let flow: Flow = serde_json::from_str(SIMPLE).unwrap();
        let rendered = flow_tree(&flow).to_string();
        assert!(rendered.starts_with("Simple flow\n"));
        assert!(rendered.contains("user (user_proxy) [wa-1]"));
        assert!(rendered.contains("user => assistant [wc-1]"));
    }

    #[test]
    fn given_saved_flow_when_loaded_then_keeps_unknown_fields() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("copy.waldiez");
        let service = FlowService::new(Arc::new(RealFileSystem));
        let mut flow: Flow = serde_json::from_str(SIMPLE).unwrap();
        flow.extra
            .insert("custom".into(), serde_json::Value::String("kept".into()));

        service.save(&flow, &path).unwrap();
        let reloaded = service.load(&path).unwrap();

        assert_eq!(reloaded.extra["custom"], "kept");
        assert_eq!(reloaded, flow);
    }
}

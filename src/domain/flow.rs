//! Flow entities: the `.waldiez` document model
//!
//! JSON field names are camelCase; snake_case aliases are accepted on input.
//! Fields this crate does not interpret are kept in `extra` maps so a
//! load/save cycle does not drop them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

fn flow_tag() -> String {
    "flow".into()
}

fn agent_tag() -> String {
    "agent".into()
}

fn chat_tag() -> String {
    "chat".into()
}

fn model_tag() -> String {
    "model".into()
}

fn tool_tag() -> String {
    "tool".into()
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

fn minus_one() -> i64 {
    -1
}

/// A serialized multi-agent workflow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Flow {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default = "flow_tag")]
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default, alias = "storage_id")]
    pub storage_id: String,
    #[serde(default, alias = "created_at")]
    pub created_at: String,
    #[serde(default, alias = "updated_at")]
    pub updated_at: String,
    pub data: FlowData,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FlowData {
    #[serde(default)]
    pub nodes: Vec<Value>,
    #[serde(default)]
    pub edges: Vec<Value>,
    #[serde(default = "empty_object")]
    pub viewport: Value,
    #[serde(default)]
    pub agents: Agents,
    #[serde(default)]
    pub models: Vec<Model>,
    #[serde(default)]
    pub tools: Vec<Tool>,
    #[serde(default)]
    pub chats: Vec<Chat>,
    #[serde(default, alias = "is_async")]
    pub is_async: bool,
    #[serde(default, alias = "cache_seed")]
    pub cache_seed: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Agents grouped by kind, as the producer writes them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Agents {
    #[serde(default, alias = "user_proxy_agents")]
    pub user_proxy_agents: Vec<Agent>,
    #[serde(default, alias = "assistant_agents")]
    pub assistant_agents: Vec<Agent>,
    #[serde(default, alias = "rag_user_proxy_agents")]
    pub rag_user_proxy_agents: Vec<Agent>,
    #[serde(default, alias = "reasoning_agents")]
    pub reasoning_agents: Vec<Agent>,
    #[serde(default, alias = "captain_agents")]
    pub captain_agents: Vec<Agent>,
    #[serde(default, alias = "group_manager_agents")]
    pub group_manager_agents: Vec<Agent>,
    #[serde(default, alias = "doc_agents")]
    pub doc_agents: Vec<Agent>,
}

impl Agents {
    /// All agents, in document order of the groups.
    pub fn iter(&self) -> impl Iterator<Item = &Agent> {
        self.user_proxy_agents
            .iter()
            .chain(&self.assistant_agents)
            .chain(&self.rag_user_proxy_agents)
            .chain(&self.reasoning_agents)
            .chain(&self.captain_agents)
            .chain(&self.group_manager_agents)
            .chain(&self.doc_agents)
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AgentType {
    #[serde(alias = "user")]
    UserProxy,
    Assistant,
    #[serde(alias = "rag_user")]
    RagUserProxy,
    Reasoning,
    Captain,
    #[serde(alias = "manager")]
    GroupManager,
    DocAgent,
}

impl AgentType {
    /// The ag2 class instantiated for this kind of agent.
    pub fn python_class(&self) -> &'static str {
        match self {
            AgentType::UserProxy => "UserProxyAgent",
            AgentType::Assistant => "AssistantAgent",
            AgentType::RagUserProxy => "RetrieveUserProxyAgent",
            AgentType::Reasoning => "ReasoningAgent",
            AgentType::Captain => "CaptainAgent",
            AgentType::GroupManager => "GroupChatManager",
            AgentType::DocAgent => "DocAgent",
        }
    }

    /// Module the class is imported from.
    pub fn python_module(&self) -> &'static str {
        match self {
            AgentType::UserProxy | AgentType::Assistant | AgentType::GroupManager => "autogen",
            AgentType::RagUserProxy => "autogen.agentchat.contrib.retrieve_user_proxy_agent",
            AgentType::Reasoning => "autogen.agents.experimental",
            AgentType::Captain => "autogen.agentchat.contrib.captainagent",
            AgentType::DocAgent => "autogen.agents.experimental",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AgentType::UserProxy => "user_proxy",
            AgentType::Assistant => "assistant",
            AgentType::RagUserProxy => "rag_user_proxy",
            AgentType::Reasoning => "reasoning",
            AgentType::Captain => "captain",
            AgentType::GroupManager => "group_manager",
            AgentType::DocAgent => "doc_agent",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: String,
    #[serde(rename = "type", default = "agent_tag")]
    pub kind: String,
    #[serde(alias = "agent_type")]
    pub agent_type: AgentType,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default, alias = "created_at")]
    pub created_at: String,
    #[serde(default, alias = "updated_at")]
    pub updated_at: String,
    #[serde(default)]
    pub data: AgentData,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HumanInputMode {
    Always,
    #[default]
    Never,
    Terminate,
}

impl HumanInputMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            HumanInputMode::Always => "ALWAYS",
            HumanInputMode::Never => "NEVER",
            HumanInputMode::Terminate => "TERMINATE",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentData {
    #[serde(default, alias = "system_message")]
    pub system_message: Option<String>,
    #[serde(default, alias = "human_input_mode")]
    pub human_input_mode: HumanInputMode,
    /// `false` or a code execution object; `null` is treated as `false`
    #[serde(default, alias = "code_execution_config")]
    pub code_execution_config: Value,
    #[serde(default, alias = "agent_default_auto_reply")]
    pub agent_default_auto_reply: Option<String>,
    #[serde(default, alias = "max_consecutive_auto_reply")]
    pub max_consecutive_auto_reply: Option<i64>,
    #[serde(default)]
    pub termination: Termination,
    #[serde(default, alias = "model_ids")]
    pub model_ids: Vec<String>,
    #[serde(default)]
    pub tools: Vec<AgentTool>,
    #[serde(default, alias = "nested_chats")]
    pub nested_chats: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A tool linked to an agent and the agent that executes it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AgentTool {
    pub id: String,
    #[serde(alias = "executor_id")]
    pub executor_id: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TerminationKind {
    #[default]
    None,
    Keyword,
    Method,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TerminationCriterion {
    #[default]
    Found,
    Ending,
    Starting,
    Exact,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Termination {
    #[serde(rename = "type", default)]
    pub kind: TerminationKind,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub criterion: Option<TerminationCriterion>,
    #[serde(default, alias = "method_content")]
    pub method_content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default = "model_tag")]
    pub kind: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default, alias = "created_at")]
    pub created_at: String,
    #[serde(default, alias = "updated_at")]
    pub updated_at: String,
    #[serde(default)]
    pub data: ModelData,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModelData {
    #[serde(default, alias = "api_type")]
    pub api_type: Option<String>,
    #[serde(default, alias = "base_url")]
    pub base_url: Option<String>,
    #[serde(default, alias = "api_key")]
    pub api_key: Option<String>,
    #[serde(default, alias = "api_version")]
    pub api_version: Option<String>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default, alias = "top_p")]
    pub top_p: Option<f64>,
    #[serde(default, alias = "max_tokens")]
    pub max_tokens: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ModelData {
    pub fn api_type(&self) -> &str {
        self.api_type.as_deref().unwrap_or("openai")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default = "tool_tag")]
    pub kind: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default, alias = "created_at")]
    pub created_at: String,
    #[serde(default, alias = "updated_at")]
    pub updated_at: String,
    #[serde(default)]
    pub data: ToolData,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolData {
    /// Python source defining a function named like the tool
    #[serde(default)]
    pub content: String,
    #[serde(default, alias = "tool_type")]
    pub tool_type: Option<String>,
    #[serde(default)]
    pub secrets: BTreeMap<String, String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: String,
    #[serde(rename = "type", default = "chat_tag")]
    pub kind: String,
    pub source: String,
    pub target: String,
    pub data: ChatData,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatData {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, alias = "source_type")]
    pub source_type: Option<String>,
    #[serde(default, alias = "target_type")]
    pub target_type: Option<String>,
    #[serde(default = "minus_one")]
    pub position: i64,
    #[serde(default = "minus_one")]
    pub order: i64,
    #[serde(default, alias = "clear_history")]
    pub clear_history: Option<bool>,
    #[serde(default)]
    pub silent: bool,
    #[serde(default, alias = "max_turns")]
    pub max_turns: Option<i64>,
    #[serde(default)]
    pub message: ChatMessage,
    #[serde(default)]
    pub summary: ChatSummary,
    #[serde(default, alias = "nested_chat")]
    pub nested_chat: Value,
    #[serde(default)]
    pub prerequisites: Vec<String>,
    #[serde(default)]
    pub condition: Value,
    #[serde(default)]
    pub available: Value,
    #[serde(default, alias = "real_source")]
    pub real_source: Option<String>,
    #[serde(default, alias = "real_target")]
    pub real_target: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    String,
    Method,
    #[default]
    None,
    RagMessageGenerator,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    #[serde(rename = "type", default)]
    pub kind: MessageKind,
    #[serde(default, alias = "use_carryover")]
    pub use_carryover: bool,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub context: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatSummary {
    #[serde(default = "default_summary_method")]
    pub method: String,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub args: Map<String, Value>,
}

fn default_summary_method() -> String {
    "last_msg".into()
}

impl Default for ChatSummary {
    fn default() -> Self {
        Self {
            method: default_summary_method(),
            prompt: String::new(),
            args: Map::new(),
        }
    }
}

impl Flow {
    pub fn agent(&self, id: &str) -> Option<&Agent> {
        self.data.agents.iter().find(|a| a.id == id)
    }

    pub fn model(&self, id: &str) -> Option<&Model> {
        self.data.models.iter().find(|m| m.id == id)
    }

    pub fn tool(&self, id: &str) -> Option<&Tool> {
        self.data.tools.iter().find(|t| t.id == id)
    }

    /// Chats started by `main()`.
    ///
    /// Chats with `order >= 0` sorted by order; when none is ordered,
    /// every chat sorted by position.
    pub fn initial_chats(&self) -> Vec<&Chat> {
        let mut ordered: Vec<&Chat> = self
            .data
            .chats
            .iter()
            .filter(|c| c.data.order >= 0)
            .collect();
        if ordered.is_empty() {
            ordered = self.data.chats.iter().collect();
            ordered.sort_by_key(|c| c.data.position);
        } else {
            ordered.sort_by_key(|c| c.data.order);
        }
        ordered
    }

    /// True if any agent may stop and wait for a human reply.
    pub fn requires_human_input(&self) -> bool {
        self.data
            .agents
            .iter()
            .any(|a| a.data.human_input_mode != HumanInputMode::Never)
    }

    /// Pip requirements to run the exported script.
    ///
    /// `base_package` is the ag2 distribution name (optionally pinned,
    /// e.g. `ag2==0.9.7`); extras are derived from the model api types.
    pub fn requirements(&self, base_package: &str, extra: &[String]) -> Vec<String> {
        let mut extras: Vec<String> = vec!["openai".into()];
        for model in &self.data.models {
            let api_type = model.data.api_type().to_lowercase();
            if api_type != "openai" && !extras.contains(&api_type) {
                extras.push(api_type);
            }
        }
        extras.sort();

        let base = match base_package.split_once("==") {
            Some((name, version)) => format!("{}[{}]=={}", name, extras.join(","), version),
            None => format!("{}[{}]", base_package, extras.join(",")),
        };

        let mut all = vec![base];
        all.extend(self.requirements.iter().cloned());
        for agent in self.data.agents.iter() {
            all.extend(agent.requirements.iter().cloned());
        }
        for model in &self.data.models {
            all.extend(model.requirements.iter().cloned());
        }
        for tool in &self.data.tools {
            all.extend(tool.requirements.iter().cloned());
        }
        all.extend(extra.iter().cloned());

        let mut all: Vec<String> = all
            .into_iter()
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .collect();
        all.sort();
        all.dedup();
        all
    }
}

//! Semantic validation of a parsed flow
//!
//! Collects every problem instead of stopping at the first one.

use std::collections::HashSet;

use regex::Regex;

use crate::domain::error::{Diagnostic, DomainError};
use crate::domain::flow::{Flow, MessageKind, TerminationKind, Tool};
use crate::domain::naming::{python_variable_name, DEFAULT_PREFIX, MAX_VARIABLE_LENGTH};

/// Function a method termination body must define.
pub const TERMINATION_FUNCTION: &str = "is_termination_message";

/// Function a method chat message body must define.
pub const MESSAGE_FUNCTION: &str = "callable_message";

/// Tool types whose content may bind the tool name instead of defining it.
const INTEROP_TOOL_TYPES: [&str; 2] = ["langchain", "crewai"];

/// Validate a flow, returning all problems found.
pub fn validate(flow: &Flow) -> Vec<Diagnostic> {
    let mut problems = Vec::new();

    if flow.kind != "flow" {
        problems.push(Diagnostic::new(
            "type",
            format!("expected \"flow\", found \"{}\"", flow.kind),
        ));
    }
    if flow.name.trim().is_empty() {
        problems.push(Diagnostic::new("name", "flow name is empty"));
    }

    check_unique(
        flow.data.agents.iter().map(|a| a.id.as_str()),
        "data.agents",
        "agent",
        &mut problems,
    );
    check_unique(
        flow.data.models.iter().map(|m| m.id.as_str()),
        "data.models",
        "model",
        &mut problems,
    );
    check_unique(
        flow.data.tools.iter().map(|t| t.id.as_str()),
        "data.tools",
        "tool",
        &mut problems,
    );
    check_unique(
        flow.data.chats.iter().map(|c| c.id.as_str()),
        "data.chats",
        "chat",
        &mut problems,
    );

    validate_tools(flow, &mut problems);
    validate_agents(flow, &mut problems);
    validate_chats(flow, &mut problems);

    problems
}

/// Validate and turn problems into a `DomainError`.
pub fn ensure_valid(flow: &Flow) -> Result<(), DomainError> {
    let diagnostics = validate(flow);
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(DomainError::InvalidFlow { diagnostics })
    }
}

fn check_unique<'a>(
    ids: impl Iterator<Item = &'a str>,
    path: &str,
    what: &str,
    problems: &mut Vec<Diagnostic>,
) {
    let mut seen = HashSet::new();
    for id in ids {
        if id.is_empty() {
            problems.push(Diagnostic::new(path, format!("{what} with empty id")));
        } else if !seen.insert(id) {
            problems.push(Diagnostic::new(path, format!("duplicate {what} id: {id}")));
        }
    }
}

/// True if `content` has a top-level `def <name>(` (or `async def`).
pub fn defines_function(content: &str, name: &str) -> bool {
    top_level_match(content, &format!(r"(?:async\s+)?def\s+{}\s*\(", regex::escape(name)))
}

/// True if `content` has a top-level assignment to `name`.
fn binds_name(content: &str, name: &str) -> bool {
    top_level_match(content, &format!(r"{}\s*(?::[^=\n]*)?=[^=]", regex::escape(name)))
}

fn top_level_match(content: &str, pattern: &str) -> bool {
    Regex::new(&format!("(?m)^{pattern}")).map_or(false, |re| re.is_match(content))
}

fn validate_tools(flow: &Flow, problems: &mut Vec<Diagnostic>) {
    for tool in &flow.data.tools {
        let path = format!("data.tools.{}", tool.id);
        if python_variable_name(&tool.name, DEFAULT_PREFIX, MAX_VARIABLE_LENGTH) != tool.name {
            problems.push(Diagnostic::new(
                format!("{path}.name"),
                format!("tool name is not a valid Python identifier: {:?}", tool.name),
            ));
            continue;
        }
        if !tool_defines_itself(tool) {
            problems.push(Diagnostic::new(
                format!("{path}.data.content"),
                format!("tool content does not define {}", tool.name),
            ));
        }
    }
}

fn tool_defines_itself(tool: &Tool) -> bool {
    let content = tool.data.content.trim();
    match tool.data.tool_type.as_deref() {
        Some("shared") => true,
        Some(kind) if INTEROP_TOOL_TYPES.contains(&kind) => {
            defines_function(content, &tool.name) || binds_name(content, &tool.name)
        }
        _ => defines_function(content, &tool.name),
    }
}

fn validate_agents(flow: &Flow, problems: &mut Vec<Diagnostic>) {
    if flow.data.agents.is_empty() {
        problems.push(Diagnostic::new("data.agents", "flow has no agents"));
        return;
    }

    for agent in flow.data.agents.iter() {
        let path = format!("data.agents.{}", agent.id);
        let data = &agent.data;

        if agent.name.trim().is_empty() {
            problems.push(Diagnostic::new(&path, "agent name is empty"));
        }
        for model_id in &data.model_ids {
            if flow.model(model_id).is_none() {
                problems.push(Diagnostic::new(
                    format!("{path}.data.modelIds"),
                    format!("unknown model: {model_id}"),
                ));
            }
        }
        for link in &data.tools {
            if flow.tool(&link.id).is_none() {
                problems.push(Diagnostic::new(
                    format!("{path}.data.tools"),
                    format!("unknown tool: {}", link.id),
                ));
            }
            if flow.agent(&link.executor_id).is_none() {
                problems.push(Diagnostic::new(
                    format!("{path}.data.tools"),
                    format!("unknown executor agent: {}", link.executor_id),
                ));
            }
        }
        if let Some(max) = data.max_consecutive_auto_reply {
            if max < 0 {
                problems.push(Diagnostic::new(
                    format!("{path}.data.maxConsecutiveAutoReply"),
                    format!("must not be negative, found {max}"),
                ));
            }
        }

        let termination = &data.termination;
        match termination.kind {
            TerminationKind::Keyword
                if termination.keywords.iter().all(|k| k.trim().is_empty()) =>
            {
                problems.push(Diagnostic::new(
                    format!("{path}.data.termination"),
                    "keyword termination without keywords",
                ));
            }
            TerminationKind::Method
                if termination
                    .method_content
                    .as_deref()
                    .map_or(true, |c| c.trim().is_empty()) =>
            {
                problems.push(Diagnostic::new(
                    format!("{path}.data.termination"),
                    "method termination without method content",
                ));
            }
            TerminationKind::Method
                if !termination
                    .method_content
                    .as_deref()
                    .is_some_and(|c| defines_function(c.trim(), TERMINATION_FUNCTION)) =>
            {
                problems.push(Diagnostic::new(
                    format!("{path}.data.termination.methodContent"),
                    format!("method termination must define {TERMINATION_FUNCTION}(...)"),
                ));
            }
            _ => {}
        }
    }
}

fn validate_chats(flow: &Flow, problems: &mut Vec<Diagnostic>) {
    if flow.data.chats.is_empty() {
        if !flow.data.agents.is_empty() {
            problems.push(Diagnostic::new(
                "data.chats",
                "flow has no chats to initiate",
            ));
        }
        return;
    }

    for (index, chat) in flow.data.chats.iter().enumerate() {
        let path = format!("data.chats[{index}]");
        if flow.agent(&chat.source).is_none() {
            problems.push(Diagnostic::new(
                format!("{path}.source"),
                format!("unknown agent: {}", chat.source),
            ));
        }
        if flow.agent(&chat.target).is_none() {
            problems.push(Diagnostic::new(
                format!("{path}.target"),
                format!("unknown agent: {}", chat.target),
            ));
        }
        if let Some(turns) = chat.data.max_turns {
            if turns <= 0 {
                problems.push(Diagnostic::new(
                    format!("{path}.data.maxTurns"),
                    format!("must be positive, found {turns}"),
                ));
            }
        }
        let message = &chat.data.message;
        if message.kind == MessageKind::Method {
            match message.content.as_deref().map(str::trim) {
                None | Some("") => problems.push(Diagnostic::new(
                    format!("{path}.data.message"),
                    "method message without content",
                )),
                Some(content) if !defines_function(content, MESSAGE_FUNCTION) => {
                    problems.push(Diagnostic::new(
                        format!("{path}.data.message.content"),
                        format!("method message must define {MESSAGE_FUNCTION}(...)"),
                    ))
                }
                Some(_) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn fixture() -> Value {
        serde_json::from_str(include_str!("../../tests/fixtures/simple.waldiez")).unwrap()
    }

    fn flow_of(value: Value) -> Flow {
        serde_json::from_value(value).unwrap()
    }

    fn messages(problems: &[Diagnostic]) -> Vec<&str> {
        problems.iter().map(|d| d.message.as_str()).collect()
    }

    #[test]
    fn given_fixture_when_validate_then_no_problems() {
        assert!(validate(&flow_of(fixture())).is_empty());
    }

    #[test]
    fn given_several_problems_when_validate_then_collects_all() {
        let mut value = fixture();
        value["type"] = json!("agent");
        value["name"] = json!("  ");
        value["data"]["chats"][0]["source"] = json!("wa-404");
        value["data"]["chats"][0]["data"]["maxTurns"] = json!(0);

        let problems = validate(&flow_of(value));

        assert_eq!(problems.len(), 4);
        assert!(problems.iter().any(|d| d.path == "type"));
        assert!(messages(&problems).contains(&"flow name is empty"));
        assert!(messages(&problems).contains(&"unknown agent: wa-404"));
        assert!(problems.iter().any(|d| d.path == "data.chats[0].data.maxTurns"));
    }

    #[test]
    fn given_duplicate_agent_ids_when_validate_then_reports_duplicate() {
        let mut value = fixture();
        value["data"]["agents"]["assistantAgents"][0]["id"] = json!("wa-1");

        let problems = validate(&flow_of(value));

        assert!(messages(&problems).contains(&"duplicate agent id: wa-1"));
    }

    #[test]
    fn given_unknown_model_reference_when_validate_then_reports_it() {
        let mut value = fixture();
        value["data"]["agents"]["assistantAgents"][0]["data"]["modelIds"] = json!(["wm-9"]);

        let problems = validate(&flow_of(value));

        assert_eq!(messages(&problems), vec!["unknown model: wm-9"]);
    }

    #[test]
    fn given_keyword_termination_without_keywords_when_validate_then_reports_it() {
        let mut value = fixture();
        value["data"]["agents"]["userProxyAgents"][0]["data"]["termination"] =
            json!({"type": "keyword", "keywords": [""], "criterion": "found", "methodContent": null});

        let problems = validate(&flow_of(value));

        assert_eq!(
            messages(&problems),
            vec!["keyword termination without keywords"]
        );
    }

    #[test]
    fn given_agents_without_chats_when_ensure_valid_then_invalid_flow() {
        let mut value = fixture();
        value["data"]["chats"] = json!([]);

        let err = ensure_valid(&flow_of(value)).unwrap_err();

        match err {
            DomainError::InvalidFlow { diagnostics } => {
                assert_eq!(diagnostics.len(), 1);
                assert_eq!(diagnostics[0].path, "data.chats");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    fn with_tool(name: &str, content: &str, tool_type: Option<&str>) -> Flow {
        let mut value = fixture();
        value["data"]["tools"] = json!([{
            "id": "wt-1", "name": name,
            "data": {"content": content, "toolType": tool_type}
        }]);
        value["data"]["agents"]["assistantAgents"][0]["data"]["tools"] =
            json!([{"id": "wt-1", "executorId": "wa-1"}]);
        flow_of(value)
    }

    #[test]
    fn given_tool_name_with_space_when_validate_then_rejects_name() {
        let problems = validate(&with_tool("my tool", "def not_it():\n    pass", None));

        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].path, "data.tools.wt-1.name");
    }

    #[test]
    fn given_tool_content_defining_other_function_when_validate_then_rejects_content() {
        let problems = validate(&with_tool("fetch", "def not_fetch():\n    pass", None));

        assert_eq!(messages(&problems), vec!["tool content does not define fetch"]);
    }

    #[test]
    fn given_nested_definition_only_when_validate_then_rejects_content() {
        let content = "class Holder:\n    def fetch(self):\n        pass";

        let problems = validate(&with_tool("fetch", content, None));

        assert_eq!(messages(&problems), vec!["tool content does not define fetch"]);
    }

    #[test]
    fn given_tool_defining_itself_when_validate_then_accepts() {
        let content = "import os\n\nasync def fetch(url: str) -> str:\n    return url";

        assert!(validate(&with_tool("fetch", content, Some("custom"))).is_empty());
    }

    #[test]
    fn given_langchain_tool_binding_its_name_when_validate_then_accepts() {
        let content = "from autogen.interop import Interoperability\nwiki = Interoperability().convert_tool(t, type=\"langchain\")";

        assert!(validate(&with_tool("wiki", content, Some("langchain"))).is_empty());
        assert_eq!(
            messages(&validate(&with_tool("wiki", content, None))),
            vec!["tool content does not define wiki"]
        );
    }

    #[test]
    fn given_method_termination_without_expected_function_when_validate_then_reports_it() {
        let mut value = fixture();
        value["data"]["agents"]["assistantAgents"][0]["data"]["termination"] = json!({
            "type": "method", "keywords": [],
            "methodContent": "def something_else(message):\n    return True"
        });

        let problems = validate(&flow_of(value));

        assert_eq!(
            messages(&problems),
            vec!["method termination must define is_termination_message(...)"]
        );
    }

    #[test]
    fn given_method_termination_with_expected_function_when_validate_then_accepts() {
        let mut value = fixture();
        value["data"]["agents"]["assistantAgents"][0]["data"]["termination"] = json!({
            "type": "method", "keywords": [],
            "methodContent": "\ndef is_termination_message(message):\n    return True"
        });

        assert!(validate(&flow_of(value)).is_empty());
    }

    #[test]
    fn given_method_message_without_expected_function_when_validate_then_reports_it() {
        let mut value = fixture();
        value["data"]["chats"][0]["data"]["message"] = json!({
            "type": "method",
            "content": "def greet(sender, recipient, context):\n    return \"hi\""
        });

        let problems = validate(&flow_of(value));

        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].path, "data.chats[0].data.message.content");
    }
}

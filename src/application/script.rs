//! Python rendering of a flow
//!
//! A flow is rendered into a list of cells. The cells are written either as
//! a py:percent script (`to_percent_script`) or as a Jupyter notebook
//! (`notebook::to_notebook`).

use std::collections::{BTreeMap, BTreeSet};

use itertools::Itertools;
use serde_json::Value;

use crate::domain::naming::{python_variable_name, DEFAULT_PREFIX, MAX_VARIABLE_LENGTH};
use crate::domain::validation::{MESSAGE_FUNCTION, TERMINATION_FUNCTION};
use crate::domain::{
    Agent, AgentType, Chat, Flow, InstanceNames, MessageKind, TerminationCriterion,
    TerminationKind,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Markdown,
    Code,
}

/// One notebook cell / one `# %%` block of the script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub kind: CellKind,
    pub source: String,
}

impl Cell {
    pub fn markdown(source: impl Into<String>) -> Self {
        Self {
            kind: CellKind::Markdown,
            source: source.into(),
        }
    }

    pub fn code(source: impl Into<String>) -> Self {
        Self {
            kind: CellKind::Code,
            source: source.into(),
        }
    }
}

/// What the cells are rendered for; only the entry point differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Script,
    Notebook,
}

/// Render a Python string literal.
pub fn python_str(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

/// Render a JSON value as the equivalent Python literal.
pub fn python_literal(value: &Value) -> String {
    match value {
        Value::Null => "None".into(),
        Value::Bool(true) => "True".into(),
        Value::Bool(false) => "False".into(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => python_str(s),
        Value::Array(items) => format!("[{}]", items.iter().map(python_literal).join(", ")),
        Value::Object(map) => format!(
            "{{{}}}",
            map.iter()
                .map(|(k, v)| format!("{}: {}", python_str(k), python_literal(v)))
                .join(", ")
        ),
    }
}

fn docstring_text(s: &str) -> String {
    s.replace('\\', "\\\\").replace("\"\"\"", "\\\"\\\"\\\"")
}

fn indent(text: &str, spaces: usize) -> String {
    let pad = " ".repeat(spaces);
    text.lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{pad}{line}")
            }
        })
        .join("\n")
}

fn is_identifier(key: &str) -> bool {
    python_variable_name(key, DEFAULT_PREFIX, MAX_VARIABLE_LENGTH) == key
}

/// Environment variable an api key is read from when the model has none.
fn api_key_env(api_type: &str) -> String {
    match api_type {
        "azure" => "AZURE_OPENAI_API_KEY".into(),
        "google" => "GOOGLE_GEMINI_API_KEY".into(),
        other => format!("{}_API_KEY", other.to_uppercase()),
    }
}

/// Render a flow into a py:percent script.
pub fn render_script(flow: &Flow, requirements: &[String]) -> String {
    to_percent_script(&render_cells(flow, requirements, Target::Script))
}

/// Write cells in the py:percent format.
pub fn to_percent_script(cells: &[Cell]) -> String {
    let body = cells
        .iter()
        .map(|cell| match cell.kind {
            CellKind::Markdown => {
                let lines = cell
                    .source
                    .lines()
                    .map(|line| {
                        if line.is_empty() {
                            "#".to_string()
                        } else {
                            format!("# {line}")
                        }
                    })
                    .join("\n");
                format!("# %% [markdown]\n{lines}")
            }
            CellKind::Code => format!("# %%\n{}", cell.source.trim_end()),
        })
        .join("\n\n");
    format!("#!/usr/bin/env python\n# -*- coding: utf-8 -*-\n\n{body}\n")
}

/// Render all cells of a flow.
pub fn render_cells(flow: &Flow, requirements: &[String], target: Target) -> Vec<Cell> {
    let names = InstanceNames::from_flow(flow);
    let initial = flow.initial_chats();

    let mut cells = vec![
        header_markdown(flow),
        header_docstring(flow, requirements),
        imports(flow, initial.len()),
    ];

    if !flow.data.tools.is_empty() {
        cells.push(Cell::markdown("## Tools"));
        cells.push(tools(flow));
    }
    if !flow.data.models.is_empty() {
        cells.push(Cell::markdown("## Models"));
        cells.push(models(flow, &names));
    }

    let (termination_cell, termination_fns) = terminations(flow, &names);
    if let Some(cell) = termination_cell {
        cells.push(Cell::markdown("## Termination"));
        cells.push(cell);
    }

    cells.push(Cell::markdown("## Agents"));
    cells.push(agents(flow, &names, &termination_fns));

    if let Some(cell) = tool_registrations(flow, &names) {
        cells.push(cell);
    }

    cells.push(Cell::markdown("## Chats"));
    cells.push(chats(flow, &names, &initial));
    cells.push(entry_point(flow.data.is_async, target));
    cells
}

fn header_markdown(flow: &Flow) -> Cell {
    let mut text = format!("# {}", flow.name);
    if !flow.description.trim().is_empty() {
        text.push_str(&format!("\n\n{}", flow.description.trim()));
    }
    Cell::markdown(text)
}

fn header_docstring(flow: &Flow, requirements: &[String]) -> Cell {
    let mut lines = vec![format!("\"\"\"{}.", docstring_text(&flow.name))];
    if !flow.description.trim().is_empty() {
        lines.push(String::new());
        lines.push(docstring_text(flow.description.trim()));
    }
    lines.push(String::new());
    lines.push(format!("Requirements: {}", requirements.join(", ")));
    if !flow.tags.is_empty() {
        lines.push(format!("Tags: {}", docstring_text(&flow.tags.join(", "))));
    }
    lines.push(String::new());
    lines.push(format!("Generated by waldiez {}.", crate::version()));
    lines.push("\"\"\"".into());
    Cell::code(lines.join("\n"))
}

fn imports(flow: &Flow, initial_chats: usize) -> Cell {
    let mut stdlib: BTreeSet<&str> = ["json", "os"].into_iter().collect();
    if flow.data.is_async {
        stdlib.insert("asyncio");
    }

    let mut from_imports: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for agent in flow.data.agents.iter() {
        from_imports
            .entry(agent.agent_type.python_module())
            .or_default()
            .insert(agent.agent_type.python_class());
        if agent.agent_type == AgentType::GroupManager {
            from_imports.entry("autogen").or_default().insert("GroupChat");
        }
    }
    if !flow.data.tools.is_empty() {
        from_imports
            .entry("autogen")
            .or_default()
            .insert("register_function");
    }
    if initial_chats > 1 {
        let function = if flow.data.is_async {
            "a_initiate_chats"
        } else {
            "initiate_chats"
        };
        from_imports
            .entry("autogen.agentchat")
            .or_default()
            .insert(function);
    }

    let mut lines: Vec<String> = stdlib.iter().map(|m| format!("import {m}")).collect();
    lines.push("from typing import Any".into());
    lines.push(String::new());
    lines.extend(
        from_imports
            .iter()
            .map(|(module, items)| format!("from {} import {}", module, items.iter().join(", "))),
    );
    Cell::code(lines.join("\n"))
}

fn tools(flow: &Flow) -> Cell {
    let blocks: Vec<String> = flow.data.tools.iter().map(|tool| {
        let mut lines: Vec<String> = tool
            .data
            .secrets
            .iter()
            .map(|(key, value)| format!("os.environ[{}] = {}", python_str(key), python_str(value)))
            .collect();
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.push(tool.data.content.trim().to_string());
        lines.join("\n")
    })
    .collect();
    Cell::code(blocks.join("\n\n\n"))
}

fn models(flow: &Flow, names: &InstanceNames) -> Cell {
    let blocks: Vec<String> = flow.data.models.iter().map(|model| {
        let data = &model.data;
        let mut entries = vec![
            format!("\"model\": {}", python_str(&model.name)),
            format!("\"api_type\": {}", python_str(data.api_type())),
        ];
        if let Some(base_url) = &data.base_url {
            entries.push(format!("\"base_url\": {}", python_str(base_url)));
        }
        if let Some(api_version) = &data.api_version {
            entries.push(format!("\"api_version\": {}", python_str(api_version)));
        }
        if let Some(temperature) = data.temperature {
            entries.push(format!("\"temperature\": {temperature}"));
        }
        if let Some(top_p) = data.top_p {
            entries.push(format!("\"top_p\": {top_p}"));
        }
        if let Some(max_tokens) = data.max_tokens {
            entries.push(format!("\"max_tokens\": {max_tokens}"));
        }
        let api_key = match &data.api_key {
            Some(key) if !key.is_empty() => python_str(key),
            _ => format!(
                "os.environ.get({}, \"\")",
                python_str(&api_key_env(data.api_type()))
            ),
        };
        entries.push(format!("\"api_key\": {api_key}"));

        format!(
            "{}_llm_config: dict[str, Any] = {{\n{},\n}}",
            names.get(&model.id),
            indent(&entries.join(",\n"), 4)
        )
    })
    .collect();
    Cell::code(blocks.join("\n\n"))
}

/// Termination functions, keyed by agent id.
fn terminations(flow: &Flow, names: &InstanceNames) -> (Option<Cell>, BTreeMap<String, String>) {
    let mut functions = BTreeMap::new();
    let mut blocks = Vec::new();

    for agent in flow.data.agents.iter() {
        let termination = &agent.data.termination;
        let function = format!("is_termination_message_{}", names.get(&agent.id));
        match termination.kind {
            TerminationKind::None => continue,
            TerminationKind::Keyword => {
                let keywords = format!(
                    "[{}]",
                    termination.keywords.iter().map(|k| python_str(k)).join(", ")
                );
                let check = match termination.criterion.unwrap_or_default() {
                    TerminationCriterion::Found => "any(keyword in content for keyword in keywords)",
                    TerminationCriterion::Ending => {
                        "any(content.rstrip().endswith(keyword) for keyword in keywords)"
                    }
                    TerminationCriterion::Starting => {
                        "any(content.lstrip().startswith(keyword) for keyword in keywords)"
                    }
                    TerminationCriterion::Exact => {
                        "any(content.strip() == keyword for keyword in keywords)"
                    }
                };
                blocks.push(format!(
                    "def {function}(message: dict[str, Any]) -> bool:\n    \
                     \"\"\"Check if the message ends the conversation.\"\"\"\n    \
                     content = message.get(\"content\") or \"\"\n    \
                     if not isinstance(content, str):\n        \
                     return False\n    \
                     keywords = {keywords}\n    \
                     return {check}"
                ));
            }
            TerminationKind::Method => {
                let content = termination.method_content.as_deref().unwrap_or_default();
                blocks.push(format!(
                    "{}\n\n\n{function} = {TERMINATION_FUNCTION}",
                    content.trim()
                ));
            }
        }
        functions.insert(agent.id.clone(), function);
    }

    if blocks.is_empty() {
        (None, functions)
    } else {
        (Some(Cell::code(blocks.join("\n\n\n"))), functions)
    }
}

fn llm_config(flow: &Flow, agent: &Agent, names: &InstanceNames) -> String {
    if agent.data.model_ids.is_empty() {
        return "False".into();
    }
    let configs = agent
        .data
        .model_ids
        .iter()
        .map(|id| format!("{}_llm_config", names.get(id)))
        .join(", ");
    let cache_seed = flow
        .data
        .cache_seed
        .map(|seed| seed.to_string())
        .unwrap_or_else(|| "None".into());
    format!("{{\n    \"config_list\": [{configs}],\n    \"cache_seed\": {cache_seed},\n}}")
}

fn group_members<'a>(flow: &'a Flow, manager: &Agent) -> Vec<&'a Agent> {
    flow.data
        .agents
        .iter()
        .filter(|a| {
            a.data.extra.get("parentId").and_then(Value::as_str) == Some(manager.id.as_str())
        })
        .collect()
}

fn agent_kwargs(
    flow: &Flow,
    agent: &Agent,
    names: &InstanceNames,
    terminations: &BTreeMap<String, String>,
) -> Vec<(String, String)> {
    let data = &agent.data;
    let mut kwargs = vec![("name".to_string(), python_str(&agent.name))];
    if !agent.description.is_empty() {
        kwargs.push(("description".into(), python_str(&agent.description)));
    }
    if let Some(system_message) = &data.system_message {
        kwargs.push(("system_message".into(), python_str(system_message)));
    }
    kwargs.push(("llm_config".into(), llm_config(flow, agent, names)));

    // DocAgent only takes the basics.
    if agent.agent_type == AgentType::DocAgent {
        return kwargs;
    }

    kwargs.push((
        "human_input_mode".into(),
        python_str(data.human_input_mode.as_str()),
    ));
    if let Some(max_reply) = data.max_consecutive_auto_reply {
        kwargs.push(("max_consecutive_auto_reply".into(), max_reply.to_string()));
    }
    if let Some(reply) = data.agent_default_auto_reply.as_deref().filter(|r| !r.is_empty()) {
        kwargs.push(("default_auto_reply".into(), python_str(reply)));
    }
    let code_execution = match &data.code_execution_config {
        Value::Null | Value::Bool(false) => "False".to_string(),
        other => python_literal(other),
    };
    kwargs.push(("code_execution_config".into(), code_execution));
    if let Some(function) = terminations.get(&agent.id) {
        kwargs.push(("is_termination_msg".into(), function.clone()));
    }

    match agent.agent_type {
        AgentType::RagUserProxy => {
            if let Some(config) = data.extra.get("retrieveConfig") {
                kwargs.push(("retrieve_config".into(), python_literal(config)));
            }
        }
        AgentType::GroupManager => {
            let members = group_members(flow, agent)
                .iter()
                .map(|a| names.get(&a.id))
                .join(", ");
            let max_round = data
                .extra
                .get("maxRound")
                .and_then(Value::as_i64)
                .map(|n| n.to_string())
                .unwrap_or_else(|| "20".into());
            kwargs.push((
                "groupchat".into(),
                format!("GroupChat(\n    agents=[{members}],\n    messages=[],\n    max_round={max_round},\n)"),
            ));
        }
        _ => {}
    }
    kwargs
}

fn agents(flow: &Flow, names: &InstanceNames, terminations: &BTreeMap<String, String>) -> Cell {
    // Managers reference their members, so they come last.
    let (managers, others): (Vec<&Agent>, Vec<&Agent>) = flow
        .data
        .agents
        .iter()
        .partition(|a| a.agent_type == AgentType::GroupManager);

    let blocks: Vec<String> = others.into_iter().chain(managers).map(|agent| {
        let kwargs = agent_kwargs(flow, agent, names, terminations)
            .into_iter()
            .map(|(key, value)| format!("{key}={value},"))
            .join("\n");
        format!(
            "{} = {}(\n{}\n)",
            names.get(&agent.id),
            agent.agent_type.python_class(),
            indent(&kwargs, 4)
        )
    })
    .collect();
    Cell::code(blocks.join("\n\n"))
}

fn tool_registrations(flow: &Flow, names: &InstanceNames) -> Option<Cell> {
    let mut blocks = Vec::new();
    for agent in flow.data.agents.iter() {
        for link in &agent.data.tools {
            let Some(tool) = flow.tool(&link.id) else {
                continue;
            };
            blocks.push(format!(
                "register_function(\n    {},\n    caller={},\n    executor={},\n    name={},\n    description={},\n)",
                tool.name,
                names.get(&agent.id),
                names.get(&link.executor_id),
                python_str(&tool.name),
                python_str(&tool.description),
            ));
        }
    }
    if blocks.is_empty() {
        None
    } else {
        Some(Cell::code(blocks.join("\n\n")))
    }
}

/// Keyword arguments of one chat: `(name, python expression)`.
fn chat_kwargs(chat: &Chat, names: &InstanceNames) -> Vec<(String, String)> {
    let data = &chat.data;
    let mut kwargs = Vec::new();

    match data.message.kind {
        MessageKind::String => {
            let content = data.message.content.as_deref().unwrap_or_default();
            kwargs.push(("message".to_string(), python_str(content)));
        }
        MessageKind::Method => {
            kwargs.push((
                "message".to_string(),
                format!("{MESSAGE_FUNCTION}_{}", names.get(&chat.id)),
            ));
        }
        MessageKind::RagMessageGenerator => {
            kwargs.push((
                "message".to_string(),
                format!("{}.message_generator", names.get(&chat.source)),
            ));
        }
        MessageKind::None => {}
    }

    kwargs.push(("summary_method".into(), python_str(&data.summary.method)));
    let mut summary_args = data.summary.args.clone();
    if !data.summary.prompt.is_empty() {
        summary_args.insert(
            "summary_prompt".into(),
            Value::String(data.summary.prompt.clone()),
        );
    }
    if !summary_args.is_empty() {
        kwargs.push((
            "summary_args".into(),
            python_literal(&Value::Object(summary_args)),
        ));
    }
    if let Some(max_turns) = data.max_turns {
        kwargs.push(("max_turns".into(), max_turns.to_string()));
    }
    if let Some(clear_history) = data.clear_history {
        kwargs.push(("clear_history".into(), python_literal(&Value::Bool(clear_history))));
    }
    kwargs.push(("silent".into(), python_literal(&Value::Bool(data.silent))));

    for (key, value) in &data.message.context {
        if is_identifier(key) && !kwargs.iter().any(|(k, _)| k == key) {
            kwargs.push((key.clone(), python_literal(value)));
        }
    }
    kwargs
}

fn chats(flow: &Flow, names: &InstanceNames, initial: &[&Chat]) -> Cell {
    let is_async = flow.data.is_async;
    let mut blocks = Vec::new();

    for chat in &flow.data.chats {
        if chat.data.message.kind == MessageKind::Method {
            let content = chat.data.message.content.as_deref().unwrap_or_default();
            blocks.push(format!(
                "{}\n\n\n{MESSAGE_FUNCTION}_{} = {MESSAGE_FUNCTION}",
                content.trim(),
                names.get(&chat.id)
            ));
        }
    }

    blocks.push(
        "def result_to_dict(result: Any) -> dict[str, Any]:\n    \
         \"\"\"Convert a chat result to a serializable dict.\"\"\"\n    \
         return {\n        \
         \"chat_id\": result.chat_id,\n        \
         \"chat_history\": result.chat_history,\n        \
         \"summary\": result.summary,\n        \
         \"cost\": result.cost,\n        \
         \"human_input\": result.human_input,\n    \
         }"
            .to_string(),
    );
    blocks.push(
        "def store_results(results: list[dict[str, Any]]) -> None:\n    \
         \"\"\"Write the chat results to results.json.\"\"\"\n    \
         with open(\"results.json\", \"w\", encoding=\"utf-8\") as file:\n        \
         json.dump({\"results\": results}, file, indent=2, default=str)"
            .to_string(),
    );

    let (def, awaiting) = if is_async {
        ("async def", "await ")
    } else {
        ("def", "")
    };
    let body = match initial {
        [chat] => {
            let method = if is_async {
                "a_initiate_chat"
            } else {
                "initiate_chat"
            };
            let mut args = vec![format!("{},", names.get(&chat.target))];
            args.extend(
                chat_kwargs(chat, names)
                    .into_iter()
                    .map(|(key, value)| format!("{key}={value},")),
            );
            format!(
                "result = {awaiting}{}.{method}(\n{}\n)\nresults = [result_to_dict(result)]",
                names.get(&chat.source),
                indent(&args.join("\n"), 4)
            )
        }
        _ => {
            let queue = initial
                .iter()
                .enumerate()
                .map(|(index, chat)| {
                    let mut entries = vec![
                        format!("\"sender\": {},", names.get(&chat.source)),
                        format!("\"recipient\": {},", names.get(&chat.target)),
                    ];
                    if is_async {
                        let prerequisites = chat
                            .data
                            .prerequisites
                            .iter()
                            .filter_map(|id| initial.iter().position(|c| &c.id == id))
                            .join(", ");
                        entries.push(format!("\"chat_id\": {index},"));
                        entries.push(format!("\"prerequisites\": [{prerequisites}],"));
                    }
                    entries.extend(
                        chat_kwargs(chat, names)
                            .into_iter()
                            .map(|(key, value)| format!("{}: {},", python_str(&key), value)),
                    );
                    format!("{{\n{}\n}},", indent(&entries.join("\n"), 4))
                })
                .join("\n");
            let (function, collect) = if is_async {
                ("a_initiate_chats", "chat_results.values()")
            } else {
                ("initiate_chats", "chat_results")
            };
            format!(
                "chat_queue: list[dict[str, Any]] = [\n{}\n]\n\
                 chat_results = {awaiting}{function}(chat_queue)\n\
                 results = [result_to_dict(result) for result in {collect}]",
                indent(&queue, 4)
            )
        }
    };

    blocks.push(format!(
        "{def} main() -> list[dict[str, Any]]:\n    \
         \"\"\"Start the chats and store their results.\"\"\"\n\
         {}\n    \
         store_results(results)\n    \
         return results",
        indent(&body, 4)
    ));
    Cell::code(blocks.join("\n\n\n"))
}

fn entry_point(is_async: bool, target: Target) -> Cell {
    let source = match (target, is_async) {
        (Target::Script, false) => "if __name__ == \"__main__\":\n    main()",
        (Target::Script, true) => "if __name__ == \"__main__\":\n    asyncio.run(main())",
        (Target::Notebook, false) => "main()",
        (Target::Notebook, true) => "await main()",
    };
    Cell::code(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn flow_from(value: Value) -> Flow {
        serde_json::from_value(value).unwrap()
    }

    fn two_agent_flow(chats: Value, is_async: bool) -> Flow {
        flow_from(json!({
            "name": "Greetings",
            "description": "Say hello",
            "tags": ["demo"],
            "data": {
                "isAsync": is_async,
                "agents": {
                    "userProxyAgents": [{
                        "id": "wa-1", "agentType": "user_proxy", "name": "User",
                        "data": {"humanInputMode": "NEVER"}
                    }],
                    "assistantAgents": [{
                        "id": "wa-2", "agentType": "assistant", "name": "Assistant",
                        "data": {
                            "modelIds": ["wm-1"],
                            "termination": {"type": "keyword", "keywords": ["TERMINATE"], "criterion": "ending"}
                        }
                    }]
                },
                "models": [{"id": "wm-1", "name": "gpt-4o", "data": {"temperature": 0.5}}],
                "chats": chats
            }
        }))
    }

    fn chat(id: &str, order: i64, content: &str) -> Value {
        json!({
            "id": id, "source": "wa-1", "target": "wa-2",
            "data": {
                "order": order,
                "maxTurns": 1,
                "message": {"type": "string", "content": content}
            }
        })
    }

    #[test]
    fn given_json_values_when_python_literal_then_uses_python_syntax() {
        let value = json!({"a": [true, false, null], "b": "x\"y", "c": 1.5});
        assert_eq!(
            python_literal(&value),
            r#"{"a": [True, False, None], "b": "x\"y", "c": 1.5}"#
        );
    }

    #[test]
    fn given_multiline_markdown_when_percent_script_then_comments_each_line() {
        let cells = vec![Cell::markdown("# Title\n\nText"), Cell::code("x = 1\n")];
        let script = to_percent_script(&cells);
        assert!(script.contains("# %% [markdown]\n# # Title\n#\n# Text\n\n# %%\nx = 1\n"));
        assert!(script.starts_with("#!/usr/bin/env python"));
    }

    #[test]
    fn given_single_chat_when_render_then_uses_initiate_chat() {
        let flow = two_agent_flow(json!([chat("wc-1", 0, "Hi there")]), false);
        let script = render_script(&flow, &["ag2[openai]".to_string()]);

        assert!(script.contains("from autogen import AssistantAgent, UserProxyAgent"));
        assert!(script.contains("gpt_4o_llm_config: dict[str, Any] = {"));
        assert!(script.contains("\"temperature\": 0.5"));
        assert!(script.contains("os.environ.get(\"OPENAI_API_KEY\", \"\")"));
        assert!(script.contains("result = user.initiate_chat(\n        assistant,"));
        assert!(script.contains("message=\"Hi there\","));
        assert!(script.contains("max_turns=1,"));
        assert!(script.contains("llm_config=False,"));
        assert!(script.contains("is_termination_msg=is_termination_message_assistant,"));
        assert!(script.contains("content.rstrip().endswith(keyword)"));
        assert!(script.contains("Requirements: ag2[openai]"));
        assert!(script.contains("if __name__ == \"__main__\":\n    main()"));
        assert!(!script.contains("initiate_chats"));
    }

    #[test]
    fn given_several_chats_when_render_then_uses_chat_queue_in_order() {
        let flow = two_agent_flow(
            json!([chat("wc-2", 1, "second"), chat("wc-1", 0, "first")]),
            false,
        );
        let script = render_script(&flow, &[]);

        assert!(script.contains("from autogen.agentchat import initiate_chats"));
        assert!(script.contains("chat_results = initiate_chats(chat_queue)"));
        let first = script.find("\"message\": \"first\"").unwrap();
        let second = script.find("\"message\": \"second\"").unwrap();
        assert!(first < second);
    }

    #[test]
    fn given_async_flow_when_render_notebook_cells_then_awaits_main() {
        let flow = two_agent_flow(
            json!([chat("wc-1", 0, "first"), chat("wc-2", 1, "second")]),
            true,
        );
        let cells = render_cells(&flow, &[], Target::Notebook);
        let source = cells.iter().map(|c| c.source.as_str()).join("\n");

        assert!(source.contains("import asyncio"));
        assert!(source.contains("async def main()"));
        assert!(source.contains("await a_initiate_chats(chat_queue)"));
        assert!(source.contains("\"chat_id\": 1,"));
        assert_eq!(cells.last().unwrap().source, "await main()");
    }

    #[test]
    fn given_method_message_when_render_then_aliases_callable() {
        let flow = two_agent_flow(
            json!([{
                "id": "wc-1", "source": "wa-1", "target": "wa-2",
                "data": {
                    "name": "Kickoff",
                    "message": {
                        "type": "method",
                        "content": "def callable_message(sender, recipient, context):\n    return \"hi\""
                    }
                }
            }]),
            false,
        );
        let script = render_script(&flow, &[]);

        assert!(script.contains("callable_message_kickoff = callable_message"));
        assert!(script.contains("message=callable_message_kickoff,"));
    }
}

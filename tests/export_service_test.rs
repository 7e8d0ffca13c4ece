//! Tests for ExportService

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Value};
use tempfile::TempDir;

use waldiez::application::services::{ExportFormat, ExportService};
use waldiez::application::ApplicationError;
use waldiez::config::Settings;
use waldiez::domain::Flow;
use waldiez::infrastructure::traits::RealFileSystem;

fn simple_flow() -> Flow {
    let text =
        fs::read_to_string(Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/simple.waldiez"))
            .unwrap();
    serde_json::from_str(&text).unwrap()
}

fn service(settings: Settings) -> ExportService {
    ExportService::new(Arc::new(RealFileSystem), Arc::new(settings))
}

/// Flow with a tool, a model, a group manager and two ordered chats.
fn rich_flow() -> Flow {
    serde_json::from_value(json!({
        "name": "Research team",
        "requirements": ["requests"],
        "data": {
            "cacheSeed": 7,
            "agents": {
                "userProxyAgents": [{
                    "id": "wa-1", "agentType": "user_proxy", "name": "Boss",
                    "data": {"humanInputMode": "ALWAYS"}
                }],
                "assistantAgents": [{
                    "id": "wa-2", "agentType": "assistant", "name": "Researcher",
                    "requirements": ["beautifulsoup4"],
                    "data": {
                        "parentId": "wa-3",
                        "modelIds": ["wm-1"],
                        "tools": [{"id": "wt-1", "executorId": "wa-1"}]
                    }
                }],
                "groupManagerAgents": [{
                    "id": "wa-3", "agentType": "group_manager", "name": "Manager",
                    "data": {"modelIds": ["wm-1"], "maxRound": 5}
                }]
            },
            "models": [{
                "id": "wm-1", "name": "claude", "data": {"apiType": "anthropic", "apiKey": "sk-test"}
            }],
            "tools": [{
                "id": "wt-1", "name": "fetch_page", "description": "Fetch a web page",
                "data": {
                    "content": "def fetch_page(url: str) -> str:\n    return url",
                    "secrets": {"PAGE_TOKEN": "abc"}
                }
            }],
            "chats": [
                {"id": "wc-2", "source": "wa-1", "target": "wa-3",
                 "data": {"order": 1, "message": {"type": "string", "content": "Summarize"}}},
                {"id": "wc-1", "source": "wa-1", "target": "wa-2",
                 "data": {"order": 0, "message": {"type": "string", "content": "Research"},
                          "summary": {"method": "reflection_with_llm", "prompt": "Be brief"}}}
            ]
        }
    }))
    .unwrap()
}

#[test]
fn given_python_output_when_export_then_writes_script() {
    let temp = TempDir::new().unwrap();
    let output = temp.path().join("nested").join("flow.py");

    let written = service(Settings::default())
        .export(&simple_flow(), &output, false)
        .unwrap();

    assert_eq!(written, output);
    let script = fs::read_to_string(&output).unwrap();
    assert!(script.starts_with("#!/usr/bin/env python"));
    assert!(script.contains("# %%"));
    assert!(script.contains("user = UserProxyAgent("));
    assert!(script.contains("assistant = AssistantAgent("));
    assert!(script.contains("store_results(results)"));
}

#[test]
fn given_notebook_output_when_export_then_writes_nbformat_4() {
    let temp = TempDir::new().unwrap();
    let output = temp.path().join("flow.ipynb");

    service(Settings::default())
        .export(&simple_flow(), &output, false)
        .unwrap();

    let notebook: Value = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(notebook["nbformat"], 4);
    assert_eq!(notebook["nbformat_minor"], 5);
    let cells = notebook["cells"].as_array().unwrap();
    assert!(cells.iter().any(|c| c["cell_type"] == "code"));
    assert!(cells.iter().any(|c| c["cell_type"] == "markdown"));
}

#[test]
fn given_waldiez_output_when_export_then_writes_same_flow() {
    let temp = TempDir::new().unwrap();
    let output = temp.path().join("copy.waldiez");
    let flow = simple_flow();

    service(Settings::default()).export(&flow, &output, false).unwrap();

    let reloaded: Flow = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(reloaded, flow);
}

#[test]
fn given_existing_output_when_export_without_force_then_output_exists() {
    let temp = TempDir::new().unwrap();
    let output = temp.path().join("flow.py");
    fs::write(&output, "original").unwrap();
    let service = service(Settings::default());

    let err = service.export(&simple_flow(), &output, false).unwrap_err();
    assert!(matches!(err, ApplicationError::OutputExists(_)));
    assert_eq!(fs::read_to_string(&output).unwrap(), "original");

    service.export(&simple_flow(), &output, true).unwrap();
    assert_ne!(fs::read_to_string(&output).unwrap(), "original");
}

#[test]
fn given_rich_flow_when_render_python_then_covers_all_parts() {
    let script = service(Settings::default())
        .render(&rich_flow(), ExportFormat::Python)
        .unwrap();

    // imports
    assert!(script.contains(
        "from autogen import AssistantAgent, GroupChat, GroupChatManager, UserProxyAgent, register_function"
    ));
    assert!(script.contains("from autogen.agentchat import initiate_chats"));
    // tools and secrets
    assert!(script.contains("os.environ[\"PAGE_TOKEN\"] = \"abc\""));
    assert!(script.contains("def fetch_page(url: str) -> str:"));
    assert!(script.contains("register_function(\n    fetch_page,\n    caller=researcher,\n    executor=boss,"));
    // models
    assert!(script.contains("claude_llm_config: dict[str, Any] = {"));
    assert!(script.contains("\"api_key\": \"sk-test\""));
    assert!(script.contains("\"cache_seed\": 7,"));
    // group manager after its members
    let member = script.find("researcher = AssistantAgent(").unwrap();
    let manager = script.find("manager = GroupChatManager(").unwrap();
    assert!(member < manager);
    assert!(script.contains("agents=[researcher],"));
    assert!(script.contains("max_round=5,"));
    // chats
    assert!(script.contains("\"summary_args\": {\"summary_prompt\": \"Be brief\"},"));
    let first = script.find("\"message\": \"Research\"").unwrap();
    let second = script.find("\"message\": \"Summarize\"").unwrap();
    assert!(first < second);
    assert!(script.contains("Requirements: ag2[anthropic,openai], beautifulsoup4, requests"));
}

#[test]
fn given_pinned_package_and_extras_when_requirements_then_merged_and_sorted() {
    let settings = Settings {
        ag2_package: "ag2==0.9.7".into(),
        extra_requirements: vec!["pandas".into(), "requests".into()],
        ..Settings::default()
    };

    let requirements = service(settings).requirements(&rich_flow());

    assert_eq!(
        requirements,
        vec![
            "ag2[anthropic,openai]==0.9.7".to_string(),
            "beautifulsoup4".to_string(),
            "pandas".to_string(),
            "requests".to_string(),
        ]
    );
}

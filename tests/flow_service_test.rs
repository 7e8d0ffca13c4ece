//! Tests for FlowService

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rstest::rstest;
use tempfile::TempDir;

use waldiez::application::services::FlowService;
use waldiez::application::ApplicationError;
use waldiez::domain::DomainError;
use waldiez::infrastructure::traits::RealFileSystem;
use waldiez::util::testing;

fn fixture_text() -> String {
    fs::read_to_string(Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/simple.waldiez"))
        .unwrap()
}

fn service() -> FlowService {
    testing::init_test_setup();
    FlowService::new(Arc::new(RealFileSystem))
}

fn write_flow(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("flow.waldiez");
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn given_valid_flow_when_check_then_returns_summary() {
    let temp = TempDir::new().unwrap();
    let path = write_flow(&temp, &fixture_text());

    let report = service().check(&path).unwrap();

    assert_eq!(report.flow.name, "Simple flow");
    assert_eq!(report.summary.agents, 2);
    assert_eq!(report.summary.chats, 1);
    assert!(!report.summary.requires_human_input);
}

#[test]
fn given_missing_file_when_load_then_flow_not_found() {
    let temp = TempDir::new().unwrap();

    let err = service().load(&temp.path().join("nope.waldiez")).unwrap_err();

    assert!(matches!(err, ApplicationError::FlowNotFound(_)));
}

#[test]
fn given_directory_when_load_then_flow_not_found() {
    let temp = TempDir::new().unwrap();

    let err = service().load(temp.path()).unwrap_err();

    assert!(matches!(err, ApplicationError::FlowNotFound(_)));
}

#[rstest]
#[case("")]
#[case("[]")]
#[case("{\"name\": \"no data\"}")]
fn given_malformed_document_when_load_then_invalid_json(#[case] content: &str) {
    let temp = TempDir::new().unwrap();
    let path = write_flow(&temp, content);

    let err = service().load(&path).unwrap_err();

    assert!(matches!(err, ApplicationError::InvalidJson { .. }));
}

#[rstest]
#[case("\"type\": \"flow\"", "\"type\": \"agent\"", "type")]
#[case("\"name\": \"Simple flow\"", "\"name\": \"\"", "name")]
#[case("\"maxTurns\": 1", "\"maxTurns\": 0", "data.chats[0].data.maxTurns")]
#[case("\"source\": \"wa-1\"", "\"source\": \"wa-9\"", "data.chats[0].source")]
fn given_semantic_problem_when_check_then_reports_path(
    #[case] from: &str,
    #[case] to: &str,
    #[case] expected_path: &str,
) {
    let temp = TempDir::new().unwrap();
    let path = write_flow(&temp, &fixture_text().replacen(from, to, 1));

    let err = service().check(&path).unwrap_err();

    match err {
        ApplicationError::Domain(DomainError::InvalidFlow { diagnostics }) => {
            assert!(
                diagnostics.iter().any(|d| d.path == expected_path),
                "expected a problem at {expected_path}, got {diagnostics:?}"
            );
        }
        other => panic!("expected InvalidFlow, got {other:?}"),
    }
}

#[test]
fn given_several_problems_when_check_then_reports_all() {
    let temp = TempDir::new().unwrap();
    let content = fixture_text()
        .replace("\"source\": \"wa-1\"", "\"source\": \"wa-8\"")
        .replace("\"target\": \"wa-2\"", "\"target\": \"wa-9\"");
    let path = write_flow(&temp, &content);

    let err = service().check(&path).unwrap_err();

    match err {
        ApplicationError::Domain(DomainError::InvalidFlow { diagnostics }) => {
            assert_eq!(diagnostics.len(), 2);
        }
        other => panic!("expected InvalidFlow, got {other:?}"),
    }
}

#[test]
fn given_snake_case_fields_when_load_then_accepts_aliases() {
    let temp = TempDir::new().unwrap();
    let content = fixture_text()
        .replace("\"maxTurns\"", "\"max_turns\"")
        .replace("\"humanInputMode\"", "\"human_input_mode\"");
    let path = write_flow(&temp, &content);

    let flow = service().load(&path).unwrap();

    assert_eq!(flow.data.chats[0].data.max_turns, Some(1));
}

#[test]
fn given_loaded_flow_when_saved_then_reloads_identically() {
    let temp = TempDir::new().unwrap();
    let path = write_flow(&temp, &fixture_text());
    let copy = temp.path().join("copy.waldiez");
    let service = service();

    let flow = service.load(&path).unwrap();
    service.save(&flow, &copy).unwrap();

    assert_eq!(service.load(&copy).unwrap(), flow);
    assert!(fs::read_to_string(&copy).unwrap().ends_with("}\n"));
}

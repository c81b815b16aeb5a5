use engine::config::load_config_from;
use engine::feed::{dispatch, FeedCommand};
use engine::{ReferenceData, StaticReferenceData};
use serde_json::json;
use shared_types::{AppErrorKind, EngineConfig};
use std::path::PathBuf;
use uuid::Uuid;

use crate::common;

fn workspace_file(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..").join(name)
}

#[tokio::test]
async fn test_feed_lines_drive_the_engine() {
    let t = common::test_engine();
    let case_id = Uuid::new_v4();
    let prosecution = json!({
        "type": "prosecution",
        "body": common::prosecution_json(
            case_id,
            "TVL980",
            "direct_submission",
            "C",
            vec![common::person("REF-1", "Ann", "Smith", "1990-02-03")],
        )
    });

    let command = FeedCommand::parse(&prosecution.to_string()).unwrap();
    assert_eq!(command.name(), "prosecution");
    let result = dispatch(&t.engine, command).await.unwrap();
    assert_eq!(result["status"], "accepted");
    assert_eq!(t.cms.created_count(), 1);

    let eject = json!({"type": "eject_case", "body": {"case_id": case_id}});
    let result = dispatch(&t.engine, FeedCommand::parse(&eject.to_string()).unwrap())
        .await
        .unwrap();
    assert_eq!(result["status"], "ejected");

    let result = dispatch(
        &t.engine,
        FeedCommand::parse(r#"{"type":"retry_attachments"}"#).unwrap(),
    )
    .await
    .unwrap();
    assert_eq!(result["attached"], 0);
}

#[tokio::test]
async fn test_feed_surfaces_engine_errors() {
    let t = common::test_engine();
    let line = json!({"type": "begin_session", "body": {"case_id": Uuid::new_v4()}});
    let err = dispatch(&t.engine, FeedCommand::parse(&line.to_string()).unwrap())
        .await
        .unwrap_err();
    assert_eq!(err.kind, AppErrorKind::NotFound);
}

#[test]
fn test_sample_config_matches_defaults() {
    let config = load_config_from(workspace_file("intake.toml")).unwrap();
    assert_eq!(config, EngineConfig::default());
}

#[test]
fn test_sample_reference_data_loads() {
    let reference = StaticReferenceData::load(workspace_file("reference.toml")).unwrap();
    assert!(reference.offence("th68001").unwrap().is_some());
    assert!(reference.document_type("SJPN").unwrap().unwrap().court_document);
    assert!(reference.is_organisation_unit("GAFTL00").unwrap());
}

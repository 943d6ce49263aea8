use jsonschema::{Draft, JSONSchema};
use serde_json::json;
use std::path::PathBuf;

use tgstats::aggregate::{aggregate, AggregateConfig};
use tgstats::archive::RawArchive;
use tgstats::error::ArchiveError;
use tgstats::normalize::{normalize, NormalizerConfig};
use tgstats::progress::NoProgress;
use tgstats::report::Report;

fn sample_archive() -> serde_json::Value {
    json!({
        "about": "Here is the data you requested.",
        "personal_information": {
            "user_id": 1,
            "first_name": "Jane",
            "last_name": "Doe",
            "phone_number": "+1 555 0100"
        },
        "chats": {
            "about": "This page lists all chats from this export.",
            "list": [
                {
                    "name": "Bob",
                    "type": "personal_chat",
                    "id": 4001,
                    "messages": [
                        {"id": 1, "type": "message", "date": "2018-08-01T10:00:00", "from": "Bob Smith", "from_id": 4001, "text": "hi there"},
                        {"id": 2, "type": "message", "date": "2018-08-01T10:01:00", "from": "Jane Doe", "from_id": 1, "text": ["see ", {"type": "link", "text": "example.com"}]},
                        {"id": 3, "type": "message", "date": "2018-08-02T09:00:00", "from": "Bob Smith", "from_id": 4001, "text": "", "photo": "photos/photo_3.jpg", "width": 800, "height": 600},
                        {"id": 4, "type": "message", "date": "2018-08-01T11:00:00", "from": "Bob Smith", "from_id": 4001, "text": "ok"}
                    ]
                },
                {
                    "type": "personal_chat",
                    "id": 4002,
                    "messages": [
                        {"id": 5, "type": "message", "date": "2018-08-03T12:00:00", "from": null, "text": "..."},
                        {"id": 6, "type": "message", "date": "2018-08-03T12:05:00", "from": "Jane Doe", "text": "hello?"}
                    ]
                },
                {
                    "name": "Book club",
                    "type": "private_group",
                    "id": 4003,
                    "messages": [
                        {"id": 7, "type": "service", "date": "2018-07-01T08:00:00", "actor": "Jane Doe", "action": "create_group", "text": ""},
                        {"id": 8, "type": "message", "date": "2018-08-28T21:30:00", "from": "Carol", "text": "Chapter 3 tonight"},
                        {"id": 9, "type": "unsupported", "date": "2018-08-28T21:31:00", "text": ""}
                    ]
                }
            ]
        }
    })
}

fn write_archive(dir: &tempfile::TempDir, value: &serde_json::Value) -> PathBuf {
    let path = dir.path().join("result.json");
    std::fs::write(&path, serde_json::to_string_pretty(value).unwrap()).unwrap();
    path
}

fn load_schema() -> JSONSchema {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("report_schema.json");
    let schema: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    JSONSchema::options()
        .with_draft(Draft::Draft7)
        .compile(&schema)
        .expect("Failed to compile schema")
}

#[test]
fn test_archive_from_disk_to_report() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_archive(&dir, &sample_archive());

    let raw = RawArchive::load_from_file(&path).unwrap();
    let normalized = normalize(&raw, &NormalizerConfig::default(), &mut NoProgress).unwrap();
    let report = aggregate(&normalized, &AggregateConfig::default());

    assert_eq!(report.owner_name, "Jane Doe");
    assert_eq!(
        report.archive_as_of.map(|ts| ts.to_rfc3339()),
        Some("2018-08-28T21:31:00+00:00".to_string())
    );
    assert_eq!(report.default_filename("svg"), "tgstats-2018-08-28.svg");

    let names: Vec<_> = report.chats.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Bob Smith", "Deleted account 1", "Book club"]);

    let bob = &report.chats[0];
    assert_eq!(bob.count_messages_total, 4);
    assert_eq!(bob.count_messages_outgoing, 1);
    // Plain, non-media texts: "hi there" (8) and "ok" (2)
    assert_eq!(bob.median_message_length, 5.0);

    let club = &report.chats[2];
    assert_eq!(club.count_messages_total, 2);
    assert_eq!(club.count_messages_outgoing, 1);

    assert_eq!(report.global.count_messages_total, 8);
    assert_eq!(report.global.count_messages_outgoing, 3);
}

#[test]
fn test_report_matches_schema() {
    let raw: RawArchive = serde_json::from_value(sample_archive()).unwrap();
    let normalized = normalize(&raw, &NormalizerConfig::default(), &mut NoProgress).unwrap();
    let report = aggregate(
        &normalized,
        &AggregateConfig::default().with_timebuckets(true),
    );

    let schema = load_schema();
    let value = serde_json::to_value(&report).unwrap();
    if let Err(errors) = schema.validate(&value) {
        let messages: Vec<String> = errors.map(|e| e.to_string()).collect();
        panic!("Report failed schema validation: {:?}", messages);
    }

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(report.default_filename("json"));
    std::fs::write(&path, report.to_json().unwrap()).unwrap();
    let reloaded: Report = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(reloaded, report);
}

#[test]
fn test_reaggregation_without_reparsing() {
    let raw: RawArchive = serde_json::from_value(sample_archive()).unwrap();
    let normalized = normalize(&raw, &NormalizerConfig::default(), &mut NoProgress).unwrap();

    let top_one = aggregate(&normalized, &AggregateConfig::default().with_top_n(1));
    assert_eq!(top_one.chats.len(), 1);
    assert_eq!(top_one.global.count_messages_total, 8);

    let without_bob = aggregate(
        &normalized,
        &AggregateConfig::default().excluding(["Bob Smith"]),
    );
    assert_eq!(without_bob.chats.len(), 2);
    assert_eq!(without_bob.global.count_messages_total, 4);

    let everything_excluded = aggregate(
        &normalized,
        &AggregateConfig::default().excluding(["4001", "4002", "4003"]),
    );
    assert!(everything_excluded.chats.is_empty());
    assert_eq!(everything_excluded.global.count_messages_total, 0);
    assert!(!everything_excluded.warnings.is_empty());
}

#[test]
fn test_malformed_archive_aborts() {
    let mut archive = sample_archive();
    archive["chats"]["list"][2]["messages"][1]["date"] = json!("28/08/2018");
    let raw: RawArchive = serde_json::from_value(archive).unwrap();

    let err = normalize(&raw, &NormalizerConfig::default(), &mut NoProgress).unwrap_err();
    assert_eq!(
        err,
        ArchiveError::MalformedRecord {
            chat: "Book club".to_string(),
            index: 1,
            reason: "unparseable date '28/08/2018'".to_string(),
        }
    );
    assert!(err.to_string().contains("Book club"));
}

#[test]
fn test_load_reports_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = RawArchive::load_from_file(&dir.path().join("missing.json")).unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to read archive file"));
}

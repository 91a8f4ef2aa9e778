#![allow(missing_docs, clippy::expect_used, clippy::unwrap_used)]

mod common;

use common::{NOTE, notechunk_cmd, write_note};
use predicates::prelude::*;
use serde_json::Value;
use std::path::Path;
use tempfile::tempdir;

fn sync_json(dir: &Path, note: &Path, store: &Path) -> Value {
    sync_json_as(dir, note, store, "note-1")
}

fn sync_json_as(dir: &Path, note: &Path, store: &Path, original_id: &str) -> Value {
    let out = notechunk_cmd(dir)
        .args([
            "sync",
            note.to_str().unwrap(),
            "--original-id",
            original_id,
            "--store",
            store.to_str().unwrap(),
            "-f",
            "json",
        ])
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    serde_json::from_slice(&out.stdout).unwrap()
}

#[test]
fn sync_twice_is_a_noop_the_second_time() -> anyhow::Result<()> {
    let tmp = tempdir()?;
    let note = write_note(tmp.path(), "rust.md", NOTE);
    let store = tmp.path().join("index.json");

    let first = sync_json(tmp.path(), &note, &store);
    assert_eq!(first["summary"]["new"], 3);

    let records: Vec<Value> = serde_json::from_str(&std::fs::read_to_string(&store)?)?;
    assert_eq!(records.len(), 3);
    assert_eq!(records[0]["vector"].as_array().unwrap().len(), 8);

    let second = sync_json(tmp.path(), &note, &store);
    assert_eq!(second["summary"]["unchanged"], 3);
    assert_eq!(second["items"].as_array().unwrap().len(), 0);
    Ok(())
}

#[test]
fn sync_after_edit_modifies_pinned_chunk() -> anyhow::Result<()> {
    let tmp = tempdir()?;
    let note = write_note(tmp.path(), "rust.md", NOTE);
    let store = tmp.path().join("index.json");
    sync_json(tmp.path(), &note, &store);

    write_note(
        tmp.path(),
        "rust.md",
        &NOTE.replace("Pinned paragraph ^pin001", "Pinned paragraph, edited ^pin001"),
    );
    let report = sync_json(tmp.path(), &note, &store);

    assert_eq!(report["summary"]["modified"], 1);
    assert_eq!(report["summary"]["unchanged"], 2);
    assert_eq!(report["items"][0]["chunkId"], "^pin001");
    assert_eq!(report["items"][0]["outcome"]["status"], "applied");
    Ok(())
}

#[test]
fn padded_original_id_finds_its_baseline() -> anyhow::Result<()> {
    let tmp = tempdir()?;
    let note = write_note(tmp.path(), "rust.md", NOTE);
    let store = tmp.path().join("index.json");
    sync_json_as(tmp.path(), &note, &store, " note-1");

    write_note(
        tmp.path(),
        "rust.md",
        &NOTE.replace("Ownership rules everything.\n\n", ""),
    );
    let report = sync_json_as(tmp.path(), &note, &store, " note-1");

    assert_eq!(report["originalId"], "note-1");
    assert_eq!(report["summary"]["new"], 0);
    assert_eq!(report["summary"]["deleted"], 1);
    assert_eq!(report["summary"]["unchanged"], 2);
    let records: Vec<Value> = serde_json::from_str(&std::fs::read_to_string(&store)?)?;
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r["payload"]["originalId"] == "note-1"));
    Ok(())
}

#[test]
fn diff_against_saved_baseline() -> anyhow::Result<()> {
    let tmp = tempdir()?;
    let note = write_note(tmp.path(), "rust.md", NOTE);
    let baseline = tmp.path().join("baseline.json");
    std::fs::write(
        &baseline,
        r#"[{"chunkId": "^pin001", "storedContentHash": "stale", "storeRecordId": "r1"},
            {"chunkId": "gone", "storedContentHash": "x", "storeRecordId": "r2"}]"#,
    )?;

    let out = notechunk_cmd(tmp.path())
        .args([
            "diff",
            note.to_str().unwrap(),
            "--original-id",
            "note-1",
            "--baseline",
            baseline.to_str().unwrap(),
            "-f",
            "json",
        ])
        .output()?;

    assert!(out.status.success());
    let view: Value = serde_json::from_slice(&out.stdout)?;
    assert_eq!(view["statuses"]["^pin001"], "modified");
    assert_eq!(view["statuses"]["gone"], "deleted");
    assert_eq!(view["summary"]["new"], 2);
    assert_eq!(view["toUpsert"].as_array().unwrap().len(), 3);
    let deletes = view["toDeleteRecordIds"].as_array().unwrap();
    assert!(deletes.contains(&Value::from("r1")));
    assert!(deletes.contains(&Value::from("r2")));
    Ok(())
}

#[test]
fn purge_removes_document_records() -> anyhow::Result<()> {
    let tmp = tempdir()?;
    let note = write_note(tmp.path(), "rust.md", NOTE);
    let store = tmp.path().join("index.json");
    sync_json(tmp.path(), &note, &store);

    notechunk_cmd(tmp.path())
        .args(["purge", "--original-id", "note-1", "--store", store.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 3 record(s)"));

    let records: Vec<Value> = serde_json::from_str(&std::fs::read_to_string(&store)?)?;
    assert!(records.is_empty());
    Ok(())
}

#[test]
fn config_shows_effective_values() -> anyhow::Result<()> {
    let tmp = tempdir()?;

    notechunk_cmd(tmp.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("inter_call_delay_ms = 0"))
        .stdout(predicate::str::contains("max_chunks_soft = 50"));

    notechunk_cmd(tmp.path())
        .args(["config", "--path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
    Ok(())
}

#[test]
fn invalid_config_is_reported() -> anyhow::Result<()> {
    let tmp = tempdir()?;
    std::fs::write(
        tmp.path().join("config.toml"),
        "[chunking]\nlist_group_min = 9\nlist_group_max = 2\n",
    )?;

    notechunk_cmd(tmp.path())
        .arg("config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("list_group_min"));
    Ok(())
}

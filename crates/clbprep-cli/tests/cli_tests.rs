//! CLI integration tests using assert_cmd.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn clbprep() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("clbprep").unwrap()
}

const READING_REPLY: &str = r#"{"feedback":{"understanding":"Main ideas identified.","clarity":"Clear sentences.","languageUse":"Good agreement.","relevanceToPassage":"Stays on the passage."},"score":82,"suggestions":["Mention the registration options.","Use more connectors."]}"#;

/// Config using a canned mock provider, with speaking and writing offline.
fn write_config(dir: &Path) -> PathBuf {
    let path = dir.join("clbprep.toml");
    let config = format!(
        r#"
default_provider = "demo"
default_model = "mock-model"
offline = ["speaking", "writing"]

[providers.demo]
type = "mock"
response = '{READING_REPLY}'
"#
    );
    std::fs::write(&path, config).unwrap();
    path
}

fn write_json(dir: &Path, name: &str, json: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, json).unwrap();
    path
}

const READING_INPUT: &str = r#"{
  "passageText": "La ville offre des cours de français gratuits le soir.",
  "studentResponseText": "Les cours sont gratuits et ont lieu le soir."
}"#;

const WRITING_INPUT: &str = r#"{
  "promptText": "Écrivez à votre propriétaire.",
  "responseText": "Le chauffage ne marche plus depuis trois jours."
}"#;

#[test]
fn assess_reading_json() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());
    let input = write_json(dir.path(), "reading.json", READING_INPUT);

    clbprep()
        .args(["assess", "reading", "--format", "json", "--input"])
        .arg(&input)
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"score\": 82"))
        .stdout(predicate::str::contains("relevanceToPassage"));
}

#[test]
fn assess_writing_offline_text() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());
    let input = write_json(dir.path(), "writing.json", WRITING_INPUT);

    clbprep()
        .args(["assess", "writing", "--input"])
        .arg(&input)
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("writing assessment: 78/100"))
        .stdout(predicate::str::contains("Suggestions:"))
        .stderr(predicate::str::contains("offline"));
}

#[test]
fn assess_rejects_short_response() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());
    let input = write_json(
        dir.path(),
        "reading.json",
        r#"{"passageText":"Un texte.","studentResponseText":"Oui."}"#,
    );

    clbprep()
        .args(["assess", "reading", "--input"])
        .arg(&input)
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("studentResponseText"))
        .stderr(predicate::str::contains("submission is invalid"));
}

#[test]
fn assess_unknown_skill() {
    clbprep()
        .args(["assess", "grammar", "--input", "x.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown skill"));
}

#[test]
fn validate_valid_submission() {
    let dir = TempDir::new().unwrap();
    let input = write_json(dir.path(), "writing.json", WRITING_INPUT);

    clbprep()
        .args(["validate", "writing", "--input"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("valid writing submission"));
}

#[test]
fn validate_reports_field_errors() {
    let dir = TempDir::new().unwrap();
    let input = write_json(
        dir.path(),
        "listening.json",
        r#"{"transcriptText":"","studentResponseText":"court"}"#,
    );

    clbprep()
        .args(["validate", "listening", "--input"])
        .arg(&input)
        .assert()
        .failure()
        .stdout(predicate::str::contains("transcriptText"))
        .stdout(predicate::str::contains("studentResponseText"))
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn validate_names_missing_and_mistyped_fields() {
    let dir = TempDir::new().unwrap();
    let input = write_json(
        dir.path(),
        "writing.json",
        r#"{"promptText":"Décrivez votre ville.","responseText":12}"#,
    );

    clbprep()
        .args(["validate", "writing", "--input"])
        .arg(&input)
        .assert()
        .failure()
        .stdout(predicate::str::contains("responseText: must be a string"))
        .stderr(predicate::str::contains("1 field error(s) found"));

    let input = write_json(
        dir.path(),
        "reading.json",
        r#"{"passageText":"La bibliothèque ferme à vingt heures."}"#,
    );
    clbprep()
        .args(["validate", "reading", "--input"])
        .arg(&input)
        .assert()
        .failure()
        .stdout(predicate::str::contains("studentResponseText: is required"));
}

#[test]
fn validate_nonexistent_file() {
    clbprep()
        .args(["validate", "reading", "--input", "nonexistent.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read submission"));
}

#[test]
fn batch_writes_results() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());
    let subs = dir.path().join("subs");
    std::fs::create_dir(&subs).unwrap();
    write_json(&subs, "reading-01.json", READING_INPUT);
    write_json(&subs, "writing-01.json", WRITING_INPUT);
    write_json(&subs, "notes.json", "{}");
    let output = dir.path().join("results.json");

    clbprep()
        .arg("batch")
        .arg("--dir")
        .arg(&subs)
        .args(["--parallelism", "2"])
        .arg("--output")
        .arg(&output)
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("reading-01.json"))
        .stdout(predicate::str::contains("writing-01.json"))
        .stdout(predicate::str::contains("notes.json").not());

    let results: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    let entries = results.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["file"], "reading-01.json");
    assert_eq!(entries[0]["result"]["score"], 82);
    assert_eq!(entries[1]["result"]["score"], 78);
}

#[test]
fn batch_fails_when_a_submission_fails() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());
    let subs = dir.path().join("subs");
    std::fs::create_dir(&subs).unwrap();
    write_json(&subs, "reading-01.json", READING_INPUT);
    write_json(&subs, "reading-02.json", r#"{"passageText":"x"}"#);

    clbprep()
        .arg("batch")
        .arg("--dir")
        .arg(&subs)
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("1 submission(s) failed"));
}

#[test]
fn batch_empty_directory() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    clbprep()
        .arg("batch")
        .arg("--dir")
        .arg(dir.path())
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no <skill>-*.json submissions"));
}

#[test]
fn list_models_with_mock() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    clbprep()
        .arg("list-models")
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Provider: demo (default)"))
        .stdout(predicate::str::contains("mock-model"));
}

#[test]
fn config_rejects_offline_reading() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("clbprep.toml");
    std::fs::write(
        &config,
        r#"
default_provider = "demo"
offline = ["reading"]

[providers.demo]
type = "mock"
"#,
    )
    .unwrap();

    clbprep()
        .arg("list-models")
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot run offline"));
}

#[test]
fn init_creates_files() {
    let dir = TempDir::new().unwrap();

    clbprep()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created clbprep.toml"))
        .stdout(predicate::str::contains("reading-sample.json"));

    assert!(dir.path().join("clbprep.toml").exists());
    for skill in ["speaking", "writing", "reading", "listening"] {
        assert!(dir
            .path()
            .join(format!("submissions/{skill}-sample.json"))
            .exists());
    }
}

#[test]
fn init_samples_are_valid() {
    let dir = TempDir::new().unwrap();
    clbprep().current_dir(dir.path()).arg("init").assert().success();

    for skill in ["speaking", "writing", "reading", "listening"] {
        clbprep()
            .current_dir(dir.path())
            .args(["validate", skill, "--input"])
            .arg(format!("submissions/{skill}-sample.json"))
            .assert()
            .success();
    }
}

#[test]
fn init_skips_existing() {
    let dir = TempDir::new().unwrap();

    clbprep().current_dir(dir.path()).arg("init").assert().success();

    clbprep()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn help_output() {
    clbprep()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("TEF/TCF Canada"));
}

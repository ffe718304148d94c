//! The `clbprep batch` command.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use futures::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;
use tokio::sync::Semaphore;

use clbprep_core::{Assessor, Skill};
use clbprep_providers::build_assessor;
use clbprep_providers::config::load_config_from;

use crate::submission::{skill_from_file_name, Submission};

/// One line of the batch output file.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchEntry {
    file: String,
    skill: Skill,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Submission files in `dir` named `<skill>-*.json`, sorted by name.
fn collect_submissions(dir: &Path) -> Result<Vec<(PathBuf, Skill)>> {
    anyhow::ensure!(dir.is_dir(), "not a directory: {}", dir.display());

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        match skill_from_file_name(name) {
            Some(skill) => files.push((path.clone(), skill)),
            None if name.ends_with(".json") => {
                tracing::warn!("skipping {name}: expected <skill>-<name>.json");
            }
            None => {}
        }
    }
    files.sort();
    Ok(files)
}

async fn assess_file(assessor: &Assessor, path: &Path, skill: Skill) -> Result<serde_json::Value> {
    let submission = Submission::load(skill, path)?;
    let report = submission.assess(assessor).await?;
    Ok(report.json)
}

pub async fn execute(
    dir: PathBuf,
    parallelism: Option<usize>,
    output: Option<PathBuf>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let parallelism = parallelism.unwrap_or(config.parallelism);
    anyhow::ensure!(parallelism >= 1, "parallelism must be at least 1");

    let files = collect_submissions(&dir)?;
    anyhow::ensure!(
        !files.is_empty(),
        "no <skill>-*.json submissions found in {}",
        dir.display()
    );

    let assessor = Arc::new(build_assessor(&config)?);
    let semaphore = Arc::new(Semaphore::new(parallelism));
    let start = Instant::now();

    eprintln!(
        "Assessing {} submissions with {} (parallelism {parallelism})",
        files.len(),
        assessor.provider_name()
    );

    let mut futures = FuturesUnordered::new();
    for (path, skill) in files {
        let assessor = Arc::clone(&assessor);
        let semaphore = Arc::clone(&semaphore);
        futures.push(async move {
            let result = async {
                let _permit = semaphore
                    .clone()
                    .acquire_owned()
                    .await
                    .map_err(|_| anyhow::anyhow!("semaphore closed"))?;
                assess_file(&assessor, &path, skill).await
            }
            .await;
            (path, skill, result)
        });
    }

    let mut entries = Vec::new();
    let mut failed = 0usize;
    while let Some((path, skill, result)) = futures.next().await {
        let file = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match result {
            Ok(json) => {
                eprintln!("  Done: {file}");
                entries.push(BatchEntry {
                    file,
                    skill,
                    result: Some(json),
                    error: None,
                });
            }
            Err(e) => {
                tracing::error!("assessment failed for {file}: {e:#}");
                eprintln!("  ERROR: {file}: {e:#}");
                failed += 1;
                entries.push(BatchEntry {
                    file,
                    skill,
                    result: None,
                    error: Some(format!("{e:#}")),
                });
            }
        }
    }
    entries.sort_by(|a, b| a.file.cmp(&b.file));

    print_summary(&entries);
    eprintln!(
        "\nComplete: {}/{} succeeded, {failed} failed ({:.1}s)",
        entries.len() - failed,
        entries.len(),
        start.elapsed().as_secs_f64()
    );

    if let Some(path) = output {
        let json = serde_json::to_string_pretty(&entries)?;
        std::fs::write(&path, json)
            .with_context(|| format!("failed to write {}", path.display()))?;
        eprintln!("Results saved to: {}", path.display());
    }

    anyhow::ensure!(failed == 0, "{failed} submission(s) failed");
    Ok(())
}

fn print_summary(entries: &[BatchEntry]) {
    use comfy_table::{Cell, Table};

    let mut table = Table::new();
    table.set_header(vec!["File", "Skill", "Score", "Status"]);

    for entry in entries {
        let score = entry
            .result
            .as_ref()
            .and_then(|r| r.get("score"))
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());
        let status = match &entry.error {
            Some(_) => "failed",
            None => "ok",
        };
        table.add_row(vec![
            Cell::new(&entry.file),
            Cell::new(entry.skill),
            Cell::new(score),
            Cell::new(status),
        ]);
    }

    println!("{table}");
}

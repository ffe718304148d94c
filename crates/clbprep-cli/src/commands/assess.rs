//! The `clbprep assess` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use clbprep_core::{AssessmentError, Skill};
use clbprep_providers::build_assessor;
use clbprep_providers::config::load_config_from;

use crate::submission::{field_errors, format_field_errors, Submission};
use crate::OutputFormat;

pub async fn execute(
    skill: Skill,
    input: PathBuf,
    format: OutputFormat,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let submission = match Submission::load(skill, &input) {
        Ok(submission) => submission,
        Err(err) => return Err(reject(err)),
    };
    let assessor = build_assessor(&config)?;

    if assessor.is_offline(skill) {
        eprintln!("Using offline {skill} feedback (no model call).");
    } else {
        eprintln!(
            "Assessing {skill} with {} / {}...",
            assessor.provider_name(),
            assessor.config().model
        );
    }

    let report = match submission.assess(&assessor).await {
        Ok(report) => report,
        Err(e @ AssessmentError::Validation(_)) => return Err(reject(e.into())),
        Err(e) => return Err(e).context(format!("{skill} assessment failed")),
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report.json)?),
        OutputFormat::Text => print!("{}", report.text),
    }
    Ok(())
}

/// List a rejected submission's field errors on stderr.
fn reject(err: anyhow::Error) -> anyhow::Error {
    match field_errors(&err) {
        Some(errors) => {
            eprint!("{}", format_field_errors(errors));
            anyhow::anyhow!("submission is invalid")
        }
        None => err,
    }
}

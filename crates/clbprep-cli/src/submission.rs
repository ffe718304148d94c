//! Submission files and how their results are printed.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use clbprep_core::model::{ListeningInput, ReadingInput, SpeakingInput, WritingInput};
use clbprep_core::{Assessment, AssessmentError, Assessor, FromRaw, Skill, ValidationErrors};

/// One learner submission, typed by skill. Only checked submissions exist.
pub enum Submission {
    Speaking(SpeakingInput),
    Writing(WritingInput),
    Reading(ReadingInput),
    Listening(ListeningInput),
}

impl Submission {
    /// Check raw JSON as a `skill` submission; every field problem is
    /// reported by wire name.
    pub fn from_value(skill: Skill, raw: &serde_json::Value) -> Result<Self, ValidationErrors> {
        Ok(match skill {
            Skill::Speaking => Submission::Speaking(SpeakingInput::from_raw(raw)?),
            Skill::Writing => Submission::Writing(WritingInput::from_raw(raw)?),
            Skill::Reading => Submission::Reading(ReadingInput::from_raw(raw)?),
            Skill::Listening => Submission::Listening(ListeningInput::from_raw(raw)?),
        })
    }

    /// Field problems surface as [`AssessmentError::Validation`], see
    /// [`field_errors`].
    pub fn load(skill: Skill, path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read submission: {}", path.display()))?;
        let raw: serde_json::Value = serde_json::from_str(&content)
            .with_context(|| format!("{} is not valid JSON", path.display()))?;
        Self::from_value(skill, &raw)
            .map_err(AssessmentError::Validation)
            .with_context(|| format!("{} is not a valid {skill} submission", path.display()))
    }

    pub async fn assess(self, assessor: &Assessor) -> Result<Report, AssessmentError> {
        match self {
            Submission::Speaking(i) => Report::build(&assessor.assess_speaking(i).await?),
            Submission::Writing(i) => Report::build(&assessor.assess_writing(i).await?),
            Submission::Reading(i) => Report::build(&assessor.assess_reading(i).await?),
            Submission::Listening(i) => Report::build(&assessor.assess_listening(i).await?),
        }
    }
}

/// A finished assessment, kept both as wire JSON and as printable text.
pub struct Report {
    pub json: serde_json::Value,
    pub text: String,
}

impl Report {
    fn build<A: Assessment + Serialize>(assessment: &A) -> Result<Self, AssessmentError> {
        let json = serde_json::to_value(assessment)
            .map_err(|e| AssessmentError::ModelOutputInvalid(e.to_string()))?;
        Ok(Self {
            json,
            text: render_text(assessment),
        })
    }
}

/// Text output lists at most this many suggestions; JSON keeps them all.
const MAX_SHOWN_SUGGESTIONS: usize = 5;

fn render_text<A: Assessment>(assessment: &A) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} assessment: {}/100",
        assessment.skill(),
        assessment.score()
    );
    if let Some(transcription) = assessment.transcription() {
        let _ = writeln!(out, "\nTranscription:\n  {transcription}");
    }
    let _ = writeln!(out, "\nFeedback:");
    for (name, text) in assessment.feedback_dimensions() {
        let _ = writeln!(out, "  {name}: {text}");
    }
    let _ = writeln!(out, "\nSuggestions:");
    for suggestion in assessment.suggestions().iter().take(MAX_SHOWN_SUGGESTIONS) {
        let _ = writeln!(out, "  - {suggestion}");
    }
    out
}

/// The field-keyed messages behind a rejected submission, if that is what
/// `error` is.
pub fn field_errors(error: &anyhow::Error) -> Option<&ValidationErrors> {
    error
        .downcast_ref::<AssessmentError>()
        .and_then(AssessmentError::field_errors)
}

/// Field errors as indented `field: message` lines.
pub fn format_field_errors(errors: &ValidationErrors) -> String {
    let mut out = String::new();
    for (field, messages) in errors.fields() {
        for message in messages {
            let _ = writeln!(out, "  {field}: {message}");
        }
    }
    out
}

/// Skill named by a batch file's prefix, e.g. `reading-01.json`.
pub fn skill_from_file_name(name: &str) -> Option<Skill> {
    let stem = name.strip_suffix(".json")?;
    let (prefix, rest) = stem.split_once('-')?;
    if rest.is_empty() {
        return None;
    }
    prefix.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_file_names() {
        assert_eq!(skill_from_file_name("reading-01.json"), Some(Skill::Reading));
        assert_eq!(
            skill_from_file_name("writing-lettre-formelle.json"),
            Some(Skill::Writing)
        );
        assert_eq!(skill_from_file_name("reading.json"), None);
        assert_eq!(skill_from_file_name("reading-.json"), None);
        assert_eq!(skill_from_file_name("notes-01.json"), None);
        assert_eq!(skill_from_file_name("reading-01.txt"), None);
    }

    #[test]
    fn submission_is_typed_by_skill() {
        let raw = serde_json::json!({
            "promptText": "Décrivez votre ville.",
            "responseText": "J'habite à Montréal depuis trois ans."
        });
        assert!(matches!(
            Submission::from_value(Skill::Writing, &raw),
            Ok(Submission::Writing(_))
        ));
        let errors = Submission::from_value(Skill::Reading, &raw).err().unwrap();
        assert!(errors.field("passageText").is_some());
    }

    #[test]
    fn missing_field_is_kept_through_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("writing-01.json");
        std::fs::write(&path, r#"{"promptText":"Décrivez votre ville."}"#).unwrap();

        let err = Submission::load(Skill::Writing, &path).err().unwrap();
        let errors = field_errors(&err).unwrap();
        assert_eq!(errors.field("responseText").unwrap(), ["is required"]);
        assert!(format!("{err:#}").contains("responseText: is required"));
    }

    #[test]
    fn malformed_json_is_not_a_field_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reading-01.json");
        std::fs::write(&path, "{ pas du json").unwrap();

        let err = Submission::load(Skill::Reading, &path).err().unwrap();
        assert!(field_errors(&err).is_none());
        assert!(err.to_string().contains("is not valid JSON"));
    }
}

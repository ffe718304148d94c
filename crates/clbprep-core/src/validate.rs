//! Input validation for assessment submissions.
//!
//! Validation runs before any prompt is rendered. It is a pure function of
//! the input: the same submission always yields the same outcome and the same
//! error map.

use serde_json::{Map, Value};

use crate::error::ValidationErrors;
use crate::model::{ListeningInput, ReadingInput, SpeakingInput, WritingInput};

/// Minimum length of any free-text learner response, in characters.
///
/// Applies to writing, reading and listening alike.
pub const MIN_RESPONSE_CHARS: usize = 10;

/// Types that can check themselves before being sent to a model.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationErrors>;
}

/// Field reader over an untyped submission that records, rather than stops
/// at, missing and wrongly-typed fields.
pub struct RawFields<'a> {
    object: Option<&'a Map<String, Value>>,
    errors: ValidationErrors,
}

impl<'a> RawFields<'a> {
    fn new(value: &'a Value) -> Self {
        let mut errors = ValidationErrors::new();
        let object = value.as_object();
        if object.is_none() {
            errors.add("submission", "must be a JSON object");
        }
        Self { object, errors }
    }

    /// A string field that must be present. Missing or wrongly-typed values
    /// read as empty so the typed checks can still run.
    pub fn required(&mut self, field: &str) -> String {
        match self.object.and_then(|o| o.get(field)) {
            Some(Value::String(text)) => text.clone(),
            None | Some(Value::Null) => {
                self.errors.add(field, "is required");
                String::new()
            }
            Some(_) => {
                self.errors.add(field, "must be a string");
                String::new()
            }
        }
    }

    /// A string field that may be absent or null.
    pub fn optional(&mut self, field: &str) -> Option<String> {
        match self.object.and_then(|o| o.get(field)) {
            Some(Value::String(text)) => Some(text.clone()),
            None | Some(Value::Null) => None,
            Some(_) => {
                self.errors.add(field, "must be a string");
                None
            }
        }
    }
}

/// Request types that can be read from untyped JSON, such as a posted form.
pub trait FromRaw: Validate + Sized {
    fn read(fields: &mut RawFields<'_>) -> Self;

    /// Read and check a raw submission. Every missing, wrongly-typed or
    /// out-of-bounds field is reported at once under its wire name; a field
    /// reported as missing is not also reported as empty.
    fn from_raw(value: &Value) -> Result<Self, ValidationErrors> {
        let mut fields = RawFields::new(value);
        if fields.object.is_none() {
            return Err(fields.errors);
        }
        let request = Self::read(&mut fields);
        let mut errors = fields.errors;
        if let Err(constraints) = request.validate() {
            for (field, messages) in constraints.fields() {
                if errors.field(field).is_none() {
                    for message in messages {
                        errors.add(field, message.as_str());
                    }
                }
            }
        }
        errors.into_result().map(|()| request)
    }
}

impl FromRaw for SpeakingInput {
    fn read(fields: &mut RawFields<'_>) -> Self {
        SpeakingInput {
            audio_data_uri: fields.required("audioDataUri"),
            prompt_text: fields.required("promptText"),
        }
    }
}

impl FromRaw for WritingInput {
    fn read(fields: &mut RawFields<'_>) -> Self {
        WritingInput {
            prompt_text: fields.required("promptText"),
            response_text: fields.required("responseText"),
        }
    }
}

impl FromRaw for ReadingInput {
    fn read(fields: &mut RawFields<'_>) -> Self {
        ReadingInput {
            passage_text: fields.required("passageText"),
            student_response_text: fields.required("studentResponseText"),
            section: fields.optional("section"),
            difficulty: fields.optional("difficulty"),
        }
    }
}

impl FromRaw for ListeningInput {
    fn read(fields: &mut RawFields<'_>) -> Self {
        ListeningInput {
            transcript_text: fields.required("transcriptText"),
            student_response_text: fields.required("studentResponseText"),
        }
    }
}

fn require_non_empty(errors: &mut ValidationErrors, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.add(field, "must not be empty");
    }
}

fn require_min_chars(errors: &mut ValidationErrors, field: &str, value: &str, min: usize) {
    let len = value.trim().chars().count();
    if len < min {
        errors.add(
            field,
            format!("must be at least {min} characters (got {len})"),
        );
    }
}

/// A URI-like reference: a scheme of ASCII letters followed by `:` and
/// something after it (`data:audio/webm;base64,...`, `https://...`).
fn looks_like_uri(value: &str) -> bool {
    let Some((scheme, rest)) = value.trim().split_once(':') else {
        return false;
    };
    !scheme.is_empty()
        && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        && !rest.is_empty()
}

impl Validate for SpeakingInput {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.audio_data_uri.trim().is_empty() {
            errors.add("audioDataUri", "must not be empty");
        } else if !looks_like_uri(&self.audio_data_uri) {
            errors.add(
                "audioDataUri",
                "must be a URI such as data:audio/webm;base64,...",
            );
        }
        require_non_empty(&mut errors, "promptText", &self.prompt_text);
        errors.into_result()
    }
}

impl Validate for WritingInput {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        require_non_empty(&mut errors, "promptText", &self.prompt_text);
        require_min_chars(
            &mut errors,
            "responseText",
            &self.response_text,
            MIN_RESPONSE_CHARS,
        );
        errors.into_result()
    }
}

impl Validate for ReadingInput {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        require_non_empty(&mut errors, "passageText", &self.passage_text);
        require_min_chars(
            &mut errors,
            "studentResponseText",
            &self.student_response_text,
            MIN_RESPONSE_CHARS,
        );
        errors.into_result()
    }
}

impl Validate for ListeningInput {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        require_non_empty(&mut errors, "transcriptText", &self.transcript_text);
        require_min_chars(
            &mut errors,
            "studentResponseText",
            &self.student_response_text,
            MIN_RESPONSE_CHARS,
        );
        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(response: &str) -> ReadingInput {
        ReadingInput {
            passage_text: "Le télétravail change nos habitudes.".into(),
            student_response_text: response.into(),
            section: None,
            difficulty: None,
        }
    }

    #[test]
    fn short_responses_rejected_for_every_text_skill() {
        let writing = WritingInput {
            prompt_text: "Décrivez votre ville.".into(),
            response_text: "Trop court".chars().take(9).collect(),
        };
        let errors = writing.validate().unwrap_err();
        assert!(errors.field("responseText").is_some());

        let errors = reading("court").validate().unwrap_err();
        assert!(errors.field("studentResponseText").is_some());

        let listening = ListeningInput {
            transcript_text: "Bonjour à tous.".into(),
            student_response_text: "   oui    ".into(),
        };
        let errors = listening.validate().unwrap_err();
        assert!(errors.field("studentResponseText").is_some());
    }

    #[test]
    fn ten_characters_is_enough() {
        assert!(reading("abcdefghij").validate().is_ok());
        // Accented characters count once each.
        assert!(reading("éèêëàâäôöû").validate().is_ok());
    }

    #[test]
    fn speaking_requires_uri_and_prompt() {
        let input = SpeakingInput {
            audio_data_uri: "not a uri".into(),
            prompt_text: " ".into(),
        };
        let errors = input.validate().unwrap_err();
        assert_eq!(errors.fields().len(), 2);
        assert!(errors.field("audioDataUri").is_some());
        assert!(errors.field("promptText").is_some());

        let input = SpeakingInput {
            audio_data_uri: "data:audio/webm;base64,GkXfo59ChoEBQveBAULygQRC".into(),
            prompt_text: "Présentez-vous.".into(),
        };
        assert!(input.validate().is_ok());
    }

    #[test]
    fn uri_detection() {
        assert!(looks_like_uri("https://cdn.example.com/a.mp3"));
        assert!(looks_like_uri("data:audio/wav;base64,AAAA"));
        assert!(!looks_like_uri("recording.mp3"));
        assert!(!looks_like_uri(":nothing"));
        assert!(!looks_like_uri("data:"));
        assert!(!looks_like_uri("1abc:foo"));
    }

    #[test]
    fn validation_is_idempotent() {
        let inputs = [reading(""), reading("court"), reading("Une réponse complète.")];
        for input in &inputs {
            assert_eq!(input.validate(), input.validate());
        }
    }

    #[test]
    fn empty_passage_and_short_response_reported_together() {
        let input = ReadingInput {
            passage_text: String::new(),
            student_response_text: "non".into(),
            section: Some("A".into()),
            difficulty: None,
        };
        let errors = input.validate().unwrap_err();
        assert_eq!(errors.field("passageText").unwrap(), ["must not be empty"]);
        assert_eq!(
            errors.field("studentResponseText").unwrap(),
            ["must be at least 10 characters (got 3)"]
        );
    }

    #[test]
    fn missing_field_is_reported_by_name() {
        let raw = serde_json::json!({"promptText": "Décrivez votre ville."});
        let errors = WritingInput::from_raw(&raw).unwrap_err();
        assert_eq!(errors.field("responseText").unwrap(), ["is required"]);
        assert!(errors.field("promptText").is_none());
    }

    #[test]
    fn wrong_types_and_constraints_reported_together() {
        let raw = serde_json::json!({
            "passageText": 42,
            "studentResponseText": "non",
            "section": ["A"]
        });
        let errors = ReadingInput::from_raw(&raw).unwrap_err();
        assert_eq!(errors.field("passageText").unwrap(), ["must be a string"]);
        assert_eq!(errors.field("section").unwrap(), ["must be a string"]);
        assert_eq!(
            errors.field("studentResponseText").unwrap(),
            ["must be at least 10 characters (got 3)"]
        );
    }

    #[test]
    fn raw_submission_must_be_an_object() {
        let errors = ListeningInput::from_raw(&serde_json::json!("bonjour")).unwrap_err();
        assert_eq!(errors.fields().len(), 1);
        assert!(errors.field("submission").is_some());
    }

    #[test]
    fn well_formed_raw_submission_is_typed() {
        let raw = serde_json::json!({
            "audioDataUri": "data:audio/webm;base64,GkXf",
            "promptText": "Présentez-vous.",
            "extra": true
        });
        let input = SpeakingInput::from_raw(&raw).unwrap();
        assert_eq!(input.prompt_text, "Présentez-vous.");

        let raw = serde_json::json!({
            "passageText": "La bibliothèque ferme à vingt heures.",
            "studentResponseText": "Elle ferme à huit heures du soir.",
            "difficulty": null
        });
        let input = ReadingInput::from_raw(&raw).unwrap();
        assert_eq!(input.difficulty, None);
    }
}

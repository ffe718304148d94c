//! Per-skill flow definitions.
//!
//! A flow ties a request type to its template, its prompt bindings, its
//! result type and (for speaking and writing) its offline fixture. The
//! orchestration itself lives in [`crate::assessor`].

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::fixtures::{speaking_fixture, writing_fixture};
use crate::model::{
    Assessment, ListeningAssessment, ListeningInput, ReadingAssessment, ReadingInput, Skill,
    SpeakingAssessment, SpeakingInput, WritingAssessment, WritingInput,
};
use crate::prompt::{
    PromptTemplate, LISTENING_TEMPLATE, READING_TEMPLATE, SPEAKING_TEMPLATE, UNSPECIFIED,
    WRITING_TEMPLATE,
};
use crate::traits::MediaPart;
use crate::validate::Validate;

/// A validated-request type that knows how to become a prompt.
pub trait AssessmentFlow: Validate + Send + Sync {
    type Output: Assessment + Serialize + DeserializeOwned + Send;

    const SKILL: Skill;
    const TEMPLATE: PromptTemplate;

    /// Values for the template's placeholders.
    fn bindings(&self) -> Vec<(&'static str, String)>;

    /// Media the model needs alongside the prompt.
    fn media(&self) -> Vec<MediaPart> {
        Vec::new()
    }

    /// Canned result for offline mode, if the skill has one.
    fn offline_fixture() -> Option<Self::Output> {
        None
    }
}

/// Whether `skill` can be configured to run offline.
pub fn has_offline_fixture(skill: Skill) -> bool {
    match skill {
        Skill::Speaking => SpeakingInput::offline_fixture().is_some(),
        Skill::Writing => WritingInput::offline_fixture().is_some(),
        Skill::Reading => ReadingInput::offline_fixture().is_some(),
        Skill::Listening => ListeningInput::offline_fixture().is_some(),
    }
}

impl AssessmentFlow for SpeakingInput {
    type Output = SpeakingAssessment;

    const SKILL: Skill = Skill::Speaking;
    const TEMPLATE: PromptTemplate = SPEAKING_TEMPLATE;

    fn bindings(&self) -> Vec<(&'static str, String)> {
        vec![
            ("audio", MediaPart::from_uri(self.audio_data_uri.trim()).describe()),
            ("promptText", self.prompt_text.trim().to_string()),
        ]
    }

    fn media(&self) -> Vec<MediaPart> {
        vec![MediaPart::from_uri(self.audio_data_uri.trim())]
    }

    fn offline_fixture() -> Option<Self::Output> {
        Some(speaking_fixture())
    }
}

impl AssessmentFlow for WritingInput {
    type Output = WritingAssessment;

    const SKILL: Skill = Skill::Writing;
    const TEMPLATE: PromptTemplate = WRITING_TEMPLATE;

    fn bindings(&self) -> Vec<(&'static str, String)> {
        vec![
            ("promptText", self.prompt_text.trim().to_string()),
            ("responseText", self.response_text.trim().to_string()),
        ]
    }

    fn offline_fixture() -> Option<Self::Output> {
        Some(writing_fixture())
    }
}

impl AssessmentFlow for ReadingInput {
    type Output = ReadingAssessment;

    const SKILL: Skill = Skill::Reading;
    const TEMPLATE: PromptTemplate = READING_TEMPLATE;

    fn bindings(&self) -> Vec<(&'static str, String)> {
        let or_unspecified = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or(UNSPECIFIED)
                .to_string()
        };
        vec![
            ("section", or_unspecified(&self.section)),
            ("difficulty", or_unspecified(&self.difficulty)),
            ("passageText", self.passage_text.trim().to_string()),
            (
                "studentResponseText",
                self.student_response_text.trim().to_string(),
            ),
        ]
    }
}

impl AssessmentFlow for ListeningInput {
    type Output = ListeningAssessment;

    const SKILL: Skill = Skill::Listening;
    const TEMPLATE: PromptTemplate = LISTENING_TEMPLATE;

    fn bindings(&self) -> Vec<(&'static str, String)> {
        vec![
            ("transcriptText", self.transcript_text.trim().to_string()),
            (
                "studentResponseText",
                self.student_response_text.trim().to_string(),
            ),
        ]
    }
}

/// Render a request's prompt from its template.
pub fn render_prompt<F: AssessmentFlow>(
    request: &F,
) -> Result<String, crate::error::TemplateError> {
    let bindings = request.bindings();
    let refs: Vec<(&str, &str)> = bindings.iter().map(|(k, v)| (*k, v.as_str())).collect();
    F::TEMPLATE.render(&refs)
}

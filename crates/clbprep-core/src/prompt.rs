//! Prompt templates for the assessment flows.
//!
//! Each skill owns one static template with `{{name}}` slots. Rendering is a
//! straight substitution: no conditionals, no loops, and every slot must be
//! bound.

use crate::error::TemplateError;

/// A static prompt with named `{{placeholder}}` slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptTemplate {
    pub name: &'static str,
    pub text: &'static str,
}

impl PromptTemplate {
    pub const fn new(name: &'static str, text: &'static str) -> Self {
        Self { name, text }
    }

    /// Placeholder names in order of first appearance.
    pub fn placeholders(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        let mut rest = self.text;
        while let Some(start) = rest.find("{{") {
            let after = &rest[start + 2..];
            let Some(end) = after.find("}}") else { break };
            let name = after[..end].trim();
            if !names.contains(&name) {
                names.push(name);
            }
            rest = &after[end + 2..];
        }
        names
    }

    /// Substitute every slot from `bindings`.
    pub fn render(&self, bindings: &[(&str, &str)]) -> Result<String, TemplateError> {
        let mut out = String::with_capacity(self.text.len() + 256);
        let mut rest = self.text;
        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let end = after.find("}}").ok_or(TemplateError::Unterminated {
                template: self.name,
            })?;
            let name = after[..end].trim();
            let value = bindings
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| *value)
                .ok_or_else(|| TemplateError::MissingBinding {
                    template: self.name,
                    placeholder: name.to_string(),
                })?;
            out.push_str(value);
            rest = &after[end + 2..];
        }
        out.push_str(rest);
        Ok(out)
    }
}

pub const SPEAKING_TEMPLATE: PromptTemplate = PromptTemplate::new(
    "speaking",
    r#"A learner preparing for a French proficiency exam recorded an answer to the oral prompt below. The recording is attached ({{audio}}).

Oral prompt:
"""
{{promptText}}
"""

1. Transcribe what the learner said, in French, exactly as spoken.
2. Give feedback on fluency, pronunciation, grammar, vocabulary and coherence. Each dimension gets two or three sentences that name concrete strengths and errors.
3. Give an overall score from 0 to 100, where 70 corresponds roughly to CLB 7.
4. List specific, actionable suggestions for improvement, most important first.
"#,
);

pub const WRITING_TEMPLATE: PromptTemplate = PromptTemplate::new(
    "writing",
    r#"A learner preparing for a French proficiency exam wrote the answer below to a writing task.

Writing task:
"""
{{promptText}}
"""

Learner's answer:
"""
{{responseText}}
"""

Assess the answer on grammar, vocabulary, structure, coherence and task achievement (does the answer do what the task asked, in the expected register and length?). Each dimension gets two or three sentences that quote concrete examples from the answer.
Give an overall score from 0 to 100, where 70 corresponds roughly to CLB 7, and list specific suggestions for improvement, most important first.
"#,
);

pub const READING_TEMPLATE: PromptTemplate = PromptTemplate::new(
    "reading",
    r#"A learner preparing for a French proficiency exam read the passage below and wrote a response showing what they understood.

Exam section: {{section}}
Difficulty: {{difficulty}}

Passage:
"""
{{passageText}}
"""

Learner's response:
"""
{{studentResponseText}}
"""

Evaluate:
- understanding: did the learner grasp the main idea and the key details?
- clarity: is the response clear and well organised?
- languageUse: accuracy and range of the learner's French.
- relevanceToPassage: does the response stay on the passage rather than general knowledge?
Give an overall score from 0 to 100 and list specific suggestions for improvement, most important first.
"#,
);

pub const LISTENING_TEMPLATE: PromptTemplate = PromptTemplate::new(
    "listening",
    r#"A learner preparing for a French proficiency exam listened to an audio clip and wrote a response about it. The clip's transcript is below; the learner did not see it.

Transcript:
"""
{{transcriptText}}
"""

Learner's response:
"""
{{studentResponseText}}
"""

Evaluate:
- comprehension: did the learner understand the main message and the speaker's intent?
- accuracy: are the details the learner reports correct with respect to the transcript?
- languageUse: accuracy and range of the learner's French.
- relevanceToAudio: does the response stay on what was actually said?
Give an overall score from 0 to 100 and list specific suggestions for improvement, most important first.
"#,
);

/// Rendered in place of absent optional metadata.
pub const UNSPECIFIED: &str = "unspecified";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_substitutes_all_slots() {
        let t = PromptTemplate::new("t", "Bonjour {{name}}, {{ greeting }}!");
        let out = t
            .render(&[("name", "Amélie"), ("greeting", "ça va")])
            .unwrap();
        assert_eq!(out, "Bonjour Amélie, ça va!");
    }

    #[test]
    fn render_reports_missing_binding() {
        let t = PromptTemplate::new("t", "{{a}} {{b}}");
        let err = t.render(&[("a", "x")]).unwrap_err();
        assert_eq!(
            err,
            TemplateError::MissingBinding {
                template: "t",
                placeholder: "b".into()
            }
        );
    }

    #[test]
    fn render_reports_unterminated_slot() {
        let t = PromptTemplate::new("t", "{{a}} {{b");
        assert!(matches!(
            t.render(&[("a", "x"), ("b", "y")]),
            Err(TemplateError::Unterminated { .. })
        ));
    }

    #[test]
    fn substituted_values_are_not_re_expanded() {
        let t = PromptTemplate::new("t", "[{{a}}]");
        assert_eq!(t.render(&[("a", "{{a}}")]).unwrap(), "[{{a}}]");
    }

    #[test]
    fn skill_templates_declare_expected_slots() {
        assert_eq!(SPEAKING_TEMPLATE.placeholders(), ["audio", "promptText"]);
        assert_eq!(WRITING_TEMPLATE.placeholders(), ["promptText", "responseText"]);
        assert_eq!(
            READING_TEMPLATE.placeholders(),
            ["section", "difficulty", "passageText", "studentResponseText"]
        );
        assert_eq!(
            LISTENING_TEMPLATE.placeholders(),
            ["transcriptText", "studentResponseText"]
        );
    }
}

//! Output schemas and structured-output extraction.
//!
//! The schemas are handed to the generation service as a contract; the
//! replies are then pulled out of whatever wrapping the model added and
//! checked against the same shape on our side.

use serde_json::{json, Map, Value};

use crate::model::Skill;
use crate::traits::OutputSchema;

fn text_properties(names: &[&str]) -> Value {
    let mut props = Map::new();
    for name in names {
        props.insert(
            (*name).to_string(),
            json!({ "type": "string", "minLength": 1 }),
        );
    }
    Value::Object(props)
}

fn feedback_schema(dimensions: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": text_properties(dimensions),
        "required": dimensions,
        "additionalProperties": false
    })
}

/// Feedback dimension names for a skill, in wire form.
pub fn feedback_dimensions(skill: Skill) -> &'static [&'static str] {
    match skill {
        Skill::Speaking => &[
            "fluency",
            "pronunciation",
            "grammar",
            "vocabulary",
            "coherence",
        ],
        Skill::Writing => &[
            "grammar",
            "vocabulary",
            "structure",
            "coherence",
            "taskAchievement",
        ],
        Skill::Reading => &["understanding", "clarity", "languageUse", "relevanceToPassage"],
        Skill::Listening => &["comprehension", "accuracy", "languageUse", "relevanceToAudio"],
    }
}

/// JSON schema for a skill's assessment result.
pub fn output_schema(skill: Skill) -> OutputSchema {
    let mut properties = Map::new();
    let mut required = Vec::new();

    if skill == Skill::Speaking {
        properties.insert(
            "transcription".into(),
            json!({
                "type": "string",
                "minLength": 1,
                "description": "Verbatim French transcription of the recording."
            }),
        );
        required.push("transcription");
    }
    properties.insert("feedback".into(), feedback_schema(feedback_dimensions(skill)));
    properties.insert(
        "score".into(),
        json!({ "type": "integer", "minimum": 0, "maximum": 100 }),
    );
    properties.insert(
        "suggestions".into(),
        json!({ "type": "array", "items": { "type": "string" }, "minItems": 1 }),
    );
    required.extend(["feedback", "score", "suggestions"]);

    OutputSchema {
        name: format!("{skill}_assessment"),
        schema: json!({
            "type": "object",
            "properties": Value::Object(properties),
            "required": required,
            "additionalProperties": false
        }),
    }
}

/// Pull a JSON object out of a model reply.
///
/// Handles, in order:
/// - a bare JSON object
/// - a ```json (or generic ```) fenced block, closed or truncated
/// - the outermost `{ ... }` span embedded in prose
///
/// Returns `None` when no candidate parses as a JSON object.
pub fn extract_json_object(response: &str) -> Option<Value> {
    let trimmed = response.trim();
    if trimmed.is_empty() {
        return None;
    }

    let mut candidates: Vec<String> = vec![trimmed.to_string()];
    candidates.extend(fenced_blocks(trimmed));
    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            candidates.push(trimmed[start..=end].to_string());
        }
    }

    candidates
        .iter()
        .filter_map(|c| serde_json::from_str::<Value>(c.trim()).ok())
        .find(Value::is_object)
}

/// Contents of ```json and generic ``` blocks, json-tagged blocks first.
fn fenced_blocks(response: &str) -> Vec<String> {
    let mut json_blocks = Vec::new();
    let mut generic_blocks = Vec::new();
    let mut in_block = false;
    let mut is_json_block = false;
    let mut current_block = String::new();

    for line in response.lines() {
        let trimmed = line.trim();

        if !in_block && trimmed.starts_with("```") {
            in_block = true;
            let lang = trimmed.trim_start_matches('`').trim().to_lowercase();
            is_json_block = lang == "json";
            current_block.clear();
            continue;
        }

        if in_block && trimmed == "```" {
            in_block = false;
            let block = std::mem::take(&mut current_block);
            if is_json_block {
                json_blocks.push(block);
            } else {
                generic_blocks.push(block);
            }
            continue;
        }

        if in_block {
            if !current_block.is_empty() {
                current_block.push('\n');
            }
            current_block.push_str(line);
        }
    }

    // Truncated replies: keep what was accumulated
    if in_block && !current_block.is_empty() {
        if is_json_block {
            json_blocks.push(current_block);
        } else {
            generic_blocks.push(current_block);
        }
    }

    json_blocks.extend(generic_blocks);
    json_blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_object() {
        let v = extract_json_object(r#"{"score": 70}"#).unwrap();
        assert_eq!(v["score"], 70);
    }

    #[test]
    fn fenced_json_block_with_prose() {
        let input = "Voici l'évaluation :\n\n```json\n{\"score\": 64}\n```\n\nBon courage !";
        let v = extract_json_object(input).unwrap();
        assert_eq!(v["score"], 64);
    }

    #[test]
    fn prefers_json_block_over_generic() {
        let input = "```\n{\"score\": 1}\n```\n```json\n{\"score\": 2}\n```";
        assert_eq!(extract_json_object(input).unwrap()["score"], 2);
    }

    #[test]
    fn embedded_object_without_fence() {
        let input = "Sure! {\"score\": 55, \"suggestions\": []} Hope this helps.";
        assert_eq!(extract_json_object(input).unwrap()["score"], 55);
    }

    #[test]
    fn nothing_parseable() {
        assert!(extract_json_object("").is_none());
        assert!(extract_json_object("   \n ").is_none());
        assert!(extract_json_object("I cannot assess this recording.").is_none());
        assert!(extract_json_object("[1, 2, 3]").is_none());
        assert!(extract_json_object("```json\n{\"score\": \n").is_none());
    }

    #[test]
    fn schema_requires_every_dimension() {
        for skill in Skill::ALL {
            let schema = output_schema(skill);
            let feedback = &schema.schema["properties"]["feedback"];
            let required: Vec<&str> = feedback["required"]
                .as_array()
                .unwrap()
                .iter()
                .map(|v| v.as_str().unwrap())
                .collect();
            assert_eq!(required, feedback_dimensions(skill));
            assert_eq!(
                schema.schema["properties"]["transcription"].is_object(),
                skill == Skill::Speaking
            );
        }
        let speaking = output_schema(Skill::Speaking);
        assert_eq!(
            speaking.schema["properties"]["transcription"]["minLength"],
            1
        );
    }
}

//! Request and result types for the four assessment skills.
//!
//! Wire names are camelCase so the same JSON a web form posts can be fed
//! straight into the pipeline.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

/// The language skill being assessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Skill {
    Speaking,
    Writing,
    Reading,
    Listening,
}

impl Skill {
    pub const ALL: [Skill; 4] = [
        Skill::Speaking,
        Skill::Writing,
        Skill::Reading,
        Skill::Listening,
    ];
}

impl fmt::Display for Skill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Skill::Speaking => write!(f, "speaking"),
            Skill::Writing => write!(f, "writing"),
            Skill::Reading => write!(f, "reading"),
            Skill::Listening => write!(f, "listening"),
        }
    }
}

impl FromStr for Skill {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "speaking" | "oral" => Ok(Skill::Speaking),
            "writing" | "written" => Ok(Skill::Writing),
            "reading" => Ok(Skill::Reading),
            "listening" => Ok(Skill::Listening),
            other => Err(format!("unknown skill: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// A recorded spoken answer to an oral prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeakingInput {
    /// Reference to the recording, usually a `data:audio/...;base64,` URI.
    pub audio_data_uri: String,
    /// The oral prompt the learner answered.
    pub prompt_text: String,
}

/// A written answer to a writing task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WritingInput {
    pub prompt_text: String,
    pub response_text: String,
}

/// A learner's written response to a reading passage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingInput {
    pub passage_text: String,
    pub student_response_text: String,
    /// Exam section the passage belongs to (e.g. "Section A").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    /// Free-form difficulty label (e.g. "B2").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
}

/// A learner's written response to an audio clip, given its transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListeningInput {
    pub transcript_text: String,
    pub student_response_text: String,
}

// ---------------------------------------------------------------------------
// Score
// ---------------------------------------------------------------------------

/// An assessment score, always an integer in `0..=100`.
///
/// Deserialization accepts integers, floats and numeric strings; fractional
/// values are rounded to the nearest integer and anything that rounds outside
/// the range is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Score(u8);

impl Score {
    pub const MAX: u8 = 100;

    pub fn new(value: u8) -> Option<Self> {
        (value <= Self::MAX).then_some(Score(value))
    }

    /// Caps values above 100.
    pub const fn saturating(value: u8) -> Self {
        if value > Self::MAX {
            Score(Self::MAX)
        } else {
            Score(value)
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<f64> for Score {
    type Error = String;

    fn try_from(raw: f64) -> Result<Self, Self::Error> {
        if !raw.is_finite() {
            return Err(format!("score {raw} is not a finite number"));
        }
        let rounded = raw.round();
        if !(0.0..=f64::from(Self::MAX)).contains(&rounded) {
            return Err(format!("score {raw} is outside 0..=100"));
        }
        Ok(Score(rounded as u8))
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for Score {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawScore {
            Number(f64),
            Text(String),
        }

        let raw = match RawScore::deserialize(deserializer)? {
            RawScore::Number(n) => n,
            RawScore::Text(s) => s
                .trim()
                .trim_end_matches('%')
                .trim()
                .parse::<f64>()
                .map_err(|_| serde::de::Error::custom(format!("score '{s}' is not numeric")))?,
        };
        Score::try_from(raw).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Common read access to any skill's result, for rendering and checks.
pub trait Assessment {
    fn skill(&self) -> Skill;
    fn score(&self) -> Score;
    fn suggestions(&self) -> &[String];
    /// Named feedback dimensions in display order.
    fn feedback_dimensions(&self) -> Vec<(&'static str, &str)>;
    fn transcription(&self) -> Option<&str> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeakingFeedback {
    pub fluency: String,
    pub pronunciation: String,
    pub grammar: String,
    pub vocabulary: String,
    pub coherence: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeakingAssessment {
    pub transcription: String,
    pub feedback: SpeakingFeedback,
    pub score: Score,
    pub suggestions: Vec<String>,
}

impl Assessment for SpeakingAssessment {
    fn skill(&self) -> Skill {
        Skill::Speaking
    }

    fn score(&self) -> Score {
        self.score
    }

    fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    fn feedback_dimensions(&self) -> Vec<(&'static str, &str)> {
        let f = &self.feedback;
        vec![
            ("fluency", f.fluency.as_str()),
            ("pronunciation", f.pronunciation.as_str()),
            ("grammar", f.grammar.as_str()),
            ("vocabulary", f.vocabulary.as_str()),
            ("coherence", f.coherence.as_str()),
        ]
    }

    fn transcription(&self) -> Option<&str> {
        Some(&self.transcription)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WritingFeedback {
    pub grammar: String,
    pub vocabulary: String,
    pub structure: String,
    pub coherence: String,
    pub task_achievement: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WritingAssessment {
    pub feedback: WritingFeedback,
    pub score: Score,
    pub suggestions: Vec<String>,
}

impl Assessment for WritingAssessment {
    fn skill(&self) -> Skill {
        Skill::Writing
    }

    fn score(&self) -> Score {
        self.score
    }

    fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    fn feedback_dimensions(&self) -> Vec<(&'static str, &str)> {
        let f = &self.feedback;
        vec![
            ("grammar", f.grammar.as_str()),
            ("vocabulary", f.vocabulary.as_str()),
            ("structure", f.structure.as_str()),
            ("coherence", f.coherence.as_str()),
            ("taskAchievement", f.task_achievement.as_str()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingFeedback {
    pub understanding: String,
    pub clarity: String,
    pub language_use: String,
    pub relevance_to_passage: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingAssessment {
    pub feedback: ReadingFeedback,
    pub score: Score,
    pub suggestions: Vec<String>,
}

impl Assessment for ReadingAssessment {
    fn skill(&self) -> Skill {
        Skill::Reading
    }

    fn score(&self) -> Score {
        self.score
    }

    fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    fn feedback_dimensions(&self) -> Vec<(&'static str, &str)> {
        let f = &self.feedback;
        vec![
            ("understanding", f.understanding.as_str()),
            ("clarity", f.clarity.as_str()),
            ("languageUse", f.language_use.as_str()),
            ("relevanceToPassage", f.relevance_to_passage.as_str()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListeningFeedback {
    pub comprehension: String,
    pub accuracy: String,
    pub language_use: String,
    pub relevance_to_audio: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListeningAssessment {
    pub feedback: ListeningFeedback,
    pub score: Score,
    pub suggestions: Vec<String>,
}

impl Assessment for ListeningAssessment {
    fn skill(&self) -> Skill {
        Skill::Listening
    }

    fn score(&self) -> Score {
        self.score
    }

    fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    fn feedback_dimensions(&self) -> Vec<(&'static str, &str)> {
        let f = &self.feedback;
        vec![
            ("comprehension", f.comprehension.as_str()),
            ("accuracy", f.accuracy.as_str()),
            ("languageUse", f.language_use.as_str()),
            ("relevanceToAudio", f.relevance_to_audio.as_str()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skill_display_and_parse() {
        assert_eq!(Skill::Reading.to_string(), "reading");
        assert_eq!("Speaking".parse::<Skill>().unwrap(), Skill::Speaking);
        assert_eq!("oral".parse::<Skill>().unwrap(), Skill::Speaking);
        assert_eq!(" listening ".parse::<Skill>().unwrap(), Skill::Listening);
        assert!("grammar".parse::<Skill>().is_err());
    }

    #[test]
    fn score_accepts_integers_floats_and_strings() {
        let s: Score = serde_json::from_str("78").unwrap();
        assert_eq!(s.value(), 78);
        let s: Score = serde_json::from_str("77.6").unwrap();
        assert_eq!(s.value(), 78);
        let s: Score = serde_json::from_str("\"64%\"").unwrap();
        assert_eq!(s.value(), 64);
        let s: Score = serde_json::from_str("100.4").unwrap();
        assert_eq!(s.value(), 100);
    }

    #[test]
    fn score_rejects_out_of_range() {
        assert!(serde_json::from_str::<Score>("101").is_err());
        assert!(serde_json::from_str::<Score>("-3").is_err());
        assert!(serde_json::from_str::<Score>("\"high\"").is_err());
        assert!(Score::new(101).is_none());
        assert!(Score::try_from(f64::NAN).is_err());
    }

    #[test]
    fn reading_input_uses_camel_case() {
        let input: ReadingInput = serde_json::from_str(
            r#"{"passageText": "Un texte.", "studentResponseText": "Une réponse assez longue."}"#,
        )
        .unwrap();
        assert_eq!(input.passage_text, "Un texte.");
        assert!(input.section.is_none());

        let json = serde_json::to_value(&input).unwrap();
        assert!(json.get("studentResponseText").is_some());
        assert!(json.get("section").is_none());
    }

    #[test]
    fn writing_feedback_dimension_names_match_wire() {
        let assessment = WritingAssessment {
            feedback: WritingFeedback {
                grammar: "g".into(),
                vocabulary: "v".into(),
                structure: "s".into(),
                coherence: "c".into(),
                task_achievement: "t".into(),
            },
            score: Score::new(50).unwrap(),
            suggestions: vec![],
        };
        let json = serde_json::to_value(&assessment).unwrap();
        for (name, value) in assessment.feedback_dimensions() {
            assert_eq!(json["feedback"][name], value);
        }
    }
}

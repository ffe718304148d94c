//! Offline fixtures for speaking and writing.
//!
//! Returned instead of a model call when the configuration puts a skill in
//! offline mode. The payloads ignore the submission entirely; they exist for
//! demos and for exercising the pipeline without network access.

use crate::model::{
    Score, SpeakingAssessment, SpeakingFeedback, WritingAssessment, WritingFeedback,
};

pub const SPEAKING_FIXTURE_SCORE: u8 = 75;
pub const WRITING_FIXTURE_SCORE: u8 = 78;

pub fn speaking_fixture() -> SpeakingAssessment {
    SpeakingAssessment {
        transcription: "Bonjour, je m'appelle Marie. J'habite à Montréal depuis deux ans et je travaille comme infirmière. Dans mon temps libre, j'aime faire du vélo et lire des romans policiers.".into(),
        feedback: SpeakingFeedback {
            fluency: "Speech flows at a natural pace with only a few short hesitations before longer sentences.".into(),
            pronunciation: "Most sounds are clear. Nasal vowels (\"temps\", \"romans\") are sometimes flattened and the French 'r' is occasionally anglicised.".into(),
            grammar: "Present tense and 'depuis' + present are used correctly. No attempt at past or conditional forms, which limits the range shown.".into(),
            vocabulary: "Everyday vocabulary is accurate and appropriate. Adding more precise or idiomatic expressions would raise the level.".into(),
            coherence: "Ideas follow a logical order (identity, home, work, leisure) but are mostly juxtaposed without connectors.".into(),
        },
        score: Score::saturating(SPEAKING_FIXTURE_SCORE),
        suggestions: vec![
            "Practise nasal vowels with minimal pairs such as 'vent / vin / vont'.".into(),
            "Link ideas with connectors like 'par ailleurs', 'ensuite', 'c'est pourquoi'.".into(),
            "Include at least one past-tense anecdote to show a wider grammatical range.".into(),
        ],
    }
}

pub fn writing_fixture() -> WritingAssessment {
    WritingAssessment {
        feedback: WritingFeedback {
            grammar: "Generally accurate sentence construction. Watch agreement of past participles with 'être' and the choice between passé composé and imparfait.".into(),
            vocabulary: "Appropriate, mostly everyday vocabulary. Some repetition ('chose', 'faire') that more precise words would avoid.".into(),
            structure: "Clear introduction and conclusion. Body paragraphs would benefit from one main idea each.".into(),
            coherence: "Ideas are easy to follow. More varied linking words would make transitions smoother.".into(),
            task_achievement: "The answer addresses the task and respects the expected register, though one point of the prompt is only briefly developed.".into(),
        },
        score: Score::saturating(WRITING_FIXTURE_SCORE),
        suggestions: vec![
            "Review past participle agreement with 'être' and preceding direct objects.".into(),
            "Replace general words like 'chose' and 'faire' with more precise vocabulary.".into(),
            "Develop each point of the task in its own paragraph with an example.".into(),
        ],
    }
}

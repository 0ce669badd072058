use crate::error::AnnotateError;
use chrono::{DateTime, Local};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::HashSet;

/// Number of questions in a rubric
pub const RUBRIC_LEN: usize = 5;
pub const MIN_SCORE: u8 = 1;
pub const MAX_SCORE: u8 = 5;
/// Score used for a question the evaluator left unanswered
pub const DEFAULT_SCORE: u8 = 3;

const DEFAULT_QUESTIONS: [&str; RUBRIC_LEN] = [
    "1. Does User A's utterance fit naturally into one scene with the given background?",
    "2. Is the generated background realistic and easy to understand?",
    "3. Does User B's reply follow logically and consistently from User A's utterance and the background?",
    "4. Is User B's reply grammatical, with fitting vocabulary and natural conversational phrasing?",
    "5. Is the whole exchange (User A - background - User B) meaningful and natural enough to keep in the dataset?",
];

/// One conversational unit from a dataset file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Identifier from the file, if it has one
    #[serde(rename = "data_id", default, deserialize_with = "deserialize_id")]
    pub id: Option<String>,
    /// What speaker A said
    #[serde(rename = "User A", default, deserialize_with = "deserialize_text")]
    pub speaker_a_utterance: Option<String>,
    /// Generated context placed between the two turns
    #[serde(rename = "background", default, deserialize_with = "deserialize_text")]
    pub background_context: Option<String>,
    /// What speaker B answered
    #[serde(rename = "User B", default, deserialize_with = "deserialize_text")]
    pub speaker_b_response: Option<String>,
}

impl Record {
    /// Identifier shown to the evaluator, falling back to the sample position
    pub fn display_id(&self, position: usize) -> String {
        self.id
            .clone()
            .unwrap_or_else(|| format!("item_idx_{}", position))
    }
}

// Some datasets carry numeric ids; keep them as text.
fn deserialize_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_text(deserializer)
}

// Non-string values are shown as their JSON text rather than failing the file.
fn deserialize_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(text),
        Some(other) => Some(other.to_string()),
    })
}

/// The ordered questions every record is judged against
#[derive(Debug, Clone, PartialEq)]
pub struct Rubric {
    questions: Vec<String>,
}

impl Rubric {
    pub fn new(questions: Vec<String>) -> Result<Self, AnnotateError> {
        if questions.len() != RUBRIC_LEN {
            return Err(AnnotateError::RubricSize {
                expected: RUBRIC_LEN,
                actual: questions.len(),
            });
        }
        if let Some(question) = first_duplicate(&questions) {
            return Err(AnnotateError::DuplicateQuestion(question.to_string()));
        }
        Ok(Self { questions })
    }

    pub fn questions(&self) -> &[String] {
        &self.questions
    }
}

/// First question text that appears more than once
pub fn first_duplicate(questions: &[String]) -> Option<&str> {
    let mut seen = HashSet::new();
    questions
        .iter()
        .find(|question| !seen.insert(question.as_str()))
        .map(String::as_str)
}

impl Default for Rubric {
    fn default() -> Self {
        Self {
            questions: DEFAULT_QUESTIONS.iter().map(|q| q.to_string()).collect(),
        }
    }
}

/// One score per rubric question, each within `MIN_SCORE..=MAX_SCORE`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scores([u8; RUBRIC_LEN]);

impl Scores {
    pub fn new(values: [u8; RUBRIC_LEN]) -> Result<Self, AnnotateError> {
        for (i, &score) in values.iter().enumerate() {
            if !(MIN_SCORE..=MAX_SCORE).contains(&score) {
                return Err(AnnotateError::ScoreOutOfRange {
                    question: i + 1,
                    score,
                });
            }
        }
        Ok(Self(values))
    }

    /// Build scores from possibly unanswered questions
    pub fn from_answers(answers: [Option<u8>; RUBRIC_LEN]) -> Result<Self, AnnotateError> {
        Self::new(answers.map(|answer| answer.unwrap_or(DEFAULT_SCORE)))
    }

    pub fn values(&self) -> [u8; RUBRIC_LEN] {
        self.0
    }
}

impl Default for Scores {
    fn default() -> Self {
        Self([DEFAULT_SCORE; RUBRIC_LEN])
    }
}

/// Scores paired with their question text, serialized as an ordered map
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreSheet {
    entries: Vec<(String, u8)>,
}

impl ScoreSheet {
    pub fn new(rubric: &Rubric, scores: &Scores) -> Self {
        let entries = rubric
            .questions()
            .iter()
            .cloned()
            .zip(scores.values())
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[(String, u8)] {
        &self.entries
    }
}

impl Serialize for ScoreSheet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (question, score) in &self.entries {
            map.serialize_entry(question, score)?;
        }
        map.end()
    }
}

/// An evaluator's verdict on one sampled record, with provenance
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Judgment {
    pub original_file_key: String,
    pub original_file_path: String,
    pub data_id: String,
    pub sampled_item_user_a: Option<String>,
    pub sampled_item_background: Option<String>,
    pub sampled_item_user_b: Option<String>,
    pub evaluation_scores: ScoreSheet,
    pub evaluator_comment: String,
    pub evaluation_timestamp: DateTime<Local>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_parsing_with_renamed_fields() {
        let json = r#"{"data_id": "d-1", "User A": "Hi", "background": "A park", "User B": "Hello", "extra": 1}"#;
        let record: Record = serde_json::from_str(json).unwrap();
        assert_eq!(record.id.as_deref(), Some("d-1"));
        assert_eq!(record.speaker_a_utterance.as_deref(), Some("Hi"));
        assert_eq!(record.background_context.as_deref(), Some("A park"));
        assert_eq!(record.speaker_b_response.as_deref(), Some("Hello"));
    }

    #[test]
    fn test_record_numeric_and_missing_id() {
        let numbered: Record = serde_json::from_str(r#"{"data_id": 17}"#).unwrap();
        assert_eq!(numbered.id.as_deref(), Some("17"));

        let anonymous: Record = serde_json::from_str(r#"{"User A": "Hi"}"#).unwrap();
        assert_eq!(anonymous.id, None);
        assert_eq!(anonymous.background_context, None);
        assert_eq!(anonymous.display_id(4), "item_idx_4");
        assert_eq!(numbered.display_id(4), "17");
    }

    #[test]
    fn test_rubric_size_is_enforced() {
        assert_eq!(Rubric::default().questions().len(), RUBRIC_LEN);
        let err = Rubric::new(vec!["only one".to_string()]).unwrap_err();
        assert!(matches!(
            err,
            AnnotateError::RubricSize {
                expected: RUBRIC_LEN,
                actual: 1
            }
        ));
    }

    #[test]
    fn test_rubric_rejects_repeated_questions() {
        let questions = ["q", "q", "q3", "q4", "q5"].map(String::from).to_vec();
        let err = Rubric::new(questions).unwrap_err();
        assert!(matches!(err, AnnotateError::DuplicateQuestion(ref q) if q == "q"));
        assert!(err.to_string().contains("'q'"));

        let distinct = ["q1", "q2", "q3", "q4", "q5"].map(String::from).to_vec();
        assert_eq!(first_duplicate(&distinct), None);
    }

    #[test]
    fn test_record_text_fields_accept_any_json_value() {
        let json = r#"{"data_id": "n-1", "User A": 42, "background": {"place": "park"}, "User B": true}"#;
        let record: Record = serde_json::from_str(json).unwrap();
        assert_eq!(record.speaker_a_utterance.as_deref(), Some("42"));
        assert_eq!(
            record.background_context.as_deref(),
            Some(r#"{"place":"park"}"#)
        );
        assert_eq!(record.speaker_b_response.as_deref(), Some("true"));

        let nulls: Record = serde_json::from_str(r#"{"User A": null}"#).unwrap();
        assert_eq!(nulls.speaker_a_utterance, None);
    }

    #[test]
    fn test_scores_range_and_defaults() {
        assert!(Scores::new([1, 2, 3, 4, 5]).is_ok());
        let err = Scores::new([1, 2, 0, 4, 5]).unwrap_err();
        assert!(matches!(
            err,
            AnnotateError::ScoreOutOfRange {
                question: 3,
                score: 0
            }
        ));
        assert!(Scores::new([6, 3, 3, 3, 3]).is_err());

        let scores = Scores::from_answers([Some(5), None, Some(1), None, None]).unwrap();
        assert_eq!(scores.values(), [5, 3, 1, 3, 3]);
        assert_eq!(Scores::default().values(), [DEFAULT_SCORE; RUBRIC_LEN]);
    }

    #[test]
    fn test_score_sheet_keeps_rubric_order() {
        let rubric = Rubric::default();
        let sheet = ScoreSheet::new(&rubric, &Scores::new([5, 4, 3, 2, 1]).unwrap());
        let json = serde_json::to_value(&sheet).unwrap();
        let keys: Vec<&String> = json.as_object().unwrap().keys().collect();
        assert_eq!(keys, rubric.questions().iter().collect::<Vec<_>>());
        assert_eq!(json[&rubric.questions()[0]], 5);
        assert_eq!(json[&rubric.questions()[4]], 1);
    }
}

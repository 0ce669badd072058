use std::path::PathBuf;

/// Every condition the annotator reports back to the user.
///
/// None of these end the process: the caller shows the message and keeps
/// accepting actions.
#[derive(Debug, thiserror::Error)]
pub enum AnnotateError {
    #[error("file '{}' was not found; check the configured path", .path.display())]
    SourceNotFound { path: PathBuf },

    #[error("file '{}' is not a JSON list of records: {source}", .path.display())]
    MalformedSource {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to read '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("no records were sampled from '{key}'; the file may be empty")]
    EmptySample { key: String },

    #[error("no source is selected")]
    NoActiveSource,

    #[error("unknown source '{0}'")]
    UnknownSource(String),

    #[error("no item is waiting for a judgment")]
    NotAwaitingJudgment,

    #[error("score {score} for question {question} is outside 1..=5")]
    ScoreOutOfRange { question: usize, score: u8 },

    #[error("the rubric needs exactly {expected} questions, got {actual}")]
    RubricSize { expected: usize, actual: usize },

    #[error("the rubric repeats the question '{0}'")]
    DuplicateQuestion(String),

    #[error("nothing has been judged yet for '{key}'")]
    NothingToExport { key: String },

    #[error("failed to serialize judgments: {0}")]
    Serialize(#[from] serde_json::Error),
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read question catalog {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse question catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("question '{id}' has invalid weight {weight}; weights must be finite and > 0")]
    InvalidWeight { id: String, weight: f64 },

    #[error("question id '{0}' appears more than once in the catalog")]
    DuplicateId(String),

    #[error("question at position {index} has an empty {field}")]
    EmptyField { index: usize, field: &'static str },
}

#[derive(Debug, Error)]
pub enum AnswerError {
    #[error("answer {value} is outside the 0-4 scale")]
    OutOfRange { value: i64 },

    #[error("answer for '{id}' is not an integer: {raw}")]
    NotAnInteger { id: String, raw: String },

    #[error("question '{0}' is answered more than once")]
    DuplicateAnswer(String),

    #[error("answer for '{id}': {source}")]
    Invalid {
        id: String,
        #[source]
        source: Box<AnswerError>,
    },

    #[error("answer sheet must be a JSON object of question id to answer")]
    NotAnObject,

    #[error("failed to parse answer sheet: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to read answer CSV: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("{} applicable question(s) are unanswered: {}", missing.len(), missing.join(", "))]
    Incomplete { missing: Vec<String> },

    #[error("role '{0}' does not answer questionnaires")]
    NotAResponder(crate::models::Role),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("DATABASE_URL must be set to a Postgres instance")]
    MissingDatabaseUrl,

    #[error("MINDSCREEN_DB_MAX_CONNECTIONS must be a positive integer, got '{0}'")]
    InvalidMaxConnections(String),
}

use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum NotebenchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Missing result file: {0}")]
    MissingFile(String),

    #[error("Missing column '{column}' in {file}")]
    MissingColumn { file: String, column: String },

    #[error("Too many runs for the color palette: {runs} runs, {colors} colors")]
    TooManyRuns { runs: usize, colors: usize },

    #[error("Chart error: {0}")]
    Chart(String),

    #[error("Invalid scenario: {0}")]
    InvalidScenario(String),

    #[error("Harness error: {0}")]
    Harness(String),
}

impl Serialize for NotebenchError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotesError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Gemini API error: {0}")]
    ModelRequest(String),

    #[error("Unexpected Gemini response: {0}")]
    ModelResponse(String),

    #[error("Image search failed: {0}")]
    Search(String),

    #[error("Failed to update doc. Status: {status}. {message}")]
    DocumentUpdate { status: u16, message: String },

    #[error("The transcript is empty")]
    EmptyTranscript,

    #[error("Could not read transcript: {0}")]
    Transcript(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Settings error: {0}")]
    SettingsError(#[from] Box<figment::Error>),
}

impl From<figment::Error> for NotesError {
    fn from(err: figment::Error) -> Self {
        NotesError::SettingsError(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, NotesError>;

pub mod auth;
pub mod chunker;
pub mod docs;
pub mod download;
pub mod endpoints;
pub mod error;
pub mod format;
pub mod http;
pub mod images;
pub mod json;
pub mod model;
pub mod orchestrator;
pub mod progress;
pub mod settings;
pub mod summary;
pub mod transcript;
pub mod types;

pub use auth::{CommandToken, CredentialProvider, StaticToken};
pub use chunker::{DEFAULT_CHUNK_SIZE, chunk_transcript};
pub use docs::{DocumentApi, DocumentCursor, GoogleDocsClient};
pub use endpoints::Endpoints;
pub use error::{NotesError, Result};
pub use format::{document_url, format_notes};
pub use http::build_client;
pub use images::{CustomSearchClient, ImageSearch};
pub use model::{GeminiClient, ModelClient};
pub use orchestrator::{Collaborators, Orchestrator, RunState};
pub use progress::{ProgressEvent, ProgressReporter, ProgressSink, Severity};
pub use settings::{RunConfig, Settings, SettingsStore};
pub use transcript::{FileTranscriptSource, StdinTranscriptSource, TranscriptSource};
pub use types::{RunOutcome, SummaryMode, Transcript};

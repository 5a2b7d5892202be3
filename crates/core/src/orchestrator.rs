//! One run: authenticate, pick the document, summarize, append, and
//! optionally illustrate.

use std::path::PathBuf;

use reqwest::Client;
use serde::Serialize;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::{
    auth::CredentialProvider,
    docs::{DocumentApi, DocumentCursor, GoogleDocsClient},
    download::{download_images, get_notes_root},
    error::{NotesError, Result},
    format::{document_title, document_url, format_notes},
    http::build_client,
    images::{CustomSearchClient, ImageSearch, derive_queries, find_images},
    model::{GeminiClient, ModelClient},
    progress::{ProgressEvent, ProgressReporter, ProgressSink},
    settings::RunConfig,
    summary::{SummaryPlan, summarize},
    types::{RunOutcome, Transcript},
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum RunState {
    #[default]
    Idle,
    Authenticating,
    ResolvingDocument,
    Summarizing,
    WritingSummary,
    DiscoveringImages,
    WritingImages,
    Succeeded,
    Failed,
}

/// Builds a document client once the bearer token is known.
pub type DocumentConnector = Box<dyn Fn(&str) -> Box<dyn DocumentApi> + Send + Sync>;

/// The remote services a run talks to.
pub struct Collaborators {
    pub credentials: Box<dyn CredentialProvider>,
    pub model: Box<dyn ModelClient>,
    /// `None` turns image discovery off.
    pub search: Option<Box<dyn ImageSearch>>,
    pub documents: DocumentConnector,
    /// Used for saving images to disk.
    pub http: Client,
}

impl Collaborators {
    /// Gemini, Custom Search and Google Docs, sharing one HTTP client.
    pub fn google(config: &RunConfig, credentials: Box<dyn CredentialProvider>) -> Result<Self> {
        let http = build_client(config.request_timeout)?;
        let endpoints = config.endpoints.clone();

        let model = GeminiClient::new(http.clone(), &endpoints, &config.model, &config.api_key);
        let search = match (&config.search_engine_id, config.download_images) {
            (Some(engine_id), true) => Some(Box::new(CustomSearchClient::new(
                http.clone(),
                &endpoints,
                &config.api_key,
                engine_id,
            )) as Box<dyn ImageSearch>),
            _ => None,
        };

        let docs_http = http.clone();
        let documents: DocumentConnector = Box::new(move |token: &str| {
            let client = GoogleDocsClient::new(docs_http.clone(), &endpoints, token);
            Box::new(client) as Box<dyn DocumentApi>
        });

        Ok(Self {
            credentials,
            model: Box::new(model),
            search,
            documents,
            http,
        })
    }
}

struct Tracker {
    state: RunState,
    progress: ProgressReporter,
}

impl Tracker {
    fn enter(&mut self, state: RunState, event: ProgressEvent) {
        debug!(?state, message = %event.message, "entering state");
        self.state = state;
        self.progress.emit(event);
    }
}

pub struct Orchestrator {
    config: RunConfig,
    parts: Collaborators,
    notes_root: PathBuf,
    tracker: Tracker,
}

impl Orchestrator {
    pub fn new(config: RunConfig, parts: Collaborators) -> Self {
        Self {
            config,
            parts,
            notes_root: get_notes_root(),
            tracker: Tracker {
                state: RunState::Idle,
                progress: ProgressReporter::new(),
            },
        }
    }

    /// Directory the `notes/` image folder is written under.
    pub fn with_notes_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.notes_root = root.into();
        self
    }

    pub fn subscribe(
        &mut self,
        sink: impl ProgressSink + 'static,
    ) -> Option<Box<dyn ProgressSink>> {
        self.tracker.progress.subscribe(sink)
    }

    pub fn unsubscribe(&mut self) -> Option<Box<dyn ProgressSink>> {
        self.tracker.progress.unsubscribe()
    }

    pub fn state(&self) -> RunState {
        self.tracker.state
    }

    pub async fn run(&mut self, transcript: &Transcript) -> Result<RunOutcome> {
        let run_id = Uuid::new_v4();
        let span = info_span!("run", %run_id, title = %transcript.title);

        match self.execute(transcript).instrument(span.clone()).await {
            Ok(outcome) => {
                span.in_scope(|| info!(document_id = %outcome.document_id, "run succeeded"));
                self.tracker.enter(
                    RunState::Succeeded,
                    ProgressEvent::success("Success! Opening Google Doc..."),
                );
                Ok(outcome)
            }
            Err(e) => {
                span.in_scope(|| error!(error = %e, "run failed"));
                self.tracker
                    .enter(RunState::Failed, ProgressEvent::error(format!("Error: {e}")));
                Err(e)
            }
        }
    }

    async fn execute(&mut self, transcript: &Transcript) -> Result<RunOutcome> {
        if transcript.text.trim().is_empty() {
            return Err(NotesError::EmptyTranscript);
        }

        self.tracker.enter(
            RunState::Authenticating,
            ProgressEvent::neutral("Authenticating user..."),
        );
        let token = self.parts.credentials.token().await?;
        let docs = (self.parts.documents)(&token);

        let document_id = match &self.config.document_id {
            Some(id) => {
                self.tracker.enter(
                    RunState::ResolvingDocument,
                    ProgressEvent::neutral("Using existing Google Doc..."),
                );
                id.clone()
            }
            None => {
                self.tracker.enter(
                    RunState::ResolvingDocument,
                    ProgressEvent::neutral("Creating new Google Doc..."),
                );
                docs.create(&document_title(&transcript.title)).await?
            }
        };
        info!(%document_id, "document resolved");

        let plan = SummaryPlan::new(transcript, self.config.summary_mode, self.config.chunk_size);
        self.tracker.enter(
            RunState::Summarizing,
            ProgressEvent::neutral(plan.announcement()),
        );
        debug!(mode = self.config.summary_mode.name(), model = %self.config.model, "summarizing");
        let summary = summarize(
            self.parts.model.as_ref(),
            transcript,
            &plan,
            &mut self.tracker.progress,
        )
        .await?;
        if summary.trim().is_empty() {
            return Err(NotesError::ModelResponse(
                "the model returned an empty summary".to_string(),
            ));
        }

        self.tracker.enter(
            RunState::WritingSummary,
            ProgressEvent::neutral("Adding notes to Google Doc..."),
        );
        let mut cursor = DocumentCursor::new(docs.as_ref(), document_id);
        cursor
            .append_text(&format_notes(&transcript.title, &summary))
            .await?;

        let mut found = Vec::new();
        if self.config.download_images {
            match self.parts.search.as_deref() {
                Some(search) => {
                    self.tracker.enter(
                        RunState::DiscoveringImages,
                        ProgressEvent::neutral("Generating image queries..."),
                    );
                    let queries = derive_queries(self.parts.model.as_ref(), &summary).await;
                    found = find_images(search, &queries).await.unwrap_or_else(|e| {
                        warn!(error = %e, "continuing without images");
                        Vec::new()
                    });
                }
                None => warn!("image search is not configured, skipping images"),
            }
        }

        let mut images = Vec::with_capacity(found.len());
        let mut saved_images = Vec::new();
        if !found.is_empty() {
            self.tracker.enter(
                RunState::WritingImages,
                ProgressEvent::neutral(format!("Adding {} images...", found.len())),
            );
            for url in found.iter() {
                match cursor.append_image(url).await {
                    Ok(()) => images.push(url.clone()),
                    Err(e) => warn!(%url, error = %e, "failed to insert image"),
                }
            }
            if self.config.save_images_locally {
                saved_images = download_images(
                    &self.parts.http,
                    &found,
                    &transcript.title,
                    &self.notes_root,
                )
                .await;
            }
        }

        let document_id = cursor.document_id().to_string();
        Ok(RunOutcome {
            document_url: document_url(&document_id),
            document_id,
            summary,
            images,
            saved_images,
        })
    }
}

//! Persisted settings and the validated configuration of one run.
//!
//! Settings are layered with Figment: built-in defaults, then the JSON
//! settings file, then `YTNOTES_*` environment variables.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized},
};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::info;

use crate::{
    auth::{CommandToken, CredentialProvider, StaticToken},
    chunker::DEFAULT_CHUNK_SIZE,
    endpoints::{DEFAULT_MODEL, Endpoints},
    error::{NotesError, Result},
    http::DEFAULT_REQUEST_TIMEOUT,
    types::SummaryMode,
};

pub const ENV_PREFIX: &str = "YTNOTES_";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Gemini and Custom Search API key.
    pub api_key: Option<String>,
    pub search_engine_id: Option<String>,
    /// Append to this document instead of creating one per run.
    pub document_id: Option<String>,
    pub summary_mode: SummaryMode,
    pub download_images: bool,
    pub save_images_locally: bool,
    /// Docs API bearer token; `gcloud` is asked when unset.
    pub access_token: Option<String>,
    pub request_timeout_secs: u64,
    pub model: String,
    pub chunk_size: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            search_engine_id: None,
            document_id: None,
            summary_mode: SummaryMode::default(),
            download_images: false,
            save_images_locally: true,
            access_token: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
            model: DEFAULT_MODEL.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl Settings {
    pub fn credentials(&self) -> Box<dyn CredentialProvider> {
        match non_blank(&self.access_token) {
            Some(token) => Box::new(StaticToken::new(token)),
            None => Box::new(CommandToken::default()),
        }
    }
}

pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join("ytnotes")
            .join("settings.json")
    }

    pub fn at_default_location() -> Self {
        Self::new(Self::default_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Defaults, then the file, then the environment.
    pub fn load(&self) -> Result<Settings> {
        Ok(self.file_figment().merge(Env::prefixed(ENV_PREFIX)).extract()?)
    }

    /// Defaults and the file only, so environment secrets never get saved.
    pub fn load_stored(&self) -> Result<Settings> {
        Ok(self.file_figment().extract()?)
    }

    fn file_figment(&self) -> Figment {
        Figment::from(Serialized::defaults(Settings::default())).merge(Json::file(&self.path))
    }

    pub async fn save(&self, settings: &Settings) -> Result<()> {
        if non_blank(&settings.api_key).is_none() {
            return Err(NotesError::Configuration(
                "Please provide an API Key.".to_string(),
            ));
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let pretty_json = serde_json::to_string_pretty(settings)?;
        fs::write(&self.path, pretty_json).await?;
        info!(path = %self.path.display(), "settings saved");
        Ok(())
    }
}

/// Everything a run needs, checked once before it starts.
#[derive(Clone, Debug)]
pub struct RunConfig {
    pub api_key: String,
    pub search_engine_id: Option<String>,
    pub document_id: Option<String>,
    pub summary_mode: SummaryMode,
    pub download_images: bool,
    pub save_images_locally: bool,
    pub request_timeout: Duration,
    pub model: String,
    pub chunk_size: usize,
    pub endpoints: Endpoints,
}

impl RunConfig {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let api_key = non_blank(&settings.api_key)
            .ok_or_else(|| NotesError::Configuration("API Key is not set.".to_string()))?;

        let search_engine_id = non_blank(&settings.search_engine_id);
        if settings.download_images && search_engine_id.is_none() {
            return Err(NotesError::Configuration(
                "Search Engine ID is required for downloading images.".to_string(),
            ));
        }
        if settings.chunk_size == 0 {
            return Err(NotesError::Configuration(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if settings.request_timeout_secs == 0 {
            return Err(NotesError::Configuration(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            api_key,
            search_engine_id,
            document_id: non_blank(&settings.document_id),
            summary_mode: settings.summary_mode,
            download_images: settings.download_images,
            save_images_locally: settings.save_images_locally,
            request_timeout: Duration::from_secs(settings.request_timeout_secs),
            model: settings.model.clone(),
            chunk_size: settings.chunk_size,
            endpoints: Endpoints::default(),
        })
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }
}

use serde::{Deserialize, Serialize};

pub const UNTITLED_VIDEO: &str = "Untitled Video";

/// Spoken text of a video, captured once per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    pub text: String,
    pub title: String,
}

impl Transcript {
    pub fn new(text: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            title: title.into(),
        }
    }
}

/// Timed transcript line, as produced by Whisper-style JSON exports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    #[serde(default)]
    pub start: f64,
    #[serde(default)]
    pub end: f64,
    pub text: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryMode {
    /// One request over the whole (truncated) transcript.
    Detailed,
    /// One request per sentence-aligned chunk.
    #[default]
    Chunked,
}

impl SummaryMode {
    pub fn name(&self) -> &'static str {
        match self {
            SummaryMode::Detailed => "detailed",
            SummaryMode::Chunked => "chunked",
        }
    }
}

impl std::str::FromStr for SummaryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "detailed" => Ok(SummaryMode::Detailed),
            "chunked" => Ok(SummaryMode::Chunked),
            other => Err(format!("unknown summary mode: {other}")),
        }
    }
}

/// What a successful run hands back to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub document_id: String,
    pub document_url: String,
    pub summary: String,
    /// Image URLs that made it into the document.
    pub images: Vec<String>,
    pub saved_images: Vec<std::path::PathBuf>,
}

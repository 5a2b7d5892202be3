use std::{path::PathBuf, time::Duration};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::{fs, io::AsyncReadExt, time::Instant};
use tracing::{debug, warn};

use crate::{
    error::{NotesError, Result},
    types::{Segment, Transcript, UNTITLED_VIDEO},
};

pub const POLL_INTERVAL: Duration = Duration::from_millis(500);
pub const POLL_TIMEOUT: Duration = Duration::from_secs(5);

/// Where a run's transcript comes from. `None` means no transcript was found.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    async fn fetch(&self) -> Result<Option<Transcript>>;
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TranscriptFile {
    Plain {
        text: String,
        title: Option<String>,
    },
    Segmented {
        segments: Vec<Segment>,
        title: Option<String>,
    },
}

/// Parse an exported transcript: `{text, title?}`, `{segments: [{text}], title?}`
/// or plain text. Text that merely opens with a brace is still plain text.
/// `None` if there is no spoken text at all.
pub fn parse_transcript(
    contents: &str,
    title_override: Option<&str>,
    fallback_title: Option<&str>,
) -> Result<Option<Transcript>> {
    let trimmed = contents.trim_start();
    let (text, json_title) = if trimmed.starts_with('{') {
        match serde_json::from_str::<TranscriptFile>(trimmed) {
            Ok(TranscriptFile::Plain { text, title }) => (text, title),
            Ok(TranscriptFile::Segmented { segments, title }) => {
                let text = segments
                    .iter()
                    .map(|segment| segment.text.trim())
                    .filter(|text| !text.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ");
                (text, title)
            }
            Err(_) if serde_json::from_str::<serde_json::Value>(trimmed).is_err() => {
                (contents.to_string(), None)
            }
            Err(e) => {
                return Err(NotesError::Transcript(format!(
                    "unrecognized JSON transcript: {e}"
                )));
            }
        }
    } else {
        (contents.to_string(), None)
    };

    if text.trim().is_empty() {
        return Ok(None);
    }

    let title = title_override
        .or(json_title.as_deref())
        .or(fallback_title)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(UNTITLED_VIDEO)
        .to_string();

    Ok(Some(Transcript { text, title }))
}

/// Waits for a transcript file to appear, then reads it.
pub struct FileTranscriptSource {
    path: PathBuf,
    title: Option<String>,
    interval: Duration,
    timeout: Duration,
}

impl FileTranscriptSource {
    pub fn new(path: impl Into<PathBuf>, title: Option<String>) -> Self {
        Self {
            path: path.into(),
            title,
            interval: POLL_INTERVAL,
            timeout: POLL_TIMEOUT,
        }
    }

    pub fn with_polling(mut self, interval: Duration, timeout: Duration) -> Self {
        self.interval = interval;
        self.timeout = timeout;
        self
    }

    async fn read_when_ready(&self) -> Result<Option<String>> {
        let deadline = Instant::now() + self.timeout;
        loop {
            match fs::read_to_string(&self.path).await {
                Ok(contents) if !contents.trim().is_empty() => return Ok(Some(contents)),
                Ok(_) => debug!(path = %self.path.display(), "transcript file is still empty"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!(path = %self.path.display(), "waiting for transcript file")
                }
                Err(e) => return Err(e.into()),
            }

            if Instant::now() >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(self.interval).await;
        }
    }
}

#[async_trait]
impl TranscriptSource for FileTranscriptSource {
    async fn fetch(&self) -> Result<Option<Transcript>> {
        let Some(contents) = self.read_when_ready().await? else {
            warn!(path = %self.path.display(), "transcript not found before timeout");
            return Ok(None);
        };

        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string());
        parse_transcript(&contents, self.title.as_deref(), stem.as_deref())
    }
}

/// Reads the whole transcript from standard input.
pub struct StdinTranscriptSource {
    title: Option<String>,
}

impl StdinTranscriptSource {
    pub fn new(title: Option<String>) -> Self {
        Self { title }
    }
}

#[async_trait]
impl TranscriptSource for StdinTranscriptSource {
    async fn fetch(&self) -> Result<Option<Transcript>> {
        let mut contents = String::new();
        tokio::io::stdin().read_to_string(&mut contents).await?;
        parse_transcript(&contents, self.title.as_deref(), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_uses_fallback_title() {
        let transcript = parse_transcript("hello there. general kenobi.", None, Some("clip"))
            .unwrap()
            .unwrap();
        assert_eq!(transcript.text, "hello there. general kenobi.");
        assert_eq!(transcript.title, "clip");
    }

    #[test]
    fn json_title_beats_fallback_but_not_override() {
        let json = r#"{"text": "spoken words", "title": "From Page"}"#;
        let t = parse_transcript(json, None, Some("file")).unwrap().unwrap();
        assert_eq!(t.title, "From Page");

        let t = parse_transcript(json, Some("Chosen"), Some("file")).unwrap().unwrap();
        assert_eq!(t.title, "Chosen");
    }

    #[test]
    fn segments_are_joined_with_spaces() {
        let json = r#"{"segments": [
            {"start": 0.0, "end": 1.5, "text": " Hello "},
            {"text": "world."},
            {"text": "  "}
        ]}"#;
        let t = parse_transcript(json, None, None).unwrap().unwrap();
        assert_eq!(t.text, "Hello world.");
        assert_eq!(t.title, UNTITLED_VIDEO);
    }

    #[test]
    fn empty_transcript_is_none() {
        assert!(parse_transcript("  \n", None, None).unwrap().is_none());
        assert!(parse_transcript(r#"{"text": ""}"#, None, None).unwrap().is_none());
    }

    #[test]
    fn unknown_json_shape_is_an_error() {
        let err = parse_transcript(r#"{"captions": []}"#, None, None).unwrap_err();
        assert!(matches!(err, NotesError::Transcript(_)));
    }

    #[test]
    fn caption_cues_in_braces_are_plain_text() {
        let contents = "{Applause} Welcome back to the show.\n{Music} Today we talk lifetimes.";
        let t = parse_transcript(contents, None, Some("talk")).unwrap().unwrap();
        assert_eq!(t.text, contents);
        assert_eq!(t.title, "talk");
    }

    #[tokio::test]
    async fn waits_for_the_file_to_appear() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("talk.txt");
        let source = FileTranscriptSource::new(&path, None)
            .with_polling(Duration::from_millis(10), Duration::from_secs(2));

        let writer_path = path.clone();
        let writer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            fs::write(&writer_path, "It appeared. Eventually.").await.unwrap();
        });

        let transcript = source.fetch().await.unwrap().unwrap();
        writer.await.unwrap();
        assert_eq!(transcript.text, "It appeared. Eventually.");
        assert_eq!(transcript.title, "talk");
    }

    #[tokio::test]
    async fn gives_up_after_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileTranscriptSource::new(dir.path().join("never.txt"), None)
            .with_polling(Duration::from_millis(10), Duration::from_millis(40));
        assert!(source.fetch().await.unwrap().is_none());
    }
}

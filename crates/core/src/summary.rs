use serde::Deserialize;
use tracing::{debug, info};

use crate::{
    chunker::chunk_transcript,
    error::{NotesError, Result},
    json::parse_fenced_json,
    model::{MAX_OUTPUT_TOKENS, ModelClient},
    progress::{ProgressEvent, ProgressReporter},
    types::{SummaryMode, Transcript},
};

/// Characters of transcript sent in a single detailed request.
pub const DETAILED_INPUT_BUDGET: usize = 100_000;

/// Where a chunk sits within the transcript.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkPosition {
    pub is_first: bool,
    pub is_last: bool,
}

impl ChunkPosition {
    pub fn of(index: usize, total: usize) -> Self {
        Self {
            is_first: index == 0,
            is_last: index + 1 == total,
        }
    }

    fn context(&self) -> &'static str {
        match (self.is_first, self.is_last) {
            (true, true) => "This is the entire content.",
            (true, false) => "This is the BEGINNING of the content.",
            (false, true) => "This is the FINAL part of the content.",
            (false, false) => "This is a middle part of the content. Summarize it concisely.",
        }
    }
}

#[derive(Deserialize)]
struct DetailedReply {
    summary: String,
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

pub fn detailed_prompt(transcript: &str) -> String {
    format!(
        r#"Your task is to create a comprehensive summary of a piece of content. Do not use words like "video" or "speaker".
GUIDELINES:
- Preserve all key details and conclusions.
- Use markdown formatting.
- Output a valid JSON object with ONE key: "summary". The value is the markdown text.
Content to analyze: ---
{}
---"#,
        truncate_chars(transcript, DETAILED_INPUT_BUDGET)
    )
}

pub fn chunk_prompt(chunk: &str, position: ChunkPosition) -> String {
    format!(
        r#"Summarize ONLY the provided content chunk. Do not refer to the source as "the video". Use markdown bullet points.
Context: {}
Content Chunk: ---
{}
---"#,
        position.context(),
        chunk
    )
}

/// Summarize the whole transcript in one request.
pub async fn summarize_detailed(
    model: &dyn ModelClient,
    transcript: &Transcript,
) -> Result<String> {
    if transcript.text.trim().is_empty() {
        return Err(NotesError::EmptyTranscript);
    }

    let reply = model
        .generate(&detailed_prompt(&transcript.text), Some(MAX_OUTPUT_TOKENS))
        .await?;
    let DetailedReply { summary } = parse_fenced_json(&reply)?;

    info!(title = %transcript.title, chars = summary.len(), "detailed summary generated");
    Ok(summary)
}

/// Summarize precomputed chunks, one request at a time, in transcript order.
pub async fn summarize_chunks(
    model: &dyn ModelClient,
    transcript: &Transcript,
    chunks: &[String],
    progress: &mut ProgressReporter,
) -> Result<String> {
    if chunks.is_empty() {
        return Err(NotesError::EmptyTranscript);
    }

    let total = chunks.len();
    let mut parts = Vec::with_capacity(total);
    for (i, chunk) in chunks.iter().enumerate() {
        progress.emit(ProgressEvent::neutral(format!(
            "Summarizing part {} of {}...",
            i + 1,
            total
        )));
        debug!(
            part = i + 1,
            total,
            chars = chunk.chars().count(),
            "summarizing chunk"
        );
        let part = model
            .generate(&chunk_prompt(chunk, ChunkPosition::of(i, total)), None)
            .await?;
        parts.push(part);
    }

    info!(title = %transcript.title, parts = total, "chunked summary generated");
    Ok(parts.join("\n\n"))
}

/// How a transcript will be summarized, decided before any request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SummaryPlan {
    Detailed,
    Chunked(Vec<String>),
}

impl SummaryPlan {
    pub fn new(transcript: &Transcript, mode: SummaryMode, max_chunk_size: usize) -> Self {
        match mode {
            SummaryMode::Detailed => SummaryPlan::Detailed,
            SummaryMode::Chunked => {
                SummaryPlan::Chunked(chunk_transcript(&transcript.text, max_chunk_size))
            }
        }
    }

    /// Status line shown when summarizing starts.
    pub fn announcement(&self) -> String {
        match self {
            SummaryPlan::Detailed => "Generating detailed summary...".to_string(),
            SummaryPlan::Chunked(chunks) => {
                format!("Summarizing transcript in {} parts...", chunks.len())
            }
        }
    }
}

pub async fn summarize(
    model: &dyn ModelClient,
    transcript: &Transcript,
    plan: &SummaryPlan,
    progress: &mut ProgressReporter,
) -> Result<String> {
    match plan {
        SummaryPlan::Detailed => summarize_detailed(model, transcript).await,
        SummaryPlan::Chunked(chunks) => {
            summarize_chunks(model, transcript, chunks, progress).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    /// Replays canned replies in order and records every prompt.
    struct ScriptedModel {
        replies: Mutex<Vec<Result<String>>>,
        prompts: Mutex<Vec<(String, Option<u32>)>>,
    }

    impl ScriptedModel {
        fn new(replies: Vec<Result<String>>) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().rev().collect()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn prompts(&self) -> Vec<(String, Option<u32>)> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ModelClient for ScriptedModel {
        async fn generate(&self, prompt: &str, max_output_tokens: Option<u32>) -> Result<String> {
            self.prompts
                .lock()
                .unwrap()
                .push((prompt.to_string(), max_output_tokens));
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(NotesError::ModelRequest("no reply scripted".into())))
        }
    }

    async fn run(
        model: &ScriptedModel,
        transcript: &Transcript,
        mode: SummaryMode,
        max_chunk_size: usize,
        progress: &mut ProgressReporter,
    ) -> Result<String> {
        let plan = SummaryPlan::new(transcript, mode, max_chunk_size);
        summarize(model, transcript, &plan, progress).await
    }

    #[test]
    fn plan_announces_its_part_count() {
        let transcript = three_chunk_transcript();
        let plan = SummaryPlan::new(&transcript, SummaryMode::Chunked, 20);
        assert_eq!(
            plan,
            SummaryPlan::Chunked(vec![
                "First part here.".to_string(),
                "Second part here.".to_string(),
                "Third part here.".to_string(),
            ])
        );
        assert_eq!(plan.announcement(), "Summarizing transcript in 3 parts...");
        assert_eq!(
            SummaryPlan::new(&transcript, SummaryMode::Detailed, 20).announcement(),
            "Generating detailed summary..."
        );
    }

    fn three_chunk_transcript() -> Transcript {
        Transcript::new("First part here. Second part here. Third part here.", "Talk")
    }

    #[test]
    fn chunk_position_covers_all_framings() {
        let position = |is_first, is_last| ChunkPosition { is_first, is_last };
        assert_eq!(ChunkPosition::of(0, 1), position(true, true));
        assert_eq!(ChunkPosition::of(0, 3), position(true, false));
        assert_eq!(ChunkPosition::of(1, 3), position(false, false));
        assert_eq!(ChunkPosition::of(2, 3), position(false, true));
    }

    #[test]
    fn detailed_prompt_truncates_by_characters() {
        let transcript = "é".repeat(DETAILED_INPUT_BUDGET + 10);
        let prompt = detailed_prompt(&transcript);
        assert_eq!(prompt.matches('é').count(), DETAILED_INPUT_BUDGET);
    }

    #[tokio::test]
    async fn chunked_mode_issues_one_request_per_chunk_in_order() {
        let model = ScriptedModel::new(vec![
            Ok("- one".into()),
            Ok("- two".into()),
            Ok("- three".into()),
        ]);
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let mut progress = ProgressReporter::with_sink(move |e: &ProgressEvent| {
            sink.lock().unwrap().push(e.message.clone())
        });

        let transcript = three_chunk_transcript();
        let summary = run(&model, &transcript, SummaryMode::Chunked, 20, &mut progress)
            .await
            .unwrap();

        assert_eq!(summary, "- one\n\n- two\n\n- three");

        let prompts = model.prompts();
        assert_eq!(prompts.len(), 3);
        assert!(prompts[0].0.contains("BEGINNING"));
        assert!(prompts[0].0.contains("First part here."));
        assert!(prompts[1].0.contains("middle part"));
        assert!(prompts[1].0.contains("Second part here."));
        assert!(prompts[2].0.contains("FINAL part"));
        assert!(prompts[2].0.contains("Third part here."));
        assert!(prompts.iter().all(|(_, max)| max.is_none()));

        assert_eq!(
            *events.lock().unwrap(),
            vec![
                "Summarizing part 1 of 3...",
                "Summarizing part 2 of 3...",
                "Summarizing part 3 of 3..."
            ]
        );
    }

    #[tokio::test]
    async fn single_chunk_is_framed_as_entire_content() {
        let model = ScriptedModel::new(vec![Ok("- all".into())]);
        let mut progress = ProgressReporter::new();
        run(&model, &three_chunk_transcript(), SummaryMode::Chunked, 5000, &mut progress)
            .await
            .unwrap();
        assert!(model.prompts()[0].0.contains("This is the entire content."));
    }

    #[tokio::test]
    async fn failing_chunk_aborts_without_further_requests() {
        let model = ScriptedModel::new(vec![
            Ok("- one".into()),
            Err(NotesError::ModelRequest("Internal error".into())),
            Ok("- three".into()),
        ]);
        let mut progress = ProgressReporter::new();
        let err = run(&model, &three_chunk_transcript(), SummaryMode::Chunked, 20, &mut progress)
            .await
            .unwrap_err();

        assert!(matches!(err, NotesError::ModelRequest(ref m) if m == "Internal error"));
        assert_eq!(model.prompts().len(), 2);
    }

    #[tokio::test]
    async fn detailed_mode_parses_fenced_summary() {
        let model = ScriptedModel::new(vec![Ok(
            "```json\n{\"summary\": \"## Key ideas\\n- a\"}\n```".into()
        )]);
        let mut progress = ProgressReporter::new();
        let transcript = three_chunk_transcript();
        let summary = run(&model, &transcript, SummaryMode::Detailed, 5000, &mut progress)
            .await
            .unwrap();

        assert_eq!(summary, "## Key ideas\n- a");
        let prompts = model.prompts();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].1, Some(MAX_OUTPUT_TOKENS));
    }

    #[tokio::test]
    async fn detailed_mode_rejects_non_json_reply() {
        let model = ScriptedModel::new(vec![Ok("Sure! Here are the notes.".into())]);
        let mut progress = ProgressReporter::new();
        let transcript = three_chunk_transcript();
        let err = run(&model, &transcript, SummaryMode::Detailed, 5000, &mut progress)
            .await
            .unwrap_err();
        assert!(matches!(err, NotesError::ModelResponse(_)));
    }

    #[tokio::test]
    async fn empty_transcript_fails_before_any_request() {
        let model = ScriptedModel::new(vec![]);
        let mut progress = ProgressReporter::new();
        let transcript = Transcript::new("  ", "Silent");
        for mode in [SummaryMode::Detailed, SummaryMode::Chunked] {
            let err = run(&model, &transcript, mode, 5000, &mut progress)
                .await
                .unwrap_err();
            assert!(matches!(err, NotesError::EmptyTranscript));
        }
        assert!(model.prompts().is_empty());
    }
}

pub const DEFAULT_CHUNK_SIZE: usize = 5000;

const TERMINATORS: [char; 3] = ['.', '!', '?'];

/// Split text into sentences: a run of non-terminators followed by any
/// number of terminators. The pieces always concatenate back to `text`.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut in_terminators = false;

    for (i, c) in text.char_indices() {
        if TERMINATORS.contains(&c) {
            in_terminators = true;
        } else if in_terminators {
            sentences.push(&text[start..i]);
            start = i;
            in_terminators = false;
        }
    }
    if start < text.len() {
        sentences.push(&text[start..]);
    }

    sentences
}

fn push_trimmed(chunks: &mut Vec<String>, chunk: &str) {
    let trimmed = chunk.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

/// Group sentences into chunks of at most `max_size` characters.
///
/// A chunk is closed only when the next sentence would push it past
/// `max_size`, so a sentence is never split and a single oversized sentence
/// becomes a chunk of its own. Sizes count characters, not bytes.
pub fn chunk_transcript(text: &str, max_size: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for sentence in split_sentences(text) {
        let len = sentence.chars().count();
        if current_len + len > max_size && current_len > 0 {
            push_trimmed(&mut chunks, &current);
            current.clear();
            current_len = 0;
        }
        current.push_str(sentence);
        current_len += len;
    }
    if current_len > 0 {
        push_trimmed(&mut chunks, &current);
    }

    chunks
}

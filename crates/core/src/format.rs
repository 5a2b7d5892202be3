/// Notes block appended to the document for one video.
pub fn format_notes(title: &str, summary: &str) -> String {
    format!("\n{title}\n\n**Summary**\n{summary}\n\n")
}

/// Title given to a freshly created document.
pub fn document_title(video_title: &str) -> String {
    format!("Notes for: {video_title}")
}

/// Edit URL of a document, for the caller to open.
pub fn document_url(document_id: &str) -> String {
    format!("https://docs.google.com/document/d/{document_id}/edit")
}

//! Append-only editing of a Google Doc.
//!
//! Every edit is positional, and positions are relative to the document's
//! current length, so the insertion index is re-read before each append and
//! appends of one run go through a single [`DocumentCursor`].

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    endpoints::Endpoints,
    error::{NotesError, Result},
    http::{failure_message, transport_error},
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Location {
    pub index: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EditRequest {
    InsertText { location: Location, text: String },
    InsertInlineImage { location: Location, uri: String },
}

impl EditRequest {
    pub fn insert_text(index: i64, text: impl Into<String>) -> Self {
        EditRequest::InsertText {
            location: Location { index },
            text: text.into(),
        }
    }

    pub fn insert_inline_image(index: i64, uri: impl Into<String>) -> Self {
        EditRequest::InsertInlineImage {
            location: Location { index },
            uri: uri.into(),
        }
    }
}

/// Structural element of a document body; only its end matters here.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuralElement {
    pub end_index: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Body {
    #[serde(default)]
    pub content: Vec<StructuralElement>,
}

#[derive(Debug, Deserialize)]
pub struct DocumentContent {
    #[serde(default)]
    pub body: Body,
}

impl DocumentContent {
    /// Insertion point for an append: just before the implicit trailing newline.
    pub fn append_index(&self) -> i64 {
        self.body
            .content
            .last()
            .map(|last| last.end_index.unwrap_or(1) - 1)
            .unwrap_or(0)
    }
}

#[async_trait]
pub trait DocumentApi: Send + Sync {
    /// Create an empty document, returning its ID.
    async fn create(&self, title: &str) -> Result<String>;
    async fn end_index(&self, document_id: &str) -> Result<i64>;
    async fn batch_update(&self, document_id: &str, requests: Vec<EditRequest>) -> Result<()>;
}

/// Google Docs REST v1 with a bearer token.
pub struct GoogleDocsClient {
    client: Client,
    base: String,
    token: String,
}

impl GoogleDocsClient {
    pub fn new(client: Client, endpoints: &Endpoints, token: &str) -> Self {
        Self {
            client,
            base: endpoints.docs_base.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let (status, message) = failure_message(response).await;
        Err(NotesError::DocumentUpdate { status, message })
    }
}

fn doc_transport(err: reqwest::Error) -> NotesError {
    NotesError::DocumentUpdate {
        status: 0,
        message: transport_error(err),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedDocument {
    document_id: String,
}

#[async_trait]
impl DocumentApi for GoogleDocsClient {
    async fn create(&self, title: &str) -> Result<String> {
        let response = self
            .client
            .post(&self.base)
            .bearer_auth(&self.token)
            .json(&serde_json::json!({ "title": title }))
            .send()
            .await
            .map_err(doc_transport)?;
        let created = Self::check(response)
            .await?
            .json::<CreatedDocument>()
            .await
            .map_err(doc_transport)?;

        info!(document_id = %created.document_id, "created document");
        Ok(created.document_id)
    }

    async fn end_index(&self, document_id: &str) -> Result<i64> {
        let response = self
            .client
            .get(format!("{}/{}", self.base, document_id))
            .query(&[("fields", "body(content)")])
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(doc_transport)?;
        let document = Self::check(response)
            .await?
            .json::<DocumentContent>()
            .await
            .map_err(doc_transport)?;

        Ok(document.append_index())
    }

    async fn batch_update(&self, document_id: &str, requests: Vec<EditRequest>) -> Result<()> {
        if requests.is_empty() {
            return Ok(());
        }

        let response = self
            .client
            .post(format!("{}/{}:batchUpdate", self.base, document_id))
            .bearer_auth(&self.token)
            .json(&serde_json::json!({ "requests": requests }))
            .send()
            .await
            .map_err(doc_transport)?;
        Self::check(response).await?;
        Ok(())
    }
}

/// The only writer to one document during a run.
///
/// Each append re-reads the end index and commits before returning, and
/// `&mut self` keeps a second append from starting in between.
pub struct DocumentCursor<'a> {
    api: &'a dyn DocumentApi,
    document_id: String,
}

impl<'a> DocumentCursor<'a> {
    pub fn new(api: &'a dyn DocumentApi, document_id: impl Into<String>) -> Self {
        Self {
            api,
            document_id: document_id.into(),
        }
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    /// Not idempotent: appending the same text twice writes it twice.
    pub async fn append_text(&mut self, text: &str) -> Result<()> {
        let index = self.api.end_index(&self.document_id).await?;
        debug!(index, chars = text.chars().count(), "appending text");
        self.api
            .batch_update(&self.document_id, vec![EditRequest::insert_text(index, text)])
            .await
    }

    /// Inline image at the end; the renderer picks its size.
    pub async fn append_image(&mut self, uri: &str) -> Result<()> {
        let index = self.api.end_index(&self.document_id).await?;
        debug!(index, %uri, "appending inline image");
        self.api
            .batch_update(
                &self.document_id,
                vec![EditRequest::insert_inline_image(index, uri)],
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::build_client;
    use mockito::{Matcher, Server};
    use std::{sync::Mutex, time::Duration};

    /// In-memory document: a flat string plus the implicit trailing newline.
    #[derive(Default)]
    struct MemoryDoc {
        text: Mutex<String>,
        reads: Mutex<usize>,
    }

    #[async_trait]
    impl DocumentApi for MemoryDoc {
        async fn create(&self, _title: &str) -> Result<String> {
            Ok("mem".into())
        }

        async fn end_index(&self, _document_id: &str) -> Result<i64> {
            *self.reads.lock().unwrap() += 1;
            // Body indices start at 1; the trailing newline sits at len + 1.
            Ok(self.text.lock().unwrap().chars().count() as i64 + 1)
        }

        async fn batch_update(&self, _document_id: &str, requests: Vec<EditRequest>) -> Result<()> {
            let mut text = self.text.lock().unwrap();
            for request in requests {
                match request {
                    EditRequest::InsertText { location, text: insert } => {
                        let at = (location.index - 1) as usize;
                        let byte = text.char_indices().nth(at).map_or(text.len(), |(i, _)| i);
                        text.insert_str(byte, &insert);
                    }
                    EditRequest::InsertInlineImage { .. } => text.push('\u{fffc}'),
                }
            }
            Ok(())
        }
    }

    fn docs_client(server: &Server) -> GoogleDocsClient {
        let endpoints = Endpoints::with_base(&server.url());
        GoogleDocsClient::new(build_client(Duration::from_secs(5)).unwrap(), &endpoints, "tok")
    }

    #[test]
    fn edit_requests_match_wire_format() {
        let json = serde_json::to_value(vec![
            EditRequest::insert_text(7, "hi"),
            EditRequest::insert_inline_image(9, "https://img/x.png"),
        ])
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                {"insertText": {"location": {"index": 7}, "text": "hi"}},
                {"insertInlineImage": {"location": {"index": 9}, "uri": "https://img/x.png"}}
            ])
        );
    }

    #[test]
    fn append_index_is_one_before_the_last_end() {
        let doc: DocumentContent = serde_json::from_str(
            r#"{"body": {"content": [
                {"endIndex": 1, "sectionBreak": {}},
                {"startIndex": 1, "endIndex": 42}
            ]}}"#,
        )
        .unwrap();
        assert_eq!(doc.append_index(), 41);
    }

    #[test]
    fn missing_end_index_falls_back_to_zero() {
        let doc: DocumentContent =
            serde_json::from_str(r#"{"body":{"content":[{"sectionBreak":{}}]}}"#).unwrap();
        assert_eq!(doc.append_index(), 0);

        let empty: DocumentContent = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.append_index(), 0);
    }

    #[tokio::test]
    async fn appending_twice_duplicates_the_text() {
        let doc = MemoryDoc::default();
        let mut cursor = DocumentCursor::new(&doc, "mem");
        cursor.append_text("note\n").await.unwrap();
        cursor.append_text("note\n").await.unwrap();

        assert_eq!(*doc.text.lock().unwrap(), "note\nnote\n");
        assert_eq!(*doc.reads.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn each_append_lands_after_the_previous_one() {
        let doc = MemoryDoc::default();
        let mut cursor = DocumentCursor::new(&doc, "mem");
        cursor.append_text("first ").await.unwrap();
        cursor.append_image("https://img/a.png").await.unwrap();
        cursor.append_text("second").await.unwrap();
        assert_eq!(*doc.text.lock().unwrap(), "first \u{fffc}second");
    }

    #[tokio::test]
    async fn append_reads_index_then_inserts_there() {
        let mut server = Server::new_async().await;
        let read = server
            .mock("GET", "/v1/documents/doc-1")
            .match_query(Matcher::UrlEncoded("fields".into(), "body(content)".into()))
            .match_header("authorization", "Bearer tok")
            .with_status(200)
            .with_body(r#"{"body":{"content":[{"endIndex":1},{"endIndex":120}]}}"#)
            .create_async()
            .await;
        let write = server
            .mock("POST", "/v1/documents/doc-1:batchUpdate")
            .match_header("authorization", "Bearer tok")
            .match_body(Matcher::Json(serde_json::json!({
                "requests": [{"insertText": {"location": {"index": 119}, "text": "hello"}}]
            })))
            .with_status(200)
            .with_body(r#"{"documentId":"doc-1","replies":[{}]}"#)
            .create_async()
            .await;

        let client = docs_client(&server);
        let mut cursor = DocumentCursor::new(&client, "doc-1");
        cursor.append_text("hello").await.unwrap();

        read.assert_async().await;
        write.assert_async().await;
    }

    #[tokio::test]
    async fn inline_image_has_no_size() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/v1/documents/doc-1")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"body":{"content":[{"endIndex":10}]}}"#)
            .create_async()
            .await;
        let write = server
            .mock("POST", "/v1/documents/doc-1:batchUpdate")
            .match_body(Matcher::Json(serde_json::json!({
                "requests": [{
                    "insertInlineImage": {"location": {"index": 9}, "uri": "https://img/a.png"}
                }]
            })))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let client = docs_client(&server);
        DocumentCursor::new(&client, "doc-1")
            .append_image("https://img/a.png")
            .await
            .unwrap();
        write.assert_async().await;
    }

    #[tokio::test]
    async fn rejected_update_is_a_document_error() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/v1/documents/doc-1")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"body":{"content":[{"endIndex":3}]}}"#)
            .create_async()
            .await;
        server
            .mock("POST", "/v1/documents/doc-1:batchUpdate")
            .with_status(400)
            .with_body(
                serde_json::json!({"error": {
                    "code": 400,
                    "message": "Invalid requests[0].insertText: \
                                Index 2 must be less than the end index"
                }})
                .to_string(),
            )
            .create_async()
            .await;

        let client = docs_client(&server);
        let err = DocumentCursor::new(&client, "doc-1")
            .append_text("x")
            .await
            .unwrap_err();
        match err {
            NotesError::DocumentUpdate { status, message } => {
                assert_eq!(status, 400);
                assert!(message.starts_with("Invalid requests[0]"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn create_returns_new_document_id() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/documents")
            .match_header("authorization", "Bearer tok")
            .match_body(Matcher::Json(serde_json::json!({"title": "Notes for: Talk"})))
            .with_status(200)
            .with_body(r#"{"documentId":"new-doc","title":"Notes for: Talk"}"#)
            .create_async()
            .await;

        let id = docs_client(&server).create("Notes for: Talk").await.unwrap();
        assert_eq!(id, "new-doc");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn empty_batch_makes_no_request() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", Matcher::Any)
            .expect(0)
            .create_async()
            .await;
        docs_client(&server).batch_update("doc-1", Vec::new()).await.unwrap();
        mock.assert_async().await;
    }
}

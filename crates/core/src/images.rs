use async_trait::async_trait;
use futures::future::join_all;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::{
    endpoints::Endpoints,
    error::{NotesError, Result},
    http::{failure_message, transport_error},
    json::parse_fenced_json,
    model::ModelClient,
};

/// Characters of summary used to derive search queries.
pub const QUERY_INPUT_BUDGET: usize = 4_000;
pub const MAX_QUERIES: usize = 3;

/// Web image search returning the top hit's link.
#[async_trait]
pub trait ImageSearch: Send + Sync {
    async fn top_image(&self, query: &str) -> Result<Option<String>>;
}

/// Google Custom Search JSON API in image mode.
pub struct CustomSearchClient {
    client: Client,
    url: String,
    api_key: String,
    engine_id: String,
}

impl CustomSearchClient {
    pub fn new(client: Client, endpoints: &Endpoints, api_key: &str, engine_id: &str) -> Self {
        Self {
            client,
            url: endpoints.search_url.clone(),
            api_key: api_key.to_string(),
            engine_id: engine_id.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Deserialize)]
struct SearchItem {
    link: Option<String>,
}

#[async_trait]
impl ImageSearch for CustomSearchClient {
    async fn top_image(&self, query: &str) -> Result<Option<String>> {
        let response = self
            .client
            .get(&self.url)
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.engine_id.as_str()),
                ("q", query),
                ("searchType", "image"),
                ("num", "1"),
            ])
            .send()
            .await
            .map_err(|e| NotesError::Search(transport_error(e)))?;

        if !response.status().is_success() {
            let (status, message) = failure_message(response).await;
            return Err(NotesError::Search(format!("status {status}: {message}")));
        }

        let body = response
            .json::<SearchResponse>()
            .await
            .map_err(|e| NotesError::Search(format!("unreadable search response: {e}")))?;

        Ok(body.items.into_iter().next().and_then(|item| item.link))
    }
}

#[derive(Deserialize)]
struct QueriesReply {
    queries: Vec<serde_json::Value>,
}

fn query_prompt(summary: &str) -> String {
    let budget = summary
        .char_indices()
        .nth(QUERY_INPUT_BUDGET)
        .map_or(summary, |(i, _)| &summary[..i]);
    format!(
        r#"Based on the following summary, generate up to {MAX_QUERIES} concise and effective Google Image Search queries that would find relevant, high-quality images to illustrate the key topics.
GUIDELINES:
1. Queries should be simple and direct.
2. Respond with a valid JSON object with a single key "queries" containing an array of strings.
3. If the summary is too generic, return an empty array for the "queries" key.
SUMMARY:
---
{budget}
---"#
    )
}

/// Ask the model for up to three image search queries.
///
/// Image discovery is optional, so every failure here degrades to an empty
/// list after a log line.
pub async fn derive_queries(model: &dyn ModelClient, summary: &str) -> Vec<String> {
    if summary.trim().is_empty() {
        debug!("summary is empty, skipping image query generation");
        return Vec::new();
    }

    let reply = match model.generate(&query_prompt(summary), None).await {
        Ok(reply) => reply,
        Err(e) => {
            warn!(error = %e, "failed to generate image queries");
            return Vec::new();
        }
    };

    let parsed: QueriesReply = match parse_fenced_json(&reply) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(error = %e, "failed to parse image query response");
            return Vec::new();
        }
    };

    let queries: Vec<String> = parsed
        .queries
        .into_iter()
        .filter_map(|q| q.as_str().map(str::trim).map(str::to_string))
        .filter(|q| !q.is_empty())
        .take(MAX_QUERIES)
        .collect();
    debug!(?queries, "image queries derived");
    queries
}

/// Look up every query concurrently and keep the links that came back.
///
/// Lookups are isolated: an error or an empty result for one query drops
/// only that query. The batch fails only when every lookup errored.
pub async fn find_images(search: &dyn ImageSearch, queries: &[String]) -> Result<Vec<String>> {
    if queries.is_empty() {
        debug!("no search queries provided, skipping image search");
        return Ok(Vec::new());
    }

    let outcomes = join_all(queries.iter().map(|q| search.top_image(q))).await;

    let mut links = Vec::new();
    let mut errors = Vec::new();
    for (query, outcome) in queries.iter().zip(outcomes) {
        match outcome {
            Ok(Some(link)) => links.push(link),
            Ok(None) => debug!(%query, "no image items found for query"),
            Err(e) => {
                warn!(%query, error = %e, "image lookup failed");
                errors.push(e.to_string());
            }
        }
    }

    if errors.len() == queries.len() {
        return Err(NotesError::Search(errors.join("; ")));
    }

    info!(found = links.len(), queries = queries.len(), "image search finished");
    Ok(links)
}

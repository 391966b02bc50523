//! Generative-model oracle for ranking and search
//!
//! Both operations post a prompt to a `generateContent` endpoint with a
//! response schema asking for a JSON array of strings, then read the array
//! back out of the first candidate's text part.
//!
//! API Flow:
//! 1. POST {api_url}/v1beta/models/{model}:generateContent, key in `x-goog-api-key`
//! 2. candidates[0].content.parts[0].text → `["id", ...]`
use std::time::Duration;

use reqwest::{Client as HttpClient, RequestBuilder};
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    models::{CatalogProjection, UserInteractions, VideoRecord},
    services::providers::{RankingOracle, SearchOracle},
};

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Clone)]
pub struct GenerativeOracle {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    model: String,
}

impl GenerativeOracle {
    pub fn new(api_key: String, api_url: String, model: String, timeout: Duration) -> AppResult<Self> {
        let http_client = HttpClient::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            api_key,
            api_url,
            model,
        })
    }

    /// generateContent request for `prompt`; the key travels as a header so
    /// it never appears in URLs that errors and traces print
    fn build_request(&self, prompt: String) -> RequestBuilder {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_url.trim_end_matches('/'),
            self.model
        );

        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": {
                    "type": "ARRAY",
                    "items": { "type": "STRING" }
                }
            }
        });

        self.http_client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
    }

    /// Sends a prompt and returns the identifier array the model produced
    async fn generate_identifiers(&self, prompt: String) -> AppResult<Vec<String>> {
        let response = self
            .build_request(prompt)
            .send()
            .await
            .map_err(|e| AppError::from(e.without_url()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "Oracle API returned status {}: {}",
                status, body
            )));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| AppError::from(e.without_url()))?;
        parse_identifier_response(&payload)
    }
}

/// Extracts the identifier array from a generateContent response
///
/// An empty text part is an empty answer; a missing part or text that is not a
/// JSON array of strings is malformed.
pub(crate) fn parse_identifier_response(payload: &Value) -> AppResult<Vec<String>> {
    let text = payload["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .ok_or_else(|| AppError::ExternalApi("Oracle response missing text part".to_string()))?;

    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    serde_json::from_str::<Vec<String>>(text).map_err(|e| {
        tracing::debug!(error = %e, text = %text, "Oracle text is not an identifier array");
        AppError::ExternalApi(format!("Malformed oracle response: {}", e))
    })
}

fn projection_json(projection: &[CatalogProjection]) -> String {
    serde_json::to_string(projection).unwrap_or_else(|_| "[]".to_string())
}

fn ranking_prompt(catalog: &[VideoRecord], interactions: &UserInteractions) -> String {
    let projection: Vec<CatalogProjection> = catalog.iter().map(CatalogProjection::from).collect();
    let history = serde_json::to_string(&interactions.watch_history).unwrap_or_else(|_| "[]".to_string());

    format!(
        "You order a horror video catalog for a single viewer.\n\
         Catalog: {}\n\
         Liked ids: {:?}\n\
         Disliked ids: {:?}\n\
         Saved ids: {:?}\n\
         Watch history (id, fraction watched): {}\n\
         Return only a JSON array of catalog ids, most relevant first.",
        projection_json(&projection),
        interactions.liked_ids,
        interactions.disliked_ids,
        interactions.saved_ids,
        history,
    )
}

fn search_prompt(query: &str, projection: &[CatalogProjection]) -> String {
    format!(
        "These videos are in the catalog: {}\n\
         The viewer is searching for: \"{}\".\n\
         Work out the intent behind the search and pick the most fitting videos.\n\
         Return only a JSON array of the matching ids, best match first.",
        projection_json(projection),
        query,
    )
}

#[async_trait::async_trait]
impl RankingOracle for GenerativeOracle {
    async fn rank(
        &self,
        catalog: &[VideoRecord],
        interactions: &UserInteractions,
    ) -> AppResult<Vec<String>> {
        let ids = self
            .generate_identifiers(ranking_prompt(catalog, interactions))
            .await?;

        tracing::info!(
            catalog = catalog.len(),
            ranked = ids.len(),
            model = %self.model,
            "Ranking oracle answered"
        );

        Ok(ids)
    }
}

#[async_trait::async_trait]
impl SearchOracle for GenerativeOracle {
    async fn search(
        &self,
        query: &str,
        projection: &[CatalogProjection],
    ) -> AppResult<Vec<String>> {
        let ids = self.generate_identifiers(search_prompt(query, projection)).await?;

        tracing::info!(
            query = %query,
            results = ids.len(),
            model = %self.model,
            "Search oracle answered"
        );

        Ok(ids)
    }
}

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::utils;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Any of these means "AI unavailable" to the assembler; none of them may
/// fail an analysis request.
#[derive(Debug, Error)]
pub enum AiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("model endpoint returned {0}")]
    Status(u16),
    #[error("no analysis text in model response")]
    EmptyResponse,
    #[error("model response was not valid JSON")]
    MalformedResponse,
}

/// Structured fields returned by the model. Everything is optional; the
/// assembler fills gaps from the heuristic fallback.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AiAnalysis {
    pub summary: Option<String>,
    pub category: Option<String>,
    pub difficulty: Option<String>,
    pub reading_time: Option<String>,
    pub tags: Vec<String>,
    pub specifications: Option<serde_json::Value>,
    pub metadata: Option<serde_json::Value>,
    #[serde(skip)]
    pub model: String,
}

/// Scraped values seeded into the prompt so the model cannot silently drop
/// fields the extractor already established.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalysisInput<'a> {
    pub url: &'a str,
    pub platform: &'a str,
    pub title: &'a str,
    pub context: &'a str,
    pub stars: Option<&'a str>,
    pub forks: Option<&'a str>,
    pub author: Option<&'a str>,
    pub price: Option<&'a str>,
}

pub struct AiAnalyzer {
    client: Client,
    api_key: String,
    model: String,
}

impl AiAnalyzer {
    pub fn new(api_key: String, model: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn analyze(&self, input: &AnalysisInput<'_>) -> Result<AiAnalysis, AiError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let payload = json!({
            "contents": [
                { "parts": [{ "text": build_prompt(input) }] }
            ],
            "generationConfig": {
                "temperature": 0.4,
                "maxOutputTokens": 1024
            }
        });

        let endpoint = format!(
            "{API_BASE}/models/{}:generateContent?key={}",
            self.model, self.api_key
        );
        let response = self
            .client
            .post(&endpoint)
            .headers(headers)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AiError::Status(status.as_u16()));
        }

        let body = response.json::<serde_json::Value>().await?;
        let text = body["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .ok_or(AiError::EmptyResponse)?;

        let mut analysis = parse_analysis(text)?;
        analysis.model = self.model.clone();
        Ok(analysis)
    }
}

fn build_prompt(input: &AnalysisInput<'_>) -> String {
    let mut known = String::new();
    for (key, value) in [
        ("stars", input.stars),
        ("forks", input.forks),
        ("author", input.author),
        ("price", input.price),
    ] {
        if let Some(value) = value {
            known.push_str(&format!("- {key}: {value}\n"));
        }
    }
    if known.is_empty() {
        known.push_str("- none\n");
    }

    format!(
        "Analyze the following page and reply with a single JSON object only, no surrounding text.\n\
         Required keys:\n\
         - \"summary\": 2-3 sentence summary\n\
         - \"category\": exactly one of \"Videos\", \"Coding\", \"Shopping\", \"Research\", \"Articles\"\n\
         - \"difficulty\": exactly one of \"Easy\", \"Medium\", \"Advanced\"\n\
         - \"readingTime\": estimate like \"5 min\"\n\
         - \"tags\": 3-6 short lowercase strings\n\
         - \"specifications\": object of product attributes (shopping pages only, otherwise omit)\n\
         - \"metadata\": object echoing the known metadata below, plus anything notable you can add (e.g. likes)\n\n\
         Known metadata (authoritative, repeat as-is):\n{known}\n\
         URL: {url}\n\
         Platform: {platform}\n\
         Title: {title}\n\n\
         Content:\n{context}",
        known = known,
        url = input.url,
        platform = input.platform,
        title = input.title,
        context = input.context,
    )
}

/// Strict parse first; if the model wrapped the object in prose, recover the
/// first balanced `{...}` span.
pub fn parse_analysis(text: &str) -> Result<AiAnalysis, AiError> {
    if let Ok(analysis) = serde_json::from_str::<AiAnalysis>(text) {
        return Ok(analysis);
    }
    let span = utils::first_json_object(text).ok_or(AiError::MalformedResponse)?;
    serde_json::from_str(span).map_err(|_| AiError::MalformedResponse)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub version: String,
}

/// Models supporting content generation, sorted by name.
pub async fn list_models(api_key: &str) -> Result<Vec<ModelInfo>, AiError> {
    let client = Client::new();
    let endpoint = format!("{API_BASE}/models?key={api_key}");
    let response = client.get(&endpoint).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(AiError::Status(status.as_u16()));
    }

    let body = response.json::<serde_json::Value>().await?;
    let mut models: Vec<ModelInfo> = body["models"]
        .as_array()
        .map(|models| {
            models
                .iter()
                .filter(|model| supports_generation(model))
                .filter_map(|model| serde_json::from_value(model.clone()).ok())
                .collect()
        })
        .unwrap_or_default();
    models.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(models)
}

fn supports_generation(model: &serde_json::Value) -> bool {
    model["supportedGenerationMethods"]
        .as_array()
        .is_some_and(|methods| methods.iter().any(|m| m.as_str() == Some("generateContent")))
}

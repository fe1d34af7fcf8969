// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Note summaries via a Hugging Face inference endpoint.
//!
//! The provider is optional. Without an API key, or when the provider call
//! fails, a local summary is returned instead so the endpoint always answers.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub const DEFAULT_SUMMARY_URL: &str =
    "https://api-inference.huggingface.co/models/facebook/bart-large-cnn";

/// Inputs beyond this many characters are cut before sending.
const MAX_INPUT_CHARS: usize = 3500;
const SUMMARY_MAX_LENGTH: u32 = 250;
const SUMMARY_MIN_LENGTH: u32 = 80;
/// Local summaries keep this many characters.
const LOCAL_SUMMARY_CHARS: usize = 100;
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Where a summary came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SummarySource {
    Provider,
    Local,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub text: String,
    pub source: SummarySource,
}

#[derive(Serialize)]
struct SummaryRequest<'a> {
    inputs: &'a str,
    parameters: SummaryParameters,
}

#[derive(Serialize)]
struct SummaryParameters {
    max_length: u32,
    min_length: u32,
}

#[derive(Deserialize)]
struct SummaryItem {
    summary_text: String,
}

/// Summarization client.
#[derive(Clone)]
pub struct TextGenerationService {
    http: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl TextGenerationService {
    pub fn new(api_key: Option<String>, url: Option<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();

        Self {
            http,
            url: url.unwrap_or_else(|| DEFAULT_SUMMARY_URL.to_string()),
            api_key,
        }
    }

    /// Whether a provider is configured at all.
    pub fn has_provider(&self) -> bool {
        self.api_key.is_some()
    }

    /// Summarize `content`, falling back to a local summary on any failure.
    pub async fn summarize(&self, content: &str) -> Summary {
        let Some(api_key) = self.api_key.as_deref() else {
            return local_summary(content);
        };

        match self.request_summary(api_key, content).await {
            Ok(text) => Summary {
                text,
                source: SummarySource::Provider,
            },
            Err(e) => {
                tracing::warn!(error = %e, "Summary provider failed, using local summary");
                local_summary(content)
            }
        }
    }

    async fn request_summary(&self, api_key: &str, content: &str) -> Result<String, AppError> {
        let body = SummaryRequest {
            inputs: truncate_chars(content, MAX_INPUT_CHARS),
            parameters: SummaryParameters {
                max_length: SUMMARY_MAX_LENGTH,
                min_length: SUMMARY_MIN_LENGTH,
            },
        };

        let response = self
            .http
            .post(&self.url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::TextGeneration(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::TextGeneration(format!("HTTP {}: {}", status, text)));
        }

        let items: Vec<SummaryItem> = response
            .json()
            .await
            .map_err(|e| AppError::TextGeneration(format!("Invalid response: {}", e)))?;

        items
            .into_iter()
            .next()
            .map(|item| item.summary_text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| AppError::TextGeneration("Empty summary".to_string()))
    }
}

/// Summary used when no provider is available.
pub fn local_summary(content: &str) -> Summary {
    let text = if content.chars().count() > LOCAL_SUMMARY_CHARS {
        format!("{}...", truncate_chars(content, LOCAL_SUMMARY_CHARS))
    } else {
        content.to_string()
    };

    Summary {
        text,
        source: SummarySource::Local,
    }
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

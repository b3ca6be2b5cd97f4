use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::SearchConfig;
use crate::services::{OperationResult, Search};

const NO_RESULT: &str = "No good search result found.";

/// Sentences kept from the encyclopedia fallback.
const SUMMARY_SENTENCES: usize = 2;

#[derive(Debug, Deserialize)]
struct InstantAnswer {
    #[serde(rename = "AbstractText", default)]
    abstract_text: String,
}

#[derive(Debug, Deserialize)]
struct PageSummary {
    #[serde(default)]
    extract: String,
}

/// Instant-answer lookup with an encyclopedia summary fallback.
pub struct WebSearch {
    client: reqwest::Client,
    config: SearchConfig,
}

impl WebSearch {
    pub fn new(config: SearchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .context("Failed to build search HTTP client")?;
        Ok(Self { client, config })
    }

    async fn instant_answer(&self, query: &str) -> Result<String> {
        let response = self
            .client
            .get(&self.config.api_url)
            .query(&[("q", query), ("format", "json"), ("no_html", "1")])
            .send()
            .await
            .context("Failed to reach search endpoint")?
            .error_for_status()
            .context("Search endpoint returned an error")?;

        // The instant-answer API may label JSON as javascript; decode from text.
        let body = response.text().await.context("Failed to read search response")?;
        let answer: InstantAnswer =
            serde_json::from_str(&body).context("Failed to parse search response")?;
        Ok(answer.abstract_text)
    }

    async fn encyclopedia_summary(&self, query: &str) -> Result<String> {
        let url = format!(
            "{}/{}",
            self.config.wikipedia_url.trim_end_matches('/'),
            urlencoding::encode(query)
        );
        let summary: PageSummary = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to reach encyclopedia endpoint")?
            .error_for_status()
            .context("Encyclopedia endpoint returned an error")?
            .json()
            .await
            .context("Failed to parse encyclopedia response")?;

        let text = first_sentences(&summary.extract, SUMMARY_SENTENCES);
        if text.is_empty() {
            anyhow::bail!("Empty encyclopedia summary for '{}'", query);
        }
        Ok(text)
    }

    async fn try_lookup(&self, query: &str) -> Result<String> {
        let abstract_text = self.instant_answer(query).await?;
        if !abstract_text.trim().is_empty() {
            return Ok(abstract_text);
        }
        debug!("No instant answer for '{}', trying encyclopedia", query);
        self.encyclopedia_summary(query).await
    }
}

#[async_trait]
impl Search for WebSearch {
    async fn lookup(&self, query: &str) -> OperationResult {
        match self.try_lookup(query).await {
            Ok(text) => OperationResult::success(text),
            Err(e) => {
                warn!("Search for '{}' failed: {:#}", query, e);
                OperationResult::Failure(NO_RESULT.to_string())
            }
        }
    }
}

/// Keep the first `count` sentences of `text`.
fn first_sentences(text: &str, count: usize) -> String {
    let text = text.trim();
    let mut seen = 0;
    for (idx, ch) in text.char_indices() {
        if matches!(ch, '.' | '!' | '?') {
            let next = text[idx + ch.len_utf8()..].chars().next();
            if next.map_or(true, char::is_whitespace) {
                seen += 1;
                if seen == count {
                    return text[..idx + ch.len_utf8()].to_string();
                }
            }
        }
    }
    text.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn search(server: &MockServer) -> WebSearch {
        WebSearch::new(SearchConfig {
            api_url: server.url("/"),
            wikipedia_url: server.url("/wiki"),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[test]
    fn test_first_sentences() {
        assert_eq!(
            first_sentences("Rust is a language. It is fast. It is safe.", 2),
            "Rust is a language. It is fast."
        );
        assert_eq!(first_sentences("Version 1.0 shipped", 2), "Version 1.0 shipped");
        assert_eq!(first_sentences("", 2), "");
    }

    #[tokio::test]
    async fn test_abstract_text_is_returned() {
        let server = MockServer::start_async().await;
        let ddg = server.mock(|when, then| {
            when.method(GET)
                .path("/")
                .query_param("q", "rust language")
                .query_param("format", "json")
                .query_param("no_html", "1");
            then.status(200)
                .json_body(json!({"AbstractText": "Rust is a programming language."}));
        });

        let result = search(&server).lookup("rust language").await;

        ddg.assert();
        assert_eq!(
            result,
            OperationResult::success("Rust is a programming language.")
        );
    }

    #[tokio::test]
    async fn test_empty_abstract_falls_back_to_encyclopedia() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/");
            then.status(200).json_body(json!({"AbstractText": ""}));
        });
        let wiki = server.mock(|when, then| {
            when.method(GET).path("/wiki/ferris");
            then.status(200).json_body(json!({
                "extract": "Ferris is a crab. Ferris is the Rust mascot. Ferris is orange."
            }));
        });

        let result = search(&server).lookup("ferris").await;

        wiki.assert();
        assert_eq!(
            result.text(),
            "Ferris is a crab. Ferris is the Rust mascot."
        );
    }

    #[tokio::test]
    async fn test_total_failure_reports_no_result() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/");
            then.status(503);
        });

        let result = search(&server).lookup("anything").await;
        assert_eq!(result.text(), NO_RESULT);
    }
}

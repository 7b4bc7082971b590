use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{header, Client};
use std::time::Duration;

/// Anything that can fetch a page body. Implemented by `reqwest::Client`;
/// tests substitute saved fixture documents.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn get_text(&self, url: &str) -> Result<String>;
}

#[async_trait]
impl Fetcher for Client {
    async fn get_text(&self, url: &str) -> Result<String> {
        tracing::debug!("GET {}", url);
        let response = self
            .get(url)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", url))?
            .error_for_status()
            .with_context(|| format!("Unexpected status from {}", url))?;

        response
            .text()
            .await
            .with_context(|| format!("Failed to read body of {}", url))
    }
}

/// Creates an HTTP client that looks like a regular browser session
pub fn create_http_client(user_agent: &str, timeout: Duration) -> Result<Client> {
    let mut headers = header::HeaderMap::new();

    headers.insert(
        header::ACCEPT,
        header::HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
    );
    headers.insert(
        header::ACCEPT_LANGUAGE,
        header::HeaderValue::from_static("en-US,en;q=0.9,nl;q=0.8")
    );
    headers.insert(
        header::DNT,
        header::HeaderValue::from_static("1")
    );
    headers.insert(
        "Upgrade-Insecure-Requests",
        header::HeaderValue::from_static("1")
    );
    headers.insert(
        "Sec-Fetch-Dest",
        header::HeaderValue::from_static("document")
    );
    headers.insert(
        "Sec-Fetch-Mode",
        header::HeaderValue::from_static("navigate")
    );

    let client = Client::builder()
        .user_agent(user_agent)
        .default_headers(headers)
        .timeout(timeout)
        .cookie_store(true)
        .build()
        .context("Failed to build HTTP client")?;

    Ok(client)
}

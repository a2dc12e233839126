//! Shared HTTP plumbing for the external service clients
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.2.0

use anyhow::{anyhow, Result};
use log::debug;
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Timeout for every outbound request
pub const HTTP_TIMEOUT_SECS: u64 = 15;

/// Nominatim rejects requests without an identifying agent
pub const USER_AGENT: &str = "AssistantBot/0.3 (personal assistant)";

/// Build a client with the shared timeout and user agent
pub fn build_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .user_agent(USER_AGENT)
        .build()?)
}

/// Send a request, turning transport failures into readable errors
pub async fn send(request: RequestBuilder) -> Result<Response> {
    request.send().await.map_err(|e| {
        if e.is_timeout() {
            anyhow!("Request timed out after {HTTP_TIMEOUT_SECS} seconds")
        } else if e.is_connect() {
            anyhow!("Could not connect to the server")
        } else {
            anyhow!("HTTP request failed: {e}")
        }
    })
}

/// Check the status and decode a JSON body
pub async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        return Err(anyhow!("Server returned HTTP {status}"));
    }
    debug!("Decoding JSON response from {}", response.url());
    response
        .json::<T>()
        .await
        .map_err(|e| anyhow!("Unexpected response body: {e}"))
}

/// Send and decode in one step
pub async fn get_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T> {
    read_json(send(request).await?).await
}

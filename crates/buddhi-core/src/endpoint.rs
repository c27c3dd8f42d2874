use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Serialize)]
struct AskRequest<'a> {
    question: &'a str,
}

#[derive(Deserialize)]
struct AskResponse {
    #[serde(default)]
    reply: Option<String>,
}

#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("could not reach {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("endpoint responded with status {0}")]
    Status(StatusCode),

    #[error("malformed endpoint response: {0}")]
    Body(#[source] reqwest::Error),

    #[error("could not build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Anything that turns a question into a full reply.
///
/// An empty string means the endpoint answered without a reply; the session
/// substitutes its placeholder in that case.
#[async_trait]
pub trait Endpoint: Send + Sync {
    async fn ask(&self, question: &str) -> Result<String, EndpointError>;
}

/// JSON-over-HTTP endpoint: `POST {question}` answered by `{reply}`.
#[derive(Clone)]
pub struct HttpEndpoint {
    client: Client,
    url: String,
}

impl HttpEndpoint {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, EndpointError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(EndpointError::Client)?;

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Endpoint for HttpEndpoint {
    async fn ask(&self, question: &str) -> Result<String, EndpointError> {
        tracing::debug!(url = %self.url, chars = question.chars().count(), "sending question");

        let response = self
            .client
            .post(&self.url)
            .json(&AskRequest { question })
            .send()
            .await
            .map_err(|source| EndpointError::Transport {
                url: self.url.clone(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(EndpointError::Status(response.status()));
        }

        let body: AskResponse = response.json().await.map_err(EndpointError::Body)?;
        Ok(body.reply.unwrap_or_default())
    }
}

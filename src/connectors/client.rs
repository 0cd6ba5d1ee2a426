use super::errors::ConnectorError;
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::Instrument;

/// Shared HTTP plumbing for the check and remediation collaborators.
#[derive(Clone)]
pub struct CollaboratorClient {
    http_client: reqwest::Client,
    base_url: String,
    retry_attempts: usize,
    auth_header: Option<String>,
}

impl CollaboratorClient {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        retry_attempts: usize,
        auth_token: Option<String>,
    ) -> Result<Self, ConnectorError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ConnectorError::Internal(format!("HTTP client error: {}", err)))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry_attempts: retry_attempts.max(1),
            auth_header: auth_token.map(|token| format!("Bearer {}", token)),
        })
    }

    /// Sends a request, retrying server errors and transport failures with
    /// exponential backoff. Client errors are returned immediately.
    pub async fn send_request<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Value, ConnectorError>
    where
        B: Serialize + ?Sized,
    {
        let mut attempt = 0usize;
        let mut last_error: Option<ConnectorError> = None;

        while attempt < self.retry_attempts {
            attempt += 1;
            let mut builder = self
                .http_client
                .request(method.clone(), format!("{}{}", self.base_url, path));

            if let Some(auth) = &self.auth_header {
                builder = builder.header("Authorization", auth);
            }
            if let Some(body) = body {
                builder = builder.json(body);
            }

            let span = tracing::info_span!(
                "collaborator_http_request",
                path,
                attempt,
                method = %method,
            );

            match builder.send().instrument(span).await {
                Ok(resp) => {
                    let status = resp.status();
                    let text = resp
                        .text()
                        .await
                        .map_err(|err| ConnectorError::HttpError(err.to_string()))?;

                    if status.is_success() {
                        if text.trim().is_empty() {
                            return Ok(Value::Null);
                        }
                        return serde_json::from_str::<Value>(&text)
                            .map_err(|_| ConnectorError::InvalidResponse(text));
                    }

                    let error = match status {
                        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                            ConnectorError::Unauthorized(text)
                        }
                        StatusCode::NOT_FOUND => ConnectorError::NotFound(text),
                        status if status.is_server_error() => ConnectorError::ServiceUnavailable(
                            format!("collaborator error {}: {}", status, text),
                        ),
                        status => {
                            ConnectorError::HttpError(format!("collaborator error {}: {}", status, text))
                        }
                    };

                    if !status.is_server_error() {
                        return Err(error);
                    }
                    last_error = Some(error);
                }
                Err(err) => {
                    last_error = Some(ConnectorError::from(err));
                }
            }

            if attempt < self.retry_attempts {
                let backoff = Duration::from_millis(100 * (1_u64 << (attempt - 1)));
                tokio::time::sleep(backoff).await;
            }
        }

        Err(last_error.unwrap_or_else(|| {
            ConnectorError::ServiceUnavailable("collaborator request failed".to_string())
        }))
    }
}

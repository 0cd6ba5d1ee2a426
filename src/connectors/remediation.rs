use super::client::CollaboratorClient;
use super::errors::ConnectorError;
use super::Remediator;
use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;

/// Triggers fixes through `{base_url}/remediations/{check_id}`.
pub struct HttpRemediator {
    client: CollaboratorClient,
}

impl HttpRemediator {
    pub fn new(client: CollaboratorClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Remediator for HttpRemediator {
    async fn remediate(&self, check_id: &str) -> Result<String, ConnectorError> {
        let path = format!("/remediations/{}", urlencoding::encode(check_id));
        let body = self
            .client
            .send_request::<Value>(Method::POST, &path, None)
            .await?;

        if body.get("success").and_then(Value::as_bool) == Some(false) {
            let reason = body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("remediation reported failure");
            return Err(ConnectorError::Internal(reason.to_string()));
        }

        Ok(body
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("Remediation for {} completed", check_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn remediator(status: u16, body: Value) -> (MockServer, HttpRemediator) {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/remediations/phi-encryption"))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&server)
            .await;
        let client =
            CollaboratorClient::new(&server.uri(), Duration::from_secs(2), 1, None).unwrap();
        (server, HttpRemediator::new(client))
    }

    #[tokio::test]
    async fn returns_collaborator_message() {
        let (_server, remediator) =
            remediator(200, json!({"success": true, "message": "Re-encrypted 2 volumes"})).await;
        assert_eq!(
            remediator.remediate("phi-encryption").await.unwrap(),
            "Re-encrypted 2 volumes"
        );
    }

    #[tokio::test]
    async fn reported_failure_is_an_error() {
        let (_server, remediator) =
            remediator(200, json!({"success": false, "message": "key vault locked"})).await;
        let err = remediator.remediate("phi-encryption").await.unwrap_err();
        assert_eq!(err, ConnectorError::Internal("key vault locked".into()));
    }

    #[tokio::test]
    async fn http_failure_is_an_error() {
        let (_server, remediator) = remediator(500, json!({"error": "boom"})).await;
        assert!(matches!(
            remediator.remediate("phi-encryption").await,
            Err(ConnectorError::ServiceUnavailable(_))
        ));
    }
}

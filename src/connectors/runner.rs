use super::client::CollaboratorClient;
use super::errors::ConnectorError;
use super::CheckRunner;
use crate::health::{CheckExecutionError, HealthCheckDefinition, RawCheckOutput};
use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;

/// Payload returned by the inspection service. Checks are heterogeneous, so
/// every field is loose here and tightened in [`CheckResponse::into_output`].
#[derive(Debug, Default, Deserialize)]
pub struct CheckResponse {
    #[serde(default)]
    pub score: Value,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub details: Option<Vec<Value>>,
    #[serde(default)]
    pub recommendations: Option<Vec<Value>>,
}

fn score_from_value(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => s.trim().trim_end_matches('%').parse().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

fn text_list(values: Option<Vec<Value>>) -> Vec<String> {
    values
        .unwrap_or_default()
        .into_iter()
        .map(|v| match v {
            Value::String(s) => s,
            other => other.to_string(),
        })
        .collect()
}

impl CheckResponse {
    pub fn into_output(self, definition: &HealthCheckDefinition) -> RawCheckOutput {
        let score = score_from_value(&self.score);
        let message = self
            .message
            .unwrap_or_else(|| format!("{} completed", definition.name));

        RawCheckOutput::new(score, message)
            .with_details(text_list(self.details))
            .with_recommendations(text_list(self.recommendations))
    }
}

/// Runs checks by posting the definition to `{base_url}/checks/{id}`.
pub struct HttpCheckRunner {
    client: CollaboratorClient,
}

impl HttpCheckRunner {
    pub fn new(client: CollaboratorClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CheckRunner for HttpCheckRunner {
    async fn run(
        &self,
        definition: &HealthCheckDefinition,
    ) -> Result<RawCheckOutput, CheckExecutionError> {
        let path = format!("/checks/{}", urlencoding::encode(&definition.id));
        let body = self
            .client
            .send_request(Method::POST, &path, Some(definition))
            .await?;

        let response: CheckResponse = serde_json::from_value(body)
            .map_err(|err| ConnectorError::InvalidResponse(err.to_string()))?;
        Ok(response.into_output(definition))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn definition() -> HealthCheckDefinition {
        HealthCheckDefinition::new("phi-encryption", "PHI encryption", "security")
    }

    fn runner(server: &MockServer, retries: usize) -> HttpCheckRunner {
        let client =
            CollaboratorClient::new(&server.uri(), Duration::from_secs(2), retries, None).unwrap();
        HttpCheckRunner::new(client)
    }

    #[test]
    fn adapter_accepts_numeric_and_string_scores() {
        let def = definition();
        let numeric: CheckResponse = serde_json::from_value(json!({"score": 92})).unwrap();
        assert_eq!(numeric.into_output(&def).score, 92.0);

        let text: CheckResponse = serde_json::from_value(json!({"score": "87.5%"})).unwrap();
        assert_eq!(text.into_output(&def).score, 87.5);

        let garbage: CheckResponse = serde_json::from_value(json!({"score": "n/a"})).unwrap();
        assert!(garbage.into_output(&def).score.is_nan());

        let missing: CheckResponse = serde_json::from_value(json!({})).unwrap();
        let output = missing.into_output(&def);
        assert!(output.score.is_nan());
        assert_eq!(output.message, "PHI encryption completed");
    }

    #[test]
    fn adapter_stringifies_structured_details() {
        let response: CheckResponse = serde_json::from_value(json!({
            "score": 80,
            "details": ["disk encrypted", {"volume": "db"}],
            "recommendations": ["rotate keys"]
        }))
        .unwrap();
        let output = response.into_output(&definition());
        assert_eq!(output.details, vec!["disk encrypted", r#"{"volume":"db"}"#]);
        assert_eq!(output.recommendations, vec!["rotate keys"]);
    }

    #[tokio::test]
    async fn runs_check_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/checks/phi-encryption"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "score": 95,
                "message": "All volumes encrypted",
                "details": ["3/3 volumes"]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let output = runner(&server, 1).run(&definition()).await.unwrap();
        assert_eq!(output.score, 95.0);
        assert_eq!(output.message, "All volumes encrypted");
        assert_eq!(output.details, vec!["3/3 volumes"]);
    }

    #[tokio::test]
    async fn server_errors_become_unavailable_after_retries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/checks/phi-encryption"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .expect(2)
            .mount(&server)
            .await;

        let err = runner(&server, 2).run(&definition()).await.unwrap_err();
        assert!(matches!(err, CheckExecutionError::Unavailable(_)));
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/checks/phi-encryption"))
            .respond_with(ResponseTemplate::new(404).set_body_string("unknown check"))
            .expect(1)
            .mount(&server)
            .await;

        let err = runner(&server, 3).run(&definition()).await.unwrap_err();
        assert!(matches!(err, CheckExecutionError::Failed(_)));
    }
}

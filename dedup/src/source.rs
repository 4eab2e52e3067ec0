use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::error::SourceError;

/// Path on the bug-tracker backend that lists every bug eligible for embedding.
pub const FOR_EMBEDDING_PATH: &str = "/api/bug-reports/for-embedding";
/// Header carrying the shared secret between the backend and this service.
pub const SIMILARITY_KEY_HEADER: &str = "x-similarity-key";

/// BugSource supplies the corpus ingested at bootstrap.
///
/// Records are returned as raw JSON so that a single malformed entry can be
/// skipped without rejecting the whole corpus.
#[async_trait::async_trait]
pub trait BugSource: Send + Sync {
    async fn fetch_bugs(&self) -> Result<Vec<Value>, SourceError>;
}

/// Configures an [HttpBugSource].
#[derive(Debug, Clone)]
pub struct HttpSourceConfig {
    /// Backend origin, e.g. `https://localhost:5000`.
    pub base_url: String,
    /// Shared secret sent in [SIMILARITY_KEY_HEADER]. Not sent when empty.
    pub api_key: String,
    pub timeout: Duration,
    /// The backend commonly runs with a self-signed certificate.
    pub accept_invalid_certs: bool,
}

/// HttpBugSource fetches the corpus from the bug-tracker backend over HTTPS.
pub struct HttpBugSource {
    client: Client,
    url: String,
    api_key: String,
}

impl HttpBugSource {
    pub fn new(cfg: HttpSourceConfig) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(cfg.timeout)
            .danger_accept_invalid_certs(cfg.accept_invalid_certs)
            .build()
            .map_err(|e| SourceError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            url: format!("{}{FOR_EMBEDDING_PATH}", cfg.base_url.trim_end_matches('/')),
            api_key: cfg.api_key,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait::async_trait]
impl BugSource for HttpBugSource {
    async fn fetch_bugs(&self) -> Result<Vec<Value>, SourceError> {
        let mut req = self.client.get(&self.url);
        if !self.api_key.is_empty() {
            req = req.header(SIMILARITY_KEY_HEADER, &self.api_key);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| SourceError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SourceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| SourceError::Decode(e.to_string()))?;
        into_records(body)
    }
}

fn into_records(body: Value) -> Result<Vec<Value>, SourceError> {
    match body {
        Value::Array(items) => Ok(items),
        other => Err(SourceError::Decode(format!(
            "expected a JSON array of bugs, got {}",
            json_type(&other)
        ))),
    }
}

fn json_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn source_for(server: &MockServer, api_key: &str) -> HttpBugSource {
        HttpBugSource::new(HttpSourceConfig {
            base_url: server.uri(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(5),
            accept_invalid_certs: false,
        })
        .unwrap()
    }

    #[test]
    fn test_url() {
        let src = HttpBugSource::new(HttpSourceConfig {
            base_url: "https://localhost:5000/".into(),
            api_key: "secret".into(),
            timeout: Duration::from_secs(5),
            accept_invalid_certs: true,
        })
        .unwrap();
        assert_eq!(src.url(), "https://localhost:5000/api/bug-reports/for-embedding");
    }

    #[test]
    fn test_into_records() {
        let items = into_records(json!([{"bugId": "1"}, 3, null])).unwrap();
        assert_eq!(items.len(), 3);
        assert!(matches!(
            into_records(json!({"bugs": []})),
            Err(SourceError::Decode(msg)) if msg.contains("object")
        ));
    }

    #[tokio::test]
    async fn test_unreachable_backend() {
        let src = HttpBugSource::new(HttpSourceConfig {
            base_url: "http://127.0.0.1:1".into(),
            api_key: String::new(),
            timeout: Duration::from_secs(2),
            accept_invalid_certs: false,
        })
        .unwrap();
        assert!(matches!(src.fetch_bugs().await, Err(SourceError::Transport(_))));
    }

    #[tokio::test]
    async fn test_fetch_sends_key_and_decodes_array() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(FOR_EMBEDDING_PATH))
            .and(header(SIMILARITY_KEY_HEADER, "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"application": "Portal", "bugId": "BUG-1", "title": "Crash"},
                {"application": "Portal", "bugId": "BUG-2", "status": "Closed"},
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let bugs = source_for(&server, "secret").fetch_bugs().await.unwrap();
        assert_eq!(bugs.len(), 2);
        assert_eq!(bugs[1]["status"], "Closed");
    }

    #[tokio::test]
    async fn test_fetch_without_key_omits_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(FOR_EMBEDDING_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        assert!(source_for(&server, "").fetch_bugs().await.unwrap().is_empty());
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].headers.get(SIMILARITY_KEY_HEADER).is_none());
    }

    #[tokio::test]
    async fn test_fetch_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(FOR_EMBEDDING_PATH))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid similarity key"))
            .mount(&server)
            .await;

        match source_for(&server, "wrong").fetch_bugs().await {
            Err(SourceError::Status { status, body }) => {
                assert_eq!(status, 401);
                assert_eq!(body, "invalid similarity key");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_rejects_non_array_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(FOR_EMBEDDING_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"bugs": []})))
            .mount(&server)
            .await;

        assert!(matches!(
            source_for(&server, "secret").fetch_bugs().await,
            Err(SourceError::Decode(msg)) if msg.contains("object")
        ));
    }
}

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::{Transport, TransportError};
use crate::models::{ApiRequest, ApiResponse};

/// Transport backed by a shared `reqwest::Client` (connection pool included).
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Builds a client with a per-request timeout and an optional user agent.
    pub fn new(timeout: Duration, user_agent: Option<&str>) -> Result<Self, String> {
        let mut builder = reqwest::Client::builder().timeout(timeout);
        if let Some(agent) = user_agent {
            builder = builder.user_agent(agent.to_string());
        }
        let client = builder
            .build()
            .map_err(|e| format!("Failed to build HTTP client: {}", e))?;
        Ok(ReqwestTransport { client })
    }

    /// Wraps an already configured client.
    pub fn from_client(client: reqwest::Client) -> Self {
        ReqwestTransport { client }
    }
}

/// Maps a reqwest failure onto our transport taxonomy.
pub fn classify_error(error: &reqwest::Error) -> TransportError {
    let message = error.to_string();
    if error.is_timeout() {
        TransportError::Timeout(message)
    } else if error.is_connect() {
        TransportError::Connect(message)
    } else if error.is_builder() {
        TransportError::InvalidRequest(message)
    } else {
        TransportError::Other(message)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        debug!("Sending {} {}", request.method, request.url);

        let mut builder = self
            .client
            .request(request.method, &request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| classify_error(&e))?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(|e| classify_error(&e))?;

        debug!("Received {} ({} bytes)", status, body.len());
        Ok(ApiResponse::new(status, headers, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use mockito::Server;

    fn transport() -> ReqwestTransport {
        ReqwestTransport::new(Duration::from_secs(5), Some("authclient-test")).unwrap()
    }

    #[tokio::test]
    async fn test_send_forwards_method_headers_and_body() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("POST", "/api/workouts")
            .match_header("x-trace", "abc")
            .match_header("user-agent", "authclient-test")
            .match_body(r#"{"name":"legs"}"#)
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": 7}"#)
            .create_async()
            .await;

        let request = ApiRequest::post(format!("{}/api/workouts", server.url()))
            .with_header("x-trace", "abc")
            .unwrap()
            .with_json(&serde_json::json!({"name": "legs"}))
            .unwrap();

        let response = transport().send(request).await.expect("request should succeed");

        m.assert_async().await;
        assert_eq!(response.status, StatusCode::CREATED);
        assert_eq!(
            response.json::<serde_json::Value>().unwrap(),
            serde_json::json!({"id": 7})
        );
    }

    #[tokio::test]
    async fn test_error_statuses_are_responses_not_errors() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/missing")
            .with_status(404)
            .create_async()
            .await;

        let response = transport()
            .send(ApiRequest::get(format!("{}/api/missing", server.url())))
            .await
            .expect("404 is still a response");
        assert_eq!(response.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_connection_refused_is_classified_as_connect() {
        // Grab a free port, then close it again so nothing is listening there.
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let result = transport()
            .send(ApiRequest::get(format!("http://127.0.0.1:{}/unreachable", port)))
            .await;

        match result {
            Err(e) => assert_eq!(e.kind(), "connect"),
            Ok(r) => panic!("expected a transport failure, got {}", r.status),
        }
    }

    #[tokio::test]
    async fn test_invalid_url_is_classified_as_invalid_request() {
        let result = transport().send(ApiRequest::get("not a url")).await;
        match result {
            Err(e) => assert_eq!(e.kind(), "invalid_request"),
            Ok(r) => panic!("expected a builder failure, got {}", r.status),
        }
    }

    #[tokio::test]
    async fn test_from_client_keeps_client_defaults() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("GET", "/api/profile")
            .match_header("x-app-version", "2.1.0")
            .with_status(200)
            .create_async()
            .await;

        let mut defaults = http::HeaderMap::new();
        defaults.insert("x-app-version", http::HeaderValue::from_static("2.1.0"));
        let client = reqwest::Client::builder()
            .default_headers(defaults)
            .build()
            .unwrap();

        let response = ReqwestTransport::from_client(client)
            .send(ApiRequest::get(format!("{}/api/profile", server.url())))
            .await
            .unwrap();

        m.assert_async().await;
        assert_eq!(response.status, StatusCode::OK);
    }
}

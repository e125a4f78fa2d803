use std::time::Duration;

use async_trait::async_trait;

use crate::services::push::{Transport, TransportError, TransportRequest, TransportResponse};

/// [`Transport`] over a pooled reqwest client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn post(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let timeout = request.timeout;
        let mut builder = self
            .client
            .post(&request.url)
            .timeout(timeout)
            .body(request.body);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| classify(e, timeout))?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| classify(e, timeout))?;

        Ok(TransportResponse::new(status, body.to_vec()))
    }

    fn name(&self) -> &'static str {
        "reqwest"
    }
}

fn classify(error: reqwest::Error, timeout: Duration) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout(timeout)
    } else if error.is_connect() {
        TransportError::Connect(error.to_string())
    } else {
        TransportError::Request(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::client::{HttpClientConfig, build_http_client};
    use crate::external::testing::serve;
    use axum::Router;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use std::collections::BTreeMap;

    fn transport() -> ReqwestTransport {
        ReqwestTransport::new(build_http_client(&HttpClientConfig::default()).unwrap())
    }

    fn request(url: String, timeout: Duration) -> TransportRequest {
        let mut headers = BTreeMap::new();
        headers.insert("Authorization".to_string(), "Bearer abc".to_string());
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        TransportRequest {
            url,
            headers,
            body: br#"{"k":"v"}"#.to_vec(),
            timeout,
        }
    }

    #[tokio::test]
    async fn test_posts_headers_and_body() {
        let app = Router::new().route(
            "/send",
            post(|headers: HeaderMap, body: String| async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                (StatusCode::OK, format!("{auth}|{body}"))
            }),
        );
        let base = serve(app).await;

        let response = transport()
            .post(request(format!("{base}/send"), Duration::from_secs(5)))
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body_text(), r#"Bearer abc|{"k":"v"}"#);
    }

    #[tokio::test]
    async fn test_error_status_is_a_response_not_an_error() {
        let app = Router::new().route(
            "/send",
            post(|| async { (StatusCode::NOT_FOUND, "UNREGISTERED") }),
        );
        let base = serve(app).await;

        let response = transport()
            .post(request(format!("{base}/send"), Duration::from_secs(5)))
            .await
            .unwrap();

        assert_eq!(response.status, 404);
        assert!(!response.is_success());
        assert_eq!(response.body_text(), "UNREGISTERED");
    }

    #[tokio::test]
    async fn test_slow_server_times_out() {
        let app = Router::new().route(
            "/send",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                StatusCode::OK
            }),
        );
        let base = serve(app).await;

        let result = transport()
            .post(request(format!("{base}/send"), Duration::from_millis(100)))
            .await;

        assert_eq!(
            result.unwrap_err(),
            TransportError::Timeout(Duration::from_millis(100))
        );
    }

    #[tokio::test]
    async fn test_refused_connection_is_a_connect_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = transport()
            .post(request(format!("http://{addr}/send"), Duration::from_secs(5)))
            .await;

        assert!(matches!(result, Err(TransportError::Connect(_))));
    }
}

//! Query coordinator.
//!
//! Turns one decoded value into exactly one [`Outcome`]. The coordinator never
//! fails: transport errors, malformed payloads and timeouts all become the
//! local connection-error outcome.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, error, info, trace};

use crate::capability::DecodedValue;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::outcome::{CheckinResponse, Outcome};

/// A remote endpoint that records check-ins.
#[async_trait::async_trait]
pub trait CheckinApi: Send + Sync + std::fmt::Debug {
    /// Submit one identifier and return the endpoint's verdict.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response body is not a
    /// valid [`CheckinResponse`].
    async fn check_in(&self, id: &str) -> Result<CheckinResponse>;
}

/// [`CheckinApi`] over HTTP: `GET <base_url>?id=<value>`.
#[derive(Debug, Clone)]
pub struct HttpCheckinApi {
    client: reqwest::Client,
    base_url: reqwest::Url,
}

impl HttpCheckinApi {
    /// Create a client for the given endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not a valid URL or the HTTP client
    /// cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = reqwest::Url::parse(base_url).map_err(|e| Error::ConfigValidation {
            message: format!("api.url is not a valid URL ({base_url}): {e}"),
        })?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    /// Create a client from the loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if no endpoint is configured or it is invalid.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.api_url()?, config.request_timeout())
    }

    /// The endpoint being queried.
    #[must_use]
    pub fn base_url(&self) -> &reqwest::Url {
        &self.base_url
    }
}

#[async_trait::async_trait]
impl CheckinApi for HttpCheckinApi {
    async fn check_in(&self, id: &str) -> Result<CheckinResponse> {
        debug!(url = %self.base_url, id = %id, "Sending check-in request");

        let response = self
            .client
            .get(self.base_url.clone())
            .query(&[("id", id)])
            .send()
            .await?;

        // The endpoint reports failures in the body; the status code is not
        // part of the contract.
        let status = response.status();
        let body = response.text().await?;
        trace!(status = %status, body = %body, "Check-in response received");

        Ok(serde_json::from_str(&body)?)
    }
}

/// Issues check-in requests and maps their results to outcomes.
#[derive(Debug, Clone)]
pub struct QueryCoordinator {
    api: Arc<dyn CheckinApi>,
    timeout: Duration,
}

impl QueryCoordinator {
    /// Create a coordinator that gives up on a request after `timeout`.
    #[must_use]
    pub fn new(api: Arc<dyn CheckinApi>, timeout: Duration) -> Self {
        Self { api, timeout }
    }

    /// Submit one decoded value and return the outcome to display.
    pub async fn submit(&self, value: &DecodedValue) -> Outcome {
        let started = Instant::now();
        let result = tokio::time::timeout(self.timeout, self.api.check_in(value.as_str()))
            .await
            .unwrap_or_else(|_| Err(Error::timeout("check-in request")));
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match result {
            Ok(response) => {
                info!(
                    value = %value,
                    kind = %response.status,
                    elapsed_ms,
                    "Check-in completed"
                );
                Outcome::remote(response)
            }
            Err(e) => {
                error!(value = %value, error = %e, elapsed_ms, "Check-in request failed");
                Outcome::connection_error()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::init_test_logging;
    use crate::outcome::{OutcomeKind, OutcomeOrigin, CONNECTION_ERROR_MESSAGE};
    use crate::testing::{Reply, ScriptedApi};
    use mockito::{Matcher, Server};

    #[tokio::test]
    async fn test_http_check_in_sends_id_query() {
        init_test_logging();
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/exec")
            .match_query(Matcher::UrlEncoded("id".into(), "ABC123".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"status":"success","message":"OK"}"#)
            .create_async()
            .await;

        let api = HttpCheckinApi::new(&format!("{}/exec", server.url()), Duration::from_secs(5))
            .unwrap();
        let response = api.check_in("ABC123").await.unwrap();

        assert_eq!(response.status, OutcomeKind::Success);
        assert_eq!(response.message, "OK");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_http_check_in_keeps_base_query_and_encodes_id() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/exec")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("deployment".into(), "kiosk-1".into()),
                Matcher::UrlEncoded("id".into(), "A B&C".into()),
            ]))
            .with_body(r#"{"status":"warning","message":"Đã check-in trước đó"}"#)
            .create_async()
            .await;

        let url = format!("{}/exec?deployment=kiosk-1", server.url());
        let api = HttpCheckinApi::new(&url, Duration::from_secs(5)).unwrap();
        let response = api.check_in("A B&C").await.unwrap();

        assert_eq!(response.status, OutcomeKind::Warning);
        assert_eq!(response.message, "Đã check-in trước đó");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_http_check_in_ignores_status_code() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/exec")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(r#"{"status":"error","message":"Không tìm thấy đại biểu"}"#)
            .create_async()
            .await;

        let api = HttpCheckinApi::new(&format!("{}/exec", server.url()), Duration::from_secs(5))
            .unwrap();
        let response = api.check_in("NOPE").await.unwrap();
        assert_eq!(response.status, OutcomeKind::Error);
    }

    #[tokio::test]
    async fn test_http_check_in_rejects_malformed_body() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/exec")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body("<html>Internal Server Error</html>")
            .create_async()
            .await;

        let api = HttpCheckinApi::new(&format!("{}/exec", server.url()), Duration::from_secs(5))
            .unwrap();
        let err = api.check_in("ABC123").await.unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[tokio::test]
    async fn test_http_check_in_connection_refused() {
        init_test_logging();
        let api = HttpCheckinApi::new("http://127.0.0.1:1/exec", Duration::from_secs(5)).unwrap();
        let err = api.check_in("ABC123").await.unwrap_err();
        assert!(matches!(err, Error::Http(_)));
        assert!(err.is_connection_error());
    }

    #[test]
    fn test_http_api_rejects_invalid_url() {
        let err = HttpCheckinApi::new("not a url", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, Error::ConfigValidation { .. }));
    }

    #[test]
    fn test_http_api_from_config_requires_url() {
        let config = Config::default();
        assert!(matches!(
            HttpCheckinApi::from_config(&config),
            Err(Error::MissingApiUrl { .. })
        ));
    }

    #[tokio::test]
    async fn test_submit_maps_response() {
        let api = ScriptedApi::new([Reply::ok(OutcomeKind::Warning, "Đã check-in trước đó")]);
        let coordinator = QueryCoordinator::new(api.clone(), Duration::from_secs(1));

        let outcome = coordinator.submit(&DecodedValue::new("ABC123")).await;

        assert_eq!(outcome.kind, OutcomeKind::Warning);
        assert_eq!(outcome.origin, OutcomeOrigin::Remote);
        assert_eq!(outcome.message, "Đã check-in trước đó");
        assert_eq!(api.calls(), vec!["ABC123"]);
    }

    #[tokio::test]
    async fn test_submit_maps_failure_to_connection_error() {
        init_test_logging();
        let api = ScriptedApi::new([Reply::Fail]);
        let coordinator = QueryCoordinator::new(api, Duration::from_secs(1));

        let outcome = coordinator.submit(&DecodedValue::new("ABC123")).await;

        assert_eq!(outcome.kind, OutcomeKind::Error);
        assert_eq!(outcome.origin, OutcomeOrigin::Local);
        assert_eq!(outcome.message, CONNECTION_ERROR_MESSAGE);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_times_out_hung_request() {
        init_test_logging();
        let api = ScriptedApi::new([Reply::Hang]);
        let coordinator = QueryCoordinator::new(api, Duration::from_secs(15));

        let started = Instant::now();
        let outcome = coordinator.submit(&DecodedValue::new("ABC123")).await;

        assert_eq!(outcome.origin, OutcomeOrigin::Local);
        assert!(started.elapsed() >= Duration::from_secs(15));
        assert!(started.elapsed() < Duration::from_secs(16));
    }

    #[tokio::test]
    async fn test_submit_over_http_failure() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/exec")
            .match_query(Matcher::Any)
            .with_body("not json")
            .create_async()
            .await;

        let api = HttpCheckinApi::new(&format!("{}/exec", server.url()), Duration::from_secs(5))
            .unwrap();
        let coordinator = QueryCoordinator::new(Arc::new(api), Duration::from_secs(5));
        let outcome = coordinator.submit(&DecodedValue::new("ABC123")).await;

        assert_eq!(outcome.message, CONNECTION_ERROR_MESSAGE);
    }
}

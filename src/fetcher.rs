use std::time::Duration;

use reqwest::header::USER_AGENT;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::debug;

use crate::utils::error::AppError;

/// Structured reason attached to every terminal fetch failure, assigned at
/// the point of failure so no caller re-parses message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    RateLimited,
    Forbidden,
    Timeout,
    Other,
}

/// Terminal fetch failure: retries exhausted, or a non-retryable status.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct FetchError {
    pub class: FailureClass,
    pub status: Option<u16>,
    pub message: String,
}

/// Per-request knobs, resolved from the ruleset with global defaults.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub user_agent: String,
    pub timeout: Duration,
    pub retry: u32,
    pub backoff: Duration,
}

#[derive(Debug)]
pub struct FetchResponse {
    pub body: String,
    pub status: u16,
}

/// HTTP GET with linear backoff. 403/429/503 and transport errors are
/// retried; any other non-200 status is terminal on the first sight.
pub struct HttpFetcher {
    client: Client,
}

const RETRYABLE_STATUSES: &[u16] = &[403, 429, 503];

impl HttpFetcher {
    pub fn new() -> Result<Self, AppError> {
        let client = Client::builder().build()?;
        Ok(Self { client })
    }

    pub async fn fetch(&self, url: &str, opts: &FetchOptions) -> Result<FetchResponse, FetchError> {
        let mut last_error = String::new();
        let mut last_class = FailureClass::Other;
        let mut last_status = None;

        for attempt in 0..=opts.retry {
            let result = self
                .client
                .get(url)
                .header(USER_AGENT, opts.user_agent.as_str())
                .timeout(opts.timeout)
                .send()
                .await;

            match result {
                Ok(response) => {
                    let status = response.status();
                    if status == StatusCode::OK {
                        match response.text().await {
                            Ok(body) => {
                                return Ok(FetchResponse { body, status: status.as_u16() });
                            }
                            Err(err) => {
                                last_error = err.to_string();
                                last_class = class_for_transport(&err);
                                last_status = None;
                            }
                        }
                    } else if RETRYABLE_STATUSES.contains(&status.as_u16()) {
                        debug!(url, status = status.as_u16(), attempt, "retryable status");
                        last_error = format!("HTTP {}", status.as_u16());
                        last_class = class_for_status(status.as_u16());
                        last_status = Some(status.as_u16());
                    } else {
                        // Hard statuses are terminal on first sight.
                        return Err(FetchError {
                            class: FailureClass::Other,
                            status: Some(status.as_u16()),
                            message: format!("HTTP {}", status.as_u16()),
                        });
                    }
                }
                Err(err) => {
                    debug!(url, attempt, error = %err, "transport error");
                    last_error = err.to_string();
                    last_class = class_for_transport(&err);
                    last_status = None;
                }
            }

            // Linear backoff scaled by the 1-indexed attempt number.
            tokio::time::sleep(opts.backoff * (attempt + 1)).await;
        }

        debug!(url, retries = opts.retry, "fetch attempts exhausted");
        Err(FetchError {
            class: last_class,
            status: last_status,
            message: format!("HTTP GET failed: {last_error}"),
        })
    }
}

fn class_for_status(status: u16) -> FailureClass {
    match status {
        429 => FailureClass::RateLimited,
        403 => FailureClass::Forbidden,
        _ => FailureClass::Other,
    }
}

fn class_for_transport(err: &reqwest::Error) -> FailureClass {
    if err.is_timeout() {
        FailureClass::Timeout
    } else {
        FailureClass::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn quick_opts(retry: u32) -> FetchOptions {
        FetchOptions {
            user_agent: "pricewatch-test/1.0".to_string(),
            timeout: Duration::from_secs(1),
            retry,
            backoff: Duration::from_millis(5),
        }
    }

    #[tokio::test]
    async fn test_three_rate_limits_then_success_takes_four_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/item"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(3)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/item"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new().unwrap();
        let response = fetcher
            .fetch(&format!("{}/item", server.uri()), &quick_opts(3))
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body, "<html>ok</html>");
        assert_eq!(server.received_requests().await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_non_retryable_status_is_terminal_on_first_attempt() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new().unwrap();
        let err = fetcher
            .fetch(&server.uri(), &quick_opts(3))
            .await
            .unwrap_err();

        assert_eq!(err.class, FailureClass::Other);
        assert_eq!(err.status, Some(500));
        assert_eq!(err.message, "HTTP 500");
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_rate_limit_classified_as_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new().unwrap();
        let err = fetcher
            .fetch(&server.uri(), &quick_opts(1))
            .await
            .unwrap_err();

        assert_eq!(err.class, FailureClass::RateLimited);
        assert_eq!(err.status, Some(429));
        assert!(err.message.contains("HTTP 429"));
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_exhausted_forbidden_classified_as_forbidden() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new().unwrap();
        let err = fetcher
            .fetch(&server.uri(), &quick_opts(0))
            .await
            .unwrap_err();

        assert_eq!(err.class, FailureClass::Forbidden);
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_timeout_classified_as_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new().unwrap();
        let opts = FetchOptions {
            timeout: Duration::from_millis(100),
            ..quick_opts(0)
        };
        let err = fetcher.fetch(&server.uri(), &opts).await.unwrap_err();

        assert_eq!(err.class, FailureClass::Timeout);
        assert_eq!(err.status, None);
    }

    #[tokio::test]
    async fn test_custom_user_agent_is_sent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(wiremock::matchers::header("user-agent", "pricewatch-test/1.0"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new().unwrap();
        let response = fetcher.fetch(&server.uri(), &quick_opts(0)).await.unwrap();
        assert_eq!(response.status, 200);
    }
}

//! Reqwest-backed relay to third-party tracking endpoints.
//!
//! This adapter owns transport details only: method selection, timeout,
//! optional proxying and status acceptance.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Proxy, StatusCode};
use tracing::info;
use url::Url;

use crate::domain::ports::{RelayAck, RelayError, WebhookRelay};
use crate::domain::{ConfigurationError, Event};

const ACCEPTED_STATUSES: [StatusCode; 3] =
    [StatusCode::OK, StatusCode::CREATED, StatusCode::NO_CONTENT];

/// How the event reaches the endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RelayMethod {
    /// Plain `GET` of the endpoint URL.
    #[default]
    Get,
    /// `POST` with the event as a JSON body.
    Post,
}

impl FromStr for RelayMethod {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            other => Err(ConfigurationError::invalid(
                "relay_method",
                format!("unsupported method {other}"),
            )),
        }
    }
}

/// Outbound proxy and its basic-auth credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    /// Proxy URL applied to every relay call.
    pub url: Url,
    /// Basic-auth user name.
    pub username: Option<String>,
    /// Basic-auth password.
    pub password: Option<String>,
}

/// Relay adapter settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    /// Request method.
    pub method: RelayMethod,
    /// Whole-request timeout.
    pub timeout: Duration,
    /// Proxy used when present.
    pub proxy: Option<ProxyConfig>,
}

/// Relay adapter issuing one HTTP request per notification.
#[derive(Debug, Clone)]
pub struct HttpWebhookRelay {
    client: Client,
    method: RelayMethod,
}

impl HttpWebhookRelay {
    /// Build the relay and its HTTP client.
    ///
    /// # Errors
    /// Returns [`ConfigurationError`] when the proxy or client cannot be
    /// constructed.
    pub fn new(config: RelayConfig) -> Result<Self, ConfigurationError> {
        let mut builder = Client::builder().timeout(config.timeout);
        if let Some(proxy) = config.proxy {
            let mut outbound = Proxy::all(proxy.url.as_str())
                .map_err(|err| ConfigurationError::invalid("proxy_url", err.to_string()))?;
            if let Some(username) = proxy.username.as_deref() {
                outbound = outbound.basic_auth(username, proxy.password.as_deref().unwrap_or(""));
            }
            builder = builder.proxy(outbound);
        }
        let client = builder
            .build()
            .map_err(|err| ConfigurationError::invalid("relay", err.to_string()))?;
        Ok(Self {
            client,
            method: config.method,
        })
    }
}

fn map_transport_error(url: &Url, error: &reqwest::Error) -> RelayError {
    if error.is_timeout() {
        RelayError::transport(url.as_str(), "request timed out")
    } else {
        RelayError::transport(url.as_str(), error.to_string())
    }
}

#[async_trait]
impl WebhookRelay for HttpWebhookRelay {
    async fn notify(&self, url: &Url, event: &Event) -> Result<RelayAck, RelayError> {
        let request = match self.method {
            RelayMethod::Get => self.client.get(url.clone()),
            RelayMethod::Post => self.client.post(url.clone()).json(event),
        };
        let response = request
            .send()
            .await
            .map_err(|err| map_transport_error(url, &err))?;

        let status = response.status();
        if !ACCEPTED_STATUSES.contains(&status) {
            return Err(RelayError::status(url.as_str(), status.as_u16()));
        }
        info!(url = %url, status = status.as_u16(), "relay endpoint hit");
        Ok(RelayAck {
            status: status.as_u16(),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rstest::rstest;
    use wiremock::{Mock, MockServer, Request, ResponseTemplate, matchers};

    use super::*;
    use crate::domain::{RequestMetadata, build_event, validate_write_request};

    fn visit() -> Event {
        let payload = validate_write_request(
            br#"{"uid":"12345","action":"objectVisited","data":{"id":"fakeItemId"}}"#,
        )
        .expect("valid payload");
        let at = Utc
            .with_ymd_and_hms(2026, 2, 24, 10, 30, 0)
            .single()
            .expect("valid time");
        build_event(&payload, &RequestMetadata::default(), at)
    }

    fn relay(method: RelayMethod) -> HttpWebhookRelay {
        HttpWebhookRelay::new(RelayConfig {
            method,
            timeout: Duration::from_millis(500),
            proxy: None,
        })
        .expect("relay builds")
    }

    fn endpoint(server: &MockServer) -> Url {
        Url::parse(&format!("{}/point", server.uri())).expect("mock url")
    }

    #[rstest]
    #[case(200)]
    #[case(201)]
    #[case(204)]
    #[tokio::test]
    async fn accepted_statuses_resolve(#[case] status: u16) {
        let server = MockServer::start().await;
        Mock::given(matchers::method("GET"))
            .and(matchers::path("/point"))
            .respond_with(ResponseTemplate::new(status))
            .expect(1)
            .mount(&server)
            .await;

        let ack = relay(RelayMethod::Get)
            .notify(&endpoint(&server), &visit())
            .await
            .expect("accepted");
        assert_eq!(ack.status, status);
    }

    #[rstest]
    #[case(202)]
    #[case(404)]
    #[case(500)]
    #[tokio::test]
    async fn other_statuses_reject(#[case] status: u16) {
        let server = MockServer::start().await;
        Mock::given(matchers::method("GET"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;
        let url = endpoint(&server);

        let err = relay(RelayMethod::Get)
            .notify(&url, &visit())
            .await
            .expect_err("rejected");
        assert_eq!(
            err.to_string(),
            format!("Fetch failed {url} Incorrect response code {status}")
        );
    }

    #[tokio::test]
    async fn post_sends_event_json() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .and(matchers::body_partial_json(
                serde_json::json!({"uid": "12345", "itemId": "fakeItemId"}),
            ))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        relay(RelayMethod::Post)
            .notify(&endpoint(&server), &visit())
            .await
            .expect("accepted");
    }

    #[tokio::test]
    async fn slow_endpoint_times_out() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let err = relay(RelayMethod::Get)
            .notify(&endpoint(&server), &visit())
            .await
            .expect_err("timed out");
        assert!(matches!(err, RelayError::Transport { .. }));
        assert!(err.to_string().ends_with("request timed out"));
    }

    #[rstest]
    #[case("get", RelayMethod::Get)]
    #[case("POST", RelayMethod::Post)]
    fn method_parses_case_insensitively(#[case] raw: &str, #[case] expected: RelayMethod) {
        assert_eq!(raw.parse::<RelayMethod>().expect("method"), expected);
    }

    #[rstest]
    fn unknown_method_is_configuration_error() {
        assert!("PATCH".parse::<RelayMethod>().is_err());
    }

    #[tokio::test]
    async fn proxy_carries_calls_with_credentials() {
        let proxy = MockServer::start().await;
        Mock::given(matchers::method("GET"))
            .and(|request: &Request| request.url.host_str() == Some("partner.test"))
            .and(matchers::path("/point"))
            .and(matchers::header("proxy-authorization", "Basic dXNlcjpzZWNyZXQ="))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&proxy)
            .await;
        let relay = HttpWebhookRelay::new(RelayConfig {
            method: RelayMethod::Get,
            timeout: Duration::from_millis(500),
            proxy: Some(ProxyConfig {
                url: Url::parse(&proxy.uri()).expect("proxy url"),
                username: Some("user".to_owned()),
                password: Some("secret".to_owned()),
            }),
        })
        .expect("relay builds");

        let ack = relay
            .notify(
                &Url::parse("http://partner.test/point").expect("partner url"),
                &visit(),
            )
            .await
            .expect("accepted through proxy");
        assert_eq!(ack.status, 204);
    }
}

//! Authenticated, rate-limited HTTP transport.
//!
//! Every outbound request goes through [`HttpTransport::send`], which
//! - waits on the shared [`RateGate`],
//! - attaches exactly one `Authorization` header when credentials are set,
//! - turns transport failures and unexpected statuses into
//!   [`ClientError::RequestFailed`].

use crate::config::{ClientConfig, Credentials};
use crate::error::{ClientError, ClientResult};
use crate::gate::RateGate;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Longest response body excerpt kept in an error message.
const BODY_SNIPPET_LEN: usize = 1000;

/// A response that passed status classification.
#[derive(Debug)]
pub struct ApiResponse {
    /// `METHOD URL` of the request that produced this response.
    pub request: String,
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl ApiResponse {
    /// Returns true if the status is 2xx.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Decodes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> ClientResult<T> {
        serde_json::from_slice(&self.body).map_err(|e| ClientError::InvalidResponse {
            request: self.request.clone(),
            detail: e.to_string(),
        })
    }
}

/// HTTP transport bound to one service root.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    root_url: String,
    client: Client,
    authorization: Option<HeaderValue>,
    gate: Arc<RateGate>,
}

/// Builder for [`HttpTransport`]; validation happens in [`build`](Self::build).
#[derive(Debug, Default)]
pub struct HttpTransportBuilder {
    root_url: Option<String>,
    client: Option<Client>,
    credentials: Option<Credentials>,
    gate: Option<Arc<RateGate>>,
}

impl HttpTransportBuilder {
    pub fn root_url(mut self, root_url: impl Into<String>) -> Self {
        self.root_url = Some(root_url.into());
        self
    }

    /// The HTTP client handle every request is executed on.
    pub fn http_client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn credentials(mut self, credentials: Option<Credentials>) -> Self {
        self.credentials = credentials;
        self
    }

    /// Shares a rate gate with other transports. Defaults to no pacing.
    pub fn rate_gate(mut self, gate: Arc<RateGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Validates the settings and creates the transport.
    pub fn build(self) -> ClientResult<HttpTransport> {
        let root_url = self
            .root_url
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .ok_or_else(|| ClientError::Config("root URL must be set".to_string()))?;
        let client = self
            .client
            .ok_or_else(|| ClientError::Config("HTTP client must be set".to_string()))?;
        let authorization = self
            .credentials
            .as_ref()
            .map(authorization_header)
            .transpose()?;

        Ok(HttpTransport {
            root_url,
            client,
            authorization,
            gate: self
                .gate
                .unwrap_or_else(|| Arc::new(RateGate::unlimited())),
        })
    }
}

impl HttpTransport {
    pub fn builder() -> HttpTransportBuilder {
        HttpTransportBuilder::default()
    }

    /// Builds a transport and its HTTP client from configuration.
    pub fn from_config(config: &ClientConfig, gate: Arc<RateGate>) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(concat!("confpub/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::Config(format!("failed to create HTTP client: {e}")))?;

        Self::builder()
            .root_url(config.root_url.clone())
            .http_client(client)
            .credentials(config.credentials())
            .rate_gate(gate)
            .build()
    }

    /// Service root without a trailing slash.
    pub fn root_url(&self) -> &str {
        &self.root_url
    }

    /// Returns true if requests carry an `Authorization` header.
    pub fn is_authenticated(&self) -> bool {
        self.authorization.is_some()
    }

    /// Sends a request to `path` below the service root.
    ///
    /// `customize` adds query parameters, headers and body. Statuses listed
    /// in `tolerated` come back as responses instead of errors, which lets
    /// callers treat "already absent" as success.
    pub async fn send<F>(
        &self,
        method: Method,
        path: &str,
        customize: F,
        tolerated: &[StatusCode],
    ) -> ClientResult<ApiResponse>
    where
        F: FnOnce(RequestBuilder) -> RequestBuilder,
    {
        let url = format!("{}{}", self.root_url, path);
        let planned = format!("{method} {url}");

        let mut request = customize(self.client.request(method, &url))
            .build()
            .map_err(|e| request_failed(planned, None, e))?;
        if let Some(authorization) = &self.authorization {
            request
                .headers_mut()
                .insert(AUTHORIZATION, authorization.clone());
        }
        let summary = format!("{} {}", request.method(), request.url());

        self.gate.acquire().await;
        debug!("Sending {}", summary);

        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| request_failed(summary.clone(), None, e))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| request_failed(summary.clone(), Some(status), e))?
            .to_vec();

        if status.is_success() || tolerated.contains(&status) {
            debug!("{} -> {}", summary, status);
            return Ok(ApiResponse {
                request: summary,
                status,
                body,
            });
        }

        Err(ClientError::RequestFailed {
            detail: status_detail(status, &body),
            request: summary,
            status: Some(status),
            source: None,
        })
    }
}

fn authorization_header(credentials: &Credentials) -> ClientResult<HeaderValue> {
    let value = match credentials {
        Credentials::Basic { username, password } => {
            format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
        }
        Credentials::Bearer(token) => format!("Bearer {token}"),
    };
    let mut header = HeaderValue::from_str(&value)
        .map_err(|_| ClientError::Config("credentials contain invalid header characters".into()))?;
    header.set_sensitive(true);
    Ok(header)
}

fn request_failed(request: String, status: Option<StatusCode>, error: reqwest::Error) -> ClientError {
    ClientError::RequestFailed {
        request,
        status,
        detail: error_chain(&error),
        source: Some(error),
    }
}

/// Joins an error with its causes, so the underlying I/O message survives.
fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let cause_message = cause.to_string();
        if !message.contains(&cause_message) {
            message.push_str(": ");
            message.push_str(&cause_message);
        }
        source = cause.source();
    }
    message
}

fn status_detail(status: StatusCode, body: &[u8]) -> String {
    let reason = status.canonical_reason().unwrap_or("unknown status");
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        return format!("response {} {}", status.as_u16(), reason);
    }
    let snippet: String = text.chars().take(BODY_SNIPPET_LEN).collect();
    format!("response {} {}: {}", status.as_u16(), reason, snippet)
}

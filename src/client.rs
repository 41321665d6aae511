use std::{sync::Arc, time::Duration};

use reqwest::{header::ACCEPT, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    deployments::DeploymentsClient,
    errors::{ApiError, ApiErrorShape, Error, Result, TransportError, TransportErrorKind},
    runs::RunsClient,
    upload::AssetsClient,
    workflows::WorkflowsClient,
    API_KEY_ENV, DEFAULT_BASE_URL, DEFAULT_REQUEST_TIMEOUT,
};

/// Client configuration. The API key falls back to the
/// [`COMFY_DEPLOY_API_KEY`](crate::API_KEY_ENV) environment variable; a
/// missing key is not a construction error and only surfaces as
/// [`Error::Auth`] once a call is attempted.
#[derive(Clone, Debug, Default)]
pub struct Config {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    /// Override the per-request timeout (defaults to 60s).
    pub timeout: Option<Duration>,
    pub http_client: Option<reqwest::Client>,
}

/// ComfyDeploy API client. Cheap to clone; all state lives behind an `Arc`
/// and nothing is mutated after construction.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

pub(crate) struct ClientInner {
    base_url: String,
    api_key: Option<String>,
    http: reqwest::Client,
    request_timeout: Duration,
}

impl Client {
    pub fn new(cfg: Config) -> Result<Self> {
        let base_url = cfg
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        reqwest::Url::parse(&base_url)
            .map_err(|err| Error::Config(format!("invalid base url: {err}")))?;

        let api_key = cfg
            .api_key
            .filter(|key| !key.trim().is_empty())
            .or_else(|| std::env::var(API_KEY_ENV).ok().filter(|key| !key.trim().is_empty()));

        let http = match cfg.http_client {
            Some(client) => client,
            None => reqwest::Client::builder().build().map_err(|err| TransportError {
                kind: TransportErrorKind::Connect,
                message: "failed to build http client".to_string(),
                source: Some(err),
            })?,
        };

        Ok(Self {
            inner: Arc::new(ClientInner {
                base_url,
                api_key,
                http,
                request_timeout: cfg.timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT),
            }),
        })
    }

    pub fn workflows(&self) -> WorkflowsClient {
        WorkflowsClient {
            inner: self.inner.clone(),
        }
    }

    pub fn deployments(&self) -> DeploymentsClient {
        DeploymentsClient {
            inner: self.inner.clone(),
        }
    }

    pub fn runs(&self) -> RunsClient {
        RunsClient {
            inner: self.inner.clone(),
        }
    }

    pub fn assets(&self) -> AssetsClient {
        AssetsClient {
            inner: self.inner.clone(),
        }
    }
}

impl ClientInner {
    fn ensure_auth(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or(Error::Auth)
    }

    /// Start a request against `path` (joined onto the base URL) with the
    /// bearer credential attached. Raises [`Error::Auth`] when no key is
    /// configured.
    pub(crate) fn request(&self, method: Method, path: &str) -> Result<reqwest::RequestBuilder> {
        let key = self.ensure_auth()?.to_string();
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let url =
            reqwest::Url::parse(&url).map_err(|err| Error::Config(format!("invalid path: {err}")))?;
        Ok(self
            .http
            .request(method, url)
            .timeout(self.request_timeout)
            .header(ACCEPT, "application/json")
            .bearer_auth(key))
    }

    /// Send the request and decode a 2xx body as JSON. Non-2xx bodies run
    /// through the error-shape decoder; unmatched payloads are preserved
    /// raw on the [`ApiError`].
    pub(crate) async fn execute_json<T: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<T> {
        let resp = self.send(builder).await?;
        let bytes = resp.bytes().await.map_err(|err| self.to_transport_error(err))?;
        serde_json::from_slice(&bytes).map_err(Error::Serialization)
    }

    pub(crate) async fn send(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let resp = builder.send().await.map_err(|err| self.to_transport_error(err))?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        tracing::debug!(status = status.as_u16(), body = %body, "request failed");
        Err(decode_api_error(status, body))
    }

    fn to_transport_error(&self, err: reqwest::Error) -> Error {
        let kind = if err.is_timeout() {
            TransportErrorKind::Timeout
        } else if err.is_connect() {
            TransportErrorKind::Connect
        } else if err.is_request() {
            TransportErrorKind::Request
        } else {
            TransportErrorKind::Other
        };
        TransportError {
            kind,
            message: err.to_string(),
            source: Some(err),
        }
        .into()
    }
}

fn decode_api_error(status: StatusCode, body: String) -> Error {
    let parsed = serde_json::from_str::<Value>(&body).ok();
    let shape = parsed.as_ref().and_then(ApiErrorShape::decode);
    let message = shape
        .as_ref()
        .map(ApiErrorShape::message)
        .or_else(|| parsed.as_ref().and_then(plain_message))
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });
    ApiError {
        status: status.as_u16(),
        message,
        shape,
        raw_body: (!body.is_empty()).then_some(body),
    }
    .into()
}

/// Best-effort message extraction for payloads that match no known shape,
/// including FastAPI's `{"detail": "..."}` simple form.
fn plain_message(value: &Value) -> Option<String> {
    let obj = value.as_object()?;
    for key in ["error", "message", "detail"] {
        if let Some(text) = obj.get(key).and_then(Value::as_str) {
            if !text.is_empty() {
                return Some(text.to_string());
            }
        }
    }
    None
}

use std::fmt;
use std::future::Future;
use std::time::Duration;

use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE},
    Method, StatusCode,
};
use serde::Serialize;

use crate::{FetchRetryError, Result, TransportOptions};

/// Anything carrying an HTTP status code.
pub trait HasStatus {
    fn status_code(&self) -> u16;
}

impl HasStatus for reqwest::Response {
    fn status_code(&self) -> u16 {
        self.status().as_u16()
    }
}

impl HasStatus for StatusCode {
    fn status_code(&self) -> u16 {
        self.as_u16()
    }
}

impl HasStatus for u16 {
    fn status_code(&self) -> u16 {
        *self
    }
}

/// Performs one request attempt.
///
/// The executor passes the same `request` to every attempt and never
/// inspects it.
pub trait Transport<Req> {
    type Response: HasStatus;
    type Error;

    fn send(
        &self,
        request: &Req,
    ) -> impl Future<Output = std::result::Result<Self::Response, Self::Error>> + Send;

    /// Names the request in retry log lines, e.g. `GET https://example.com`.
    fn describe<'a>(&self, _request: &'a Req) -> Option<&'a (dyn fmt::Display + Sync)> {
        None
    }
}

/// Adapts a closure into a [`Transport`].
///
/// The closure receives its own clone of the request on every attempt.
#[derive(Clone)]
pub struct FnTransport<F>(pub F);

impl<F> fmt::Debug for FnTransport<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnTransport")
    }
}

impl<Req, F, Fut, Res, E> Transport<Req> for FnTransport<F>
where
    Req: Clone,
    F: Fn(Req) -> Fut,
    Fut: Future<Output = std::result::Result<Res, E>> + Send,
    Res: HasStatus,
{
    type Response = Res;
    type Error = E;

    fn send(&self, request: &Req) -> impl Future<Output = std::result::Result<Res, E>> + Send {
        (self.0)(request.clone())
    }
}

/// Method, URL, headers and body of a request, replayed on every attempt.
#[derive(Clone, Debug)]
pub struct RequestDescriptor {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl RequestDescriptor {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serializes `value` as the body and sets `Content-Type: application/json`.
    pub fn json<T: Serialize + ?Sized>(self, value: &T) -> Result<Self> {
        let body = serde_json::to_vec(value)
            .map_err(|err| FetchRetryError::Encode(format!("invalid JSON body: {err}")))?;
        Ok(self
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .body(body))
    }
}

impl fmt::Display for RequestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// Default transport over a shared `reqwest::Client`.
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport {
    http: reqwest::Client,
    options: TransportOptions,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reuses an existing client, keeping its connection pool.
    pub fn from_client(http: reqwest::Client) -> Self {
        Self {
            http,
            options: TransportOptions::default(),
        }
    }

    /// Applies transport options such as the per-attempt timeout.
    pub fn with_options(mut self, opts: TransportOptions) -> Self {
        self.options = opts;
        self
    }
}

impl Transport<RequestDescriptor> for ReqwestTransport {
    type Response = reqwest::Response;
    type Error = FetchRetryError;

    async fn send(&self, request: &RequestDescriptor) -> Result<reqwest::Response> {
        #[cfg(feature = "tracing")]
        tracing::trace!("sending {request}");

        let mut builder = self
            .http
            .request(request.method.clone(), &request.url)
            .headers(request.headers.clone())
            .timeout(Duration::from_millis(self.options.timeout_ms));
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        builder.send().await.map_err(FetchRetryError::Transport)
    }

    fn describe<'a>(
        &self,
        request: &'a RequestDescriptor,
    ) -> Option<&'a (dyn fmt::Display + Sync)> {
        Some(request as &(dyn fmt::Display + Sync))
    }
}

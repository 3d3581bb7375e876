use http::header;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use url::Url;

use crate::error::{BaasError, Error, Result};

static USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

pub(crate) static DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Credentials and settings sent with every request.
#[derive(Debug, Clone, Default)]
pub(crate) struct Settings {
    pub(crate) app_id: String,
    pub(crate) app_key: String,
    pub(crate) basic_auth: Option<String>,
    pub(crate) timeout: Option<Duration>,
}

/// Client is a wrapper around `reqwest::Client` which provides automatically
/// prepending the base url and the application headers.
#[derive(Debug, Clone)]
pub(crate) struct Client {
    base_url: Url,
    inner: reqwest::Client,
}

#[derive(Clone)]
pub(crate) enum Body {
    Empty,
    Json(serde_json::Value),
}

impl Client {
    /// Creates a new client.
    pub(crate) fn new<U>(base_url: U, settings: Settings) -> Result<Self>
    where
        U: AsRef<str>,
    {
        // Joining relative paths drops the last segment unless the base ends
        // with a slash.
        let mut base_url = base_url.as_ref().to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        let base_url = Url::parse(&base_url).map_err(Error::InvalidUrl)?;

        let mut default_headers = header::HeaderMap::new();
        default_headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        let app_id = header::HeaderValue::from_str(&settings.app_id)
            .map_err(|_e| Error::InvalidAppId)?;
        default_headers.insert("X-Application-Id", app_id);
        let app_key = header::HeaderValue::from_str(&settings.app_key)
            .map_err(|_e| Error::InvalidAppKey)?;
        default_headers.insert("X-Application-Key", app_key);
        if let Some(basic_auth) = settings.basic_auth.filter(|auth| !auth.is_empty()) {
            let auth = header::HeaderValue::from_str(&basic_auth)
                .map_err(|_e| Error::InvalidBasicAuth)?;
            default_headers.insert(header::AUTHORIZATION, auth);
        }

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(default_headers)
            .timeout(settings.timeout.unwrap_or(DEFAULT_TIMEOUT))
            .build()
            .map_err(Error::HttpClientSetup)?;

        Ok(Self {
            base_url,
            inner: http_client,
        })
    }

    async fn execute<P>(&self, method: http::Method, path: P, body: Body) -> Result<Response>
    where
        P: AsRef<str>,
    {
        let url = self
            .base_url
            .join(path.as_ref().trim_start_matches('/'))
            .map_err(Error::InvalidUrl)?;

        let mut req = self.inner.request(method.clone(), url);
        match body {
            Body::Empty => {}
            Body::Json(value) => req = req.json(&value),
        }

        // No retries: a failed request fails the operation that issued it.
        let res = req.send().await.map_err(Error::Http)?;

        Ok(Response::new(res, method, path.as_ref().to_string()))
    }

    pub(crate) async fn get<S>(&self, path: S) -> Result<Response>
    where
        S: AsRef<str>,
    {
        self.execute(http::Method::GET, path.as_ref(), Body::Empty)
            .await
    }

    pub(crate) async fn post<S, P>(&self, path: S, payload: P) -> Result<Response>
    where
        S: AsRef<str>,
        P: Serialize,
    {
        self.execute(
            http::Method::POST,
            path,
            Body::Json(serde_json::to_value(payload).map_err(Error::Serialize)?),
        )
        .await
    }
}

#[derive(Debug)]
pub(crate) struct Response {
    inner: reqwest::Response,
    method: http::Method,
    path: String,
}

impl Response {
    pub(crate) fn new(inner: reqwest::Response, method: http::Method, path: String) -> Self {
        Self {
            inner,
            method,
            path,
        }
    }

    pub(crate) async fn json<T: DeserializeOwned>(self) -> Result<T> {
        self.check_error()
            .await?
            .inner
            .json::<T>()
            .await
            .map_err(Error::Deserialize)
    }

    pub(crate) async fn check_error(self) -> Result<Response> {
        let status = self.inner.status();
        if !status.is_success() {
            let status_text = status.canonical_reason().map(String::from);

            // Try to decode the error
            let e = match self.inner.json::<BaasError>().await {
                Ok(mut e) => {
                    e.status = status.as_u16();
                    e.status_text = status_text;
                    e.method = self.method;
                    e.path = self.path;
                    Error::Baas(e)
                }
                Err(_e) => {
                    // Decoding failed, we still want a BaasError
                    Error::Baas(BaasError::new(
                        status.as_u16(),
                        status_text,
                        self.method,
                        self.path,
                        None,
                    ))
                }
            };
            return Err(e);
        }

        Ok(self)
    }
}

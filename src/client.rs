//! The datasource client.
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{env, fmt::Debug as FmtDebug, sync::Arc, time::Duration};
use tracing::{info, instrument, warn};

use crate::{
    buckets::{self, MetricFindValue},
    completion::FieldCompleter,
    error::{Error, Result},
    http, objects,
    query::{self, QueryOptions, QueryResults},
    template::{Identity, TemplateSrv},
};

/// The query string that lists buckets in [`Client::metric_find_query`].
pub static BUCKETS_QUERY: &str = "buckets";

/// The client is the entrypoint of the datasource.
///
/// You can create it using [`Client::builder`] or [`Client::new`].
///
/// # Examples
/// ```
/// use baas_datasource::{Client, Error};
///
/// fn main() -> Result<(), Error> {
///     // Read the URL, tenant and application credentials from BAAS_URL,
///     // BAAS_TENANT_ID, BAAS_APP_ID and BAAS_APP_KEY.
///     # std::env::set_var("BAAS_URL", "http://localhost:8080/api");
///     # std::env::set_var("BAAS_TENANT_ID", "tenant1");
///     let client = Client::new()?;
///
///     // Set all available options. Unset options fall back to environment
///     // variables.
///     let client = Client::builder()
///         .with_url("https://baas.example.com/api")
///         .with_tenant_id("tenant1")
///         .with_app_id("my-app")
///         .with_app_key("my-key")
///         .with_timestamp_inference(true)
///         .build()?;
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Client {
    url: String,
    tenant_id: String,
    http_client: http::Client,
    templates: Arc<dyn TemplateSrv>,
    infer_timestamps: bool,
    pub buckets: buckets::Client,
    pub objects: objects::Client,
}

impl Client {
    /// Creates a new client. If you want to configure it, use [`Client::builder`].
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Create a new client using a builder.
    pub fn builder() -> Builder {
        Builder::new()
    }

    /// Get the url (cloned).
    pub fn url(&self) -> String {
        self.url.clone()
    }

    /// Get the tenant ID (cloned).
    pub fn tenant_id(&self) -> String {
        self.tenant_id.clone()
    }

    /// Run a panel query.
    ///
    /// Hidden and incomplete targets are skipped. Targets that need the same
    /// backend request share it, and the distinct requests run concurrently.
    /// Results are returned in target order.
    ///
    /// # Errors
    /// If a target is malformed or any backend request fails. There are no
    /// partial results.
    #[instrument(skip(self, options), fields(targets = options.targets.len()))]
    pub async fn query(&self, options: &QueryOptions) -> Result<QueryResults> {
        query::execute(
            &self.objects,
            self.templates.as_ref(),
            self.infer_timestamps,
            options,
        )
        .await
    }

    /// Check that the backend is reachable with the configured credentials.
    #[instrument(skip(self))]
    pub async fn test_datasource(&self) -> TestResult {
        match self.http_client.get(self.buckets.path()).await {
            Ok(res) => match res.check_error().await {
                Ok(_) => TestResult::success(),
                Err(e) => TestResult::error(&e),
            },
            Err(e) => TestResult::error(&e),
        }
    }

    /// Call the legacy health endpoint.
    #[instrument(skip(self))]
    pub async fn health(&self) -> Result<()> {
        self.http_client.get("/1/_health").await?.check_error().await?;
        Ok(())
    }

    /// Answer a variable query. Only [`BUCKETS_QUERY`] is understood, any
    /// other query yields no values.
    #[instrument(skip(self))]
    pub async fn metric_find_query<Q>(&self, query: Q) -> Vec<MetricFindValue>
    where
        Q: AsRef<str> + FmtDebug,
    {
        if query.as_ref() == BUCKETS_QUERY {
            self.buckets.list().await
        } else {
            Vec::new()
        }
    }

    /// Annotations are not supported.
    pub async fn annotation_query<T>(&self, _options: T) -> Option<Value> {
        None
    }

    /// Create a field-name completer for a bucket.
    pub fn field_completer(&self, bucket: impl Into<String>) -> FieldCompleter<Client> {
        FieldCompleter::new(self.clone(), bucket)
    }
}

/// Outcome of [`Client::test_datasource`].
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Success,
    Error,
}

/// The result of a connection test, as the host displays it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TestResult {
    pub status: TestStatus,
    pub message: String,
}

impl TestResult {
    fn success() -> Self {
        Self {
            status: TestStatus::Success,
            message: "Server connected".to_string(),
        }
    }

    fn error(e: &Error) -> Self {
        warn!(error = %e, "connection test failed");
        Self {
            status: TestStatus::Error,
            message: e.connection_message(),
        }
    }
}

/// This builder is used to create a new client.
pub struct Builder {
    env_fallback: bool,
    url: Option<String>,
    tenant_id: Option<String>,
    app_id: Option<String>,
    app_key: Option<String>,
    basic_auth: Option<String>,
    timeout: Option<Duration>,
    templates: Option<Arc<dyn TemplateSrv>>,
    infer_timestamps: bool,
}

impl Builder {
    /// Create a new builder.
    fn new() -> Self {
        Self {
            env_fallback: true,
            url: None,
            tenant_id: None,
            app_id: None,
            app_key: None,
            basic_auth: None,
            timeout: None,
            templates: None,
            infer_timestamps: false,
        }
    }

    /// Don't fall back to environment variables.
    pub fn no_env(mut self) -> Self {
        self.env_fallback = false;
        self
    }

    /// Set the base URL of the backend. If this is not set, it will be read
    /// from the environment variable `BAAS_URL`.
    pub fn with_url<S: Into<String>>(mut self, url: S) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set the tenant. If this is not set, it will be read from the
    /// environment variable `BAAS_TENANT_ID`.
    pub fn with_tenant_id<S: Into<String>>(mut self, tenant_id: S) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    /// Set the application ID. If this is not set, it will be read from the
    /// environment variable `BAAS_APP_ID`.
    pub fn with_app_id<S: Into<String>>(mut self, app_id: S) -> Self {
        self.app_id = Some(app_id.into());
        self
    }

    /// Set the application key. If this is not set, it will be read from the
    /// environment variable `BAAS_APP_KEY`.
    pub fn with_app_key<S: Into<String>>(mut self, app_key: S) -> Self {
        self.app_key = Some(app_key.into());
        self
    }

    /// Set a value for the `Authorization` header, e.g. `Basic ...` for a
    /// backend behind a proxy. If this is not set, it will be read from the
    /// environment variable `BAAS_BASIC_AUTH`.
    pub fn with_basic_auth<S: Into<String>>(mut self, basic_auth: S) -> Self {
        self.basic_auth = Some(basic_auth.into());
        self
    }

    /// Set the request timeout. Defaults to 10 seconds.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the template service applied to every target before it is
    /// parsed. Defaults to leaving targets untouched.
    pub fn with_template<T: TemplateSrv + 'static>(mut self, templates: T) -> Self {
        self.templates = Some(Arc::new(templates));
        self
    }

    /// Try `updatedAt`, then `createdAt` as the timestamp of targets that
    /// don't name a timestamp field. Without this, `updatedAt` is used.
    pub fn with_timestamp_inference(mut self, infer: bool) -> Self {
        self.infer_timestamps = infer;
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<Client> {
        let env_fallback = self.env_fallback;
        let setting = |value: Option<String>, var: &str| {
            let value = value.unwrap_or_default();
            if value.is_empty() && env_fallback {
                env::var(var).unwrap_or_default()
            } else {
                value
            }
        };

        let url = setting(self.url, "BAAS_URL");
        if url.is_empty() {
            return Err(Error::MissingUrl);
        }

        let tenant_id = setting(self.tenant_id, "BAAS_TENANT_ID");
        if tenant_id.is_empty() {
            return Err(Error::MissingTenantId);
        }

        let settings = http::Settings {
            app_id: setting(self.app_id, "BAAS_APP_ID"),
            app_key: setting(self.app_key, "BAAS_APP_KEY"),
            basic_auth: Some(setting(self.basic_auth, "BAAS_BASIC_AUTH")),
            timeout: self.timeout,
        };
        let http_client = http::Client::new(&url, settings)?;

        info!(url = %url, tenant_id = %tenant_id, "created datasource client");

        Ok(Client {
            url,
            tenant_id: tenant_id.clone(),
            http_client: http_client.clone(),
            templates: self.templates.unwrap_or_else(|| Arc::new(Identity)),
            infer_timestamps: self.infer_timestamps,
            buckets: buckets::Client::new(http_client.clone(), tenant_id.clone()),
            objects: objects::Client::new(http_client, tenant_id),
        })
    }
}

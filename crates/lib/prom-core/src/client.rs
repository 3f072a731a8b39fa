//! HTTP client adapter for the Prometheus API.
//!
//! One outbound request per operation, no retries. Authentication and the
//! multi-tenant org header are attached uniformly; response envelopes are
//! decoded into the typed model before anything else sees them.

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::backend::MetricsBackend;
use crate::model::{LabelSet, MetadataRecord, SampleResult, Target, TargetHealth};

const ORG_ID_HEADER: &str = "X-Scope-OrgID";

/// How requests authenticate against the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Auth {
    None,
    Basic { username: String, password: String },
    Bearer(String),
}

impl Auth {
    /// Resolves configured credentials into one scheme. A bearer token
    /// takes precedence over basic credentials when both are present.
    #[must_use]
    pub fn resolve(
        username: Option<String>,
        password: Option<String>,
        token: Option<String>,
    ) -> Self {
        if let Some(token) = token.filter(|token| !token.is_empty()) {
            return Self::Bearer(token);
        }
        match (username, password) {
            (Some(username), Some(password)) if !username.is_empty() => {
                Self::Basic { username, password }
            }
            _ => Self::None,
        }
    }

    /// Name of the resolved scheme, for startup logging.
    #[must_use]
    pub const fn method_name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Basic { .. } => "basic_auth",
            Self::Bearer(_) => "bearer_token",
        }
    }
}

/// Immutable connection descriptor for one backend instance.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub url: String,
    pub auth: Auth,
    pub org_id: Option<String>,
    pub timeout: Duration,
}

#[derive(Debug)]
pub enum ClientError {
    /// Network-level failure reaching the backend.
    Connection(String),
    /// The backend answered but rejected the request.
    Api {
        status: Option<u16>,
        message: String,
    },
    /// The backend answered with a body this adapter cannot decode.
    Decode(String),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection(message) => write!(f, "prometheus unreachable: {message}"),
            Self::Api {
                status: Some(status),
                message,
            } => write!(f, "prometheus api error (status {status}): {message}"),
            Self::Api {
                status: None,
                message,
            } => write!(f, "prometheus api error: {message}"),
            Self::Decode(message) => write!(f, "undecodable prometheus response: {message}"),
        }
    }
}

impl Error for ClientError {}

/// Live client for one Prometheus-compatible backend.
pub struct PrometheusClient {
    http: reqwest::Client,
    base_url: String,
    auth: Auth,
    org_id: Option<String>,
}

impl PrometheusClient {
    /// Builds a client from an immutable connection descriptor.
    ///
    /// # Errors
    /// Returns `ClientError::Connection` if the underlying HTTP client
    /// cannot be constructed.
    pub fn new(settings: ConnectionSettings) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|err| ClientError::Connection(err.to_string()))?;
        Ok(Self {
            http,
            base_url: settings.url.trim_end_matches('/').to_string(),
            auth: settings.auth,
            org_id: settings.org_id,
        })
    }

    /// One-shot reachability probe against the backend health endpoint.
    ///
    /// # Errors
    /// Returns `ClientError` when the backend is unreachable or unhealthy.
    pub async fn ping(&self) -> Result<(), ClientError> {
        let url = format!("{}/-/healthy", self.base_url);
        let response = self.request(&url, &[]).send().await.map_err(connection_err)?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ClientError::Api {
                status: Some(status.as_u16()),
                message: format!("health probe failed with status {status}"),
            })
        }
    }

    fn request(&self, url: &str, params: &[(&str, &str)]) -> reqwest::RequestBuilder {
        let mut builder = self.http.get(url);
        if !params.is_empty() {
            builder = builder.query(params);
        }
        builder = match &self.auth {
            Auth::None => builder,
            Auth::Basic { username, password } => builder.basic_auth(username, Some(password)),
            Auth::Bearer(token) => builder.bearer_auth(token),
        };
        if let Some(org_id) = &self.org_id {
            builder = builder.header(ORG_ID_HEADER, org_id);
        }
        builder
    }

    async fn api_get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T, ClientError> {
        let url = format!("{}/api/v1/{}", self.base_url, endpoint);
        debug!(endpoint, "prometheus api request");
        let response = self.request(&url, params).send().await.map_err(connection_err)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(connection_err)?;
        decode_envelope(status, &body)
    }
}

fn connection_err(err: reqwest::Error) -> ClientError {
    ClientError::Connection(err.to_string())
}

#[derive(Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
struct ApiEnvelope<T> {
    status: String,
    #[serde(default)]
    data: Option<T>,
    #[serde(default)]
    error: Option<String>,
}

/// Decodes the `{status, data, error}` envelope every API endpoint wraps
/// its payload in. Error envelopes (including 4xx/5xx bodies) become
/// `ClientError::Api`; a body that is not an envelope at all becomes
/// `ClientError::Decode`, or `Api` when the HTTP status already signals
/// failure.
fn decode_envelope<T: DeserializeOwned>(status: u16, body: &str) -> Result<T, ClientError> {
    let envelope: ApiEnvelope<T> = match serde_json::from_str(body) {
        Ok(envelope) => envelope,
        Err(_) if (400..600).contains(&status) => {
            return Err(ClientError::Api {
                status: Some(status),
                message: format!("request failed with status {status}"),
            });
        }
        Err(err) => return Err(ClientError::Decode(err.to_string())),
    };
    if envelope.status != "success" {
        return Err(ClientError::Api {
            status: Some(status),
            message: envelope
                .error
                .unwrap_or_else(|| "unknown error".to_string()),
        });
    }
    envelope
        .data
        .ok_or_else(|| ClientError::Decode("missing data field".to_string()))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TargetDiscovery {
    #[serde(default)]
    active_targets: Vec<RawActiveTarget>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawActiveTarget {
    #[serde(default)]
    discovered_labels: Option<LabelSet>,
    #[serde(default)]
    labels: LabelSet,
    #[serde(default)]
    scrape_pool: String,
    #[serde(default)]
    scrape_url: String,
    #[serde(default)]
    last_error: String,
    #[serde(default)]
    last_scrape: String,
    #[serde(default)]
    last_scrape_duration: f64,
    #[serde(default)]
    health: TargetHealth,
}

impl RawActiveTarget {
    fn into_target(self) -> Target {
        let job = self.labels.get("job").cloned().unwrap_or_default();
        let instance = self.labels.get("instance").cloned().unwrap_or_default();
        Target {
            job,
            instance,
            health: self.health,
            labels: self.labels,
            scrape_pool: self.scrape_pool,
            scrape_url: self.scrape_url,
            last_scrape: self.last_scrape,
            last_scrape_duration: self.last_scrape_duration,
            last_error: self.last_error,
            discovered_labels: self.discovered_labels,
        }
    }
}

#[async_trait]
impl MetricsBackend for PrometheusClient {
    async fn instant_query(
        &self,
        promql: &str,
        time: Option<&str>,
    ) -> Result<SampleResult, ClientError> {
        let mut params = vec![("query", promql)];
        if let Some(time) = time {
            params.push(("time", time));
        }
        self.api_get("query", &params).await
    }

    async fn range_query(
        &self,
        promql: &str,
        start: &str,
        end: &str,
        step: &str,
    ) -> Result<SampleResult, ClientError> {
        let params = [
            ("query", promql),
            ("start", start),
            ("end", end),
            ("step", step),
        ];
        self.api_get("query_range", &params).await
    }

    async fn list_metric_names(&self) -> Result<Vec<String>, ClientError> {
        let mut names: Vec<String> = self.api_get("label/__name__/values", &[]).await?;
        names.sort();
        Ok(names)
    }

    async fn metric_metadata(&self, metric: &str) -> Result<Vec<MetadataRecord>, ClientError> {
        let mut per_metric: BTreeMap<String, Vec<MetadataRecord>> =
            self.api_get("metadata", &[("metric", metric)]).await?;
        Ok(per_metric.remove(metric).unwrap_or_default())
    }

    async fn scrape_targets(&self) -> Result<Vec<Target>, ClientError> {
        let discovery: TargetDiscovery = self.api_get("targets", &[]).await?;
        let mut targets: Vec<Target> = discovery
            .active_targets
            .into_iter()
            .map(RawActiveTarget::into_target)
            .collect();
        targets.sort_by(|a, b| a.page_key().cmp(&b.page_key()));
        Ok(targets)
    }
}

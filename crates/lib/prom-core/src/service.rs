//! Service layer: per-tool semantics over a backend.
//!
//! Each operation validates its arguments, performs exactly one backend
//! call, and reshapes the result through the pagination/filter engine and
//! the optional compact encoding. Handlers share one service instance; it
//! holds no mutable state, so concurrent invocations need no locking.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::backend::MetricsBackend;
use crate::client::ClientError;
use crate::compact::{CompactTarget, EncodedSamples, compact_samples};
use crate::model::{MetadataRecord, SampleResult, Target};
use crate::page::{FilterSpec, PageError, PageMeta, PageRequest, PageResult, paginate_and_filter};

/// Per-invocation failure, translated to a protocol error at the dispatch
/// boundary.
#[derive(Debug)]
pub enum ServiceError {
    /// The caller supplied an argument this layer rejects.
    Validation {
        parameter: &'static str,
        message: String,
    },
    /// The backend could not be reached.
    Connection(String),
    /// The backend rejected the request or returned an undecodable body.
    Query(String),
}

impl ServiceError {
    fn validation(parameter: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            parameter,
            message: message.into(),
        }
    }

    /// Stable machine-checkable code for the protocol error payload.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "ValidationError",
            Self::Connection(_) => "ConnectionError",
            Self::Query(_) => "QueryError",
        }
    }

    /// The offending parameter, when the failure is caller-fixable.
    #[must_use]
    pub const fn parameter(&self) -> Option<&'static str> {
        match self {
            Self::Validation { parameter, .. } => Some(parameter),
            Self::Connection(_) | Self::Query(_) => None,
        }
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation { parameter, message } => {
                write!(f, "invalid {parameter}: {message}")
            }
            Self::Connection(message) => write!(f, "{message}"),
            Self::Query(message) => write!(f, "{message}"),
        }
    }
}

impl Error for ServiceError {}

impl From<ClientError> for ServiceError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Connection(_) => Self::Connection(err.to_string()),
            ClientError::Api { .. } | ClientError::Decode(_) => Self::Query(err.to_string()),
        }
    }
}

fn page_err(err: PageError) -> ServiceError {
    match err {
        PageError::NonPositiveLimit(limit) => {
            ServiceError::validation("limit", format!("must be positive, got {limit}"))
        }
        PageError::NegativeOffset(offset) => {
            ServiceError::validation("offset", format!("must not be negative, got {offset}"))
        }
        PageError::InvalidPattern(err) => {
            ServiceError::validation("filter_pattern", err.to_string())
        }
    }
}

/// Arguments for an instant query invocation.
#[derive(Debug, Clone, Default)]
pub struct InstantQueryRequest {
    pub query: String,
    pub time: Option<String>,
    pub page: PageRequest,
    pub compact: bool,
}

/// Arguments for a range query invocation.
#[derive(Debug, Clone)]
pub struct RangeQueryRequest {
    pub query: String,
    pub start: String,
    pub end: String,
    pub step: String,
}

/// Arguments for a metric name listing.
#[derive(Debug, Clone, Default)]
pub struct ListMetricsRequest {
    pub filter: FilterSpec,
    pub page: PageRequest,
}

/// Arguments for a scrape target listing.
#[derive(Debug, Clone, Default)]
pub struct TargetsRequest {
    pub active_only: bool,
    pub page: PageRequest,
    pub compact: bool,
}

/// Instant query response: the (possibly compacted) result plus pagination
/// metadata when slicing was requested.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    #[serde(flatten)]
    pub data: EncodedSamples,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PageMeta>,
}

/// Target listing in either the full or the compact projection.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum TargetsResponse {
    Full(PageResult<Target>),
    Compact(PageResult<CompactTarget>),
}

/// Shared, immutable service over one backend.
pub struct MetricsService<B> {
    backend: Arc<B>,
}

impl<B> Clone for MetricsService<B> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
        }
    }
}

impl<B: MetricsBackend> MetricsService<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    #[must_use]
    pub const fn from_arc(backend: Arc<B>) -> Self {
        Self { backend }
    }

    /// Runs an instant query, slicing vector/matrix elements positionally
    /// when pagination was requested and compacting on demand.
    ///
    /// # Errors
    /// Returns `ServiceError` for bad page bounds or any backend failure.
    pub async fn instant_query(
        &self,
        request: InstantQueryRequest,
    ) -> Result<QueryResponse, ServiceError> {
        request.page.validate().map_err(page_err)?;
        debug!(query = %request.query, compact = request.compact, "instant query");
        let result = self
            .backend
            .instant_query(&request.query, request.time.as_deref())
            .await?;

        let (result, pagination) = if request.page.requested() {
            match result {
                SampleResult::Vector(elements) => {
                    let page = paginate_and_filter(
                        elements,
                        &FilterSpec::default(),
                        request.page,
                        |_| String::new(),
                    )
                    .map_err(page_err)?;
                    (SampleResult::Vector(page.items), Some(page.meta))
                }
                SampleResult::Matrix(series) => {
                    let page = paginate_and_filter(
                        series,
                        &FilterSpec::default(),
                        request.page,
                        |_| String::new(),
                    )
                    .map_err(page_err)?;
                    (SampleResult::Matrix(page.items), Some(page.meta))
                }
                // Scalar and string results have no element list to slice.
                other => (other, None),
            }
        } else {
            (result, None)
        };

        let data = if request.compact {
            compact_samples(result)
        } else {
            EncodedSamples::Plain(result)
        };
        Ok(QueryResponse { data, pagination })
    }

    /// Runs a range query. The window and step are validated before the
    /// backend is contacted; the original strings pass through untouched so
    /// the backend sees exactly what the caller wrote.
    ///
    /// # Errors
    /// Returns `ServiceError::Validation` for an unparsable or inverted
    /// window or a non-positive step, and propagates backend failures.
    pub async fn range_query(
        &self,
        request: RangeQueryRequest,
    ) -> Result<SampleResult, ServiceError> {
        let start = parse_time(&request.start).ok_or_else(|| {
            ServiceError::validation("start", format!("not a timestamp: {}", request.start))
        })?;
        let end = parse_time(&request.end).ok_or_else(|| {
            ServiceError::validation("end", format!("not a timestamp: {}", request.end))
        })?;
        if start > end {
            return Err(ServiceError::validation(
                "start",
                "start must not be after end",
            ));
        }
        let step = parse_step(&request.step).ok_or_else(|| {
            ServiceError::validation("step", format!("not a duration: {}", request.step))
        })?;
        if step <= 0.0 {
            return Err(ServiceError::validation("step", "must be positive"));
        }

        debug!(query = %request.query, start = %request.start, end = %request.end, "range query");
        Ok(self
            .backend
            .range_query(&request.query, &request.start, &request.end, &request.step)
            .await?)
    }

    /// Lists metric names through the pagination/filter engine, keyed by
    /// the name itself.
    ///
    /// # Errors
    /// Returns `ServiceError` for bad bounds, a bad pattern, or any
    /// backend failure.
    pub async fn list_metrics(
        &self,
        request: ListMetricsRequest,
    ) -> Result<PageResult<String>, ServiceError> {
        request.page.validate().map_err(page_err)?;
        let names = self.backend.list_metric_names().await?;
        debug!(total = names.len(), "listing metrics");
        paginate_and_filter(names, &request.filter, request.page, Clone::clone).map_err(page_err)
    }

    /// Fetches metadata records for one metric. An unknown metric yields an
    /// empty sequence, not an error.
    ///
    /// # Errors
    /// Returns `ServiceError` for an empty metric name or any backend
    /// failure.
    pub async fn metric_metadata(
        &self,
        metric: &str,
    ) -> Result<Vec<MetadataRecord>, ServiceError> {
        if metric.trim().is_empty() {
            return Err(ServiceError::validation("metric", "must not be empty"));
        }
        Ok(self.backend.metric_metadata(metric).await?)
    }

    /// Lists scrape targets: the health filter applies first, then
    /// pagination keyed by job + instance.
    ///
    /// # Errors
    /// Returns `ServiceError` for bad page bounds or any backend failure.
    pub async fn targets(
        &self,
        request: TargetsRequest,
    ) -> Result<TargetsResponse, ServiceError> {
        request.page.validate().map_err(page_err)?;
        let targets = self.backend.scrape_targets().await?;
        let targets: Vec<Target> = if request.active_only {
            targets
                .into_iter()
                .filter(|target| target.health.is_up())
                .collect()
        } else {
            targets
        };
        let page = paginate_and_filter(
            targets,
            &FilterSpec::default(),
            request.page,
            Target::page_key,
        )
        .map_err(page_err)?;

        if request.compact {
            let meta = page.meta;
            let items = page.items.into_iter().map(CompactTarget::from).collect();
            Ok(TargetsResponse::Compact(PageResult { items, meta }))
        } else {
            Ok(TargetsResponse::Full(page))
        }
    }
}

/// Parses an instant as Unix seconds or RFC 3339.
fn parse_time(value: &str) -> Option<f64> {
    if let Ok(seconds) = value.parse::<f64>() {
        return seconds.is_finite().then_some(seconds);
    }
    chrono::DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|instant| instant.timestamp_millis() as f64 / 1000.0)
}

/// Parses a resolution step: bare seconds or a Prometheus duration string
/// such as `30s`, `5m`, or `1h30m`.
fn parse_step(value: &str) -> Option<f64> {
    if let Ok(seconds) = value.parse::<f64>() {
        return seconds.is_finite().then_some(seconds);
    }
    if value.is_empty() {
        return None;
    }
    let mut total = 0.0_f64;
    let mut rest = value;
    while !rest.is_empty() {
        let digits_end = rest.find(|c: char| !c.is_ascii_digit())?;
        if digits_end == 0 {
            return None;
        }
        let (digits, tail) = rest.split_at(digits_end);
        let amount: f64 = digits.parse().ok()?;
        let (unit, tail) = if let Some(tail) = tail.strip_prefix("ms") {
            ("ms", tail)
        } else {
            (tail.get(..1)?, tail.get(1..)?)
        };
        let scale = match unit {
            "ms" => 0.001,
            "s" => 1.0,
            "m" => 60.0,
            "h" => 3_600.0,
            "d" => 86_400.0,
            "w" => 604_800.0,
            "y" => 31_536_000.0,
            _ => return None,
        };
        total += amount * scale;
        rest = tail;
    }
    Some(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_time_accepts_unix_and_rfc3339() {
        assert_eq!(parse_time("1712000000"), Some(1_712_000_000.0));
        assert_eq!(parse_time("1712000000.5"), Some(1_712_000_000.5));
        let parsed = parse_time("2026-08-01T00:00:30Z").expect("rfc3339 should parse");
        assert!(parsed > 1_712_000_000.0);
        assert!(parse_time("yesterday").is_none());
        assert!(parse_time("").is_none());
    }

    #[test]
    fn parse_step_accepts_seconds_and_durations() {
        assert_eq!(parse_step("15"), Some(15.0));
        assert_eq!(parse_step("15s"), Some(15.0));
        assert_eq!(parse_step("5m"), Some(300.0));
        assert_eq!(parse_step("1h30m"), Some(5_400.0));
        assert_eq!(parse_step("250ms"), Some(0.25));
        assert_eq!(parse_step("1w"), Some(604_800.0));
        assert!(parse_step("").is_none());
        assert!(parse_step("5x").is_none());
        assert!(parse_step("m5").is_none());
    }

    #[test]
    fn parse_step_keeps_sign_for_validation() {
        assert_eq!(parse_step("-15"), Some(-15.0));
        assert_eq!(parse_step("0"), Some(0.0));
        assert_eq!(parse_step("0s"), Some(0.0));
    }
}

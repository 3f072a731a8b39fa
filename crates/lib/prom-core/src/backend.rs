//! The seam between the service layer and a Prometheus-compatible backend.

use async_trait::async_trait;

use crate::client::ClientError;
use crate::model::{MetadataRecord, SampleResult, Target};

/// Query and discovery operations the tools need from a backend.
///
/// Implemented by [`crate::client::PrometheusClient`] for live backends and
/// by in-memory fakes in tests. Every method maps to exactly one outbound
/// call; retries, if any, belong to the transport policy outside this
/// crate.
#[async_trait]
pub trait MetricsBackend: Send + Sync {
    /// Evaluates an instant query, optionally at an explicit instant.
    async fn instant_query(
        &self,
        promql: &str,
        time: Option<&str>,
    ) -> Result<SampleResult, ClientError>;

    /// Evaluates a query over a start/end window with a step interval.
    async fn range_query(
        &self,
        promql: &str,
        start: &str,
        end: &str,
        step: &str,
    ) -> Result<SampleResult, ClientError>;

    /// Metric names, sorted lexicographically for stable pagination.
    async fn list_metric_names(&self) -> Result<Vec<String>, ClientError>;

    /// Metadata records for one metric; empty when the metric is unknown.
    async fn metric_metadata(&self, metric: &str) -> Result<Vec<MetadataRecord>, ClientError>;

    /// Scrape targets, sorted by (job, instance) for stable pagination.
    async fn scrape_targets(&self) -> Result<Vec<Target>, ClientError>;
}

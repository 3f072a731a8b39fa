//! Wire-level data model for Prometheus query results and scrape targets.
//!
//! Shapes mirror the Prometheus HTTP API so responses deserialize directly
//! into typed values. Sample values stay backend-native strings; parsing
//! them into floats would silently lose precision.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A set of label name/value pairs. Label names are unique per set.
pub type LabelSet = BTreeMap<String, String>;

/// One `[unix_seconds, "value"]` pair as the backend encodes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplePoint(pub f64, pub String);

impl SamplePoint {
    #[must_use]
    pub const fn timestamp(&self) -> f64 {
        self.0
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.1
    }
}

/// An instant-vector element: a label set with a single sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstantSample {
    #[serde(rename = "metric")]
    pub labels: LabelSet,
    pub value: SamplePoint,
}

/// A range-vector series: a label set with samples over a time window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeSeries {
    #[serde(rename = "metric")]
    pub labels: LabelSet,
    pub values: Vec<SamplePoint>,
}

/// A query result, tagged by the backend's `resultType` convention.
///
/// The variant set is closed; every consumer matches all four cases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "resultType", content = "result", rename_all = "lowercase")]
pub enum SampleResult {
    Vector(Vec<InstantSample>),
    Matrix(Vec<RangeSeries>),
    Scalar(SamplePoint),
    String(SamplePoint),
}

impl SampleResult {
    /// Number of vector/matrix elements; 1 for scalar and string results.
    #[must_use]
    pub fn element_count(&self) -> usize {
        match self {
            Self::Vector(elements) => elements.len(),
            Self::Matrix(series) => series.len(),
            Self::Scalar(_) | Self::String(_) => 1,
        }
    }
}

/// One metadata record for a metric, as served by the metadata endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    #[serde(rename = "type")]
    pub metric_type: String,
    pub help: String,
    #[serde(default)]
    pub unit: String,
}

/// Health state of a scrape target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetHealth {
    Up,
    Down,
    #[default]
    Unknown,
}

impl TargetHealth {
    #[must_use]
    pub const fn is_up(self) -> bool {
        matches!(self, Self::Up)
    }
}

/// A scrape endpoint with its health and label metadata.
///
/// `job` and `instance` are lifted out of the label set because every
/// listing is keyed and sorted by them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub job: String,
    pub instance: String,
    pub health: TargetHealth,
    pub labels: LabelSet,
    pub scrape_pool: String,
    pub scrape_url: String,
    pub last_scrape: String,
    pub last_scrape_duration: f64,
    pub last_error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discovered_labels: Option<LabelSet>,
}

impl Target {
    /// Stable pagination key.
    #[must_use]
    pub fn page_key(&self) -> String {
        format!("{}/{}", self.job, self.instance)
    }
}

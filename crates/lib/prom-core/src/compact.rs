//! Opt-in compact encodings that shrink responses without losing data.
//!
//! Vector and matrix results are re-encoded against a shared dictionary of
//! deduplicated label sets, with each series referencing its labels by
//! index and carrying its points as plain `[timestamp, "value"]` arrays.
//! The encoding restructures but never drops: [`CompactSamples::expand`]
//! restores the original element multiset. Scalar and string results pass
//! through unchanged.

use serde::{Deserialize, Serialize};

use crate::model::{InstantSample, LabelSet, RangeSeries, SamplePoint, SampleResult, Target, TargetHealth};

const COMPACT_VECTOR: &str = "compact_vector";
const COMPACT_MATRIX: &str = "compact_matrix";

/// A series referencing its label set by index into the shared dictionary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompactSeries {
    pub labels: usize,
    pub points: Vec<SamplePoint>,
}

/// A vector or matrix result re-encoded against a shared label-set
/// dictionary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompactSamples {
    pub result_type: String,
    pub label_sets: Vec<LabelSet>,
    pub series: Vec<CompactSeries>,
}

impl CompactSamples {
    fn from_series<I>(result_type: &str, source: I) -> Self
    where
        I: IntoIterator<Item = (LabelSet, Vec<SamplePoint>)>,
    {
        let mut label_sets: Vec<LabelSet> = Vec::new();
        let mut series = Vec::new();
        for (labels, points) in source {
            let index = match label_sets.iter().position(|known| *known == labels) {
                Some(index) => index,
                None => {
                    label_sets.push(labels);
                    label_sets.len() - 1
                }
            };
            series.push(CompactSeries {
                labels: index,
                points,
            });
        }
        Self {
            result_type: result_type.to_string(),
            label_sets,
            series,
        }
    }

    /// Restores the native encoding. Returns `None` for an unknown result
    /// type or a dangling label-set reference.
    #[must_use]
    pub fn expand(&self) -> Option<SampleResult> {
        match self.result_type.as_str() {
            COMPACT_VECTOR => {
                let mut elements = Vec::with_capacity(self.series.len());
                for series in &self.series {
                    elements.push(InstantSample {
                        labels: self.label_sets.get(series.labels)?.clone(),
                        value: series.points.first()?.clone(),
                    });
                }
                Some(SampleResult::Vector(elements))
            }
            COMPACT_MATRIX => {
                let mut expanded = Vec::with_capacity(self.series.len());
                for series in &self.series {
                    expanded.push(RangeSeries {
                        labels: self.label_sets.get(series.labels)?.clone(),
                        values: series.points.clone(),
                    });
                }
                Some(SampleResult::Matrix(expanded))
            }
            _ => None,
        }
    }
}

/// A query result in either its native or compacted encoding.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EncodedSamples {
    Plain(SampleResult),
    Compact(CompactSamples),
}

/// Applies the compact encoding where it is defined.
///
/// Only vector and matrix results have a compact form; scalar and string
/// results are already minimal and pass through as-is.
#[must_use]
pub fn compact_samples(result: SampleResult) -> EncodedSamples {
    match result {
        SampleResult::Vector(elements) => EncodedSamples::Compact(CompactSamples::from_series(
            COMPACT_VECTOR,
            elements.into_iter().map(|el| (el.labels, vec![el.value])),
        )),
        SampleResult::Matrix(series) => EncodedSamples::Compact(CompactSamples::from_series(
            COMPACT_MATRIX,
            series.into_iter().map(|s| (s.labels, s.values)),
        )),
        other => EncodedSamples::Plain(other),
    }
}

/// Reduced target projection for `compact=true` listings.
///
/// Discovery metadata, scrape URLs, and scrape duration are dropped;
/// identity, health, labels, and error state are kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompactTarget {
    pub job: String,
    pub instance: String,
    pub health: TargetHealth,
    pub labels: LabelSet,
    pub last_scrape: String,
    pub last_error: String,
}

impl From<Target> for CompactTarget {
    fn from(target: Target) -> Self {
        Self {
            job: target.job,
            instance: target.instance,
            health: target.health,
            labels: target.labels,
            last_scrape: target.last_scrape,
            last_error: target.last_error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> LabelSet {
        pairs
            .iter()
            .map(|(name, value)| ((*name).to_string(), (*value).to_string()))
            .collect()
    }

    fn sample(labels: LabelSet, ts: f64, value: &str) -> InstantSample {
        InstantSample {
            labels,
            value: SamplePoint(ts, value.to_string()),
        }
    }

    #[test]
    fn vector_round_trips() {
        let original = SampleResult::Vector(vec![
            sample(labels(&[("job", "api"), ("instance", "a:9090")]), 1.0, "0.25"),
            sample(labels(&[("job", "api"), ("instance", "b:9090")]), 1.0, "0.5"),
        ]);
        let EncodedSamples::Compact(compact) = compact_samples(original.clone()) else {
            panic!("vector should compact");
        };
        assert_eq!(compact.result_type, "compact_vector");
        assert_eq!(compact.expand(), Some(original));
    }

    #[test]
    fn matrix_round_trips() {
        let original = SampleResult::Matrix(vec![RangeSeries {
            labels: labels(&[("job", "api")]),
            values: vec![
                SamplePoint(1.0, "1".to_string()),
                SamplePoint(16.0, "2".to_string()),
            ],
        }]);
        let EncodedSamples::Compact(compact) = compact_samples(original.clone()) else {
            panic!("matrix should compact");
        };
        assert_eq!(compact.result_type, "compact_matrix");
        assert_eq!(compact.expand(), Some(original));
    }

    #[test]
    fn identical_label_sets_share_one_dictionary_entry() {
        let shared = labels(&[("job", "api")]);
        let original = SampleResult::Matrix(vec![
            RangeSeries {
                labels: shared.clone(),
                values: vec![SamplePoint(1.0, "1".to_string())],
            },
            RangeSeries {
                labels: shared,
                values: vec![SamplePoint(2.0, "2".to_string())],
            },
        ]);
        let EncodedSamples::Compact(compact) = compact_samples(original) else {
            panic!("matrix should compact");
        };
        assert_eq!(compact.label_sets.len(), 1);
        assert_eq!(compact.series.len(), 2);
        assert!(compact.series.iter().all(|series| series.labels == 0));
    }

    #[test]
    fn values_keep_full_precision() {
        let original = SampleResult::Vector(vec![sample(
            labels(&[("job", "api")]),
            1_712_000_000.123,
            "0.123456789012345678",
        )]);
        let EncodedSamples::Compact(compact) = compact_samples(original) else {
            panic!("vector should compact");
        };
        assert_eq!(compact.series[0].points[0].value(), "0.123456789012345678");
    }

    #[test]
    fn scalar_passes_through_unchanged() {
        let original = SampleResult::Scalar(SamplePoint(1.0, "42".to_string()));
        assert_eq!(
            compact_samples(original.clone()),
            EncodedSamples::Plain(original)
        );
    }

    #[test]
    fn target_projection_keeps_identity_and_error_state() {
        let target = Target {
            job: "node".to_string(),
            instance: "host:9100".to_string(),
            health: TargetHealth::Down,
            labels: labels(&[("job", "node"), ("instance", "host:9100")]),
            scrape_pool: "node".to_string(),
            scrape_url: "http://host:9100/metrics".to_string(),
            last_scrape: "2026-08-01T00:00:00Z".to_string(),
            last_scrape_duration: 0.02,
            last_error: "connection refused".to_string(),
            discovered_labels: Some(labels(&[("__address__", "host:9100")])),
        };
        let compact = CompactTarget::from(target);
        assert_eq!(compact.job, "node");
        assert_eq!(compact.health, TargetHealth::Down);
        assert_eq!(compact.last_error, "connection refused");
        let json = serde_json::to_value(&compact).expect("compact target should serialize");
        assert!(json.get("scrape_url").is_none());
        assert!(json.get("discovered_labels").is_none());
    }
}

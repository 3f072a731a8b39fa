use prom_core::backend::MetricsBackend;
use prom_core::page::{FilterSpec, PageRequest};
use prom_core::service::{ListMetricsRequest, TargetsRequest};
use rmcp::{
    ErrorData,
    handler::server::wrapper::Parameters,
    model::{CallToolResult, Content},
    schemars,
    tool,
    tool_router,
};
use serde::{Deserialize, Serialize};

use crate::{PromMcp, helpers};

/// Parameters for listing metric names.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ListMetricsParams {
    pub prefix: Option<String>,
    pub filter_pattern: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Parameters for fetching metadata of one metric.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct GetMetricMetadataParams {
    pub metric: String,
}

/// Parameters for listing scrape targets.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct GetTargetsParams {
    pub active_only: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub compact: Option<bool>,
}

#[tool_router(router = tool_router_discovery, vis = "pub")]
impl<B: MetricsBackend + 'static> PromMcp<B> {
    #[tool(
        description = "List metric names, with optional prefix and regex filters and limit/offset pagination."
    )]
    async fn list_metrics(
        &self,
        Parameters(params): Parameters<ListMetricsParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let result = self
            .service()
            .list_metrics(ListMetricsRequest {
                filter: FilterSpec {
                    prefix: params.prefix,
                    pattern: params.filter_pattern,
                },
                page: PageRequest {
                    limit: params.limit,
                    offset: params.offset,
                },
            })
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(result)?]))
    }

    #[tool(
        description = "Get type/help/unit metadata records for a metric; an unknown metric returns an empty list."
    )]
    async fn get_metric_metadata(
        &self,
        Parameters(params): Parameters<GetMetricMetadataParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let records = self
            .service()
            .metric_metadata(&params.metric)
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(records)?]))
    }

    #[tool(
        description = "List scrape targets with health state; active_only keeps healthy targets, compact drops discovery metadata and scrape URLs."
    )]
    async fn get_targets(
        &self,
        Parameters(params): Parameters<GetTargetsParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let response = self
            .service()
            .targets(TargetsRequest {
                active_only: params.active_only.unwrap_or(false),
                page: PageRequest {
                    limit: params.limit,
                    offset: params.offset,
                },
                compact: params.compact.unwrap_or(false),
            })
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(response)?]))
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use prom_core::backend::MetricsBackend;
    use prom_core::client::ClientError;
    use prom_core::model::{MetadataRecord, SamplePoint, SampleResult, Target};
    use prom_core::service::MetricsService;
    use rmcp::handler::server::wrapper::Parameters;
    use rmcp::model::ErrorCode;

    use super::{GetMetricMetadataParams, ListMetricsParams};
    use crate::PromMcp;

    struct NamesBackend;

    #[async_trait]
    impl MetricsBackend for NamesBackend {
        async fn instant_query(
            &self,
            _promql: &str,
            _time: Option<&str>,
        ) -> Result<SampleResult, ClientError> {
            Ok(SampleResult::Scalar(SamplePoint(0.0, "0".to_string())))
        }

        async fn range_query(
            &self,
            _promql: &str,
            _start: &str,
            _end: &str,
            _step: &str,
        ) -> Result<SampleResult, ClientError> {
            Ok(SampleResult::Matrix(Vec::new()))
        }

        async fn list_metric_names(&self) -> Result<Vec<String>, ClientError> {
            Ok(vec![
                "compute_cpu".to_string(),
                "storage_reads".to_string(),
                "storage_writes".to_string(),
            ])
        }

        async fn metric_metadata(
            &self,
            _metric: &str,
        ) -> Result<Vec<MetadataRecord>, ClientError> {
            Ok(Vec::new())
        }

        async fn scrape_targets(&self) -> Result<Vec<Target>, ClientError> {
            Ok(Vec::new())
        }
    }

    fn server() -> PromMcp<NamesBackend> {
        PromMcp::new(MetricsService::new(NamesBackend))
    }

    #[tokio::test]
    async fn list_metrics_succeeds_with_filters() {
        let result = server()
            .list_metrics(Parameters(ListMetricsParams {
                prefix: Some("storage_".to_string()),
                filter_pattern: None,
                limit: Some(20),
                offset: None,
            }))
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn list_metrics_rejects_invalid_pattern() {
        let err = server()
            .list_metrics(Parameters(ListMetricsParams {
                prefix: None,
                filter_pattern: Some("(".to_string()),
                limit: None,
                offset: None,
            }))
            .await
            .expect_err("bad pattern should be rejected");
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
        let data = err.data.expect("data payload expected");
        assert_eq!(data["error_code"], "ValidationError");
        assert_eq!(data["offending_parameter"], "filter_pattern");
    }

    #[tokio::test]
    async fn unknown_metric_metadata_is_a_success() {
        let result = server()
            .get_metric_metadata(Parameters(GetMetricMetadataParams {
                metric: "nonexistent_metric".to_string(),
            }))
            .await;
        assert!(result.is_ok());
    }
}

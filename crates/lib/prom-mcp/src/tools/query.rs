use prom_core::backend::MetricsBackend;
use prom_core::page::PageRequest;
use prom_core::service::{InstantQueryRequest, RangeQueryRequest};
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

/// Parameters for a PromQL instant query.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ExecuteQueryParams {
    pub query: String,
    pub time: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub compact: Option<bool>,
}

/// Parameters for a PromQL range query.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ExecuteRangeQueryParams {
    pub query: String,
    pub start: String,
    pub end: String,
    pub step: String,
}

#[tool_router(router = tool_router_query, vis = "pub")]
impl<B: MetricsBackend + 'static> PromMcp<B> {
    #[tool(
        description = "Execute a PromQL instant query, with optional pagination over vector/matrix elements and an optional compact encoding."
    )]
    async fn execute_query(
        &self,
        Parameters(params): Parameters<ExecuteQueryParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let response = self
            .service()
            .instant_query(InstantQueryRequest {
                query: params.query,
                time: params.time,
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

    #[tool(
        description = "Execute a PromQL range query over a start/end window at a step resolution (RFC 3339 or Unix timestamps; steps like '30s' or '5m')."
    )]
    async fn execute_range_query(
        &self,
        Parameters(params): Parameters<ExecuteRangeQueryParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let result = self
            .service()
            .range_query(RangeQueryRequest {
                query: params.query,
                start: params.start,
                end: params.end,
                step: params.step,
            })
            .await
            .map_err(helpers::map_err)?;
        Ok(CallToolResult::success(vec![Content::json(result)?]))
    }
}

//! MCP server implementation for the Prometheus adapter.
//!
//! This crate wires the metrics service into rmcp tool handlers and exposes
//! the MCP-facing API surface for query and discovery.

mod helpers;
mod tools;
pub mod server;

use std::collections::HashSet;
use std::sync::Arc;

use prom_core::backend::MetricsBackend;
use prom_core::service::MetricsService;
use rmcp::{ServerHandler, handler::server::tool::ToolRouter, tool_handler};
use rmcp::model::{ServerCapabilities, ServerInfo};

const SERVER_INSTRUCTIONS: &str = r"prom-mcp exposes a Prometheus-compatible backend as MCP tools.

Workflow:
1. Discover what the backend knows:
   - `list_metrics` lists metric names, with optional `prefix` and
     `filter_pattern` (regex) filters plus `limit`/`offset` pagination.
   - `get_metric_metadata` returns type/help/unit records for one metric.
2. Query time-series data:
   - `execute_query` evaluates a PromQL instant query; pass `limit`/`offset`
     to page through large vectors and `compact=true` for a label-dictionary
     encoding that keeps every sample.
   - `execute_range_query` evaluates a query over `start`..`end` at `step`
     resolution (RFC 3339 or Unix timestamps; `30s`/`5m`-style steps).
3. Inspect scrape health:
   - `get_targets` lists scrape targets; `active_only=true` keeps healthy
     ones, `compact=true` drops discovery metadata and keeps job, instance,
     health, labels, and the last error.

Notes:
- Listings report `total_count`, `returned_count`, `offset`, and `has_more`
  so pagination can continue from where it stopped.
- Errors carry a stable `error_code` (ValidationError, ConnectionError,
  QueryError) and name the offending parameter when one exists.";

/// MCP server wrapper around the shared metrics service and tool router.
pub struct PromMcp<B: MetricsBackend> {
    tool_router: ToolRouter<Self>,
    service: Arc<MetricsService<B>>,
}

impl<B: MetricsBackend> Clone for PromMcp<B> {
    fn clone(&self) -> Self {
        Self {
            tool_router: self.tool_router.clone(),
            service: self.service.clone(),
        }
    }
}

impl<B: MetricsBackend + 'static> PromMcp<B> {
    /// Creates a server exposing every tool.
    #[must_use]
    pub fn new(service: MetricsService<B>) -> Self {
        Self::with_enabled_tools(service, None)
    }

    /// Creates a server restricted to an allow-list of tool names.
    ///
    /// `None` enables every tool. Names outside the allow-list are removed
    /// from the router up front, so they neither appear in `tools/list` nor
    /// dispatch.
    #[must_use]
    pub fn with_enabled_tools(
        service: MetricsService<B>,
        enabled: Option<&HashSet<String>>,
    ) -> Self {
        let mut tool_router = Self::tool_router_query() + Self::tool_router_discovery();
        if let Some(enabled) = enabled {
            tool_router
                .map
                .retain(|name, _| enabled.contains(name.as_ref()));
        }
        Self {
            tool_router,
            service: Arc::new(service),
        }
    }

    /// Names of the tools this instance serves, sorted.
    #[must_use]
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .tool_router
            .list_all()
            .into_iter()
            .map(|tool| tool.name.into_owned())
            .collect();
        names.sort();
        names
    }

    pub(crate) fn service(&self) -> &MetricsService<B> {
        &self.service
    }
}

#[tool_handler]
impl<B: MetricsBackend + 'static> ServerHandler for PromMcp<B> {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(SERVER_INSTRUCTIONS.to_string()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use async_trait::async_trait;
    use prom_core::backend::MetricsBackend;
    use prom_core::client::ClientError;
    use prom_core::model::{MetadataRecord, SamplePoint, SampleResult, Target};
    use prom_core::service::MetricsService;

    use super::PromMcp;

    struct NullBackend;

    #[async_trait]
    impl MetricsBackend for NullBackend {
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
            Ok(Vec::new())
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

    #[test]
    fn every_tool_is_served_by_default() {
        let mcp = PromMcp::new(MetricsService::new(NullBackend));
        assert_eq!(
            mcp.tool_names(),
            vec![
                "execute_query",
                "execute_range_query",
                "get_metric_metadata",
                "get_targets",
                "list_metrics",
            ]
        );
    }

    #[test]
    fn allow_list_prunes_the_router() {
        let enabled: HashSet<String> =
            ["list_metrics", "execute_query"].iter().map(|s| (*s).to_string()).collect();
        let mcp = PromMcp::with_enabled_tools(MetricsService::new(NullBackend), Some(&enabled));
        assert_eq!(mcp.tool_names(), vec!["execute_query", "list_metrics"]);
    }

    #[test]
    fn unknown_names_in_the_allow_list_enable_nothing() {
        let enabled: HashSet<String> = ["no_such_tool".to_string()].into_iter().collect();
        let mcp = PromMcp::with_enabled_tools(MetricsService::new(NullBackend), Some(&enabled));
        assert!(mcp.tool_names().is_empty());
    }
}

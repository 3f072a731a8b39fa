use std::collections::HashSet;
use std::error::Error;
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use clap::{Parser, ValueEnum};

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Transport the MCP server speaks to its client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TransportMode {
    Stdio,
    Http,
}

#[derive(Parser, Debug)]
#[command(name = "prom-mcpd", version, about = "Prometheus MCP daemon.")]
struct CliArgs {
    #[arg(long, env = "PROMETHEUS_URL")]
    prometheus_url: Option<String>,

    #[arg(long, env = "PROMETHEUS_USERNAME")]
    prometheus_username: Option<String>,

    #[arg(long, env = "PROMETHEUS_PASSWORD")]
    prometheus_password: Option<String>,

    #[arg(long, env = "PROMETHEUS_TOKEN")]
    prometheus_token: Option<String>,

    #[arg(long, env = "ORG_ID")]
    org_id: Option<String>,

    #[arg(long, env = "PROM_MCP_TRANSPORT", value_enum, default_value = "stdio")]
    transport: TransportMode,

    #[arg(long, env = "PROM_MCP_BIND", default_value = DEFAULT_BIND_ADDR)]
    bind_addr: SocketAddr,

    #[arg(
        long,
        env = "PROM_MCP_HTTP_TIMEOUT_SECS",
        default_value_t = DEFAULT_HTTP_TIMEOUT_SECS
    )]
    http_timeout_secs: u64,

    /// Comma-separated allow-list of tool names; unset serves every tool.
    #[arg(long, env = "PROM_MCP_ENABLED_TOOLS", value_delimiter = ',')]
    enabled_tools: Option<Vec<String>>,
}

/// Runtime configuration loaded from CLI arguments and environment variables.
#[derive(Debug, Clone)]
pub struct PromConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub token: Option<String>,
    pub org_id: Option<String>,
    pub transport: TransportMode,
    pub bind_addr: SocketAddr,
    pub http_timeout: Duration,
    pub enabled_tools: Option<HashSet<String>>,
}

#[derive(Debug)]
pub enum ConfigError {
    MissingSetting(&'static str),
    InvalidSetting { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSetting(name) => write!(f, "missing required setting: {name}"),
            Self::InvalidSetting { name, value } => {
                write!(f, "invalid {name} value: {value}")
            }
        }
    }
}

impl Error for ConfigError {}

impl PromConfig {
    pub fn from_args() -> Result<Self, ConfigError> {
        Self::try_from(CliArgs::parse())
    }
}

impl TryFrom<CliArgs> for PromConfig {
    type Error = ConfigError;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let url = args
            .prometheus_url
            .filter(|value| !value.trim().is_empty())
            .ok_or(ConfigError::MissingSetting("PROMETHEUS_URL"))?;
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::InvalidSetting {
                name: "PROMETHEUS_URL",
                value: url,
            });
        }

        let username = args.prometheus_username.filter(|value| !value.is_empty());
        let password = args.prometheus_password.filter(|value| !value.is_empty());
        let token = args.prometheus_token.filter(|value| !value.is_empty());

        // Basic credentials only count as a pair.
        if username.is_some() != password.is_some() {
            return Err(ConfigError::MissingSetting(if username.is_some() {
                "PROMETHEUS_PASSWORD"
            } else {
                "PROMETHEUS_USERNAME"
            }));
        }

        let enabled_tools = args
            .enabled_tools
            .map(|tools| {
                tools
                    .into_iter()
                    .map(|tool| tool.trim().to_string())
                    .filter(|tool| !tool.is_empty())
                    .collect::<HashSet<_>>()
            })
            .filter(|set| !set.is_empty());

        Ok(Self {
            url,
            username,
            password,
            token,
            org_id: args.org_id.filter(|value| !value.is_empty()),
            transport: args.transport,
            bind_addr: args.bind_addr,
            http_timeout: Duration::from_secs(args.http_timeout_secs),
            enabled_tools,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> CliArgs {
        CliArgs {
            prometheus_url: Some("http://localhost:9090".to_string()),
            prometheus_username: None,
            prometheus_password: None,
            prometheus_token: None,
            org_id: None,
            transport: TransportMode::Stdio,
            bind_addr: DEFAULT_BIND_ADDR.parse().expect("valid bind addr"),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            enabled_tools: None,
        }
    }

    #[test]
    fn missing_url_is_fatal() {
        let mut args = base_args();
        args.prometheus_url = None;

        let err = PromConfig::try_from(args).expect_err("config should be rejected");
        assert!(matches!(err, ConfigError::MissingSetting("PROMETHEUS_URL")));
    }

    #[test]
    fn non_http_url_is_rejected() {
        let mut args = base_args();
        args.prometheus_url = Some("localhost:9090".to_string());

        let err = PromConfig::try_from(args).expect_err("config should be rejected");
        assert!(matches!(
            err,
            ConfigError::InvalidSetting { name: "PROMETHEUS_URL", .. }
        ));
    }

    #[test]
    fn half_a_basic_credential_pair_is_rejected() {
        let mut args = base_args();
        args.prometheus_username = Some("user".to_string());

        let err = PromConfig::try_from(args).expect_err("config should be rejected");
        assert!(matches!(
            err,
            ConfigError::MissingSetting("PROMETHEUS_PASSWORD")
        ));
    }

    #[test]
    fn enabled_tools_are_trimmed_and_deduplicated() {
        let mut args = base_args();
        args.enabled_tools = Some(vec![
            "list_metrics".to_string(),
            " execute_query".to_string(),
            "list_metrics".to_string(),
            String::new(),
        ]);

        let config = PromConfig::try_from(args).expect("config should parse");
        let enabled = config.enabled_tools.expect("allow-list expected");
        assert_eq!(enabled.len(), 2);
        assert!(enabled.contains("execute_query"));
    }

    #[test]
    fn empty_allow_list_means_no_restriction() {
        let mut args = base_args();
        args.enabled_tools = Some(vec![String::new()]);

        let config = PromConfig::try_from(args).expect("config should parse");
        assert!(config.enabled_tools.is_none());
    }

    #[test]
    fn both_auth_schemes_may_be_configured_together() {
        let mut args = base_args();
        args.prometheus_username = Some("user".to_string());
        args.prometheus_password = Some("secret".to_string());
        args.prometheus_token = Some("token".to_string());

        let config = PromConfig::try_from(args).expect("config should parse");
        assert!(config.token.is_some());
        assert!(config.username.is_some());
    }
}

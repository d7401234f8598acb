use crate::config::toml_config::FilterConfig;
use crate::utils::error::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// `<option>` HTML
    Markup,
    Json,
    Text,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "sub-service-filter")]
#[command(about = "Load the sub-service options that belong to a service")]
pub struct CliConfig {
    /// Service id currently selected in the form; omit for a blank selection
    #[arg(long)]
    pub service: Option<String>,

    #[arg(long, help = "TOML configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "JSON catalog used instead of the HTTP endpoint")]
    pub catalog: Option<PathBuf>,

    #[arg(long)]
    pub base_url: Option<String>,

    #[arg(long)]
    pub endpoint_path: Option<String>,

    #[arg(long)]
    pub query_param: Option<String>,

    #[arg(long)]
    pub timeout_seconds: Option<u64>,

    #[arg(long, value_enum, default_value = "markup")]
    pub format: OutputFormat,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,
}

impl CliConfig {
    /// 先讀設定檔，再以命令列參數覆寫
    pub fn resolve(&self) -> Result<FilterConfig> {
        let mut config = match &self.config {
            Some(path) => {
                tracing::debug!("Loading configuration from {}", path.display());
                FilterConfig::from_file(path)?
            }
            None => FilterConfig::default(),
        };

        if let Some(base_url) = &self.base_url {
            config.lookup.base_url = base_url.clone();
        }
        if let Some(endpoint_path) = &self.endpoint_path {
            config.lookup.endpoint_path = endpoint_path.clone();
        }
        if let Some(query_param) = &self.query_param {
            config.lookup.query_param = query_param.clone();
        }
        if let Some(timeout) = self.timeout_seconds {
            config.lookup.timeout_seconds = timeout;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let cli = CliConfig::parse_from([
            "sub-service-filter",
            "--service",
            "5",
            "--base-url",
            "https://admin.example.com",
            "--query-param",
            "service",
            "--format",
            "json",
        ]);

        let config = cli.resolve().unwrap();
        assert_eq!(cli.service.as_deref(), Some("5"));
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(config.lookup.base_url, "https://admin.example.com");
        assert_eq!(config.lookup.query_param, "service");
        assert_eq!(config.lookup.endpoint_path, "/ai/get_sub_services/");
    }
}

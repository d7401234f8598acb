use crate::config::toml_config::LookupConfig;
use crate::domain::model::{LookupResponse, ServiceRef, SubServiceOption};
use crate::domain::ports::SubServiceLookup;
use crate::utils::error::{FilterError, LookupFailure, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// 透過 HTTP GET 查詢子服務
#[derive(Debug, Clone)]
pub struct HttpSubServiceLookup {
    client: Client,
    endpoint: Url,
    query_param: String,
}

impl HttpSubServiceLookup {
    pub fn new(config: &LookupConfig) -> Result<Self> {
        let endpoint = Url::parse(&config.base_url)
            .and_then(|base| base.join(&config.endpoint_path))
            .map_err(|e| FilterError::InvalidConfigValueError {
                field: "lookup.base_url".to_string(),
                value: config.base_url.clone(),
                reason: format!("Invalid URL format: {}", e),
            })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .default_headers(build_headers(&config.headers)?)
            .build()?;

        tracing::debug!("Sub-service lookup endpoint: {}", endpoint);

        Ok(Self {
            client,
            endpoint,
            query_param: config.query_param.clone(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

fn build_headers(headers: &HashMap<String, String>) -> Result<HeaderMap> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            FilterError::InvalidConfigValueError {
                field: "lookup.headers".to_string(),
                value: name.clone(),
                reason: format!("Invalid header name: {}", e),
            }
        })?;
        let header_value =
            HeaderValue::from_str(value).map_err(|e| FilterError::InvalidConfigValueError {
                field: format!("lookup.headers.{}", name),
                value: value.clone(),
                reason: format!("Invalid header value: {}", e),
            })?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}

#[async_trait]
impl SubServiceLookup for HttpSubServiceLookup {
    async fn fetch(
        &self,
        service: &ServiceRef,
    ) -> std::result::Result<Vec<SubServiceOption>, LookupFailure> {
        let Some(service_id) = service.as_str() else {
            return Ok(Vec::new());
        };

        tracing::debug!(
            "GET {}?{}={}",
            self.endpoint,
            self.query_param,
            service_id
        );
        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&[(self.query_param.as_str(), service_id)])
            .send()
            .await
            .map_err(|e| LookupFailure::transport(service_id, &e))?;

        let status = response.status();
        tracing::debug!("Lookup response status: {}", status);
        if !status.is_success() {
            return Err(LookupFailure::status(service_id, status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| LookupFailure::transport(service_id, &e))?;

        let items = serde_json::from_slice::<LookupResponse>(&body)
            .map_err(|e| LookupFailure::decode(service_id, e.to_string()))?
            .into_options();

        tracing::debug!("Loaded {} sub-services for service {}", items.len(), service_id);
        Ok(items)
    }
}

/// 固定的服務 → 子服務對照表，離線使用
#[derive(Debug, Clone, Default)]
pub struct StaticLookup {
    catalog: HashMap<String, Vec<SubServiceOption>>,
}

impl StaticLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_service(mut self, service_id: impl Into<String>, items: Vec<SubServiceOption>) -> Self {
        self.catalog.insert(service_id.into(), items);
        self
    }

    /// 從 JSON 檔案載入，格式為 `{"<service id>": [{"id": .., "name": ..}]}`
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let catalog: HashMap<String, Vec<SubServiceOption>> = serde_json::from_str(content)?;
        Ok(Self { catalog })
    }

    pub fn service_count(&self) -> usize {
        self.catalog.len()
    }
}

#[async_trait]
impl SubServiceLookup for StaticLookup {
    async fn fetch(
        &self,
        service: &ServiceRef,
    ) -> std::result::Result<Vec<SubServiceOption>, LookupFailure> {
        Ok(service
            .as_str()
            .and_then(|id| self.catalog.get(id))
            .cloned()
            .unwrap_or_default())
    }
}

use crate::domain::model::PLACEHOLDER_LABEL;
use crate::utils::error::{FilterError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

pub const DEFAULT_ENDPOINT_PATH: &str = "/ai/get_sub_services/";
pub const DEFAULT_QUERY_PARAM: &str = "service_id";
pub const DEFAULT_SERVICE_FIELD_ID: &str = "id_service";
pub const DEFAULT_SUB_SERVICE_FIELD_ID: &str = "id_sub_service";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub lookup: LookupConfig,
    pub fields: FieldConfig,
    pub behavior: BehaviorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    pub base_url: String,
    pub endpoint_path: String,
    pub query_param: String,
    pub timeout_seconds: u64,
    pub headers: HashMap<String, String>,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            endpoint_path: DEFAULT_ENDPOINT_PATH.to_string(),
            query_param: DEFAULT_QUERY_PARAM.to_string(),
            timeout_seconds: 10,
            headers: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    pub service_id: String,
    pub sub_service_id: String,
    pub placeholder_label: String,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            service_id: DEFAULT_SERVICE_FIELD_ID.to_string(),
            sub_service_id: DEFAULT_SUB_SERVICE_FIELD_ID.to_string(),
            placeholder_label: PLACEHOLDER_LABEL.to_string(),
        }
    }
}

impl FieldConfig {
    /// inline formset 中第 `index` 列的欄位 id，例如 `id_tickets-0-service`
    pub fn for_formset_row(&self, prefix: &str, index: usize) -> Self {
        let row_id = |id: &str| {
            let name = id.strip_prefix("id_").unwrap_or(id);
            format!("id_{}-{}-{}", prefix, index, name)
        };
        Self {
            service_id: row_id(&self.service_id),
            sub_service_id: row_id(&self.sub_service_id),
            placeholder_label: self.placeholder_label.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// 較舊的查詢晚回來時丟棄其結果
    pub discard_stale_responses: bool,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            discard_stale_responses: true,
        }
    }
}

impl FilterConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(FilterError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| FilterError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${LOOKUP_BASE_URL})；未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| FilterError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_url("lookup.base_url", &self.lookup.base_url)?;
        validation::validate_endpoint_path("lookup.endpoint_path", &self.lookup.endpoint_path)?;
        validation::validate_non_empty_string("lookup.query_param", &self.lookup.query_param)?;
        validation::validate_positive_number("lookup.timeout_seconds", self.lookup.timeout_seconds, 1)?;

        validation::validate_element_id("fields.service_id", &self.fields.service_id)?;
        validation::validate_element_id("fields.sub_service_id", &self.fields.sub_service_id)?;
        if self.fields.service_id == self.fields.sub_service_id {
            return Err(FilterError::InvalidConfigValueError {
                field: "fields.sub_service_id".to_string(),
                value: self.fields.sub_service_id.clone(),
                reason: "Service and sub-service fields must be different elements".to_string(),
            });
        }

        Ok(())
    }
}

impl Validate for FilterConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Django 預設的空白選項文字
pub const PLACEHOLDER_LABEL: &str = "---------";

/// 服務欄位目前的值。空字串或純空白視為「未選擇」。
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceRef(Option<String>);

impl ServiceRef {
    pub fn new(value: Option<String>) -> Self {
        Self(value)
    }

    pub fn blank() -> Self {
        Self(None)
    }

    pub fn is_blank(&self) -> bool {
        self.as_str().is_none()
    }

    /// 去除空白後的值；未選擇時回傳 None
    pub fn as_str(&self) -> Option<&str> {
        self.0
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

impl From<&str> for ServiceRef {
    fn from(value: &str) -> Self {
        Self(Some(value.to_string()))
    }
}

impl From<Option<String>> for ServiceRef {
    fn from(value: Option<String>) -> Self {
        Self(value)
    }
}

impl fmt::Display for ServiceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str().unwrap_or(""))
    }
}

/// 查詢端點回傳的單一子服務
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubServiceOption {
    #[serde(deserialize_with = "id_as_text")]
    pub id: String,
    pub name: String,
}

impl SubServiceOption {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

// id 可能是數字 (主鍵) 也可能是字串
fn id_as_text<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(text) => Ok(text),
        serde_json::Value::Number(number) => Ok(number.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "sub-service id must be a string or number, got {}",
            other
        ))),
    }
}

/// 端點可能直接回傳陣列，也可能包在 `{"sub_services": [...]}` 裡
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LookupResponse {
    Bare(Vec<SubServiceOption>),
    Enveloped { sub_services: Vec<SubServiceOption> },
}

impl LookupResponse {
    pub fn into_options(self) -> Vec<SubServiceOption> {
        match self {
            LookupResponse::Bare(items) => items,
            LookupResponse::Enveloped { sub_services } => sub_services,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.value.is_empty()
    }

    pub fn to_markup(&self) -> String {
        format!(
            r#"<option value="{}">{}</option>"#,
            escape_html(&self.value),
            escape_html(&self.label)
        )
    }
}

/// 子服務下拉選單的內容，第一個永遠是空白選項
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionList {
    options: Vec<SelectOption>,
}

impl OptionList {
    pub fn placeholder(label: &str) -> Self {
        Self {
            options: vec![SelectOption::new("", label)],
        }
    }

    pub fn from_sub_services(label: &str, items: &[SubServiceOption]) -> Self {
        let mut list = Self::placeholder(label);
        list.options.extend(
            items
                .iter()
                .map(|item| SelectOption::new(item.id.clone(), item.name.clone())),
        );
        list
    }

    pub fn options(&self) -> &[SelectOption] {
        &self.options
    }

    pub fn labels(&self) -> Vec<&str> {
        self.options.iter().map(|o| o.label.as_str()).collect()
    }

    pub fn values(&self) -> Vec<&str> {
        self.options.iter().map(|o| o.value.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// 不含空白選項的項目數
    pub fn item_count(&self) -> usize {
        self.options.iter().filter(|o| !o.is_placeholder()).count()
    }

    pub fn contains_value(&self, value: &str) -> bool {
        self.options.iter().any(|o| o.value == value)
    }

    /// 產生 `<select>` 的內部 HTML
    pub fn to_markup(&self) -> String {
        self.options
            .iter()
            .map(SelectOption::to_markup)
            .collect::<Vec<_>>()
            .join("")
    }
}

impl Default for OptionList {
    fn default() -> Self {
        Self::placeholder(PLACEHOLDER_LABEL)
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

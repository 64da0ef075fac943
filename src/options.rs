//! Selectable values for the type, category and source controls.

use clap::ValueEnum;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::cache::HttpFetcher;
use crate::error::CatalogError;

/// Which option list to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OptionKind {
    Types,
    Categories,
    Sources,
}

impl OptionKind {
    pub fn path(self) -> &'static str {
        match self {
            OptionKind::Types => "/types",
            OptionKind::Categories => "/categories",
            OptionKind::Sources => "/sources",
        }
    }
}

/// One selectable value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOption {
    pub value: String,
    pub label: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawOption {
    Labeled {
        value: Value,
        #[serde(default)]
        label: Option<String>,
    },
    Plain(Value),
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Parse an option list body: an array of plain values or of
/// `{value, label}` objects.
pub fn parse_options(body: &Value) -> Vec<FilterOption> {
    let Some(entries) = body.as_array() else {
        debug!("Option list is not an array");
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| serde_json::from_value::<RawOption>(entry.clone()).ok())
        .map(|raw| match raw {
            RawOption::Labeled { value, label } => {
                let value = value_to_string(&value);
                FilterOption {
                    label: label.unwrap_or_else(|| value.clone()),
                    value,
                }
            }
            RawOption::Plain(value) => {
                let value = value_to_string(&value);
                FilterOption {
                    label: value.clone(),
                    value,
                }
            }
        })
        .collect()
}

/// Loads option lists from the catalog host.
pub struct OptionsClient {
    fetcher: HttpFetcher,
    origin: Url,
}

impl OptionsClient {
    pub fn new(fetcher: HttpFetcher, host: &Url) -> Self {
        Self {
            fetcher,
            origin: host.clone(),
        }
    }

    pub fn url_for(&self, kind: OptionKind) -> Result<Url, CatalogError> {
        self.origin
            .join(kind.path())
            .map_err(|e| CatalogError::invalid_url(kind.path(), e))
    }

    pub async fn fetch(&self, kind: OptionKind) -> Result<Vec<FilterOption>, CatalogError> {
        let url = self.url_for(kind)?;
        let body = self.fetcher.get_json(url.as_str()).await?;
        Ok(parse_options(&body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_plain_strings() {
        let options = parse_options(&json!(["video", "audio"]));
        assert_eq!(
            options,
            vec![
                FilterOption {
                    value: "video".to_string(),
                    label: "video".to_string()
                },
                FilterOption {
                    value: "audio".to_string(),
                    label: "audio".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_parse_labeled_and_numeric() {
        let options = parse_options(&json!([
            {"value": "wiki", "label": "Wikimedia"},
            {"value": 20},
            40
        ]));
        let pairs: Vec<(&str, &str)> = options
            .iter()
            .map(|o| (o.value.as_str(), o.label.as_str()))
            .collect();
        assert_eq!(pairs, vec![("wiki", "Wikimedia"), ("20", "20"), ("40", "40")]);
    }

    #[test]
    fn test_parse_non_array() {
        assert!(parse_options(&json!({"items": []})).is_empty());
    }

    #[test]
    fn test_option_urls_are_origin_relative() {
        let host = Url::parse("https://api.example/media/search?x=1").unwrap();
        let fetcher = HttpFetcher::new("test", std::time::Duration::from_secs(1)).unwrap();
        let client = OptionsClient::new(fetcher, &host);
        assert_eq!(
            client.url_for(OptionKind::Categories).unwrap().as_str(),
            "https://api.example/categories"
        );
    }
}

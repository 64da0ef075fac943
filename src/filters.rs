//! Filter state and its mapping to catalog query parameters.
//!
//! The same parameter names are used for the catalog request URL and for
//! the address bar, so a bookmarked address decodes back into the filters
//! that produced it.

use serde::{Deserialize, Serialize};
use tracing::warn;
use url::Url;

use crate::error::CatalogError;

pub const PARAM_SEARCH: &str = "search";
pub const PARAM_TYPE: &str = "type";
pub const PARAM_CATEGORY: &str = "category";
pub const PARAM_SOURCE: &str = "source";
pub const PARAM_LANG_CODE: &str = "langCode";
pub const PARAM_LIMIT: &str = "limit";

/// Default page size when neither the address nor the config supplies one.
pub const DEFAULT_LIMIT: u32 = 20;

/// Canonical filter selection.
///
/// Field order is significant: query parameters are written in the order
/// returned by [`Filters::query_params`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filters {
    pub search: String,
    #[serde(rename = "type", default)]
    pub types: Vec<String>,
    #[serde(rename = "category", default)]
    pub categories: Vec<String>,
    #[serde(rename = "source", default)]
    pub sources: Vec<String>,
    #[serde(rename = "langCode", default)]
    pub lang_codes: Vec<String>,
    pub limit: u32,
}

impl Filters {
    /// Every recognized parameter with its serialized value, `None` when empty.
    pub fn query_params(&self) -> [(&'static str, Option<String>); 6] {
        [
            (PARAM_SEARCH, scalar(&self.search)),
            (PARAM_TYPE, joined(&self.types)),
            (PARAM_CATEGORY, joined(&self.categories)),
            (PARAM_SOURCE, joined(&self.sources)),
            (PARAM_LANG_CODE, joined(&self.lang_codes)),
            (PARAM_LIMIT, (self.limit != 0).then(|| self.limit.to_string())),
        ]
    }
}

fn scalar(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn joined(values: &[String]) -> Option<String> {
    let values: Vec<&str> = values
        .iter()
        .map(String::as_str)
        .filter(|v| !v.is_empty())
        .collect();
    (!values.is_empty()).then(|| values.join(","))
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Filters read back from a URL.
///
/// `limit` is kept exactly as it appeared in the query; nothing checks
/// that it is numeric.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedFilters {
    pub search: String,
    pub types: Vec<String>,
    pub categories: Vec<String>,
    pub sources: Vec<String>,
    pub lang_codes: Vec<String>,
    pub limit: String,
}

impl DecodedFilters {
    /// Convert into typed filters, falling back to `default_limit` when the
    /// decoded limit is not a number.
    pub fn into_filters(self, default_limit: u32) -> Filters {
        let limit = match self.limit.parse::<u32>() {
            Ok(limit) => limit,
            Err(_) => {
                if !self.limit.is_empty() {
                    warn!(
                        "Ignoring non-numeric limit {:?}, using {}",
                        self.limit, default_limit
                    );
                }
                default_limit
            }
        };

        Filters {
            search: self.search,
            types: self.types,
            categories: self.categories,
            sources: self.sources,
            lang_codes: self.lang_codes,
            limit,
        }
    }
}

/// Maps [`Filters`] to and from query parameters on a fixed catalog host.
#[derive(Debug, Clone)]
pub struct FilterCodec {
    host: Url,
}

impl FilterCodec {
    pub fn new(host: &str) -> Result<Self, CatalogError> {
        let host = Url::parse(host).map_err(|e| CatalogError::invalid_url(host, e))?;
        Ok(Self { host })
    }

    pub fn host(&self) -> &Url {
        &self.host
    }

    /// Build the catalog request URL for `filters`.
    ///
    /// Empty fields are left out entirely rather than sent as empty values.
    pub fn encode(&self, filters: &Filters) -> Url {
        let mut url = self.host.clone();
        for (key, value) in filters.query_params() {
            if let Some(value) = value {
                set_query_param(&mut url, key, &value);
            }
        }
        url
    }

    /// Read the recognized parameters of `url`.
    pub fn decode(url: &Url, default_limit: u32) -> DecodedFilters {
        let mut decoded = DecodedFilters {
            limit: default_limit.to_string(),
            ..Default::default()
        };

        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                PARAM_SEARCH => decoded.search = value.into_owned(),
                PARAM_TYPE => decoded.types = split_list(&value),
                PARAM_CATEGORY => decoded.categories = split_list(&value),
                PARAM_SOURCE => decoded.sources = split_list(&value),
                PARAM_LANG_CODE => decoded.lang_codes = split_list(&value),
                PARAM_LIMIT => decoded.limit = value.into_owned(),
                _ => {}
            }
        }

        decoded
    }

    /// The address-bar form of `filters`: `current` with its query replaced
    /// by the non-empty filter fields.
    pub fn address_for(current: &Url, filters: &Filters) -> Url {
        let mut url = current.clone();
        url.set_query(None);
        for (key, value) in filters.query_params() {
            match value {
                Some(value) => set_query_param(&mut url, key, &value),
                None => remove_query_param(&mut url, key),
            }
        }
        url
    }
}

/// Set `key` to `value`, replacing the first existing occurrence and
/// dropping any others.
fn set_query_param(url: &mut Url, key: &str, value: &str) {
    let mut replaced = false;
    let mut pairs = Vec::new();
    for (k, v) in url.query_pairs().into_owned() {
        if k == key {
            if !replaced {
                pairs.push((k, value.to_string()));
                replaced = true;
            }
        } else {
            pairs.push((k, v));
        }
    }
    if !replaced {
        pairs.push((key.to_string(), value.to_string()));
    }
    write_query(url, &pairs);
}

fn remove_query_param(url: &mut Url, key: &str) {
    if url.query().is_none() {
        return;
    }
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .into_owned()
        .filter(|(k, _)| k != key)
        .collect();
    write_query(url, &pairs);
}

fn write_query(url: &mut Url, pairs: &[(String, String)]) {
    if pairs.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(pairs);
    }
}

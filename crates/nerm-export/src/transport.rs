use std::fmt;

use async_trait::async_trait;

use crate::error::Result;

/// HTTP verbs the client issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
            Method::Patch => write!(f, "PATCH"),
        }
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
        }
    }
}

/// Ordered query parameters. Keys are unique; `set` replaces in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl ToString) {
        let key = key.into();
        let value = value.to_string();
        match self.pairs.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.pairs.push((key, value)),
        }
    }

    /// Sets `key` only when `value` is present and non-empty.
    pub fn set_opt(&mut self, key: impl Into<String>, value: Option<&str>) {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            self.set(key, value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Request executor for the tenant API.
///
/// Implementations resolve `resource_path` (and the optional `record_id`
/// segment) against the tenant's API root, attach credentials, and return
/// the raw body of a successful response. Non-success statuses must be
/// reported as [`crate::ExportError::Http`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(
        &self,
        method: Method,
        resource_path: &str,
        record_id: Option<&str>,
        query: &QueryParams,
        body: Option<Vec<u8>>,
    ) -> Result<Vec<u8>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_replaces_in_place() {
        let mut params = QueryParams::new().with("limit", 100).with("offset", 0);
        params.set("offset", 200);
        assert_eq!(params.get("offset"), Some("200"));
        assert_eq!(
            params.pairs(),
            &[
                ("limit".to_string(), "100".to_string()),
                ("offset".to_string(), "200".to_string())
            ]
        );
    }

    #[test]
    fn test_set_opt_skips_empty() {
        let mut params = QueryParams::new();
        params.set_opt("status", Some(""));
        params.set_opt("name", None);
        assert!(params.is_empty());
        params.set_opt("status", Some("Active"));
        assert_eq!(params.get("status"), Some("Active"));
    }
}

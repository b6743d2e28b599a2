use async_trait::async_trait;
use tracing::debug;
use url::Url;

use crate::error::{ExportError, Result};
use crate::transport::{Method, QueryParams, Transport};

/// reqwest-backed [`Transport`] for one tenant.
pub struct ApiClient {
    http: reqwest::Client,
    api_root: Url,
    health_url: Url,
    token: String,
}

impl ApiClient {
    /// Client for `https://{tenant}.{base_url}`.
    pub fn new(tenant: &str, base_url: &str, token: &str) -> Result<Self> {
        let base_url = base_url.trim_matches('/');
        Self::with_origin(&format!("https://{tenant}.{base_url}"), token)
    }

    /// Client for an explicit origin such as `http://127.0.0.1:8080`.
    pub fn with_origin(origin: &str, token: &str) -> Result<Self> {
        let origin = origin.trim_end_matches('/');
        let api_root = parse_url(&format!("{origin}/api/"))?;
        let health_url = parse_url(&format!("{origin}/health_check"))?;
        let token = token.strip_prefix("Bearer ").unwrap_or(token).to_string();
        Ok(Self {
            http: reqwest::Client::new(),
            api_root,
            health_url,
            token,
        })
    }

    pub fn api_root(&self) -> &Url {
        &self.api_root
    }

    fn url(&self, resource_path: &str, record_id: Option<&str>) -> Result<Url> {
        let mut path = resource_path.trim_matches('/').to_string();
        if let Some(id) = record_id.filter(|id| !id.is_empty()) {
            path.push('/');
            path.push_str(id);
        }
        self.api_root
            .join(&path)
            .map_err(|e| ExportError::invalid_request(format!("bad resource path '{path}': {e}")))
    }

    /// GET the tenant health endpoint; any HTTP status is returned, not raised.
    pub async fn health(&self) -> Result<(u16, String)> {
        let resp = self
            .http
            .get(self.health_url.clone())
            .bearer_auth(&self.token)
            .send()
            .await?;
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        Ok((status, body))
    }
}

#[async_trait]
impl Transport for ApiClient {
    async fn request(
        &self,
        method: Method,
        resource_path: &str,
        record_id: Option<&str>,
        query: &QueryParams,
        body: Option<Vec<u8>>,
    ) -> Result<Vec<u8>> {
        let url = self.url(resource_path, record_id)?;
        debug!(%method, %url, "sending request");

        let mut req = self
            .http
            .request(method.into(), url)
            .bearer_auth(&self.token)
            .header("Accept", "application/json")
            .header("Content-Type", "application/json");
        if !query.is_empty() {
            req = req.query(query.pairs());
        }
        if let Some(body) = body {
            req = req.body(body);
        }

        let resp = req.send().await?;
        handle_response(resp).await
    }
}

async fn handle_response(resp: reqwest::Response) -> Result<Vec<u8>> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ExportError::Http {
            status: status.as_u16(),
            body,
        });
    }
    Ok(resp.bytes().await?.to_vec())
}

fn parse_url(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| ExportError::invalid_request(format!("invalid URL '{raw}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_urls() {
        let client = ApiClient::new("acme", "nonemployee.com/", "secret").unwrap();
        assert_eq!(client.api_root().as_str(), "https://acme.nonemployee.com/api/");
        assert_eq!(
            client.url("profiles", None).unwrap().as_str(),
            "https://acme.nonemployee.com/api/profiles"
        );
        assert_eq!(
            client.url("advanced_search/s1/run", None).unwrap().as_str(),
            "https://acme.nonemployee.com/api/advanced_search/s1/run"
        );
        assert_eq!(
            client.url("profiles", Some("p-9")).unwrap().as_str(),
            "https://acme.nonemployee.com/api/profiles/p-9"
        );
        assert_eq!(
            client.health_url.as_str(),
            "https://acme.nonemployee.com/health_check"
        );
    }

    #[test]
    fn test_bearer_prefix_is_stripped() {
        let client = ApiClient::with_origin("http://localhost:1", "Bearer abc").unwrap();
        assert_eq!(client.token, "abc");
    }

    #[test]
    fn test_invalid_origin() {
        assert!(ApiClient::with_origin("not a url", "t").is_err());
    }
}

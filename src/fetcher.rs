//! Remote document retrieval.
//!
//! [`RemoteTypeFetcher`] turns a store-relative path into a URL, performs one GET
//! through an [`HttpTransport`], and parses the body. It keeps no state besides the
//! transport and base URL; caching happens one level up in the loader.

use std::sync::Arc;

use tracing::{info, warn};

use crate::cancel::CancellationToken;
use crate::error::TypeLoadError;
use crate::index::{TypeIndex, INDEX_PATH};
use crate::types::TypeNode;

#[cfg(feature = "remote")]
use std::time::Duration;

/// Status and body of a completed GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Blocking GET transport.
///
/// Implementations return `Ok` for any HTTP response, successful or not, and reserve
/// `Err` for failures to obtain a response at all. They should return
/// `TypeLoadError::Cancelled` when `cancel` is set before the request is sent.
pub trait HttpTransport: Send + Sync {
    fn get(&self, url: &str, cancel: &CancellationToken) -> Result<HttpResponse, TypeLoadError>;
}

/// [`HttpTransport`] backed by a blocking `reqwest` client.
#[cfg(feature = "remote")]
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

#[cfg(feature = "remote")]
impl ReqwestTransport {
    /// Build a client with the given request timeout.
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("bicep-schema/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[cfg(feature = "remote")]
impl HttpTransport for ReqwestTransport {
    fn get(&self, url: &str, cancel: &CancellationToken) -> Result<HttpResponse, TypeLoadError> {
        cancel.ensure_not_cancelled()?;

        let response = self
            .client
            .get(url)
            .send()
            .map_err(|source| TypeLoadError::Network {
                url: url.to_string(),
                source,
            })?;

        let status = response.status().as_u16();
        let body = response.text().map_err(|source| TypeLoadError::Network {
            url: url.to_string(),
            source,
        })?;

        Ok(HttpResponse { status, body })
    }
}

/// Fetches and parses documents below a base URL.
#[derive(Clone)]
pub struct RemoteTypeFetcher {
    base_url: String,
    transport: Arc<dyn HttpTransport>,
}

impl RemoteTypeFetcher {
    pub fn new(base_url: impl Into<String>, transport: Arc<dyn HttpTransport>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            transport,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL of a store-relative path.
    pub fn url_for(&self, relative_path: &str) -> String {
        format!("{}/{}", self.base_url, relative_path.trim_start_matches('/'))
    }

    /// Fetch and parse `index.json`.
    ///
    /// # Errors
    ///
    /// Returns `TypeLoadError::RemoteFetch` for a non-success status and
    /// `TypeLoadError::TypeParse` if the body is not a valid index.
    pub fn fetch_index(&self, cancel: &CancellationToken) -> Result<TypeIndex, TypeLoadError> {
        let url = self.url_for(INDEX_PATH);
        info!(url = %url, "Fetching type index");
        let body = self.fetch(&url, cancel)?;
        TypeIndex::parse(&body, &url)
    }

    /// Fetch the type file at `relative_path` and parse it into nodes whose edges
    /// are rebased to the store root.
    ///
    /// # Errors
    ///
    /// Returns `TypeLoadError::RemoteFetch` for a non-success status and
    /// `TypeLoadError::TypeParse` if the body is not an array of type nodes.
    pub fn fetch_types(
        &self,
        relative_path: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<TypeNode>, TypeLoadError> {
        let url = self.url_for(relative_path);
        info!(url = %url, "Fetching type");
        let body = self.fetch(&url, cancel)?;
        parse_type_file(&body, relative_path, &url)
    }

    fn fetch(&self, url: &str, cancel: &CancellationToken) -> Result<String, TypeLoadError> {
        cancel.ensure_not_cancelled()?;
        let response = self.transport.get(url, cancel)?;
        cancel.ensure_not_cancelled()?;

        if !response.is_success() {
            warn!(url, status = response.status, "Failed to fetch type document");
            return Err(TypeLoadError::RemoteFetch {
                url: url.to_string(),
                status: response.status,
            });
        }
        Ok(response.body)
    }
}

/// Parse the body of a type file located at `relative_path`.
///
/// Local (`#/n`) and file-relative references are rebased so every edge in the
/// result is relative to the store root.
pub fn parse_type_file(
    content: &str,
    relative_path: &str,
    url: &str,
) -> Result<Vec<TypeNode>, TypeLoadError> {
    let mut nodes: Vec<TypeNode> =
        serde_json::from_str(content).map_err(|e| TypeLoadError::TypeParse {
            url: url.to_string(),
            message: e.to_string(),
        })?;
    for node in &mut nodes {
        node.rebase_edges(relative_path);
    }
    Ok(nodes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CrossFileTypeReference;
    use std::sync::Mutex;

    /// Serves a fixed response and records requested URLs.
    struct StaticTransport {
        response: HttpResponse,
        requests: Mutex<Vec<String>>,
    }

    impl StaticTransport {
        fn new(status: u16, body: &str) -> Arc<Self> {
            Arc::new(Self {
                response: HttpResponse {
                    status,
                    body: body.to_string(),
                },
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    impl HttpTransport for StaticTransport {
        fn get(&self, url: &str, _cancel: &CancellationToken) -> Result<HttpResponse, TypeLoadError> {
            self.requests.lock().unwrap().push(url.to_string());
            Ok(self.response.clone())
        }
    }

    #[test]
    fn url_for_joins_with_single_slash() {
        let fetcher = RemoteTypeFetcher::new(
            "https://example.com/generated/",
            StaticTransport::new(200, "[]"),
        );
        assert_eq!(fetcher.base_url(), "https://example.com/generated");
        assert_eq!(
            fetcher.url_for("storage/types.json"),
            "https://example.com/generated/storage/types.json"
        );
        assert_eq!(
            fetcher.url_for("/index.json"),
            "https://example.com/generated/index.json"
        );
    }

    #[test]
    fn fetch_types_rebases_edges() {
        let body = r##"[
            { "$type": "StringType" },
            { "$type": "ArrayType", "itemType": { "$ref": "#/0" } },
            { "$type": "ArrayType", "itemType": { "$ref": "../common/types.json#/4" } }
        ]"##;
        let transport = StaticTransport::new(200, body);
        let fetcher = RemoteTypeFetcher::new("https://example.com", transport.clone());

        let nodes = fetcher
            .fetch_types("storage/2023-01-01/types.json", &CancellationToken::new())
            .unwrap();
        assert_eq!(nodes.len(), 3);
        assert_eq!(
            nodes[1].edges(),
            [&CrossFileTypeReference::new("storage/2023-01-01/types.json", 0)]
        );
        assert_eq!(
            nodes[2].edges(),
            [&CrossFileTypeReference::new("storage/common/types.json", 4)]
        );
        assert_eq!(
            *transport.requests.lock().unwrap(),
            ["https://example.com/storage/2023-01-01/types.json"]
        );
    }

    #[test]
    fn non_success_status_is_remote_fetch_error() {
        let fetcher = RemoteTypeFetcher::new("https://example.com", StaticTransport::new(404, ""));
        let result = fetcher.fetch_types("missing.json", &CancellationToken::new());
        match result {
            Err(TypeLoadError::RemoteFetch { url, status }) => {
                assert_eq!(url, "https://example.com/missing.json");
                assert_eq!(status, 404);
            }
            other => panic!("expected RemoteFetch, got {:?}", other),
        }
    }

    #[test]
    fn non_array_body_is_parse_error() {
        let fetcher = RemoteTypeFetcher::new(
            "https://example.com",
            StaticTransport::new(200, r#"{"$type": "StringType"}"#),
        );
        let result = fetcher.fetch_types("types.json", &CancellationToken::new());
        assert!(matches!(result, Err(TypeLoadError::TypeParse { .. })));
    }

    #[test]
    fn cancelled_token_skips_request() {
        let transport = StaticTransport::new(200, "[]");
        let fetcher = RemoteTypeFetcher::new("https://example.com", transport.clone());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = fetcher.fetch_index(&cancel);
        assert!(matches!(result, Err(TypeLoadError::Cancelled)));
        assert!(transport.requests.lock().unwrap().is_empty());
    }

    #[test]
    fn fetch_index_parses_document() {
        let body = r##"{"resources": {"Microsoft.Web/sites@2022-03-01": {"$ref": "web/types.json#/1"}}}"##;
        let fetcher = RemoteTypeFetcher::new("https://example.com", StaticTransport::new(200, body));
        let index = fetcher.fetch_index(&CancellationToken::new()).unwrap();
        assert!(index.resource("microsoft.web/sites").is_some());
    }
}

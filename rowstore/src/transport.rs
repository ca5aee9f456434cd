use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use crate::error::FetchError;

/// A decoded fetch window.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FetchResponse {
    /// Server-reported total row count, when the response carried one.
    pub total: Option<u64>,
    /// `items[i]` is the payload for absolute index `offset + i`. A `None`
    /// element means "not available" and must not overwrite a cached row.
    pub items: Vec<Option<Value>>,
}

/// Transport capability consumed by [`crate::RowDataStore`].
///
/// Implementations fetch the `count` rows starting at absolute index
/// `offset`. The store issues at most one fetch at a time and aborts a
/// superseded fetch by dropping its future.
#[async_trait]
pub trait RowFetcher: Send + Sync {
    async fn fetch(&self, offset: u64, count: u64) -> Result<FetchResponse, FetchError>;
}

/// HTTP JSON fetcher: `GET <base-url>?offset=<n>&count=<n>`.
///
/// Both the query parameter names and the response key paths are
/// configurable. Key paths may be dotted to reach into an envelope, e.g.
/// with a server responding
///
/// ```json
/// {"results": {"total": 888, "items": [...]}, "error": null}
/// ```
///
/// configure `results.total` and `results.items`.
#[derive(Clone, Debug)]
pub struct HttpRowFetcher {
    client: reqwest::Client,
    base_url: Url,
    offset_param: String,
    count_param: String,
    total_path: String,
    items_path: String,
    timeout: Option<Duration>,
}

impl HttpRowFetcher {
    pub fn new(base_url: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            offset_param: "offset".into(),
            count_param: "count".into(),
            total_path: "total".into(),
            items_path: "items".into(),
            timeout: None,
        }
    }

    /// Reuses an existing client (connection pool) instead of creating one.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_param_keys(
        mut self,
        offset_param: impl Into<String>,
        count_param: impl Into<String>,
    ) -> Self {
        self.offset_param = offset_param.into();
        self.count_param = count_param.into();
        self
    }

    pub fn with_total_path(mut self, total_path: impl Into<String>) -> Self {
        self.total_path = total_path.into();
        self
    }

    pub fn with_items_path(mut self, items_path: impl Into<String>) -> Self {
        self.items_path = items_path.into();
        self
    }

    /// Per-request timeout. Default is none.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn build_url(&self, offset: u64, count: u64) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair(&self.offset_param, &offset.to_string())
            .append_pair(&self.count_param, &count.to_string());
        url
    }
}

#[async_trait]
impl RowFetcher for HttpRowFetcher {
    async fn fetch(&self, offset: u64, count: u64) -> Result<FetchResponse, FetchError> {
        let url = self.build_url(offset, count);

        let mut request = self.client.get(url);
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let body: Value = response.json().await?;

        let total = lookup_path(&body, &self.total_path).and_then(Value::as_u64);

        let items = match lookup_path(&body, &self.items_path) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| (!item.is_null()).then(|| item.clone()))
                .collect(),
            Some(other) => {
                return Err(FetchError::Decode(format!(
                    "expected an array at `{}`, got {other}",
                    self.items_path
                )));
            }
        };

        Ok(FetchResponse { total, items })
    }
}

/// Resolves a dotted key path inside a JSON value.
fn lookup_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |node, key| node.get(key))
}

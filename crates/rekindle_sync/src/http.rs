//! HTTP transport for paged endpoints.
//!
//! The actual HTTP library is abstracted behind [`HttpClient`] so the
//! fetcher can run over reqwest (feature `reqwest`), a test double, or any
//! other client. Token refresh and retry policy belong to that client, not
//! to this module.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::transport::{check_page_size, PageFetcher};
use async_trait::async_trait;
use rekindle_protocol::{Identified, Memory, MemoryActivity, PageRequest, PageResult};
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use tracing::debug;
use url::Url;

/// Route prefix of the user/groups service.
pub const USER_GROUPS_PREFIX: &str = "/user-groups-api";
/// Route prefix of the memories service.
pub const MEMORIES_PREFIX: &str = "/memories-api";

/// Joins a service prefix and a route path.
pub fn build_endpoint(prefix: &str, path: &str) -> String {
    format!("{prefix}{path}")
}

/// Raw HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a response.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP client abstraction.
///
/// `Err` means the request never produced a response (connection refused,
/// DNS failure, timeout). Any response, whatever its status, is `Ok`.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Sends a GET request.
    async fn get(&self, url: &str, headers: &[(String, String)]) -> Result<HttpResponse, String>;
}

/// A paged collection exposed by the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PagedResource {
    /// Posts and comments of a memory, keyed by memory id.
    MemoryActivities,
    /// Memories of a group, keyed by group id.
    GroupMemories,
    /// Any other paged route. An `{id}` segment in the template is replaced
    /// by the parent id.
    Custom {
        /// Service prefix.
        prefix: String,
        /// Route template, e.g. `/groups/{id}/members`.
        path_template: String,
        /// Name of the page size query parameter.
        page_size_param: String,
    },
}

impl PagedResource {
    /// Route template including the service prefix, e.g.
    /// `/memories-api/memories/{id}/activities`.
    pub fn route(&self) -> String {
        match self {
            PagedResource::MemoryActivities => {
                build_endpoint(MEMORIES_PREFIX, "/memories/{id}/activities")
            }
            PagedResource::GroupMemories => build_endpoint(MEMORIES_PREFIX, "/groups/{id}/memories"),
            PagedResource::Custom {
                prefix,
                path_template,
                ..
            } => build_endpoint(prefix, path_template),
        }
    }

    /// Unencoded path segments of the route for `parent_id`.
    pub fn segments(&self, parent_id: &str) -> Vec<String> {
        self.route()
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| match segment {
                "{id}" => parent_id.to_string(),
                other => other.to_string(),
            })
            .collect()
    }

    /// Name of the page size query parameter.
    pub fn page_size_param(&self) -> &str {
        match self {
            PagedResource::MemoryActivities => "pageSize",
            PagedResource::GroupMemories => "limit",
            PagedResource::Custom {
                page_size_param, ..
            } => page_size_param,
        }
    }
}

/// Fetches pages of `T` from a paged REST endpoint.
///
/// Holds no state between calls; every fetch is one GET.
pub struct HttpPageFetcher<C, T> {
    config: SyncConfig,
    resource: PagedResource,
    client: C,
    _item: PhantomData<fn() -> T>,
}

/// Fetcher for a memory's activity feed.
pub type ActivityFetcher<C> = HttpPageFetcher<C, MemoryActivity>;
/// Fetcher for a group's memories.
pub type GroupMemoryFetcher<C> = HttpPageFetcher<C, Memory>;

impl<C: HttpClient, T> HttpPageFetcher<C, T> {
    /// Creates a fetcher for `resource`.
    pub fn new(config: SyncConfig, resource: PagedResource, client: C) -> Self {
        Self {
            config,
            resource,
            client,
            _item: PhantomData,
        }
    }

    /// Returns the resource this fetcher pages through.
    pub fn resource(&self) -> &PagedResource {
        &self.resource
    }

    /// Full URL for `request`, resolved against the configured base URL.
    pub fn page_url(&self, request: &PageRequest) -> SyncResult<Url> {
        let base = &self.config.base_url;
        let mut url = Url::parse(base)
            .map_err(|e| SyncError::Config(format!("invalid base url {base:?}: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| SyncError::Config(format!("base url {base:?} cannot carry a path")))?
            .pop_if_empty()
            .extend(self.resource.segments(&request.parent_id));
        url.query_pairs_mut()
            .extend_pairs(request.query_pairs(self.resource.page_size_param()));
        Ok(url)
    }

    fn headers(&self) -> Vec<(String, String)> {
        let mut headers = vec![("Accept".to_string(), "application/json".to_string())];
        if let Some(token) = &self.config.bearer_token {
            headers.push(("Authorization".to_string(), format!("Bearer {token}")));
        }
        headers
    }
}

impl<C: HttpClient> ActivityFetcher<C> {
    /// Creates a fetcher for memory activity feeds.
    pub fn memory_activities(config: SyncConfig, client: C) -> Self {
        Self::new(config, PagedResource::MemoryActivities, client)
    }
}

impl<C: HttpClient> GroupMemoryFetcher<C> {
    /// Creates a fetcher for group memory lists.
    pub fn group_memories(config: SyncConfig, client: C) -> Self {
        Self::new(config, PagedResource::GroupMemories, client)
    }
}

#[async_trait]
impl<C, T> PageFetcher for HttpPageFetcher<C, T>
where
    C: HttpClient,
    T: Identified + Clone + DeserializeOwned + Send + Sync + 'static,
{
    type Item = T;

    async fn fetch_page(
        &self,
        parent_id: &str,
        page_size: u32,
        cursor: Option<&str>,
    ) -> SyncResult<PageResult<T>> {
        check_page_size(page_size)?;

        let request = PageRequest {
            parent_id: parent_id.to_string(),
            page_size,
            cursor: cursor.map(str::to_string),
        };
        let url = self.page_url(&request)?;
        debug!(%url, "GET page");

        let response = self
            .client
            .get(url.as_str(), &self.headers())
            .await
            .map_err(SyncError::network_retryable)?;

        if !response.is_success() {
            return Err(SyncError::from_status(response.status, &response.body));
        }

        Ok(PageResult::decode(&response.body)?)
    }
}

/// [`HttpClient`] backed by `reqwest`.
#[cfg(feature = "reqwest")]
pub struct ReqwestClient {
    client: reqwest::Client,
}

#[cfg(feature = "reqwest")]
impl ReqwestClient {
    /// Builds a client honoring the configured timeout.
    pub fn new(config: &SyncConfig) -> SyncResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SyncError::Config(format!("http client: {e}")))?;
        Ok(Self { client })
    }
}

#[cfg(feature = "reqwest")]
#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get(&self, url: &str, headers: &[(String, String)]) -> Result<HttpResponse, String> {
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }
        let response = request.send().await.map_err(|e| e.to_string())?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| e.to_string())?;
        Ok(HttpResponse::new(status, body.to_vec()))
    }
}

//! Confluence source: fetches pages over the REST API and converts
//! their storage-format HTML bodies to Markdown files.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::debug;

use crate::error::FetchError;
use crate::sources::Fetcher;
use crate::utils::html::html_to_markdown;
use crate::utils::text::sanitize_filename;

const PAGE_LIMIT: usize = 100;
const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// Fetch plan for one page.
#[derive(Debug, Clone, Deserialize)]
pub struct PageConfig {
    pub page_id: String,
    #[serde(default)]
    pub include_descendants: bool,
}

/// Fetch plan: a whole space, an explicit page list, or both.
/// At least one must be present.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfluenceConfig {
    pub space: Option<String>,
    #[serde(default)]
    pub pages: Vec<PageConfig>,
}

/// Load a fetch plan from a JSON config file.
///
/// ```json
/// {
///   "space": "ENG",
///   "pages": [
///     {"page_id": "12345", "include_descendants": true},
///     {"page_id": "67890"}
///   ]
/// }
/// ```
pub fn load_confluence_config(path: &Path) -> Result<ConfluenceConfig, FetchError> {
    let content = fs::read_to_string(path)?;
    let config: ConfluenceConfig = serde_json::from_str(&content)?;
    Ok(config)
}

#[derive(Debug, Deserialize)]
struct ApiPage {
    id: String,
    title: String,
    body: Option<ApiBody>,
}

#[derive(Debug, Deserialize)]
struct ApiBody {
    storage: Option<ApiStorage>,
}

#[derive(Debug, Deserialize)]
struct ApiStorage {
    value: String,
}

#[derive(Debug, Deserialize)]
struct ApiPageList {
    #[serde(default)]
    results: Vec<ApiPage>,
}

#[derive(Debug)]
pub struct ConfluenceFetcher {
    base_url: String,
    token: String,
    config: ConfluenceConfig,
    client: Client,
}

impl ConfluenceFetcher {
    /// Credentials come from `CONFLUENCE_URL` and `CONFLUENCE_TOKEN`.
    /// Fails fast, before any network or disk activity.
    pub fn from_env(config: ConfluenceConfig) -> Result<Self, FetchError> {
        let url = std::env::var("CONFLUENCE_URL")
            .map_err(|_| FetchError::MissingCredential("CONFLUENCE_URL"))?;
        let token = std::env::var("CONFLUENCE_TOKEN")
            .map_err(|_| FetchError::MissingCredential("CONFLUENCE_TOKEN"))?;
        Self::new(url, token, config)
    }

    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        config: ConfluenceConfig,
    ) -> Result<Self, FetchError> {
        if config.space.is_none() && config.pages.is_empty() {
            return Err(FetchError::InvalidConfig(
                "fetch plan needs a space or at least one page".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(FetchError::Http)?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            config,
            client,
        })
    }

    fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<serde_json::Value, FetchError> {
        debug!("GET {url}");
        let response = self
            .client
            .get(url)
            .query(query)
            .bearer_auth(&self.token)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Api(format!("{url} returned {status}")));
        }
        Ok(response.json()?)
    }

    /// Pages in the configured space, paginated.
    fn fetch_space_pages(&self, space: &str) -> Result<Vec<ApiPage>, FetchError> {
        let url = format!("{}/rest/api/content", self.base_url);
        let mut pages = Vec::new();
        let mut start = 0;

        loop {
            let value = self.get_json(
                &url,
                &[
                    ("type", "page".to_string()),
                    ("spaceKey", space.to_string()),
                    ("expand", "body.storage".to_string()),
                    ("limit", PAGE_LIMIT.to_string()),
                    ("start", start.to_string()),
                ],
            )?;
            let batch: ApiPageList = serde_json::from_value(value)?;
            let count = batch.results.len();
            pages.extend(batch.results);
            if count < PAGE_LIMIT {
                break;
            }
            start += PAGE_LIMIT;
        }

        Ok(pages)
    }

    fn fetch_page(&self, page_id: &str) -> Result<ApiPage, FetchError> {
        let url = format!("{}/rest/api/content/{}", self.base_url, page_id);
        let value = self.get_json(&url, &[("expand", "body.storage".to_string())])?;
        Ok(serde_json::from_value(value)?)
    }

    /// All descendants of a page via a paginated CQL search.
    fn fetch_descendants(&self, page_id: &str) -> Result<Vec<ApiPage>, FetchError> {
        let url = format!("{}/rest/api/content/search", self.base_url);
        let cql = format!("ancestor = {page_id} AND type = page");
        let mut pages = Vec::new();
        let mut start = 0;

        loop {
            let value = self.get_json(
                &url,
                &[
                    ("cql", cql.clone()),
                    ("expand", "body.storage".to_string()),
                    ("limit", PAGE_LIMIT.to_string()),
                    ("start", start.to_string()),
                ],
            )?;
            let batch: ApiPageList = serde_json::from_value(value)?;
            let count = batch.results.len();
            pages.extend(batch.results);
            if count < PAGE_LIMIT {
                break;
            }
            start += PAGE_LIMIT;
        }

        Ok(pages)
    }

    /// Collect every page named by the fetch plan, de-duplicated by id
    /// across the space listing and the page configs.
    fn collect_pages(&self) -> Result<Vec<ApiPage>, FetchError> {
        let mut pages = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        if let Some(ref space) = self.config.space {
            for page in self.fetch_space_pages(space)? {
                if seen.insert(page.id.clone()) {
                    pages.push(page);
                }
            }
        }

        for page_config in &self.config.pages {
            let page = self.fetch_page(&page_config.page_id)?;
            if seen.insert(page.id.clone()) {
                pages.push(page);
            }

            if page_config.include_descendants {
                for descendant in self.fetch_descendants(&page_config.page_id)? {
                    if seen.insert(descendant.id.clone()) {
                        pages.push(descendant);
                    }
                }
            }
        }

        Ok(pages)
    }
}

impl Fetcher for ConfluenceFetcher {
    fn fetch(&self, out_dir: &Path) -> Result<Vec<PathBuf>, FetchError> {
        fs::create_dir_all(out_dir)?;

        let pages = self.collect_pages()?;

        let mut saved = Vec::new();
        for page in pages {
            let html = page
                .body
                .and_then(|b| b.storage)
                .map(|s| s.value)
                .unwrap_or_default();
            let markdown = html_to_markdown(&html);

            let filename = format!("{}_{}.md", page.id, sanitize_filename(&page.title));
            let dest = out_dir.join(filename);
            fs::write(&dest, markdown)?;
            saved.push(dest);
        }

        Ok(saved)
    }
}

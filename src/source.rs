use std::path::PathBuf;
use std::sync::LazyLock;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use regex::Regex;
use spider_client::shapes::request::{ReturnFormat, ReturnFormatHandling};
use spider_client::{RequestParams, Spider};
use tracing::debug;

static IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\([^)]*\)").unwrap());
static BLANKS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Supplies the visible text of the enrollment page, one snapshot per call.
#[async_trait]
pub trait PageSource: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch_text(&self) -> Result<String>;
}

/// Re-reads a text dump of the page on every poll.
pub struct FileSource {
    path: PathBuf,
    name: String,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = format!("file:{}", path.display());
        Self { path, name }
    }
}

#[async_trait]
impl PageSource for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_text(&self) -> Result<String> {
        tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read page snapshot {:?}", self.path))
    }
}

/// Renders the page through spider.cloud and returns its text content.
pub struct SpiderSource {
    spider: Spider,
    url: String,
}

impl SpiderSource {
    pub fn from_env(url: &str) -> Result<Self> {
        let api_key = std::env::var("SPIDER_API_KEY")
            .map_err(|_| anyhow!("SPIDER_API_KEY environment variable must be set"))?;
        let spider = Spider::new(Some(api_key))
            .map_err(|e| anyhow!("Failed to create Spider client: {}", e))?;
        Ok(Self {
            spider,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl PageSource for SpiderSource {
    fn name(&self) -> &str {
        &self.url
    }

    async fn fetch_text(&self) -> Result<String> {
        let params = RequestParams {
            return_format: Some(ReturnFormatHandling::Single(ReturnFormat::Markdown)),
            ..Default::default()
        };

        let response = self
            .spider
            .scrape_url(&self.url, Some(params), "application/json")
            .await
            .map_err(|e| anyhow!("Spider scrape failed: {}", e))?;

        let parsed: serde_json::Value = match response.as_str() {
            Some(s) => serde_json::from_str(s).unwrap_or(response.clone()),
            None => response,
        };

        let content = content_of(&parsed)
            .ok_or_else(|| anyhow!("No content in spider response for {}", self.url))?;
        debug!(chars = content.len(), "Fetched page text");
        Ok(content)
    }
}

fn content_of(response: &serde_json::Value) -> Option<String> {
    response
        .as_array()
        .and_then(|arr| arr.first())
        .and_then(|obj| obj.get("content"))
        .and_then(|c| c.as_str())
        .map(clean_markdown)
}

/// Drop image syntax and collapse runs of blank lines.
fn clean_markdown(md: &str) -> String {
    let cleaned = IMAGE_RE.replace_all(md, "");
    BLANKS_RE.replace_all(&cleaned, "\n\n").to_string()
}

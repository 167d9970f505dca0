// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use crate::config::ApiConfig;
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Accepts a string, a number or null. Null becomes an empty string.
fn deserialize_lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let value: Value = Deserialize::deserialize(deserializer)?;

    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        _ => Err(D::Error::custom("Expected string, number, or null")),
    }
}

/// Null lists and objects decode to their defaults.
fn deserialize_null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Category {
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub name: String,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryList {
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub items: Vec<Category>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Video {
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub expired_at: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoProgram {
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub title: String,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tag {
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Episode {
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub url: String,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub title: String,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub video: Video,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub video_program: VideoProgram,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub next: String,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub previous: String,
}

impl Pagination {
    pub fn next_link(&self) -> Option<&str> {
        let next = self.next.trim();
        if next.is_empty() { None } else { Some(next) }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EpisodePage {
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub pagination: Pagination,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub items: Vec<Episode>,
}

/// Appends `path` below `base`, the way a filesystem join would: a leading `/`
/// on `path` does not discard the base path. Absolute URLs are taken as-is.
pub fn join_path(base: &Url, path: &str) -> Result<Url> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }

    base.join(path.trim_start_matches('/'))
        .with_context(|| format!("Failed to join '{}' onto {}", path, base))
}

/// Anything that can hand back one page of a category's episode listing.
pub(crate) trait PageSource {
    async fn fetch_page(&self, url: &Url) -> Result<EpisodePage>;
}

/// Follows `pagination.next` from `first` until a page has no next link.
/// Fails once `max_pages` pages have been read and there is still more.
pub(crate) async fn collect_pages<S: PageSource>(
    source: &S,
    api_root: &Url,
    first: Url,
    max_pages: usize,
) -> Result<Vec<Episode>> {
    let mut episodes = Vec::new();
    let mut url = first;

    for page in 1..=max_pages {
        info!("Reading page {}", page);
        let mut body = source.fetch_page(&url).await?;
        episodes.append(&mut body.items);

        match body.pagination.next_link() {
            Some(next) => url = join_path(api_root, next)?,
            None => return Ok(episodes),
        }
    }

    anyhow::bail!(
        "Pagination hit the {} page limit at {}; stopping to avoid an endless loop",
        max_pages,
        url
    )
}

/// Builds a readable error for a JSON body that failed to decode, with a
/// window of the text around the failure.
fn describe_json_error(response_text: &str, e: &serde_json::Error) -> String {
    let line_num = e.line();
    let col_num = e.column();

    let mut byte_pos = 0;
    for (i, line_content) in response_text.lines().enumerate() {
        if i + 1 == line_num {
            byte_pos += col_num.saturating_sub(1);
            break;
        }
        byte_pos += line_content.len() + 1;
    }
    let byte_pos = byte_pos.min(response_text.len());

    let mut start = byte_pos.saturating_sub(100);
    while !response_text.is_char_boundary(start) {
        start -= 1;
    }
    let mut end = std::cmp::min(byte_pos + 100, response_text.len());
    while !response_text.is_char_boundary(end) {
        end += 1;
    }
    let context = &response_text[start..end];

    format!(
        "JSON parsing failed at line {}, column {} (byte position ~{}):\n\
        Context: ...{}...\n\
        Error: {}",
        line_num,
        col_num,
        byte_pos,
        context.replace(['\n', '\r'], " "),
        e
    )
}

fn format_bytes(len: usize) -> String {
    if len < 1024 {
        format!("{} B", len)
    } else if len < 1024 * 1024 {
        format!("{:.1} KB", len as f64 / 1024.0)
    } else {
        format!("{:.1} MB", len as f64 / (1024.0 * 1024.0))
    }
}

#[derive(Debug)]
pub struct NhkApi {
    client: Client,
    api_root: Url,
    language: String,
}

impl NhkApi {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let api_root = Url::parse(&config.root)
            .with_context(|| format!("Invalid API root URL: {}", config.root))?;
        if api_root.cannot_be_a_base() {
            anyhow::bail!("API root URL cannot carry a path: {}", config.root);
        }
        if config.language.trim().is_empty() {
            anyhow::bail!("API language must not be empty");
        }

        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .user_agent(config.user_agent.clone())
                .build()?,
            api_root,
            language: config.language.clone(),
        })
    }

    pub fn api_root(&self) -> &Url {
        &self.api_root
    }

    fn shows_url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.api_root.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("API root URL cannot carry a path: {}", self.api_root))?
            .pop_if_empty()
            .extend(["showsapi", "v1", self.language.as_str()])
            .extend(segments);
        Ok(url)
    }

    pub fn categories_url(&self) -> Result<Url> {
        self.shows_url(&["categories", ""])
    }

    pub fn category_episodes_url(&self, category_id: &str) -> Result<Url> {
        self.shows_url(&["categories", category_id, "video_episodes"])
    }

    async fn make_request<T>(&self, url: &Url) -> Result<T>
    where
        T: DeserializeOwned,
    {
        debug!("Requesting: {}", url);

        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg} [{elapsed_precise}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message("Sending request...");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", url))?;

        if !response.status().is_success() {
            pb.finish_and_clear();
            anyhow::bail!(
                "HTTP request to {} failed with status: {}",
                url,
                response.status()
            );
        }

        pb.set_message("Downloading...");

        let mut response_bytes = Vec::new();
        let mut stream = response.bytes_stream();

        while let Some(chunk_result) = futures_util::StreamExt::next(&mut stream).await {
            let chunk = chunk_result.with_context(|| "Failed to read response chunk")?;
            response_bytes.extend_from_slice(&chunk);
            pb.set_message(format!(
                "Downloading... {}",
                format_bytes(response_bytes.len())
            ));
        }

        pb.finish_and_clear();
        debug!("Response size: {} bytes", response_bytes.len());

        let response_text = String::from_utf8(response_bytes)
            .with_context(|| "Failed to convert response to UTF-8 string")?;

        if response_text.trim().is_empty() {
            anyhow::bail!("Empty response from {}", url);
        }

        serde_json::from_str(&response_text).map_err(|e| {
            let error_msg = describe_json_error(&response_text, &e);
            warn!("JSON parsing error from {}: {}", url, error_msg);
            anyhow::anyhow!(error_msg)
        })
    }

    pub async fn get_categories(&self) -> Result<Vec<Category>> {
        let url = self.categories_url()?;
        let list: CategoryList = self
            .make_request(&url)
            .await
            .with_context(|| "Failed to load category list")?;
        Ok(list.items)
    }

    /// Every episode in a category, across all pages.
    pub async fn get_category_episodes(
        &self,
        category_id: &str,
        max_pages: usize,
    ) -> Result<Vec<Episode>> {
        let first = self.category_episodes_url(category_id)?;
        collect_pages(self, &self.api_root, first, max_pages)
            .await
            .with_context(|| format!("Failed to load episodes of category {}", category_id))
    }

    /// Fetches any API path and returns the JSON untouched.
    pub async fn get_raw(&self, path: &str) -> Result<Value> {
        let url = join_path(&self.api_root, path)?;
        self.make_request(&url).await
    }
}

impl PageSource for NhkApi {
    async fn fetch_page(&self, url: &Url) -> Result<EpisodePage> {
        self.make_request(url).await
    }
}

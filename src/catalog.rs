use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::thread;
use std::time::Duration;

use anyhow::bail;
use crossbeam_channel::unbounded;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::{AUTHORIZATION, USER_AGENT};
use reqwest::StatusCode;
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://apis.ccbp.in/videos";
pub const DEFAULT_WORKERS: usize = 4;

// Characters that cannot appear raw inside one URL path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("video {0} not found")]
    NotFound(String),
    #[error("catalog unreachable: {0}")]
    Network(String),
    #[error("unexpected catalog response: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub base_url: Option<String>,
    pub access_token: String,
    pub user_agent: String,
    pub timeout: Option<Duration>,
    /// Parallel per-id lookups in `get_many_by_ids`; defaults to [`DEFAULT_WORKERS`].
    pub workers: Option<usize>,
    pub http_client: Option<HttpClient>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    Home,
    Trending,
    Gaming,
}

impl Category {
    pub fn as_path(&self) -> &'static str {
        match self {
            Category::Home => "all",
            Category::Trending => "trending",
            Category::Gaming => "gaming",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Category::Home => "Home",
            Category::Trending => "Trending",
            Category::Gaming => "Gaming",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "home" | "all" => Ok(Category::Home),
            "trending" => Ok(Category::Trending),
            "gaming" => Ok(Category::Gaming),
            other => bail!("unknown category {other:?}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub profile_image_url: String,
    #[serde(default, deserialize_with = "count")]
    pub subscriber_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Video {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub thumbnail_url: String,
    #[serde(default, deserialize_with = "count")]
    pub view_count: u64,
    #[serde(default)]
    pub published_at: String,
    pub channel: Channel,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
}

impl Video {
    fn normalize(mut self) -> Self {
        if self.channel.id.trim().is_empty() {
            self.channel.id = self.channel.name.clone();
        }
        self
    }
}

#[derive(Debug, Deserialize)]
struct VideoList {
    #[serde(default)]
    videos: Vec<Video>,
}

#[derive(Debug, Deserialize)]
struct VideoDetail {
    #[serde(default, alias = "video")]
    video_details: Option<Video>,
}

pub struct Client {
    http: HttpClient,
    base_url: String,
    access_token: String,
    user_agent: String,
    workers: usize,
}

impl Client {
    pub fn new(config: ClientConfig) -> anyhow::Result<Self> {
        if config.user_agent.trim().is_empty() {
            bail!("catalog client user agent required");
        }
        let base = config
            .base_url
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let base_url = Url::parse(&base)?;

        let http = match config.http_client {
            Some(client) => client,
            None => HttpClient::builder()
                .timeout(config.timeout.unwrap_or(Duration::from_secs(20)))
                .build()?,
        };

        Ok(Client {
            http,
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
            access_token: config.access_token,
            user_agent: config.user_agent,
            workers: config.workers.unwrap_or(DEFAULT_WORKERS).max(1),
        })
    }

    pub fn list_by_category(&self, category: Category) -> Result<Vec<Video>, CatalogError> {
        let query: &[(&str, &str)] = match category {
            Category::Home => &[("search", "")],
            _ => &[],
        };
        let list: VideoList = self.get_json(category.as_path(), query)?;
        Ok(list.videos.into_iter().map(Video::normalize).collect())
    }

    /// An empty term yields the unfiltered home feed.
    pub fn search(&self, term: &str) -> Result<Vec<Video>, CatalogError> {
        let list: VideoList = self.get_json("all", &[("search", term.trim())])?;
        Ok(list.videos.into_iter().map(Video::normalize).collect())
    }

    pub fn get_by_id(&self, id: &str) -> Result<Video, CatalogError> {
        if id.trim().is_empty() {
            return Err(CatalogError::NotFound(id.to_string()));
        }
        let path = video_path(id);
        let detail: VideoDetail = self.get_json(&path, &[]).map_err(|err| match err {
            CatalogError::Network(_) | CatalogError::Decode(_) => err,
            CatalogError::NotFound(_) => CatalogError::NotFound(id.to_string()),
        })?;
        detail
            .video_details
            .map(Video::normalize)
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))
    }

    /// Resolves every id it can and drops the rest.
    ///
    /// The catalog has no bulk lookup, so the home listing stands in for
    /// one. Ids it does not cover are fetched one by one in parallel.
    /// Results follow the order of `ids`; duplicates and blanks are ignored.
    pub fn get_many_by_ids(&self, ids: &[String]) -> Vec<Video> {
        let mut wanted: Vec<&str> = Vec::with_capacity(ids.len());
        for id in ids {
            let id = id.trim();
            if !id.is_empty() && !wanted.contains(&id) {
                wanted.push(id);
            }
        }
        if wanted.is_empty() {
            return Vec::new();
        }

        let mut found: HashMap<String, Video> = match self.list_by_category(Category::Home) {
            Ok(videos) => videos
                .into_iter()
                .filter(|video| wanted.contains(&video.id.as_str()))
                .map(|video| (video.id.clone(), video))
                .collect(),
            Err(err) => {
                tracing::debug!(error = %err, "bulk lookup unavailable, fetching ids one by one");
                HashMap::new()
            }
        };

        let missing: Vec<&str> = wanted
            .iter()
            .copied()
            .filter(|id| !found.contains_key(*id))
            .collect();
        for video in fetch_each(&missing, self.workers, |id| self.get_by_id(id)) {
            found.insert(video.id.clone(), video);
        }

        wanted.iter().filter_map(|id| found.remove(*id)).collect()
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, CatalogError> {
        let url = format!("{}/{}", self.base_url, path);
        tracing::debug!(%url, "catalog request");

        let mut request = self
            .http
            .get(&url)
            .header(USER_AGENT, &self.user_agent)
            .query(query);
        if !self.access_token.is_empty() {
            request = request.header(AUTHORIZATION, format!("Bearer {}", self.access_token));
        }

        let response = request
            .send()
            .map_err(|err| CatalogError::Network(err.to_string()))?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            return Err(CatalogError::Network(format!("{url} returned {status}")));
        }

        let body = response
            .text()
            .map_err(|err| CatalogError::Network(err.to_string()))?;
        serde_json::from_str(&body).map_err(|err| CatalogError::Decode(err.to_string()))
    }
}

fn video_path(id: &str) -> String {
    utf8_percent_encode(id, PATH_SEGMENT).to_string()
}

/// Runs `fetch` for every id on a pool of at most `workers` threads and keeps
/// the successes, in input order.
pub(crate) fn fetch_each<F>(ids: &[&str], workers: usize, fetch: F) -> Vec<Video>
where
    F: Fn(&str) -> Result<Video, CatalogError> + Sync,
{
    if ids.is_empty() {
        return Vec::new();
    }
    let (job_tx, job_rx) = unbounded();
    for job in ids.iter().copied().enumerate() {
        let _ = job_tx.send(job);
    }
    drop(job_tx);

    let (result_tx, result_rx) = unbounded();
    thread::scope(|scope| {
        for _ in 0..workers.clamp(1, ids.len()) {
            let jobs = job_rx.clone();
            let results = result_tx.clone();
            let fetch = &fetch;
            scope.spawn(move || {
                for (index, id) in jobs.iter() {
                    let _ = results.send((index, id, fetch(id)));
                }
            });
        }
    });
    drop(result_tx);

    let mut fetched: Vec<(usize, Video)> = result_rx
        .iter()
        .filter_map(|(index, id, result)| match result {
            Ok(video) => Some((index, video)),
            Err(err) => {
                tracing::warn!(id, error = %err, "dropping unavailable video");
                None
            }
        })
        .collect();
    fetched.sort_by_key(|(index, _)| *index);
    fetched.into_iter().map(|(_, video)| video).collect()
}

/// Accepts counts as numbers or as the abbreviated text the catalog serves
/// ("1.4K", "2M").
fn count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Float(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Float(f) if f >= 0.0 => Ok(f as u64),
        Raw::Float(f) => Err(de::Error::custom(format!("negative count {f}"))),
        Raw::Text(text) => parse_count(&text)
            .ok_or_else(|| de::Error::custom(format!("invalid count {text:?}"))),
    }
}

pub fn parse_count(text: &str) -> Option<u64> {
    let cleaned: String = text
        .trim()
        .trim_end_matches(" views")
        .trim_end_matches(" subscribers")
        .chars()
        .filter(|c| *c != ',')
        .collect();
    if cleaned.is_empty() {
        return Some(0);
    }
    let (digits, multiplier) = match cleaned.chars().last()?.to_ascii_uppercase() {
        'K' => (&cleaned[..cleaned.len() - 1], 1_000f64),
        'M' => (&cleaned[..cleaned.len() - 1], 1_000_000f64),
        'B' => (&cleaned[..cleaned.len() - 1], 1_000_000_000f64),
        _ => (cleaned.as_str(), 1f64),
    };
    let value: f64 = digits.trim().parse().ok()?;
    if value < 0.0 || !value.is_finite() {
        return None;
    }
    Some((value * multiplier).round() as u64)
}

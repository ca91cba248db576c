use std::io::Write;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;

use crate::domain::null_as_default;
use crate::error::SyncError;

pub const ARCHIVE_HOST: &str = "xeno-canto.org";
pub const QUALITY_A: &str = "A";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub recordings: Vec<Recording>,
}

/// One archive recording. Field names follow the archive's abbreviations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Recording {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, rename = "gen", deserialize_with = "null_as_default")]
    pub genus: String,
    #[serde(default, rename = "sp", deserialize_with = "null_as_default")]
    pub species: String,
    #[serde(default, rename = "rec", deserialize_with = "null_as_default")]
    pub recordist: String,
    #[serde(default, rename = "cnt", deserialize_with = "null_as_default")]
    pub country: String,
    #[serde(default, rename = "loc", deserialize_with = "null_as_default")]
    pub location: String,
    #[serde(default, rename = "q", deserialize_with = "null_as_default")]
    pub quality: String,
    #[serde(default, rename = "lic", deserialize_with = "null_as_default")]
    pub license: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub file: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub length: String,
}

impl Recording {
    pub fn is_usable(&self) -> bool {
        !self.file.trim().is_empty()
    }

    /// The archive hands out scheme-relative file references; downloads
    /// always go over https.
    pub fn file_url(&self) -> String {
        secure_url(self.file.trim())
    }

    pub fn page_url(&self) -> String {
        format!("https://{ARCHIVE_HOST}/{}", self.id)
    }
}

pub fn secure_url(reference: &str) -> String {
    if reference.starts_with("https://") {
        reference.to_string()
    } else if let Some(rest) = reference.strip_prefix("http://") {
        format!("https://{rest}")
    } else if let Some(rest) = reference.strip_prefix("//") {
        format!("https://{rest}")
    } else if reference.starts_with('/') {
        format!("https://{ARCHIVE_HOST}{reference}")
    } else {
        format!("https://{reference}")
    }
}

pub trait ArchiveClient: Send + Sync {
    /// First result page for a query in the archive's search syntax.
    fn search(&self, query: &str) -> Result<SearchResponse, SyncError>;
    fn download(&self, url: &str, sink: &mut dyn Write) -> Result<u64, SyncError>;
}

#[derive(Clone)]
pub struct ArchiveHttpClient {
    client: Client,
    base_url: String,
    token: String,
}

impl ArchiveHttpClient {
    pub fn new(token: &str, base_url: &str, timeout: Duration) -> Result<Self, SyncError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("species-sync/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| SyncError::ArchiveHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| SyncError::ArchiveHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn handle_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, SyncError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "archive request failed".to_string());
        Err(SyncError::ArchiveStatus { status, message })
    }
}

impl ArchiveClient for ArchiveHttpClient {
    fn search(&self, query: &str) -> Result<SearchResponse, SyncError> {
        let url = format!("{}/recordings", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("query", query), ("key", self.token.as_str()), ("page", "1")])
            .send()
            .map_err(|err| SyncError::ArchiveHttp(err.to_string()))?;
        let response = Self::handle_status(response)?;
        response
            .json()
            .map_err(|err| SyncError::ArchiveHttp(err.to_string()))
    }

    fn download(&self, url: &str, sink: &mut dyn Write) -> Result<u64, SyncError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| SyncError::ArchiveHttp(err.to_string()))?;
        let mut response = Self::handle_status(response)?;
        response
            .copy_to(sink)
            .map_err(|err| SyncError::ArchiveHttp(err.to_string()))
    }
}

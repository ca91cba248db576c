use std::fmt;
use std::io::Write;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;

use crate::domain::null_as_default;
use crate::error::SyncError;

/// Scope description marking the worldwide assessment of a taxon.
pub const GLOBAL_SCOPE: &str = "Global";

#[derive(Debug, Clone, Deserialize)]
pub struct TaxonResponse {
    #[serde(default)]
    pub taxon: Option<Taxon>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub assessments: Vec<AssessmentSummary>,
}

impl TaxonResponse {
    /// The first global-scope assessment that carries an id, with that id.
    pub fn global_assessment(&self) -> Option<(u64, &AssessmentSummary)> {
        self.assessments
            .iter()
            .filter(|assessment| assessment.is_global())
            .find_map(|assessment| assessment.assessment_id.map(|id| (id, assessment)))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Taxon {
    #[serde(default)]
    pub scientific_name: Option<String>,
    #[serde(default)]
    pub kingdom_name: Option<String>,
    #[serde(default)]
    pub phylum_name: Option<String>,
    #[serde(default)]
    pub class_name: Option<String>,
    #[serde(default)]
    pub order_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
    #[serde(default)]
    pub genus_name: Option<String>,
    #[serde(default)]
    pub species_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssessmentSummary {
    #[serde(default)]
    pub assessment_id: Option<u64>,
    #[serde(default)]
    pub year_published: Option<TextOrNumber>,
    #[serde(default)]
    pub red_list_category_code: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub scopes: Vec<Scope>,
}

impl AssessmentSummary {
    pub fn is_global(&self) -> bool {
        self.scopes
            .iter()
            .any(|scope| scope.description.en.as_deref() == Some(GLOBAL_SCOPE))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Scope {
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: LocalizedText,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocalizedText {
    #[serde(default)]
    pub en: Option<String>,
}

/// Fields the registry sends either as JSON strings or as numbers.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TextOrNumber {
    Text(String),
    Number(serde_json::Number),
}

impl fmt::Display for TextOrNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextOrNumber::Text(value) => write!(f, "{value}"),
            TextOrNumber::Number(value) => write!(f, "{value}"),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssessmentDetail {
    #[serde(default)]
    pub population_trend: Option<PopulationTrend>,
    #[serde(default)]
    pub red_list_category: Option<RedListCategory>,
    #[serde(default)]
    pub supplementary_info: Option<SupplementaryInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PopulationTrend {
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: LocalizedText,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RedListCategory {
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SupplementaryInfo {
    #[serde(default)]
    pub population_size: Option<TextOrNumber>,
    #[serde(default)]
    pub generational_length: Option<TextOrNumber>,
}

/// The assessment endpoint answers with the assessment itself or with a
/// `result` envelope, depending on API revision.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AssessmentPayload {
    Envelope { result: Vec<AssessmentDetail> },
    Direct(AssessmentDetail),
}

impl AssessmentPayload {
    /// A bare object only counts as an assessment when it carries a trend.
    pub fn into_detail(self) -> Option<AssessmentDetail> {
        match self {
            AssessmentPayload::Direct(detail) if detail.population_trend.is_some() => Some(detail),
            AssessmentPayload::Direct(_) => None,
            AssessmentPayload::Envelope { result } => result.into_iter().next(),
        }
    }
}

pub trait RegistryClient: Send + Sync {
    fn taxon_by_name(&self, genus: &str, species: &str) -> Result<TaxonResponse, SyncError>;
    fn assessment(&self, assessment_id: u64) -> Result<AssessmentPayload, SyncError>;
    /// Streams the distribution map image for an assessment into `sink`,
    /// returning the number of bytes written.
    fn download_map(&self, assessment_id: u64, sink: &mut dyn Write) -> Result<u64, SyncError>;
}

#[derive(Clone)]
pub struct RegistryHttpClient {
    client: Client,
    map_client: Client,
    base_url: String,
    map_base_url: String,
}

impl RegistryHttpClient {
    pub fn new(
        token: &str,
        base_url: &str,
        map_base_url: &str,
        timeout: Duration,
    ) -> Result<Self, SyncError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("species-sync/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| SyncError::RegistryHttp(err.to_string()))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let mut auth = HeaderValue::from_str(token)
            .map_err(|err| SyncError::RegistryHttp(format!("invalid token: {err}")))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| SyncError::RegistryHttp(err.to_string()))?;

        // The map images are served by the public site, which rejects the
        // API client's default headers.
        let mut map_headers = HeaderMap::new();
        map_headers.insert(ACCEPT, HeaderValue::from_static("image/jpeg"));
        map_headers.insert(
            USER_AGENT,
            HeaderValue::from_static("Mozilla/5.0 (Windows NT 10.0; Win64; x64)"),
        );
        let map_client = Client::builder()
            .default_headers(map_headers)
            .timeout(timeout)
            .build()
            .map_err(|err| SyncError::RegistryHttp(err.to_string()))?;

        Ok(Self {
            client,
            map_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            map_base_url: map_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn map_url(&self, assessment_id: u64) -> String {
        format!(
            "{}/assessments/{assessment_id}/distribution_map/jpg",
            self.map_base_url
        )
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
            .unwrap_or_else(|_| "registry request failed".to_string());
        Err(SyncError::RegistryStatus { status, message })
    }
}

impl RegistryClient for RegistryHttpClient {
    fn taxon_by_name(&self, genus: &str, species: &str) -> Result<TaxonResponse, SyncError> {
        let url = format!("{}/taxa/scientific_name", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("genus_name", genus), ("species_name", species)])
            .send()
            .map_err(|err| SyncError::RegistryHttp(err.to_string()))?;
        let response = Self::handle_status(response)?;
        response
            .json()
            .map_err(|err| SyncError::RegistryHttp(err.to_string()))
    }

    fn assessment(&self, assessment_id: u64) -> Result<AssessmentPayload, SyncError> {
        let url = format!("{}/assessment/{assessment_id}", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|err| SyncError::RegistryHttp(err.to_string()))?;
        let response = Self::handle_status(response)?;
        response
            .json()
            .map_err(|err| SyncError::RegistryHttp(err.to_string()))
    }

    fn download_map(&self, assessment_id: u64, sink: &mut dyn Write) -> Result<u64, SyncError> {
        let url = self.map_url(assessment_id);
        let response = self
            .map_client
            .get(&url)
            .send()
            .map_err(|err| SyncError::RegistryHttp(err.to_string()))?;
        let mut response = Self::handle_status(response)?;
        response
            .copy_to(sink)
            .map_err(|err| SyncError::RegistryHttp(err.to_string()))
    }
}

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::normalize::asset_name;

/// Sentinel for every value that could not be resolved.
pub const NOT_AVAILABLE: &str = "n/a";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeciesInput {
    pub genus: String,
    pub species: String,
    #[serde(rename = "german", alias = "displayName")]
    pub display_name: String,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub weight: Option<String>,
}

impl SpeciesInput {
    pub fn scientific_name(&self) -> String {
        format!("{} {}", self.genus, self.species)
    }

    pub fn slug(&self) -> String {
        url_slug(&format!("{}{}", self.genus, self.species))
    }

    pub fn asset_name(&self) -> String {
        asset_name_for(&self.display_name, &self.scientific_name())
    }

    pub fn size_or_na(&self) -> String {
        or_not_available(self.size.as_deref())
    }

    pub fn weight_or_na(&self) -> String {
        or_not_available(self.weight.as_deref())
    }
}

/// One dataset row. Field names on the wire are those of the published
/// dataset; consumers match records by `URLSlug`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeciesRecord {
    #[serde(rename = "URLSlug")]
    pub url_slug: String,
    #[serde(rename = "Wissenschaftlicher Name")]
    pub scientific_name: String,
    #[serde(rename = "Deutscher Name")]
    pub display_name: String,
    #[serde(rename = "Gewicht")]
    pub weight: String,
    #[serde(rename = "Größe")]
    pub size: String,
    #[serde(rename = "Assessment ID")]
    pub assessment_id: String,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Trend")]
    pub trend: String,
    #[serde(rename = "Kategorie")]
    pub category: String,
    #[serde(rename = "Populationgröße")]
    pub population_size: String,
    #[serde(rename = "Lebenserwartung")]
    pub generation_length: String,
    #[serde(rename = "Kingdom")]
    pub kingdom: String,
    #[serde(rename = "Phylum")]
    pub phylum: String,
    #[serde(rename = "Class")]
    pub class: String,
    #[serde(rename = "Order")]
    pub order: String,
    #[serde(rename = "Family")]
    pub family: String,
    #[serde(rename = "Genus")]
    pub genus: String,
    #[serde(rename = "Species")]
    pub species: String,
    #[serde(rename = "Letztes IUCN Update")]
    pub last_upstream_update: String,
    #[serde(rename = "Daten abgerufen")]
    pub date_fetched: String,
}

impl SpeciesRecord {
    /// The all-"n/a" record used whenever a species cannot be resolved.
    /// Identity and physical fields still come from the input.
    pub fn fallback(input: &SpeciesInput, scientific_name: &str, date_fetched: &str) -> Self {
        Self {
            url_slug: input.slug(),
            scientific_name: scientific_name.to_string(),
            display_name: input.display_name.clone(),
            weight: input.weight_or_na(),
            size: input.size_or_na(),
            assessment_id: NOT_AVAILABLE.to_string(),
            status: NOT_AVAILABLE.to_string(),
            trend: NOT_AVAILABLE.to_string(),
            category: NOT_AVAILABLE.to_string(),
            population_size: NOT_AVAILABLE.to_string(),
            generation_length: NOT_AVAILABLE.to_string(),
            kingdom: NOT_AVAILABLE.to_string(),
            phylum: NOT_AVAILABLE.to_string(),
            class: NOT_AVAILABLE.to_string(),
            order: NOT_AVAILABLE.to_string(),
            family: NOT_AVAILABLE.to_string(),
            genus: NOT_AVAILABLE.to_string(),
            species: NOT_AVAILABLE.to_string(),
            last_upstream_update: NOT_AVAILABLE.to_string(),
            date_fetched: date_fetched.to_string(),
        }
    }

    /// Numeric assessment id, `None` for the sentinel or anything unparsable.
    pub fn assessment_id(&self) -> Option<u64> {
        self.assessment_id.trim().parse().ok()
    }

    pub fn label(&self) -> &str {
        if self.display_name.trim().is_empty() {
            &self.scientific_name
        } else {
            &self.display_name
        }
    }

    pub fn asset_name(&self) -> String {
        asset_name_for(&self.display_name, &self.scientific_name)
    }

    pub fn has_species_data(&self) -> bool {
        self.scientific_name != NOT_AVAILABLE && self.assessment_id().is_some()
    }
}

/// Sidecar written next to every downloaded recording.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditMetadata {
    pub scientific_name: String,
    pub german_name: String,
    pub recordist: String,
    pub country: String,
    pub location: String,
    pub quality: String,
    pub license: String,
    pub source: String,
    pub url: String,
}

/// Outcome of [`crate::recording::RecordingAcquirer::ensure_recording`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingOutcome {
    AlreadyPresent,
    Downloaded,
    Missing,
    Failed,
}

impl RecordingOutcome {
    pub fn label(self) -> &'static str {
        match self {
            RecordingOutcome::AlreadyPresent | RecordingOutcome::Downloaded => "ok",
            RecordingOutcome::Missing => "missing",
            RecordingOutcome::Failed => "error",
        }
    }
}

impl fmt::Display for RecordingOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Outcome of [`crate::maps::MapSynchronizer::sync_map`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapOutcome {
    Skipped,
    UpToDate,
    Downloaded,
    Missing,
    Failed,
}

impl MapOutcome {
    pub fn label(self) -> &'static str {
        match self {
            MapOutcome::Skipped => NOT_AVAILABLE,
            MapOutcome::UpToDate | MapOutcome::Downloaded => "ok",
            MapOutcome::Missing => "missing",
            MapOutcome::Failed => "error",
        }
    }
}

impl fmt::Display for MapOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Lowercase and drop all whitespace: `"Turdus merula"` becomes `turdusmerula`.
pub fn url_slug(value: &str) -> String {
    value
        .chars()
        .filter(|ch| !ch.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Asset names derive from the display name, falling back to the scientific
/// name when no display name is set.
pub fn asset_name_for(display_name: &str, scientific_name: &str) -> String {
    if display_name.trim().is_empty() {
        asset_name(Some(scientific_name))
    } else {
        asset_name(Some(display_name))
    }
}

/// Field deserializer that reads an explicit JSON `null` like a missing key.
/// Use together with `#[serde(default)]`.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

fn or_not_available(value: Option<&str>) -> String {
    match value {
        Some(value) if !value.trim().is_empty() => value.to_string(),
        _ => NOT_AVAILABLE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blackbird() -> SpeciesInput {
        SpeciesInput {
            genus: "Turdus".to_string(),
            species: "merula".to_string(),
            display_name: "Amsel".to_string(),
            size: Some("24-27 cm".to_string()),
            weight: None,
        }
    }

    #[test]
    fn slug_is_lowercase_without_whitespace() {
        assert_eq!(blackbird().slug(), "turdusmerula");
        assert_eq!(url_slug("Parus  Major"), "parusmajor");
    }

    #[test]
    fn fallback_keeps_identity() {
        let record = SpeciesRecord::fallback(&blackbird(), "Turdus merula", "2026-01-02");
        assert_eq!(record.url_slug, "turdusmerula");
        assert_eq!(record.display_name, "Amsel");
        assert_eq!(record.size, "24-27 cm");
        assert_eq!(record.weight, NOT_AVAILABLE);
        assert_eq!(record.assessment_id, NOT_AVAILABLE);
        assert_eq!(record.assessment_id(), None);
        assert!(!record.has_species_data());
    }

    #[test]
    fn species_input_reads_published_keys() {
        let input: SpeciesInput = serde_json::from_str(
            r#"{"genus":"Erithacus","species":"rubecula","german":"Rotkehlchen"}"#,
        )
        .unwrap();
        assert_eq!(input.display_name, "Rotkehlchen");
        assert_eq!(input.size_or_na(), NOT_AVAILABLE);
    }

    #[test]
    fn record_serializes_every_field() {
        let record = SpeciesRecord::fallback(&blackbird(), "Turdus merula", "2026-01-02");
        let value = serde_json::to_value(&record).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), 20);
        assert_eq!(object["URLSlug"], "turdusmerula");
        assert_eq!(object["Kingdom"], NOT_AVAILABLE);
    }
}

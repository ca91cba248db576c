//! Resolves a species against the assessment registry.
//!
//! Every path through [`Resolver::resolve_species`] ends in a complete record:
//! upstream failures degrade to "n/a" values and leave one line in the error
//! log.

use crate::domain::{NOT_AVAILABLE, SpeciesInput, SpeciesRecord};
use crate::error_log::ErrorLog;
use crate::format::{generation_length, group_digit_runs};
use crate::registry::{AssessmentDetail, RegistryClient, TextOrNumber};

pub const DEFAULT_CATEGORY_CODE: &str = "DD";
pub const DEFAULT_TREND: &str = "Unknown";

const CATEGORY_LABELS: &[(&str, &str)] = &[
    ("LC", "Nicht gefährdet"),
    ("NT", "Potentiell gefährdet"),
    ("VU", "Gefährdet"),
    ("EN", "Stark gefährdet"),
    ("CR", "Vom Aussterben bedroht"),
    ("EW", "In freier Wildbahn ausgestorben"),
    ("EX", "Ausgestorben"),
    ("DD", "Keine ausreichende Datenlage"),
];

const TREND_LABELS: &[(&str, &str)] = &[
    ("Increasing", "Zunehmend"),
    ("Stable", "Stabil"),
    ("Decreasing", "Abnehmend"),
    ("Unknown", "Unbekannt"),
];

/// German long form of a Red List category code. Unknown codes map to the
/// "insufficient data" label.
pub fn category_label(code: &str) -> &'static str {
    lookup(CATEGORY_LABELS, code).unwrap_or("Keine ausreichende Datenlage")
}

/// German label of an English population trend.
pub fn trend_label(trend: &str) -> &'static str {
    lookup(TREND_LABELS, trend).unwrap_or("Unbekannt")
}

fn lookup(table: &[(&str, &'static str)], key: &str) -> Option<&'static str> {
    table
        .iter()
        .find(|(candidate, _)| *candidate == key)
        .map(|(_, label)| *label)
}

/// Conservation fields taken from the assessment detail, already localized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssessmentFields {
    pub trend: String,
    pub category: String,
    pub population: String,
    pub generation: String,
}

impl AssessmentFields {
    pub fn neutral() -> Self {
        Self {
            trend: NOT_AVAILABLE.to_string(),
            category: NOT_AVAILABLE.to_string(),
            population: NOT_AVAILABLE.to_string(),
            generation: NOT_AVAILABLE.to_string(),
        }
    }

    pub fn from_detail(detail: &AssessmentDetail) -> Self {
        let trend = detail
            .population_trend
            .as_ref()
            .and_then(|trend| trend.description.en.as_deref())
            .unwrap_or(DEFAULT_TREND);
        let category = detail
            .red_list_category
            .as_ref()
            .and_then(|category| category.code.as_deref())
            .unwrap_or(DEFAULT_CATEGORY_CODE);
        let info = detail.supplementary_info.as_ref();
        let population = text_or_na(info.and_then(|info| info.population_size.as_ref()));
        let generation = text_or_na(info.and_then(|info| info.generational_length.as_ref()));

        Self {
            trend: trend_label(trend).to_string(),
            category: category_label(category).to_string(),
            population: group_digit_runs(&population),
            generation: generation_length(&generation),
        }
    }
}

fn text_or_na(value: Option<&TextOrNumber>) -> String {
    match value.map(ToString::to_string) {
        Some(text) if !text.trim().is_empty() => text,
        _ => NOT_AVAILABLE.to_string(),
    }
}

fn name_or_na(value: Option<&String>) -> String {
    match value {
        Some(value) if !value.trim().is_empty() => value.clone(),
        _ => NOT_AVAILABLE.to_string(),
    }
}

pub struct Resolver<'a, R: RegistryClient> {
    registry: &'a R,
    errors: &'a ErrorLog,
    date_fetched: String,
}

impl<'a, R: RegistryClient> Resolver<'a, R> {
    pub fn new(registry: &'a R, errors: &'a ErrorLog, date_fetched: String) -> Self {
        Self {
            registry,
            errors,
            date_fetched,
        }
    }

    pub fn date_fetched(&self) -> &str {
        &self.date_fetched
    }

    pub fn resolve_species(&self, input: &SpeciesInput) -> SpeciesRecord {
        let scientific = input.scientific_name();
        tracing::info!(
            species = %scientific,
            name = %input.display_name,
            "looking up taxon"
        );

        let response = match self.registry.taxon_by_name(&input.genus, &input.species) {
            Ok(response) => response,
            Err(err) => {
                self.errors
                    .append(&format!("no match: {scientific} ({err})"));
                return SpeciesRecord::fallback(input, &scientific, &self.date_fetched);
            }
        };

        let Some(taxon) = response.taxon.as_ref() else {
            self.errors.append(&format!("no match: {scientific}"));
            return SpeciesRecord::fallback(input, &scientific, &self.date_fetched);
        };
        let resolved_name = taxon
            .scientific_name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| scientific.clone());

        let Some((assessment_id, global)) = response.global_assessment() else {
            self.errors
                .append(&format!("no global assessment: {resolved_name}"));
            return SpeciesRecord::fallback(input, &resolved_name, &self.date_fetched);
        };

        let fields = self.assessment_fields(assessment_id);
        let status = global
            .red_list_category_code
            .clone()
            .filter(|code| !code.trim().is_empty())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());

        SpeciesRecord {
            url_slug: input.slug(),
            scientific_name: resolved_name,
            display_name: input.display_name.clone(),
            weight: input.weight_or_na(),
            size: input.size_or_na(),
            assessment_id: assessment_id.to_string(),
            status,
            trend: fields.trend,
            category: fields.category,
            population_size: fields.population,
            generation_length: fields.generation,
            kingdom: name_or_na(taxon.kingdom_name.as_ref()),
            phylum: name_or_na(taxon.phylum_name.as_ref()),
            class: name_or_na(taxon.class_name.as_ref()),
            order: name_or_na(taxon.order_name.as_ref()),
            family: name_or_na(taxon.family_name.as_ref()),
            genus: name_or_na(taxon.genus_name.as_ref()),
            species: name_or_na(taxon.species_name.as_ref()),
            last_upstream_update: text_or_na(global.year_published.as_ref()),
            date_fetched: self.date_fetched.clone(),
        }
    }

    /// Detail lookup never fails the species; any problem yields neutral
    /// values.
    fn assessment_fields(&self, assessment_id: u64) -> AssessmentFields {
        match self.registry.assessment(assessment_id) {
            Ok(payload) => match payload.into_detail() {
                Some(detail) => AssessmentFields::from_detail(&detail),
                None => {
                    self.errors.append(&format!(
                        "assessment {assessment_id}: unexpected response shape"
                    ));
                    AssessmentFields::neutral()
                }
            },
            Err(err) => {
                self.errors
                    .append(&format!("assessment {assessment_id}: {err}"));
                AssessmentFields::neutral()
            }
        }
    }
}

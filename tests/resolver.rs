use std::io::Write;
use std::sync::Mutex;

use camino::Utf8PathBuf;
use serde_json::json;

use species_data_sync::domain::{NOT_AVAILABLE, SpeciesInput};
use species_data_sync::error::SyncError;
use species_data_sync::error_log::ErrorLog;
use species_data_sync::registry::{AssessmentPayload, RegistryClient, TaxonResponse};
use species_data_sync::resolver::Resolver;

const DATE: &str = "2026-03-01";

#[derive(Default)]
struct MockRegistry {
    taxon: Option<serde_json::Value>,
    assessment: Option<serde_json::Value>,
    assessment_calls: Mutex<Vec<u64>>,
}

impl RegistryClient for MockRegistry {
    fn taxon_by_name(&self, _genus: &str, _species: &str) -> Result<TaxonResponse, SyncError> {
        match &self.taxon {
            Some(value) => Ok(serde_json::from_value(value.clone()).unwrap()),
            None => Err(SyncError::RegistryStatus {
                status: 404,
                message: "not found".to_string(),
            }),
        }
    }

    fn assessment(&self, assessment_id: u64) -> Result<AssessmentPayload, SyncError> {
        self.assessment_calls.lock().unwrap().push(assessment_id);
        match &self.assessment {
            Some(value) => Ok(serde_json::from_value(value.clone()).unwrap()),
            None => Err(SyncError::RegistryHttp("connection reset".to_string())),
        }
    }

    fn download_map(&self, _assessment_id: u64, _sink: &mut dyn Write) -> Result<u64, SyncError> {
        unreachable!("resolver never downloads maps")
    }
}

fn blackbird() -> SpeciesInput {
    SpeciesInput {
        genus: "Turdus".to_string(),
        species: "merula".to_string(),
        display_name: "Amsel".to_string(),
        size: Some("24-29 cm".to_string()),
        weight: None,
    }
}

fn taxon_json() -> serde_json::Value {
    json!({
        "taxon": {
            "scientific_name": "Turdus merula",
            "kingdom_name": "ANIMALIA",
            "phylum_name": "CHORDATA",
            "class_name": "AVES",
            "order_name": "PASSERIFORMES",
            "family_name": "TURDIDAE",
            "genus_name": "Turdus",
            "species_name": "merula"
        },
        "assessments": [
            {
                "assessment_id": 1111,
                "year_published": "2015",
                "red_list_category_code": "LC",
                "scopes": [{"description": {"en": "Europe"}}]
            },
            {
                "assessment_id": 103890208,
                "year_published": 2018,
                "red_list_category_code": "LC",
                "scopes": [{"description": {"en": "Global"}}]
            }
        ]
    })
}

fn detail_json() -> serde_json::Value {
    json!({
        "population_trend": {"description": {"en": "Increasing"}},
        "red_list_category": {"code": "LC"},
        "supplementary_info": {
            "population_size": "1000000000-1999999999",
            "generational_length": 4.6
        }
    })
}

fn error_log(temp: &tempfile::TempDir) -> (Utf8PathBuf, ErrorLog) {
    let path = Utf8PathBuf::from_path_buf(temp.path().join("errors.log")).unwrap();
    (path.clone(), ErrorLog::new(path))
}

fn read_log(path: &Utf8PathBuf) -> String {
    std::fs::read_to_string(path.as_std_path()).unwrap_or_default()
}

#[test]
fn resolves_direct_assessment_payload() {
    let temp = tempfile::tempdir().unwrap();
    let (log_path, log) = error_log(&temp);
    let registry = MockRegistry {
        taxon: Some(taxon_json()),
        assessment: Some(detail_json()),
        ..MockRegistry::default()
    };

    let record = Resolver::new(&registry, &log, DATE.to_string()).resolve_species(&blackbird());

    assert_eq!(*registry.assessment_calls.lock().unwrap(), vec![103890208]);
    assert_eq!(record.url_slug, "turdusmerula");
    assert_eq!(record.scientific_name, "Turdus merula");
    assert_eq!(record.display_name, "Amsel");
    assert_eq!(record.size, "24-29 cm");
    assert_eq!(record.weight, NOT_AVAILABLE);
    assert_eq!(record.assessment_id, "103890208");
    assert_eq!(record.status, "LC");
    assert_eq!(record.trend, "Zunehmend");
    assert_eq!(record.category, "Nicht gefährdet");
    assert_eq!(record.population_size, "1.000.000.000-1.999.999.999");
    assert_eq!(record.generation_length, "4,6 Jahre");
    assert_eq!(record.kingdom, "ANIMALIA");
    assert_eq!(record.family, "TURDIDAE");
    assert_eq!(record.last_upstream_update, "2018");
    assert_eq!(record.date_fetched, DATE);
    assert!(read_log(&log_path).is_empty());
}

#[test]
fn resolves_enveloped_assessment_payload() {
    let temp = tempfile::tempdir().unwrap();
    let (_, log) = error_log(&temp);
    let registry = MockRegistry {
        taxon: Some(taxon_json()),
        assessment: Some(json!({ "result": [detail_json()] })),
        ..MockRegistry::default()
    };

    let record = Resolver::new(&registry, &log, DATE.to_string()).resolve_species(&blackbird());

    assert_eq!(record.trend, "Zunehmend");
    assert_eq!(record.category, "Nicht gefährdet");
}

#[test]
fn unknown_taxon_yields_fallback_record() {
    let temp = tempfile::tempdir().unwrap();
    let (log_path, log) = error_log(&temp);
    let registry = MockRegistry::default();

    let record = Resolver::new(&registry, &log, DATE.to_string()).resolve_species(&blackbird());

    assert_eq!(record.url_slug, "turdusmerula");
    assert_eq!(record.scientific_name, "Turdus merula");
    assert_eq!(record.size, "24-29 cm");
    assert_eq!(record.assessment_id, NOT_AVAILABLE);
    assert_eq!(record.kingdom, NOT_AVAILABLE);
    assert_eq!(record.date_fetched, DATE);
    assert!(registry.assessment_calls.lock().unwrap().is_empty());
    assert!(read_log(&log_path).contains("no match: Turdus merula"));
}

#[test]
fn regional_assessments_only_yield_fallback_record() {
    let temp = tempfile::tempdir().unwrap();
    let (log_path, log) = error_log(&temp);
    let mut taxon = taxon_json();
    taxon["assessments"] = json!([
        {"assessment_id": 1111, "scopes": [{"description": {"en": "Europe"}}]}
    ]);
    taxon["taxon"]["scientific_name"] = json!("Turdus merula merula");
    let registry = MockRegistry {
        taxon: Some(taxon),
        ..MockRegistry::default()
    };

    let record = Resolver::new(&registry, &log, DATE.to_string()).resolve_species(&blackbird());

    assert_eq!(record.scientific_name, "Turdus merula merula");
    assert_eq!(record.assessment_id, NOT_AVAILABLE);
    assert_eq!(record.status, NOT_AVAILABLE);
    assert!(registry.assessment_calls.lock().unwrap().is_empty());
    assert!(read_log(&log_path).contains("no global assessment: Turdus merula merula"));
}

#[test]
fn failed_assessment_lookup_keeps_taxonomy() {
    let temp = tempfile::tempdir().unwrap();
    let (log_path, log) = error_log(&temp);
    let registry = MockRegistry {
        taxon: Some(taxon_json()),
        assessment: None,
        ..MockRegistry::default()
    };

    let record = Resolver::new(&registry, &log, DATE.to_string()).resolve_species(&blackbird());

    assert_eq!(record.assessment_id, "103890208");
    assert_eq!(record.status, "LC");
    assert_eq!(record.order, "PASSERIFORMES");
    assert_eq!(record.trend, NOT_AVAILABLE);
    assert_eq!(record.category, NOT_AVAILABLE);
    assert_eq!(record.population_size, NOT_AVAILABLE);
    assert_eq!(record.generation_length, NOT_AVAILABLE);
    assert!(read_log(&log_path).contains("assessment 103890208:"));
}

#[test]
fn object_without_trend_is_not_an_assessment() {
    let temp = tempfile::tempdir().unwrap();
    let (log_path, log) = error_log(&temp);
    let registry = MockRegistry {
        taxon: Some(taxon_json()),
        assessment: Some(json!({"message": "rate limited"})),
        ..MockRegistry::default()
    };

    let record = Resolver::new(&registry, &log, DATE.to_string()).resolve_species(&blackbird());

    assert_eq!(record.trend, NOT_AVAILABLE);
    assert_eq!(record.category, NOT_AVAILABLE);
    assert!(read_log(&log_path).contains("unexpected response shape"));
}

#[test]
fn null_assessment_list_counts_as_no_global_assessment() {
    let temp = tempfile::tempdir().unwrap();
    let (log_path, log) = error_log(&temp);
    let mut taxon = taxon_json();
    taxon["assessments"] = json!(null);
    taxon["taxon"]["scientific_name"] = json!("Turdus merula merula");
    let registry = MockRegistry {
        taxon: Some(taxon),
        ..MockRegistry::default()
    };

    let record = Resolver::new(&registry, &log, DATE.to_string()).resolve_species(&blackbird());

    assert_eq!(record.scientific_name, "Turdus merula merula");
    assert_eq!(record.assessment_id, NOT_AVAILABLE);
    let log = read_log(&log_path);
    assert!(log.contains("no global assessment: Turdus merula merula"));
    assert!(!log.contains("no match"));
}

#[test]
fn null_regional_scopes_do_not_hide_the_global_assessment() {
    let temp = tempfile::tempdir().unwrap();
    let (log_path, log) = error_log(&temp);
    let mut taxon = taxon_json();
    taxon["assessments"][0]["scopes"] = json!(null);
    taxon["assessments"][0]["year_published"] = json!(null);
    taxon["taxon"]["phylum_name"] = json!(null);
    let registry = MockRegistry {
        taxon: Some(taxon),
        assessment: Some(detail_json()),
        ..MockRegistry::default()
    };

    let record = Resolver::new(&registry, &log, DATE.to_string()).resolve_species(&blackbird());

    assert_eq!(record.assessment_id, "103890208");
    assert_eq!(record.kingdom, "ANIMALIA");
    assert_eq!(record.phylum, NOT_AVAILABLE);
    assert_eq!(record.trend, "Zunehmend");
    assert!(read_log(&log_path).is_empty());
}

use std::fmt::Write as _;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{NOT_AVAILABLE, SpeciesRecord};
use crate::store::{AssetProbe, Store};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportCounts {
    pub total_species: usize,
    pub missing_sound_mp3: usize,
    pub missing_sound_credits: usize,
    pub missing_map: usize,
    pub missing_assessment_id: usize,
    pub missing_status: usize,
    pub missing_category: usize,
    pub missing_trend: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingLists {
    pub sound_mp3: Vec<String>,
    pub sound_credits: Vec<String>,
    pub maps: Vec<String>,
    pub assessment_id: Vec<String>,
    pub status: Vec<String>,
    pub category: Vec<String>,
    pub trend: Vec<String>,
}

/// Which species lack which artifact. Counts always equal the list lengths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletenessReport {
    pub generated_at: String,
    pub counts: ReportCounts,
    pub missing: MissingLists,
}

impl CompletenessReport {
    pub fn build(records: &[SpeciesRecord], store: &Store, probe: &dyn AssetProbe) -> Self {
        let mut missing = MissingLists::default();

        for record in records {
            let label = record.label().to_string();
            let name = record.asset_name();

            if is_missing(&record.assessment_id) {
                missing.assessment_id.push(label.clone());
            }
            if is_missing(&record.status) {
                missing.status.push(label.clone());
            }
            if is_missing(&record.category) {
                missing.category.push(label.clone());
            }
            if is_missing(&record.trend) {
                missing.trend.push(label.clone());
            }

            let has_audio = probe.exists(&store.sound_path(&name));
            if !has_audio {
                missing.sound_mp3.push(label.clone());
            }
            if has_audio && !probe.exists(&store.credits_path(&name)) {
                missing.sound_credits.push(label.clone());
            }
            if !probe.exists(&store.map_path(&name)) {
                missing.maps.push(label);
            }
        }

        let counts = ReportCounts {
            total_species: records.len(),
            missing_sound_mp3: missing.sound_mp3.len(),
            missing_sound_credits: missing.sound_credits.len(),
            missing_map: missing.maps.len(),
            missing_assessment_id: missing.assessment_id.len(),
            missing_status: missing.status.len(),
            missing_category: missing.category.len(),
            missing_trend: missing.trend.len(),
        };

        Self {
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            counts,
            missing,
        }
    }

    /// Human-readable summary. Rendered from this report only, so it always
    /// agrees with the JSON file.
    pub fn render_summary(&self) -> String {
        let counts = &self.counts;
        let mut out = String::new();
        let rule = "==============================";
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "Completeness report");
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "Species total: {}", counts.total_species);
        let _ = writeln!(out, "Missing sound (mp3): {}", counts.missing_sound_mp3);
        let _ = writeln!(out, "Missing sound credits: {}", counts.missing_sound_credits);
        let _ = writeln!(out, "Missing map: {}", counts.missing_map);
        let _ = writeln!(out, "Missing assessment id: {}", counts.missing_assessment_id);
        let _ = writeln!(out, "Missing status: {}", counts.missing_status);
        let _ = writeln!(out, "Missing category: {}", counts.missing_category);
        let _ = writeln!(out, "Missing trend: {}", counts.missing_trend);
        let _ = writeln!(out, "------------------------------");

        let sections: [(&str, &[String]); 7] = [
            ("Missing sound mp3", self.missing.sound_mp3.as_slice()),
            ("Missing sound credits", self.missing.sound_credits.as_slice()),
            ("Missing maps", self.missing.maps.as_slice()),
            ("Missing assessment ids", self.missing.assessment_id.as_slice()),
            ("Missing status", self.missing.status.as_slice()),
            ("Missing category", self.missing.category.as_slice()),
            ("Missing trend", self.missing.trend.as_slice()),
        ];
        for (title, names) in sections {
            if names.is_empty() {
                continue;
            }
            let _ = writeln!(out, "\n{title} ({}):", names.len());
            for name in names {
                let _ = writeln!(out, " - {name}");
            }
        }
        let _ = writeln!(out, "\n{rule}");
        out
    }
}

fn is_missing(value: &str) -> bool {
    value.trim().is_empty() || value == NOT_AVAILABLE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_lists_only_non_empty_sections() {
        let report = CompletenessReport {
            generated_at: "2026-01-01T00:00:00Z".to_string(),
            counts: ReportCounts {
                total_species: 2,
                missing_map: 1,
                ..ReportCounts::default()
            },
            missing: MissingLists {
                maps: vec!["Amsel".to_string()],
                ..MissingLists::default()
            },
        };
        let summary = report.render_summary();
        assert!(summary.contains("Species total: 2"));
        assert!(summary.contains("Missing maps (1):\n - Amsel"));
        assert!(!summary.contains("Missing trend ("));
    }

    #[test]
    fn serializes_published_keys() {
        let report = CompletenessReport {
            generated_at: "2026-01-01T00:00:00Z".to_string(),
            counts: ReportCounts::default(),
            missing: MissingLists::default(),
        };
        let value = serde_json::to_value(&report).unwrap();
        assert!(value["counts"].get("missingSoundMp3").is_some());
        assert!(value["missing"].get("soundCredits").is_some());
        assert!(value.get("generatedAt").is_some());
    }

    #[test]
    fn generated_at_is_utc_with_milliseconds() {
        struct Nothing;
        impl AssetProbe for Nothing {
            fn exists(&self, _path: &camino::Utf8Path) -> bool {
                false
            }
        }
        let store = Store::new("maps".into(), "sounds".into());

        let report = CompletenessReport::build(&[], &store, &Nothing);

        let stamp = &report.generated_at;
        assert_eq!(stamp.len(), "2026-01-01T00:00:00.000Z".len());
        assert!(stamp.ends_with('Z'));
        assert_eq!(&stamp[19..20], ".");
        assert!(chrono::DateTime::parse_from_rfc3339(stamp).is_ok());
    }
}

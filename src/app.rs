use std::fs;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use camino::Utf8PathBuf;
use serde::Serialize;

use crate::archive::ArchiveClient;
use crate::cache::AssessmentIdCache;
use crate::config::ResolvedConfig;
use crate::domain::{MapOutcome, RecordingOutcome, SpeciesInput, SpeciesRecord};
use crate::error::SyncError;
use crate::error_log::ErrorLog;
use crate::maps::MapSynchronizer;
use crate::recording::RecordingAcquirer;
use crate::registry::RegistryClient;
use crate::report::CompletenessReport;
use crate::resolver::Resolver;
use crate::scheduler::SequentialScheduler;
use crate::store::{LocalFs, Store};

#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub records: Vec<SpeciesRecord>,
    pub report: CompletenessReport,
    pub items: Vec<SpeciesStatus>,
}

/// Per-species status line. Informational only; the report is computed from
/// the records and the asset tree, not from these labels.
#[derive(Debug, Clone, Serialize)]
pub struct SpeciesStatus {
    pub name: String,
    pub scientific_name: String,
    pub data: String,
    pub sound: String,
    pub map: String,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub index: usize,
    pub total: usize,
    pub display_name: String,
    pub scientific_name: String,
    pub data: &'static str,
    pub sound: RecordingOutcome,
    pub map: MapOutcome,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

pub struct App<R: RegistryClient, A: ArchiveClient> {
    store: Store,
    registry: R,
    archive: A,
    errors: ErrorLog,
    dataset_output: Utf8PathBuf,
    report_output: Utf8PathBuf,
    pacing: Duration,
}

impl<R: RegistryClient, A: ArchiveClient> App<R, A> {
    pub fn new(config: &ResolvedConfig, registry: R, archive: A) -> Self {
        Self {
            store: Store::new(config.map_dir.clone(), config.sound_dir.clone()),
            registry,
            archive,
            errors: ErrorLog::new(config.error_log.clone()),
            dataset_output: config.dataset_output.clone(),
            report_output: config.report_output.clone(),
            pacing: config.pacing,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn errors(&self) -> &ErrorLog {
        &self.errors
    }

    /// Synchronizes every species in input order, then writes the dataset and
    /// the completeness report. Only failures to write those two files are
    /// returned; everything per species ends up in a record.
    pub fn run(
        &self,
        species: &[SpeciesInput],
        cache: &mut AssessmentIdCache,
        sink: &dyn ProgressSink,
    ) -> Result<RunResult, SyncError> {
        self.store.ensure_roots()?;
        let date_fetched = chrono::Utc::now().format("%Y-%m-%d").to_string();
        let total = species.len();
        tracing::info!(total, pacing_ms = self.pacing.as_millis() as u64, "starting sync");

        let scheduler = SequentialScheduler::new(self.pacing);
        let outcomes = scheduler.run(species, |index, input| {
            let (record, sound, map) = self.isolated_step(input, cache, &date_fetched);
            let data = if record.has_species_data() { "ok" } else { "n/a" };
            tracing::debug!(
                "[{}/{}] {} - {} (sound: {}, map: {}, species data: {})",
                index + 1,
                total,
                record.label(),
                record.scientific_name,
                sound,
                map,
                data
            );
            sink.event(ProgressEvent {
                index,
                total,
                display_name: record.label().to_string(),
                scientific_name: record.scientific_name.clone(),
                data,
                sound,
                map,
            });
            let status = SpeciesStatus {
                name: record.label().to_string(),
                scientific_name: record.scientific_name.clone(),
                data: data.to_string(),
                sound: sound.label().to_string(),
                map: map.label().to_string(),
            };
            (record, status)
        });
        let (records, items): (Vec<_>, Vec<_>) = outcomes.into_iter().unzip();

        Store::write_json_atomic(&self.dataset_output, &records)?;
        tracing::info!(path = %self.dataset_output, records = records.len(), "dataset written");

        let report = self.write_report(&records)?;
        Ok(RunResult {
            records,
            report,
            items,
        })
    }

    /// Rebuilds the report from the dataset already on disk.
    pub fn report(&self) -> Result<CompletenessReport, SyncError> {
        let content = fs::read_to_string(self.dataset_output.as_std_path())
            .map_err(|_| SyncError::DatasetRead(self.dataset_output.clone().into_std_path_buf()))?;
        let records: Vec<SpeciesRecord> = serde_json::from_str(&content)
            .map_err(|err| SyncError::DatasetParse(err.to_string()))?;
        self.write_report(&records)
    }

    fn write_report(&self, records: &[SpeciesRecord]) -> Result<CompletenessReport, SyncError> {
        let report = CompletenessReport::build(records, &self.store, &LocalFs);
        Store::write_json_atomic(&self.report_output, &report)?;
        tracing::info!(path = %self.report_output, "report written");
        Ok(report)
    }

    /// Runs one species behind an error and panic boundary. Whatever escapes
    /// is logged and replaced by the fallback record.
    fn isolated_step(
        &self,
        input: &SpeciesInput,
        cache: &mut AssessmentIdCache,
        date_fetched: &str,
    ) -> (SpeciesRecord, RecordingOutcome, MapOutcome) {
        let result = catch_unwind(AssertUnwindSafe(|| {
            self.sync_species(input, cache, date_fetched)
        }));
        let err = match result {
            Ok(Ok(outcome)) => return outcome,
            Ok(Err(err)) => err,
            Err(payload) => {
                let message = if let Some(s) = payload.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = payload.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "unknown panic".to_string()
                };
                SyncError::SpeciesAborted(message)
            }
        };

        let scientific = input.scientific_name();
        self.errors
            .append(&format!("processing {scientific}: {err}"));
        (
            SpeciesRecord::fallback(input, &scientific, date_fetched),
            RecordingOutcome::Failed,
            MapOutcome::Failed,
        )
    }

    fn sync_species(
        &self,
        input: &SpeciesInput,
        cache: &mut AssessmentIdCache,
        date_fetched: &str,
    ) -> Result<(SpeciesRecord, RecordingOutcome, MapOutcome), SyncError> {
        let resolver = Resolver::new(&self.registry, &self.errors, date_fetched.to_string());
        let record = resolver.resolve_species(input);

        let sound = RecordingAcquirer::new(&self.archive, &self.store, &self.errors)
            .ensure_recording_named(
                &input.genus,
                &input.species,
                &input.display_name,
                &record.asset_name(),
            )?;

        let map = MapSynchronizer::new(&self.registry, &self.store, &self.errors)
            .sync_map(cache, &record)?;

        Ok((record, sound, map))
    }
}

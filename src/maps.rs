use crate::cache::AssessmentIdCache;
use crate::domain::{MapOutcome, SpeciesRecord};
use crate::error::SyncError;
use crate::error_log::ErrorLog;
use crate::registry::RegistryClient;
use crate::store::Store;

/// Keeps one distribution map per species in step with its assessment.
///
/// Maps only change upstream when a new assessment is published, so a map
/// on disk whose cached assessment id matches the record is never fetched
/// again.
pub struct MapSynchronizer<'a, R: RegistryClient> {
    registry: &'a R,
    store: &'a Store,
    errors: &'a ErrorLog,
}

impl<'a, R: RegistryClient> MapSynchronizer<'a, R> {
    pub fn new(registry: &'a R, store: &'a Store, errors: &'a ErrorLog) -> Self {
        Self {
            registry,
            store,
            errors,
        }
    }

    pub fn sync_map(
        &self,
        cache: &mut AssessmentIdCache,
        record: &SpeciesRecord,
    ) -> Result<MapOutcome, SyncError> {
        let label = record.label();
        let Some(assessment_id) = record.assessment_id() else {
            tracing::info!(name = %label, "no assessment id, skipping map");
            return Ok(MapOutcome::Skipped);
        };

        let name = record.asset_name();
        let path = self.store.map_path(&name);
        if path.as_std_path().exists() && cache.get(&name) == Some(assessment_id) {
            tracing::info!(name = %label, "map is up to date");
            return Ok(MapOutcome::UpToDate);
        }

        tracing::info!(name = %label, assessment_id, "downloading map");
        let result = Store::write_with_atomic(&path, |file| {
            self.registry.download_map(assessment_id, file)
        });
        match result {
            Ok(bytes) => {
                tracing::info!(path = %path, bytes, "map saved");
            }
            Err(err) if err.is_status() => {
                tracing::warn!(name = %label, "map not found: {err}");
                return Ok(MapOutcome::Missing);
            }
            Err(err) => {
                self.errors
                    .append(&format!("map download for {label}: {err}"));
                return Ok(MapOutcome::Failed);
            }
        }

        if let Err(err) = cache.record(&name, assessment_id) {
            self.errors
                .append(&format!("assessment cache update for {label}: {err}"));
        }
        Ok(MapOutcome::Downloaded)
    }
}

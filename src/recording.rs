use crate::archive::{ARCHIVE_HOST, ArchiveClient, QUALITY_A, Recording};
use crate::domain::{CreditMetadata, RecordingOutcome, asset_name_for};
use crate::error::SyncError;
use crate::error_log::ErrorLog;
use crate::store::Store;

/// Archive queries from most to least specific: quality A with a typical call
/// length, any quality A, anything.
pub fn cascade_queries(genus: &str, species: &str) -> [String; 3] {
    [
        format!("gen:{genus} sp:{species} q:A len:25-35"),
        format!("gen:{genus} sp:{species} q:A"),
        format!("gen:{genus} sp:{species}"),
    ]
}

/// Prefers a quality A recording, otherwise the first usable one.
pub fn pick_candidate(recordings: &[Recording]) -> Option<&Recording> {
    recordings
        .iter()
        .filter(|recording| recording.is_usable())
        .find(|recording| recording.quality == QUALITY_A)
        .or_else(|| recordings.iter().find(|recording| recording.is_usable()))
}

pub struct RecordingAcquirer<'a, A: ArchiveClient> {
    archive: &'a A,
    store: &'a Store,
    errors: &'a ErrorLog,
}

impl<'a, A: ArchiveClient> RecordingAcquirer<'a, A> {
    pub fn new(archive: &'a A, store: &'a Store, errors: &'a ErrorLog) -> Self {
        Self {
            archive,
            store,
            errors,
        }
    }

    /// Makes sure the species has one recording on disk. Existing audio is
    /// never replaced.
    pub fn ensure_recording(
        &self,
        genus: &str,
        species: &str,
        display_name: &str,
    ) -> Result<RecordingOutcome, SyncError> {
        let name = asset_name_for(display_name, &format!("{genus} {species}"));
        self.ensure_recording_named(genus, species, display_name, &name)
    }

    /// Same as [`ensure_recording`](Self::ensure_recording), but stores the
    /// audio under an asset name chosen by the caller. The pipeline passes the
    /// name of the resolved record so sounds, maps and the report agree.
    pub fn ensure_recording_named(
        &self,
        genus: &str,
        species: &str,
        display_name: &str,
        name: &str,
    ) -> Result<RecordingOutcome, SyncError> {
        let scientific = format!("{genus} {species}");
        let dir = self.store.sound_dir(name);

        if Store::has_audio(&dir)? {
            tracing::info!(name = %name, "recording already present");
            return Ok(RecordingOutcome::AlreadyPresent);
        }

        let Some(candidate) = self.search_cascade(genus, species) else {
            tracing::warn!(species = %scientific, "no recordings available");
            return Ok(RecordingOutcome::Missing);
        };

        let url = candidate.file_url();
        let target = self.store.sound_path(name);
        tracing::info!(url = %url, target = %target, "downloading recording");
        if let Err(err) =
            Store::write_with_atomic(&target, |file| self.archive.download(&url, file))
        {
            self.errors
                .append(&format!("recording {scientific}: {err}"));
            return Ok(RecordingOutcome::Failed);
        }

        let credits = CreditMetadata {
            scientific_name: scientific.clone(),
            german_name: display_name.to_string(),
            recordist: candidate.recordist.clone(),
            country: candidate.country.clone(),
            location: candidate.location.clone(),
            quality: candidate.quality.clone(),
            license: candidate.license.clone(),
            source: ARCHIVE_HOST.to_string(),
            url: candidate.page_url(),
        };
        if let Err(err) = Store::write_json_atomic(&self.store.credits_path(name), &credits) {
            self.errors
                .append(&format!("credits {scientific}: {err}"));
        }

        tracing::info!(target = %target, "recording saved");
        Ok(RecordingOutcome::Downloaded)
    }

    /// Runs the queries in order and stops at the first one with a usable
    /// result. Failed queries are logged and skipped.
    fn search_cascade(&self, genus: &str, species: &str) -> Option<Recording> {
        for query in cascade_queries(genus, species) {
            match self.archive.search(&query) {
                Ok(response) => {
                    if let Some(candidate) = pick_candidate(&response.recordings) {
                        tracing::debug!(query = %query, id = %candidate.id, "recording candidate");
                        return Some(candidate.clone());
                    }
                }
                Err(err) => {
                    self.errors
                        .append(&format!("archive search '{query}': {err}"));
                }
            }
        }
        None
    }
}

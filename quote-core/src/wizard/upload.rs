use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use crate::api::{ApiError, QuoteApi};
use crate::models::UploadedFile;

/// A file picked by the customer, not yet sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingUpload {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Per-file upload progress in percent, keyed by filename.
///
/// The backend takes each file in a single call, so a file sits at 0 while its
/// call is in flight and moves to 100 once the backend has stored it. A failed
/// file is dropped at once; the rest of a batch is dropped when the batch ends,
/// after its final state has been copied into the [`UploadReport`].
///
/// Clones share the same map, so a clone taken before a batch starts can be
/// polled while it runs.
#[derive(Debug, Clone, Default)]
pub struct UploadTracker {
    progress: Arc<Mutex<HashMap<String, u8>>>,
}

impl UploadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn progress(
        &self,
        filename: &str,
    ) -> Option<u8> {
        self.progress.lock().ok()?.get(filename).copied()
    }

    /// Snapshot of every tracked file, sorted by name.
    pub fn snapshot(&self) -> Vec<(String, u8)> {
        let mut entries: Vec<_> = match self.progress.lock() {
            Ok(map) => map.iter().map(|(k, v)| (k.clone(), *v)).collect(),
            Err(_) => Vec::new(),
        };
        entries.sort();
        entries
    }

    fn set(
        &self,
        filename: &str,
        percent: u8,
    ) {
        if let Ok(mut map) = self.progress.lock() {
            map.insert(filename.to_string(), percent.min(100));
        }
    }

    fn forget(
        &self,
        filename: &str,
    ) {
        if let Ok(mut map) = self.progress.lock() {
            map.remove(filename);
        }
    }

    /// Removes `filenames` and returns what was recorded for them, by name.
    fn take(
        &self,
        filenames: &[String],
    ) -> Vec<(String, u8)> {
        let Ok(mut map) = self.progress.lock() else {
            return Vec::new();
        };
        let mut taken: Vec<_> = filenames
            .iter()
            .filter_map(|name| map.remove(name).map(|percent| (name.clone(), percent)))
            .collect();
        taken.sort();
        taken
    }
}

/// Outcome of one upload batch.
#[derive(Debug, Default)]
pub struct UploadReport {
    pub uploaded: Vec<UploadedFile>,
    pub failed: Vec<(String, ApiError)>,
    /// Final progress of every file in the batch that did not fail, by name.
    pub progress: Vec<(String, u8)>,
}

/// Uploads every file concurrently.
///
/// Each upload is independent: a failure is recorded for that file and the
/// others carry on. `on_complete` runs for each successful upload as it
/// finishes, in completion order.
pub async fn upload_all<F>(
    api: Arc<dyn QuoteApi>,
    tracker: &UploadTracker,
    files: Vec<PendingUpload>,
    mut on_complete: F,
) -> UploadReport
where
    F: FnMut(&UploadedFile),
{
    let batch: Vec<String> = files.iter().map(|f| f.filename.clone()).collect();
    let mut in_flight = batch.clone();

    let mut tasks = JoinSet::new();
    for file in files {
        let api = Arc::clone(&api);
        let tracker = tracker.clone();
        tracker.set(&file.filename, 0);
        tasks.spawn(async move {
            let result = api
                .upload_file(&file.filename, &file.content_type, file.bytes)
                .await;
            match &result {
                Ok(_) => tracker.set(&file.filename, 100),
                Err(_) => tracker.forget(&file.filename),
            }
            (file.filename, result)
        });
    }

    let mut report = UploadReport::default();
    let mut aborted = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((filename, result)) => {
                if let Some(pos) = in_flight.iter().position(|name| *name == filename) {
                    in_flight.swap_remove(pos);
                }
                match result {
                    Ok(uploaded) => {
                        debug!(%filename, id = uploaded.id, "upload finished");
                        on_complete(&uploaded);
                        report.uploaded.push(uploaded);
                    }
                    Err(error) => {
                        warn!(%filename, %error, "upload failed");
                        report.failed.push((filename, error));
                    }
                }
            }
            Err(join_error) => {
                error!(%join_error, "upload task aborted");
                aborted.push(join_error.to_string());
            }
        }
    }

    // An aborted task cannot name its file; the names still in flight are theirs.
    for (filename, reason) in in_flight.into_iter().zip(aborted) {
        tracker.forget(&filename);
        report.failed.push((
            filename,
            ApiError::Connection(format!("upload aborted: {reason}")),
        ));
    }

    report.progress = tracker.take(&batch);
    report
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn take_removes_only_the_batch() {
        let tracker = UploadTracker::new();
        tracker.set("proof.pdf", 100);
        tracker.set("logo.svg", 0);
        tracker.set("other-batch.png", 0);

        let taken = tracker.take(&["proof.pdf".to_string(), "logo.svg".to_string()]);

        assert_eq!(
            taken,
            vec![("logo.svg".to_string(), 0), ("proof.pdf".to_string(), 100)]
        );
        assert_eq!(tracker.snapshot(), vec![("other-batch.png".to_string(), 0)]);
    }

    #[test]
    fn progress_is_capped_at_100() {
        let tracker = UploadTracker::new();

        tracker.set("proof.pdf", 250);

        assert_eq!(tracker.progress("proof.pdf"), Some(100));
    }

    #[test]
    fn clones_share_progress() {
        let tracker = UploadTracker::new();
        let observer = tracker.clone();

        tracker.set("proof.pdf", 0);

        assert_eq!(observer.snapshot(), vec![("proof.pdf".to_string(), 0)]);
    }
}

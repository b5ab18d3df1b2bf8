//! Last-write-wins reconciliation between the local store and the external directory.
//!
//! For every resource the newer `lastModified` wins and is copied verbatim to the other side.
//! Equal stamps (including both absent) are treated as consistent and nothing is written.
//! Concurrent edits on two devices between runs lose the older side; this is not a merge.

use std::collections::BTreeSet;

use persistence_host::SharedDirectoryHandle;
use serde::Serialize;

use crate::{data_access::DualBackendStore, error::StorageError, resource::ResourceDocument};

const TARGET: &str = "quiz_storage::sync";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
/// Outcome of one reconciliation run.
pub struct SyncReport {
    /// Whether a granted directory took part. `false` means nothing was compared.
    pub external_available: bool,
    /// Resources copied from the directory into the local store.
    pub pulled: Vec<String>,
    /// Resources copied from the local store into the directory.
    pub pushed: Vec<String>,
    /// Resources whose stamps already matched.
    pub unchanged: Vec<String>,
    /// Resources skipped because the directory failed, with the failure message.
    pub failed: Vec<(String, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Pull,
    Push,
    Keep,
}

fn direction(local_stamp: u64, external_stamp: u64) -> Direction {
    match external_stamp.cmp(&local_stamp) {
        std::cmp::Ordering::Greater => Direction::Pull,
        std::cmp::Ordering::Less => Direction::Push,
        std::cmp::Ordering::Equal => Direction::Keep,
    }
}

#[derive(Clone)]
/// Runs reconciliation through a [`DualBackendStore`].
pub struct SyncEngine {
    store: DualBackendStore,
    tracked: Vec<String>,
}

impl SyncEngine {
    /// Creates an engine that always considers `tracked` in addition to discovered resources.
    pub fn new(store: DualBackendStore, tracked: Vec<String>) -> Self {
        Self { store, tracked }
    }

    /// Reconciles every known resource.
    ///
    /// Without a granted directory this is a no-op reporting `external_available: false`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::LocalStore`] when the local store fails; directory failures are
    /// collected per resource in [`SyncReport::failed`].
    pub async fn reconcile(&self) -> Result<SyncReport, StorageError> {
        let Some(handle) = self.store.external_handle().await else {
            tracing::debug!(target: TARGET, "no granted directory; reconciliation skipped");
            return Ok(SyncReport::default());
        };

        let mut report = SyncReport {
            external_available: true,
            ..SyncReport::default()
        };
        for resource in self.resource_names(&handle).await? {
            match self.reconcile_one(&handle, &resource).await {
                Ok(Direction::Pull) => report.pulled.push(resource),
                Ok(Direction::Push) => report.pushed.push(resource),
                Ok(Direction::Keep) => report.unchanged.push(resource),
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    tracing::warn!(target: TARGET, resource = %resource, error = %err, "resource reconciliation skipped");
                    report.failed.push((resource, err.to_string()));
                }
            }
        }

        tracing::info!(
            target: TARGET,
            pulled = report.pulled.len(),
            pushed = report.pushed.len(),
            unchanged = report.unchanged.len(),
            failed = report.failed.len(),
            "reconciliation finished"
        );
        Ok(report)
    }

    async fn resource_names(
        &self,
        handle: &SharedDirectoryHandle,
    ) -> Result<BTreeSet<String>, StorageError> {
        let mut names: BTreeSet<String> = self.tracked.iter().cloned().collect();
        names.extend(self.store.local_resource_names().await?);
        match self.store.external_resource_names(handle).await {
            Ok(external) => names.extend(external),
            Err(err) => {
                tracing::warn!(target: TARGET, error = %err, "directory listing failed; reconciling known resources only");
            }
        }
        Ok(names)
    }

    async fn reconcile_one(
        &self,
        handle: &SharedDirectoryHandle,
        resource: &str,
    ) -> Result<Direction, StorageError> {
        let local = self.store.read_local(resource).await?;
        let external = self.store.read_external(handle, resource).await?;
        let local_stamp = local.as_ref().map_or(0, |doc| doc.last_modified);
        let external_stamp = external.as_ref().map_or(0, |doc| doc.last_modified);

        match (direction(local_stamp, external_stamp), local, external) {
            (Direction::Pull, _, Some(document)) => {
                self.store.write_local(resource, &document).await?;
                Ok(Direction::Pull)
            }
            (Direction::Push, Some(document), _) => {
                self.push(handle, resource, &document).await?;
                Ok(Direction::Push)
            }
            _ => Ok(Direction::Keep),
        }
    }

    async fn push(
        &self,
        handle: &SharedDirectoryHandle,
        resource: &str,
        document: &ResourceDocument,
    ) -> Result<(), StorageError> {
        self.store.write_external(handle, resource, document).await
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use futures::executor::block_on;
    use persistence_host::{MemoryDirectoryHandle, MemoryKeyValueStore, PermissionState};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::{config::StorageConfig, context::StorageContext};

    struct Fixture {
        kv: MemoryKeyValueStore,
        dir: MemoryDirectoryHandle,
        store: DualBackendStore,
        engine: SyncEngine,
    }

    fn fixture(granted: bool) -> Fixture {
        let ctx = StorageContext::new();
        ctx.begin_session("ada", true);
        let kv = MemoryKeyValueStore::default();
        let dir = MemoryDirectoryHandle::new("quiz");
        if granted {
            ctx.replace_handle(Some(dir.shared()), true);
            ctx.record_permission(PermissionState::Granted);
        }
        let config = StorageConfig::default();
        let store = DualBackendStore::new(ctx, Rc::new(kv.clone()), Rc::new(config.clone()));
        let engine = SyncEngine::new(store.clone(), config.tracked_resources);
        Fixture {
            kv,
            dir,
            store,
            engine,
        }
    }

    fn put_external(dir: &MemoryDirectoryHandle, resource: &str, data: serde_json::Value, ts: u64) {
        dir.insert_file(
            format!("{resource}.json"),
            ResourceDocument::new(data, ts).to_json_text().expect("render"),
        );
    }

    fn put_local(store: &DualBackendStore, resource: &str, data: serde_json::Value, ts: u64) {
        block_on(store.write_local(resource, &ResourceDocument::new(data, ts))).expect("seed");
    }

    fn external_doc(dir: &MemoryDirectoryHandle, resource: &str) -> ResourceDocument {
        ResourceDocument::from_json_text(&dir.file(&format!("{resource}.json")).expect("file"))
            .expect("parse")
    }

    fn local_doc(store: &DualBackendStore, resource: &str) -> ResourceDocument {
        block_on(store.read_local(resource))
            .expect("read")
            .expect("local doc")
    }

    #[test]
    fn newer_external_copy_is_pulled_verbatim() {
        let fx = fixture(true);
        put_local(&fx.store, "categories", json!(["old"]), 100);
        put_external(&fx.dir, "categories", json!(["new"]), 200);

        let report = block_on(fx.engine.reconcile()).expect("sync");

        assert_eq!(report.pulled, vec!["categories".to_string()]);
        assert_eq!(
            local_doc(&fx.store, "categories"),
            ResourceDocument::new(json!(["new"]), 200)
        );
        assert_eq!(fx.dir.write_calls(), 0);
    }

    #[test]
    fn newer_local_copy_is_pushed_verbatim() {
        let fx = fixture(true);
        put_local(&fx.store, "groups", json!({"g": 2}), 300);
        put_external(&fx.dir, "groups", json!({"g": 1}), 100);

        let report = block_on(fx.engine.reconcile()).expect("sync");

        assert_eq!(report.pushed, vec!["groups".to_string()]);
        assert_eq!(
            external_doc(&fx.dir, "groups"),
            ResourceDocument::new(json!({"g": 2}), 300)
        );
    }

    #[test]
    fn equal_stamps_write_nothing() {
        let fx = fixture(true);
        put_local(&fx.store, "questions", json!([1]), 500);
        put_external(&fx.dir, "questions", json!([2]), 500);
        let local_puts = fx.kv.put_calls();

        let report = block_on(fx.engine.reconcile()).expect("sync");

        assert!(report.unchanged.contains(&"questions".to_string()));
        assert_eq!(fx.kv.put_calls(), local_puts);
        assert_eq!(fx.dir.write_calls(), 0);
        assert_eq!(local_doc(&fx.store, "questions").data, json!([1]));
        assert_eq!(external_doc(&fx.dir, "questions").data, json!([2]));
    }

    #[test]
    fn resources_absent_on_one_side_are_copied_and_absent_on_both_are_kept() {
        let fx = fixture(true);
        put_local(&fx.store, "statistics", json!({"runs": 1}), 10);
        put_external(&fx.dir, "decks", json!(["d"]), 20);

        let report = block_on(fx.engine.reconcile()).expect("sync");

        assert_eq!(report.pushed, vec!["statistics".to_string()]);
        assert_eq!(report.pulled, vec!["decks".to_string()]);
        assert_eq!(
            report.unchanged,
            vec![
                "categories".to_string(),
                "groups".to_string(),
                "questions".to_string()
            ]
        );
        assert_eq!(local_doc(&fx.store, "decks").last_modified, 20);
    }

    #[test]
    fn directory_failures_are_reported_per_resource() {
        let fx = fixture(true);
        put_local(&fx.store, "categories", json!([]), 10);
        fx.dir.insert_file("groups.json", "{ broken");

        let report = block_on(fx.engine.reconcile()).expect("sync");

        assert_eq!(report.pushed, vec!["categories".to_string()]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "groups");
    }

    #[test]
    fn without_directory_nothing_is_compared() {
        let fx = fixture(false);
        put_local(&fx.store, "categories", json!([]), 10);

        let report = block_on(fx.engine.reconcile()).expect("sync");

        assert_eq!(report, SyncReport::default());
        assert!(!report.external_available);
    }

    #[test]
    fn direction_follows_strict_comparison() {
        assert_eq!(direction(1, 2), Direction::Pull);
        assert_eq!(direction(2, 1), Direction::Push);
        assert_eq!(direction(0, 0), Direction::Keep);
        assert_eq!(direction(7, 7), Direction::Keep);
    }
}

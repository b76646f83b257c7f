//! Upload orchestration: validate, resolve the case, then hash, deduplicate,
//! wrap, name and persist each file of a batch and record it in the
//! container manifest.

use crate::{
    models::{
        case::is_valid_secret,
        file_record::FileRecord,
        upload::{BatchReport, DuplicateFile, IncomingFile, UploadedFile},
    },
    services::{
        archive::{self, ARCHIVE_PASSWORD, ARCHIVE_SUFFIX, ArchiveError},
        cases::CaseDirectory,
        hasher::ContentHash,
        inventory::InventoryStore,
        locks::ContainerLocks,
        naming::resolve_key,
        object_store::{ObjectStore, StoreError, ensure_key_safe},
    },
};
use std::{collections::HashMap, sync::Arc};
use thiserror::Error;
use tokio::task::{self, JoinError};
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    #[error("case lookup failed: {0}")]
    Lookup(#[from] sqlx::Error),
    #[error("payload task failed: {0}")]
    Task(#[from] JoinError),
    /// The batch stopped at a failing file. `report` lists the files stored
    /// and recorded before it.
    #[error("{cause}")]
    Interrupted {
        report: Box<BatchReport>,
        #[source]
        cause: Box<IntakeError>,
    },
}

pub type IntakeResult<T> = Result<T, IntakeError>;

/// Drives upload batches against the object store.
#[derive(Clone)]
pub struct IntakeService {
    store: Arc<dyn ObjectStore>,
    directory: Arc<dyn CaseDirectory>,
    locks: ContainerLocks,
}

impl IntakeService {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        directory: Arc<dyn CaseDirectory>,
        locks: ContainerLocks,
    ) -> Self {
        Self {
            store,
            directory,
            locks,
        }
    }

    /// Process one upload batch for the case identified by `secret`.
    ///
    /// Files are handled in order. The first failure aborts the rest of the
    /// batch with [`IntakeError::Interrupted`]; files persisted before it
    /// stay persisted and stay recorded in the manifest.
    pub async fn handle_upload(
        &self,
        secret: &str,
        files: Vec<IncomingFile>,
    ) -> IntakeResult<BatchReport> {
        if !is_valid_secret(secret) {
            return Err(IntakeError::Validation(
                "Invalid secret format. Expected dddd-dddd-dddd-dddd.".into(),
            ));
        }

        let container = self
            .directory
            .container_for_secret(secret)
            .await?
            .ok_or_else(|| IntakeError::NotFound("No case matches the provided secret.".into()))?;

        let files = normalize_batch(files)?;

        let _guard = self.locks.lock(&container).await;
        let inventory = InventoryStore::new(self.store.as_ref(), &container);
        let mut index = InventoryIndex::new(inventory.load().await?);
        let mut report = BatchReport::new(container.as_str());

        let processed = self
            .process_files(&container, &mut index, &mut report, files)
            .await;
        let saved = if index.dirty {
            inventory.save(&index.records).await
        } else {
            Ok(())
        };

        match (processed, saved) {
            (Ok(()), Ok(())) => {}
            (Ok(()), Err(err)) => return Err(err.into()),
            (Err(cause), saved) => {
                if let Err(err) = saved {
                    warn!(
                        "manifest save for {} failed after batch error: {}",
                        container, err
                    );
                }
                warn!(
                    "batch into {} interrupted after {} upload(s): {}",
                    container,
                    report.uploaded_files.len(),
                    cause
                );
                report.fail(format!("An error occurred during file upload: {cause}"));
                return Err(IntakeError::Interrupted {
                    report: Box::new(report),
                    cause: Box::new(cause),
                });
            }
        }

        report.classify();
        info!(
            "batch into {}: {} uploaded, {} duplicate",
            container,
            report.uploaded_files.len(),
            report.duplicate_files.len()
        );
        Ok(report)
    }

    async fn process_files(
        &self,
        container: &str,
        index: &mut InventoryIndex,
        report: &mut BatchReport,
        files: Vec<IncomingFile>,
    ) -> IntakeResult<()> {
        for IncomingFile { filename, data } in files {
            let size = data.len() as u64;
            let payload = prepare_payload(filename.clone(), data).await?;

            let digests = [payload.unzipped_hash, payload.zipped_hash];
            if let Some(existing) = self.find_live_match(container, index, &digests).await? {
                debug!("{} duplicates stored object {}", filename, existing);
                report.duplicate_files.push(DuplicateFile { filename, existing });
                continue;
            }

            let store = self.store.as_ref();
            let key = resolve_key(&filename, payload.suffix, move |candidate| async move {
                store.exists(container, &candidate).await
            })
            .await?;

            store.put(container, &key, &payload.stored, false).await?;
            debug!("stored {} as {}/{}", filename, container, key);

            index.push(FileRecord::new(
                key.clone(),
                payload.unzipped_hash,
                payload.zipped_hash,
                size,
            ));
            report.uploaded_files.push(UploadedFile {
                filename,
                stored_as: key,
                size,
            });
        }
        Ok(())
    }

    /// Look each digest up in both indices and return the matching record's
    /// key if its object still exists. Matches whose object is gone are
    /// dropped.
    async fn find_live_match(
        &self,
        container: &str,
        index: &mut InventoryIndex,
        digests: &[ContentHash],
    ) -> IntakeResult<Option<String>> {
        while let Some(name) = index.lookup(digests).map(str::to_owned) {
            if self.store.exists(container, &name).await? {
                return Ok(Some(name));
            }
            warn!(
                "manifest of {} lists {} but the object is missing; dropping record",
                container, name
            );
            index.remove(&name);
        }
        Ok(None)
    }
}

/// A payload in the form it will be stored, with both digests.
struct PreparedPayload {
    unzipped_hash: ContentHash,
    zipped_hash: ContentHash,
    stored: Vec<u8>,
    suffix: &'static str,
}

/// Hash, inspect and wrap `data` on the blocking pool.
async fn prepare_payload(filename: String, data: Vec<u8>) -> IntakeResult<PreparedPayload> {
    task::spawn_blocking(move || -> IntakeResult<PreparedPayload> {
        let unzipped_hash = ContentHash::compute(&data);
        if archive::is_already_wrapped(&data, ARCHIVE_PASSWORD) {
            return Ok(PreparedPayload {
                unzipped_hash,
                zipped_hash: unzipped_hash,
                stored: data,
                suffix: "",
            });
        }
        let stored = archive::wrap(&filename, &data, ARCHIVE_PASSWORD)?;
        Ok(PreparedPayload {
            unzipped_hash,
            zipped_hash: ContentHash::compute(&stored),
            stored,
            suffix: ARCHIVE_SUFFIX,
        })
    })
    .await?
}

/// Normalize every filename of the batch. Unnamed parts are skipped; a name
/// that cannot become an object key rejects the batch.
fn normalize_batch(files: Vec<IncomingFile>) -> IntakeResult<Vec<IncomingFile>> {
    let mut batch = Vec::with_capacity(files.len());
    for file in files {
        let Some(filename) = normalize_filename(&file.filename) else {
            continue;
        };
        if ensure_key_safe(&format!("{filename}{ARCHIVE_SUFFIX}")).is_err() {
            return Err(IntakeError::Validation(
                "A filename is too long or contains unsupported characters.".into(),
            ));
        }
        batch.push(IncomingFile {
            filename,
            data: file.data,
        });
    }
    if batch.is_empty() {
        return Err(IntakeError::Validation("No files uploaded.".into()));
    }
    Ok(batch)
}

/// Reduce a submitted filename to its final path component.
///
/// Returns `None` when nothing usable is left.
fn normalize_filename(raw: &str) -> Option<String> {
    let name = raw.rsplit(['/', '\\']).next().unwrap_or(raw).trim();
    if name.is_empty() || name == "." || name == ".." || name.chars().any(char::is_control) {
        return None;
    }
    Some(name.to_string())
}

/// The batch's working copy of the manifest, indexed by both digests.
///
/// Records appended during the batch are indexed immediately, so a file
/// repeated within one batch is reported as a duplicate.
struct InventoryIndex {
    records: Vec<FileRecord>,
    by_unzipped: HashMap<ContentHash, String>,
    by_zipped: HashMap<ContentHash, String>,
    dirty: bool,
}

impl InventoryIndex {
    fn new(records: Vec<FileRecord>) -> Self {
        let mut index = Self {
            records: Vec::with_capacity(records.len()),
            by_unzipped: HashMap::new(),
            by_zipped: HashMap::new(),
            dirty: false,
        };
        for record in records {
            index.insert(record);
        }
        index
    }

    fn lookup(&self, digests: &[ContentHash]) -> Option<&str> {
        digests
            .iter()
            .find_map(|d| self.by_unzipped.get(d).or_else(|| self.by_zipped.get(d)))
            .map(String::as_str)
    }

    /// Add `record`, replacing any record with the same name.
    fn push(&mut self, record: FileRecord) {
        if self.records.iter().any(|r| r.name == record.name) {
            self.remove(&record.name);
        }
        self.insert(record);
        self.dirty = true;
    }

    fn remove(&mut self, name: &str) {
        self.records.retain(|r| r.name != name);
        self.by_unzipped.retain(|_, n| n != name);
        self.by_zipped.retain(|_, n| n != name);
        // Another record with the same digest may still be live.
        for record in &self.records {
            self.by_unzipped
                .entry(record.unzipped_hash)
                .or_insert_with(|| record.name.clone());
            self.by_zipped
                .entry(record.zipped_hash)
                .or_insert_with(|| record.name.clone());
        }
        self.dirty = true;
    }

    fn insert(&mut self, record: FileRecord) {
        self.by_unzipped
            .entry(record.unzipped_hash)
            .or_insert_with(|| record.name.clone());
        self.by_zipped
            .entry(record.zipped_hash)
            .or_insert_with(|| record.name.clone());
        self.records.push(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::upload::UploadStatus,
        services::{inventory::MANIFEST_KEY, memory_store::MemoryObjectStore},
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const SECRET: &str = "1234-5678-9012-3456";
    const CONTAINER: &str = "case-abcd1234";

    /// Maps a single secret to `case-abcd1234`.
    #[derive(Default)]
    struct StaticDirectory {
        lookups: AtomicUsize,
    }

    #[async_trait]
    impl CaseDirectory for StaticDirectory {
        async fn container_for_secret(&self, secret: &str) -> Result<Option<String>, sqlx::Error> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            Ok((secret == SECRET).then(|| CONTAINER.to_string()))
        }
    }

    struct Harness {
        service: IntakeService,
        store: Arc<MemoryObjectStore>,
        directory: Arc<StaticDirectory>,
    }

    impl Harness {
        async fn new() -> Self {
            let store = Arc::new(MemoryObjectStore::new());
            store.create_container(CONTAINER).await.unwrap();
            let directory = Arc::new(StaticDirectory::default());
            let service = IntakeService::new(store.clone(), directory.clone(), ContainerLocks::new());
            Self {
                service,
                store,
                directory,
            }
        }

        async fn upload(&self, files: &[(&str, &[u8])]) -> IntakeResult<BatchReport> {
            let files = files
                .iter()
                .map(|(name, data)| IncomingFile::new(*name, *data))
                .collect();
            self.service.handle_upload(SECRET, files).await
        }

        async fn manifest(&self) -> Vec<FileRecord> {
            InventoryStore::new(self.store.as_ref(), CONTAINER)
                .load()
                .await
                .unwrap()
        }

        fn object_keys(&self) -> Vec<String> {
            self.store
                .keys(CONTAINER)
                .into_iter()
                .filter(|k| k != MANIFEST_KEY)
                .collect()
        }
    }

    fn stored_names(report: &BatchReport) -> Vec<&str> {
        report
            .uploaded_files
            .iter()
            .map(|f| f.stored_as.as_str())
            .collect()
    }

    #[tokio::test]
    async fn uploads_are_wrapped_and_recorded() {
        let h = Harness::new().await;
        let report = h.upload(&[("report.pdf", b"%PDF-1.7 body")]).await.unwrap();

        assert_eq!(report.status, UploadStatus::Success);
        assert_eq!(report.container_name, CONTAINER);
        assert_eq!(stored_names(&report), ["report.pdf.zip"]);

        let stored = h.store.get(CONTAINER, "report.pdf.zip").await.unwrap();
        assert!(archive::is_already_wrapped(&stored, ARCHIVE_PASSWORD));

        let manifest = h.manifest().await;
        assert_eq!(manifest.len(), 1);
        assert_eq!(manifest[0].name, "report.pdf.zip");
        assert_eq!(manifest[0].size, 13);
        assert_eq!(manifest[0].unzipped_hash, ContentHash::compute(b"%PDF-1.7 body"));
        assert_eq!(manifest[0].zipped_hash, ContentHash::compute(&stored));
    }

    #[tokio::test]
    async fn reupload_of_same_bytes_is_duplicate() {
        let h = Harness::new().await;
        h.upload(&[("data.csv", b"a,b,c")]).await.unwrap();
        let report = h.upload(&[("renamed.csv", b"a,b,c")]).await.unwrap();

        assert_eq!(report.status, UploadStatus::Warning);
        assert!(report.uploaded_files.is_empty());
        assert_eq!(
            report.duplicate_files,
            [DuplicateFile {
                filename: "renamed.csv".into(),
                existing: "data.csv.zip".into(),
            }]
        );
        assert_eq!(h.object_keys(), ["data.csv.zip"]);
        assert_eq!(h.manifest().await.len(), 1);
    }

    #[tokio::test]
    async fn resubmitting_stored_envelope_is_duplicate() {
        let h = Harness::new().await;
        h.upload(&[("a.txt", b"alpha")]).await.unwrap();
        let envelope = h.store.get(CONTAINER, "a.txt.zip").await.unwrap();

        let report = h.upload(&[("a.txt.zip", envelope.as_slice())]).await.unwrap();
        assert_eq!(report.duplicate_files.len(), 1);
        assert_eq!(report.duplicate_files[0].existing, "a.txt.zip");
    }

    #[tokio::test]
    async fn name_collisions_are_suffixed_in_submission_order() {
        let h = Harness::new().await;
        h.store
            .put(CONTAINER, "a.txt.zip", b"pre-existing", false)
            .await
            .unwrap();

        let report = h
            .upload(&[("a.txt", b"first"), ("a.txt", b"second")])
            .await
            .unwrap();

        assert_eq!(stored_names(&report), ["a_1.txt.zip", "a_2.txt.zip"]);
        assert_eq!(
            h.store.get(CONTAINER, "a.txt.zip").await.unwrap(),
            b"pre-existing"
        );
        assert_eq!(h.object_keys(), ["a.txt.zip", "a_1.txt.zip", "a_2.txt.zip"]);
    }

    #[tokio::test]
    async fn manifest_grows_by_new_files_only() {
        let h = Harness::new().await;
        h.upload(&[("one.txt", b"1")]).await.unwrap();
        let before = h.manifest().await.len();

        let report = h
            .upload(&[("two.txt", b"22"), ("one.txt", b"1"), ("three.txt", b"333")])
            .await
            .unwrap();
        assert_eq!(report.status, UploadStatus::Warning);
        assert_eq!(report.uploaded_files.len(), 2);
        assert_eq!(report.duplicate_files.len(), 1);

        let manifest = h.manifest().await;
        assert_eq!(manifest.len(), before + 2);
        for uploaded in &report.uploaded_files {
            let record = manifest
                .iter()
                .find(|r| r.name == uploaded.stored_as)
                .expect("record for stored key");
            assert_eq!(record.size, uploaded.size);
            assert!(h.store.exists(CONTAINER, &record.name).await.unwrap());
        }
        assert_eq!(manifest[1].size, 2);
        assert_eq!(manifest[2].size, 3);
    }

    #[tokio::test]
    async fn already_wrapped_payload_is_stored_unchanged() {
        let h = Harness::new().await;
        let envelope = archive::wrap("inner.txt", b"inner payload", ARCHIVE_PASSWORD).unwrap();

        let report = h.upload(&[("evidence.zip", envelope.as_slice())]).await.unwrap();
        assert_eq!(stored_names(&report), ["evidence.zip"]);
        assert_eq!(h.store.get(CONTAINER, "evidence.zip").await.unwrap(), envelope);

        let record = &h.manifest().await[0];
        assert_eq!(record.unzipped_hash, record.zipped_hash);
        assert_eq!(record.size, envelope.len() as u64);
    }

    #[tokio::test]
    async fn invalid_secret_touches_nothing() {
        let h = Harness::new().await;
        let calls_before = h.store.calls();

        let err = h
            .service
            .handle_upload("1234-5678", vec![IncomingFile::new("a.txt", b"a".to_vec())])
            .await
            .unwrap_err();

        assert!(matches!(err, IntakeError::Validation(_)));
        assert_eq!(h.store.calls(), calls_before);
        assert_eq!(h.directory.lookups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unknown_secret_is_not_found_without_storage_access() {
        let h = Harness::new().await;
        let calls_before = h.store.calls();
        let err = h
            .service
            .handle_upload(
                "9999-9999-9999-9999",
                vec![IncomingFile::new("a.txt", b"a".to_vec())],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, IntakeError::NotFound(_)));
        assert_eq!(h.store.calls(), calls_before);
    }

    #[tokio::test]
    async fn empty_batches_are_rejected() {
        let h = Harness::new().await;
        assert!(matches!(
            h.upload(&[]).await,
            Err(IntakeError::Validation(_))
        ));
        assert!(matches!(
            h.upload(&[("", b"x"), ("  ", b"y"), ("dir/", b"z")]).await,
            Err(IntakeError::Validation(_))
        ));
        assert!(h.object_keys().is_empty());
    }

    #[tokio::test]
    async fn unnamed_parts_are_skipped_and_paths_stripped() {
        let h = Harness::new().await;
        let report = h
            .upload(&[("", b"ignored"), ("C:\\Users\\x\\notes.txt", b"notes")])
            .await
            .unwrap();
        assert_eq!(report.status, UploadStatus::Success);
        assert_eq!(report.uploaded_files[0].filename, "notes.txt");
        assert_eq!(stored_names(&report), ["notes.txt.zip"]);
    }

    #[tokio::test]
    async fn same_file_twice_in_one_batch_is_duplicate() {
        let h = Harness::new().await;
        let report = h
            .upload(&[("x.txt", b"hello"), ("x.txt", b"hello")])
            .await
            .unwrap();

        assert_eq!(stored_names(&report), ["x.txt.zip"]);
        assert_eq!(report.duplicate_files.len(), 1);
        assert_eq!(report.duplicate_files[0].existing, "x.txt.zip");
        assert_eq!(report.status, UploadStatus::Warning);
        assert_eq!(h.object_keys(), ["x.txt.zip"]);
        assert_eq!(h.manifest().await.len(), 1);
    }

    #[tokio::test]
    async fn stale_manifest_record_does_not_block_reupload() {
        let h = Harness::new().await;
        h.upload(&[("gone.txt", b"bytes")]).await.unwrap();
        h.store.remove_silently(CONTAINER, "gone.txt.zip");

        let report = h.upload(&[("gone.txt", b"bytes")]).await.unwrap();
        assert_eq!(report.status, UploadStatus::Success);
        assert_eq!(stored_names(&report), ["gone.txt.zip"]);

        let manifest = h.manifest().await;
        assert_eq!(manifest.len(), 1);
        assert_eq!(manifest[0].name, "gone.txt.zip");
    }

    #[tokio::test]
    async fn failure_aborts_batch_but_keeps_earlier_files_recorded() {
        let h = Harness::new().await;
        h.store.fail_puts_of("b.txt.zip");

        let err = h
            .upload(&[("a.txt", b"a"), ("b.txt", b"b"), ("c.txt", b"c")])
            .await
            .unwrap_err();
        match err {
            IntakeError::Interrupted { report, cause } => {
                assert!(matches!(*cause, IntakeError::Store(StoreError::Io(_))));
                assert_eq!(report.status, UploadStatus::Error);
                assert!(report.message.starts_with("An error occurred during file upload:"));
                assert_eq!(stored_names(&report), ["a.txt.zip"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert_eq!(h.object_keys(), ["a.txt.zip"]);
        let names: Vec<_> = h.manifest().await.into_iter().map(|r| r.name).collect();
        assert_eq!(names, ["a.txt.zip"]);
    }

    #[tokio::test]
    async fn stale_record_under_reused_key_is_replaced() {
        let h = Harness::new().await;
        h.upload(&[("a.txt", b"one")]).await.unwrap();
        h.store.remove_silently(CONTAINER, "a.txt.zip");

        let report = h.upload(&[("a.txt", b"two")]).await.unwrap();
        assert_eq!(stored_names(&report), ["a.txt.zip"]);

        let manifest = h.manifest().await;
        let names: Vec<_> = manifest.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["a.txt.zip"]);
        assert_eq!(manifest[0].unzipped_hash, ContentHash::compute(b"two"));
    }

    #[tokio::test]
    async fn stored_digest_of_candidate_envelope_counts_as_match() {
        let h = Harness::new().await;
        h.upload(&[("a.txt", b"alpha")]).await.unwrap();
        let manifest = h.manifest().await;
        let zipped = manifest[0].zipped_hash;

        let mut index = InventoryIndex::new(manifest);
        let found = h
            .service
            .find_live_match(
                CONTAINER,
                &mut index,
                &[ContentHash::compute(b"unrelated"), zipped],
            )
            .await
            .unwrap();
        assert_eq!(found.as_deref(), Some("a.txt.zip"));
    }

    #[tokio::test]
    async fn payload_preparation_wraps_or_passes_through() {
        let plain = prepare_payload("a.txt".into(), b"plain".to_vec()).await.unwrap();
        assert_eq!(plain.suffix, ARCHIVE_SUFFIX);
        assert_eq!(plain.unzipped_hash, ContentHash::compute(b"plain"));
        assert_eq!(plain.zipped_hash, ContentHash::compute(&plain.stored));
        assert!(archive::is_already_wrapped(&plain.stored, ARCHIVE_PASSWORD));

        let envelope = plain.stored.clone();
        let passed = prepare_payload("a.txt.zip".into(), envelope.clone()).await.unwrap();
        assert_eq!(passed.suffix, "");
        assert_eq!(passed.stored, envelope);
        assert_eq!(passed.zipped_hash, passed.unzipped_hash);
    }

    #[tokio::test]
    async fn padded_secret_is_rejected() {
        let h = Harness::new().await;
        let err = h
            .service
            .handle_upload(
                " 1234-5678-9012-3456\n",
                vec![IncomingFile::new("a.txt", b"a".to_vec())],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, IntakeError::Validation(_)));
        assert_eq!(h.directory.lookups.load(Ordering::SeqCst), 0);
        assert!(h.object_keys().is_empty());
    }

    #[tokio::test]
    async fn unstorable_filename_is_a_validation_error() {
        let h = Harness::new().await;
        let calls_before = h.store.calls();
        let long_name = format!("{}.txt", "n".repeat(1020));

        let err = h.upload(&[(long_name.as_str(), b"x")]).await.unwrap_err();
        assert!(matches!(err, IntakeError::Validation(_)));
        assert_eq!(h.store.calls(), calls_before);
    }

    #[tokio::test]
    async fn corrupt_manifest_degrades_to_empty() {
        let h = Harness::new().await;
        h.store
            .put(CONTAINER, MANIFEST_KEY, b"[{\"broken\":", true)
            .await
            .unwrap();

        let report = h.upload(&[("fresh.txt", b"fresh")]).await.unwrap();
        assert_eq!(report.status, UploadStatus::Success);
        assert_eq!(h.manifest().await.len(), 1);
    }

    #[tokio::test]
    async fn manifest_name_cannot_be_clobbered() {
        let h = Harness::new().await;
        let envelope = archive::wrap("x", b"x", ARCHIVE_PASSWORD).unwrap();
        let report = h.upload(&[(MANIFEST_KEY, envelope.as_slice())]).await.unwrap();
        assert_eq!(stored_names(&report), [format!("{MANIFEST_KEY}_1")]);
        assert_eq!(h.manifest().await.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_batches_keep_every_record() {
        let h = Harness::new().await;
        let mut tasks = Vec::new();
        for i in 0..8 {
            let service = h.service.clone();
            tasks.push(tokio::spawn(async move {
                let file = IncomingFile::new(format!("f{i}.txt"), format!("payload {i}"));
                service.handle_upload(SECRET, vec![file]).await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }
        assert_eq!(h.manifest().await.len(), 8);
    }

    #[test]
    fn filenames_are_reduced_to_last_component() {
        assert_eq!(normalize_filename("a/b/c.txt").as_deref(), Some("c.txt"));
        assert_eq!(normalize_filename("..\\evil.txt").as_deref(), Some("evil.txt"));
        assert_eq!(normalize_filename(" spaced.txt ").as_deref(), Some("spaced.txt"));
        assert_eq!(normalize_filename("a/.."), None);
        assert_eq!(normalize_filename("bad\nname"), None);
        assert_eq!(normalize_filename(""), None);
    }
}

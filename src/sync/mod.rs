//! Sync Orchestrator
//!
//! Drives one file submission end to end: normalize → classify →
//! summarize → persist locally → enforce local retention → best-effort
//! remote upload → enforce remote retention. Local success is
//! authoritative and final; no remote outcome ever rolls it back.
//! Ingestion failures compensate fully and leave no orphaned state.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::docstore::codec::{decode_history_document, encode_dataset_document};
use crate::docstore::{DocStoreClient, DocumentId, Session};
use crate::errors::{EngineError, MalformedInputError, TransportError};
use crate::file_store::{DatasetHandle, FileStore};
use crate::ingest::{classify_table, normalize_csv, summarize};
use crate::retention::{RetainedStore, RetentionManager, RETAIN_LIMIT};
use crate::types::{Dataset, HistoryEntry};

/// Remote document size ceiling the orchestrator enforces before encoding.
pub const MAX_DOCUMENT_BYTES: usize = 1_048_576;

/// How far past the cap the remote query looks when hunting for overflow.
const RETENTION_SCAN_LIMIT: usize = 25;

/// Orchestrator lifecycle for one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Ingesting,
    Persisted,
    Uploading,
    Synced,
}

/// Outcome of the best-effort remote leg of an ingestion.
#[derive(Debug)]
pub enum RemoteSync {
    Synced(DocumentId),
    Skipped(&'static str),
    Failed(EngineError),
}

/// Result of a successful ingestion. The local dataset is durable by the
/// time this value exists, whatever `remote` says.
#[derive(Debug)]
pub struct IngestOutcome {
    pub dataset: Dataset,
    pub handle: DatasetHandle,
    pub remote: RemoteSync,
}

pub struct SyncOrchestrator {
    file_store: FileStore,
    retention: RetentionManager,
    remote: Option<DocStoreClient>,
    /// Serializes admit/list on the shared retained-set index (local tier)
    admit_lock: tokio::sync::Mutex<()>,
    state: Mutex<SyncState>,
}

impl SyncOrchestrator {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let file_store = FileStore::new(config.data_paths.clone())?;
        let remote = config.remote.map(DocStoreClient::new);

        Ok(Self {
            file_store,
            retention: RetentionManager::new(),
            remote,
            admit_lock: tokio::sync::Mutex::new(()),
            state: Mutex::new(SyncState::Idle),
        })
    }

    pub fn state(&self) -> SyncState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn transition(&self, next: SyncState) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        debug!(from = ?*state, to = ?next, "sync state transition");
        *state = next;
    }

    /// Authenticate against the remote store.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, EngineError> {
        let client = self
            .remote
            .as_ref()
            .ok_or(TransportError::NotConfigured)?;
        Ok(client.login(email, password).await?)
    }

    /// Ingest a CSV file from disk.
    pub async fn ingest_file(
        &self,
        path: &Path,
        session: Option<&Session>,
    ) -> Result<IngestOutcome, EngineError> {
        let bytes = std::fs::read(path).map_err(|e| {
            EngineError::MalformedInput(MalformedInputError::Io(e))
        })?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.csv".to_string());
        self.ingest_bytes(&filename, &bytes, session).await
    }

    /// Ingest raw CSV bytes. The dataset is durably persisted and local
    /// retention enforced before this returns; the remote leg never blocks
    /// local success.
    pub async fn ingest_bytes(
        &self,
        filename: &str,
        bytes: &[u8],
        session: Option<&Session>,
    ) -> Result<IngestOutcome, EngineError> {
        self.transition(SyncState::Ingesting);
        info!(filename, size = bytes.len(), "ingesting dataset");

        let dataset = match self.build_dataset(filename, bytes) {
            Ok(dataset) => dataset,
            Err(e) => {
                // Nothing was persisted; the failure path has no state to
                // compensate beyond returning to Idle
                self.transition(SyncState::Idle);
                return Err(e);
            }
        };

        // Persist + admit under the index lock, synchronously, before any
        // success is reported
        let handle = {
            let _guard = self.admit_lock.lock().await;
            let handle = match self.file_store.save(&dataset) {
                Ok(handle) => handle,
                Err(e) => {
                    self.transition(SyncState::Idle);
                    return Err(e.into());
                }
            };
            if let Err(e) = self.retention.enforce(&self.file_store).await {
                // The dataset is committed; a cap overshoot is repaired on
                // the next admit
                warn!(error = %e, "local retention enforcement failed");
            }
            handle
        };
        self.transition(SyncState::Persisted);
        info!(id = %dataset.id, rows = dataset.records.len(), "dataset persisted locally");

        let remote = match (self.remote.as_ref(), session) {
            (Some(client), Some(session)) => {
                self.transition(SyncState::Uploading);
                match self.upload(client, session, &dataset).await {
                    Ok(doc_id) => {
                        self.transition(SyncState::Synced);
                        info!(document_id = %doc_id, "dataset synced to remote store");
                        RemoteSync::Synced(doc_id)
                    }
                    Err(e) => {
                        // Local state is authoritative; report and move on
                        self.transition(SyncState::Persisted);
                        warn!(error = %e, "remote upload failed, local dataset kept");
                        RemoteSync::Failed(e)
                    }
                }
            }
            (None, _) => RemoteSync::Skipped("remote store not configured"),
            (_, None) => RemoteSync::Skipped("no session provided"),
        };

        Ok(IngestOutcome {
            dataset,
            handle,
            remote,
        })
    }

    fn build_dataset(&self, filename: &str, bytes: &[u8]) -> Result<Dataset, EngineError> {
        let mut table = normalize_csv(bytes)?;
        classify_table(&mut table);
        let summary = summarize(&table);
        Ok(Dataset::new(filename, table.rows, summary))
    }

    async fn upload(
        &self,
        client: &DocStoreClient,
        session: &Session,
        dataset: &Dataset,
    ) -> Result<DocumentId, EngineError> {
        // Size gate before the codec runs; the codec itself is size-blind
        let payload_size = serde_json::to_vec(&dataset.records)
            .map(|b| b.len())
            .unwrap_or(usize::MAX);
        if payload_size > MAX_DOCUMENT_BYTES {
            return Err(EngineError::Capacity {
                size: payload_size,
                limit: MAX_DOCUMENT_BYTES,
            });
        }

        let document = encode_dataset_document(dataset);
        let doc_id = client.insert(session, &document).await?;

        // Remote retention is best-effort like the rest of the remote leg
        let remote_store = RemoteRetained { client, session };
        if let Err(e) = self.retention.enforce(&remote_store).await {
            warn!(error = %e, "remote retention enforcement failed");
        }

        Ok(doc_id)
    }

    /// Recent uploads from the remote store, newest first, capped at 5.
    /// Best-effort: any transport failure yields an empty history.
    pub async fn fetch_history(&self, session: &Session) -> Vec<HistoryEntry> {
        match self.try_fetch_history(session).await {
            Ok(history) => history,
            Err(e) => {
                warn!(error = %e, "history fetch failed, returning empty history");
                Vec::new()
            }
        }
    }

    async fn try_fetch_history(
        &self,
        session: &Session,
    ) -> Result<Vec<HistoryEntry>, EngineError> {
        let client = self
            .remote
            .as_ref()
            .ok_or(TransportError::NotConfigured)?;

        let documents = client.query_recent(session, RETAIN_LIMIT).await?;
        let mut history: Vec<HistoryEntry> = documents
            .iter()
            .filter_map(|doc| decode_history_document(&doc.fields))
            .collect();
        history.truncate(RETAIN_LIMIT);

        debug!(entries = history.len(), "fetched remote history");
        Ok(history)
    }

    /// Recent uploads from the local store, newest first, capped at 5.
    pub async fn local_history(&self) -> Result<Vec<HistoryEntry>, EngineError> {
        let _guard = self.admit_lock.lock().await;
        let handles = self.retention.list(&self.file_store).await?;

        let mut history = Vec::with_capacity(handles.len());
        for handle in &handles {
            match self.file_store.load(handle) {
                Ok(dataset) => history.push(HistoryEntry {
                    filename: dataset.filename,
                    timestamp: dataset.created_at,
                    item_count: dataset.records.len(),
                    records: dataset.records,
                }),
                Err(e) => {
                    warn!(id = %handle.id, error = %e, "skipping unloadable dataset");
                }
            }
        }
        Ok(history)
    }
}

/// Remote tier seen through the retention seam.
struct RemoteRetained<'a> {
    client: &'a DocStoreClient,
    session: &'a Session,
}

#[async_trait]
impl RetainedStore for RemoteRetained<'_> {
    type Item = DocumentId;
    type Error = TransportError;

    async fn fetch_ordered(&self) -> Result<Vec<DocumentId>, TransportError> {
        let documents = self
            .client
            .query_recent(self.session, RETENTION_SCAN_LIMIT)
            .await?;
        Ok(documents.into_iter().map(|doc| doc.id).collect())
    }

    async fn delete(&self, item: &DocumentId) -> Result<(), TransportError> {
        self.client.delete(self.session, item).await
    }

    fn describe(item: &DocumentId) -> String {
        item.0.clone()
    }
}

pub mod config;
pub mod data_paths;
pub mod docstore;
pub mod errors;
pub mod file_store;
pub mod ingest;
pub mod logging;
pub mod retention;
pub mod sync;
pub mod types;

pub use config::{EngineConfig, RemoteConfig};
pub use errors::EngineError;
pub use sync::{IngestOutcome, RemoteSync, SyncOrchestrator, SyncState};
pub use types::{CellValue, Dataset, EquipmentRecord, HistoryEntry, Status};

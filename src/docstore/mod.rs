//! Remote typed document store: wire codec, REST client, auth session

pub mod client;
pub mod codec;
pub mod session;

pub use client::{DocStoreClient, DocumentId, RemoteDocument};
pub use codec::{
    decode_history_document, decode_record, encode_dataset_document, encode_record, TypedValue,
};
pub use session::Session;

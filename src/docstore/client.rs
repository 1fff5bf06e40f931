//! REST client for the remote typed document store
//!
//! Documents are schema-less trees of tagged values addressed by collection
//! name. The store supports insert, a recency-ordered limited query, and
//! delete; auth is a bearer token from the identity endpoint.

use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::config::RemoteConfig;
use crate::docstore::codec::{decode_fields, TypedValue};
use crate::docstore::session::Session;
use crate::errors::TransportError;

use std::collections::BTreeMap;

/// Identifier of one stored document within its collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentId(pub String);

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One document returned by a query: its id plus decoded fields.
#[derive(Debug, Clone)]
pub struct RemoteDocument {
    pub id: DocumentId,
    pub fields: BTreeMap<String, TypedValue>,
}

/// Client for the document store REST surface.
pub struct DocStoreClient {
    client: Client,
    config: RemoteConfig,
}

impl DocStoreClient {
    pub fn new(config: RemoteConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn collection(&self) -> &str {
        &self.config.collection
    }

    /// Exchange email/password for a session at the identity endpoint.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, TransportError> {
        let url = format!(
            "{}:signInWithPassword?key={}",
            self.config.auth_url, self.config.api_key
        );
        let payload = json!({
            "email": email,
            "password": password,
            "returnSecureToken": true,
        });

        debug!(email, "logging in to identity endpoint");
        let response = self.client.post(&url).json(&payload).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "login rejected");
            return Err(TransportError::Auth(format!("status {status}: {body}")));
        }

        let body: Value = response.json().await?;
        let id_token = body
            .get("idToken")
            .and_then(Value::as_str)
            .ok_or(TransportError::Malformed { context: "login" })?
            .to_string();
        let local_id = body
            .get("localId")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        info!(email, "login successful");
        Ok(Session::new(id_token, local_id, email.to_string()))
    }

    /// Insert a document into the configured collection.
    pub async fn insert(
        &self,
        session: &Session,
        document: &TypedValue,
    ) -> Result<DocumentId, TransportError> {
        let token = session.bearer_token()?;
        let url = format!("{}/{}", self.config.docs_url, self.config.collection);

        // The wire document is the `fields` object of the map encoding
        let fields = document.to_wire();
        let payload = json!({ "fields": fields["mapValue"]["fields"] });

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                context: "insert",
                status,
                body,
            });
        }

        let body: Value = response.json().await?;
        let name = body
            .get("name")
            .and_then(Value::as_str)
            .ok_or(TransportError::Malformed { context: "insert" })?;
        // The store returns a full resource path; the id is its tail
        let id = name.rsplit('/').next().unwrap_or(name).to_string();

        debug!(document_id = %id, "document inserted");
        Ok(DocumentId(id))
    }

    /// Query the collection ordered by `createdAt` descending, newest first.
    pub async fn query_recent(
        &self,
        session: &Session,
        limit: usize,
    ) -> Result<Vec<RemoteDocument>, TransportError> {
        let token = session.bearer_token()?;
        let url = format!("{}:runQuery", self.config.docs_url);
        let query = json!({
            "structuredQuery": {
                "from": [{ "collectionId": self.config.collection }],
                "orderBy": [{
                    "field": { "fieldPath": "createdAt" },
                    "direction": "DESCENDING"
                }],
                "limit": limit,
            }
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                context: "query",
                status,
                body,
            });
        }

        let items: Vec<Value> = response.json().await?;
        let mut documents = Vec::new();
        for item in &items {
            // Result batches may carry read-time-only entries with no document
            let Some(doc) = item.get("document") else {
                continue;
            };
            let id = doc
                .get("name")
                .and_then(Value::as_str)
                .map(|name| name.rsplit('/').next().unwrap_or(name).to_string())
                .unwrap_or_default();
            let fields = doc
                .get("fields")
                .and_then(Value::as_object)
                .map(decode_fields)
                .unwrap_or_default();
            documents.push(RemoteDocument {
                id: DocumentId(id),
                fields,
            });
        }

        debug!(count = documents.len(), "query returned documents");
        Ok(documents)
    }

    /// Delete one document from the configured collection.
    pub async fn delete(
        &self,
        session: &Session,
        id: &DocumentId,
    ) -> Result<(), TransportError> {
        let token = session.bearer_token()?;
        let url = format!("{}/{}/{}", self.config.docs_url, self.config.collection, id);

        let response = self.client.delete(&url).bearer_auth(token).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                context: "delete",
                status,
                body,
            });
        }

        debug!(document_id = %id, "document deleted");
        Ok(())
    }
}

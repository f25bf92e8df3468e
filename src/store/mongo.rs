//! MongoDB-backed document store.
//!
//! Maps the abstract store contract onto the MongoDB driver:
//! - the paginated index traversal becomes an indexed, sorted `find` with an
//!   `_id`-anchored range resume token
//! - `set`/`add`/`delete`/`remove` become `replace_one` (upsert),
//!   `insert_one`, strict `delete_one` and tolerant `delete_one`
//!
//! Document payloads are stored verbatim in a `payload` field keyed by a
//! string `_id`. Documents written by other producers are exported as their
//! relaxed extended JSON rendering.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use bson::{doc, Bson, Document};
use futures::TryStreamExt;
use mongodb::options::{ClientOptions, Credential};
use mongodb::{Client, Collection};
use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::error::{ConnectionError, QueryError, Result, StoreWriteError};

use super::{DocumentStore, IndexQuery, PageEntry, PageFetch};

/// Field holding the verbatim document payload.
const PAYLOAD_FIELD: &str = "payload";

/// Field holding the absolute expiry timestamp, when an action carries one.
const EXPIRY_FIELD: &str = "expires_at";

/// Document store backed by a MongoDB cluster.
///
/// One instance owns one client for the duration of one export run or one
/// task attempt. It is never shared across concurrent task attempts.
pub struct MongoStore {
    client: Client,
    collection: Collection<Document>,
}

impl MongoStore {
    /// Connect to the store cluster described by `config`.
    ///
    /// Connection establishment is verified with a ping; failure here is
    /// fatal for the surrounding run.
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let uri = Self::build_uri(&config.urls);
        info!("Connecting to store at {uri}...");

        let mut options = ClientOptions::parse(&uri)
            .await
            .map_err(|e| ConnectionError::InvalidUri(format!("{uri}: {e}")))?;
        options.app_name = Some("docferry".to_string());
        options.server_selection_timeout = Some(Duration::from_secs(config.connect_timeout_secs));

        if let Some(username) = &config.username {
            let mut credential = Credential::default();
            credential.username = Some(username.clone());
            credential.password = config.password.clone();
            options.credential = Some(credential);
        }

        let client = Client::with_options(options)
            .map_err(|e| ConnectionError::ConnectionFailed(e.to_string()))?;

        // Force a round trip so an unreachable cluster fails now, not on
        // the first page fetch.
        client
            .database(&config.bucket)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| ConnectionError::ConnectionFailed(e.to_string()))?;

        let collection = client
            .database(&config.bucket)
            .collection::<Document>(&config.collection);

        info!(
            "Connected to store (bucket: {}, collection: {})",
            config.bucket, config.collection
        );

        Ok(Self { client, collection })
    }

    /// Release the underlying client. Invoked exactly once at the end of a
    /// run or task attempt, on both success and failure paths.
    pub async fn disconnect(self) {
        info!("Disconnecting from store...");
        self.client.shutdown().await;
    }

    /// Join the configured node URLs into a single connection string.
    fn build_uri(urls: &[String]) -> String {
        if urls.len() == 1 && urls[0].starts_with("mongodb") {
            return urls[0].clone();
        }
        let hosts: Vec<&str> = urls
            .iter()
            .map(|u| u.trim_start_matches("mongodb://"))
            .collect();
        format!("mongodb://{}", hosts.join(","))
    }

    /// Verify the named index exists before the first page fetch.
    async fn verify_index(&self, index: &str) -> Result<()> {
        if index == "_id" {
            return Ok(());
        }
        let names = self
            .collection
            .list_index_names()
            .await
            .map_err(|e| QueryError::Pagination(e.to_string()))?;
        let prefix = format!("{index}_");
        if names.iter().any(|n| n == index || n.starts_with(&prefix)) {
            Ok(())
        } else {
            Err(QueryError::ViewNotFound(index.to_string()).into())
        }
    }

    /// Build the document stored for one imported payload.
    fn stored_document(key: &str, document: &str, expiry: Option<u32>) -> Document {
        let mut stored = doc! { "_id": key, PAYLOAD_FIELD: document };
        if let Some(seconds) = expiry {
            let now_ms = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as i64;
            stored.insert(
                EXPIRY_FIELD,
                bson::DateTime::from_millis(now_ms + i64::from(seconds) * 1000),
            );
        }
        stored
    }

    /// Turn a fetched document into a page entry.
    ///
    /// Documents written by docferry carry a verbatim `payload` field; for
    /// anything else the whole document is rendered as relaxed extended
    /// JSON so nothing is dropped.
    fn entry_from_document(mut fetched: Document, include_docs: bool) -> PageEntry {
        let key = match fetched.remove("_id") {
            Some(Bson::String(s)) => s,
            Some(other) => other.to_string(),
            None => String::new(),
        };

        let document = if !include_docs {
            String::new()
        } else if let Some(Bson::String(payload)) = fetched.get(PAYLOAD_FIELD) {
            payload.clone()
        } else {
            Bson::Document(fetched).into_relaxed_extjson().to_string()
        };

        PageEntry { key, document }
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn fetch_page(&self, query: &IndexQuery, resume: Option<&str>) -> Result<PageFetch> {
        if resume.is_none() {
            self.verify_index(&query.index).await?;
        }

        let mut filter = Document::new();
        if let Some(key) = &query.key_filter {
            filter.insert(query.index.as_str(), key.as_str());
        }
        if let Some(after) = resume {
            // Resume anchoring assumes string document ids, which is what
            // docferry itself writes.
            filter.insert("_id", doc! { "$gt": after });
        }

        let mut find = self
            .collection
            .find(filter)
            .sort(doc! { "_id": 1 })
            .limit(query.page_size as i64);
        if !query.include_docs {
            find = find.projection(doc! { "_id": 1 });
        }

        let mut cursor = find
            .await
            .map_err(|e| QueryError::Pagination(e.to_string()))?;

        let mut entries = Vec::with_capacity(query.page_size);
        while let Some(fetched) = cursor
            .try_next()
            .await
            .map_err(|e| QueryError::Pagination(e.to_string()))?
        {
            entries.push(Self::entry_from_document(fetched, query.include_docs));
        }

        debug!("Fetched page of {} entries", entries.len());

        // A short page means the traversal is exhausted; a full page may
        // have more behind it, so anchor the next fetch on the last key.
        let resume = if entries.len() == query.page_size {
            entries.last().map(|e| e.key.clone())
        } else {
            None
        };

        Ok(PageFetch { entries, resume })
    }

    async fn set(&self, key: &str, document: &str, expiry: Option<u32>) -> Result<()> {
        let replacement = Self::stored_document(key, document, expiry);
        self.collection
            .replace_one(doc! { "_id": key }, replacement)
            .upsert(true)
            .await
            .map_err(|e| StoreWriteError::Failed {
                key: key.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    async fn add(&self, key: &str, document: &str, expiry: Option<u32>) -> Result<()> {
        let stored = Self::stored_document(key, document, expiry);
        match self.collection.insert_one(stored).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => {
                Err(StoreWriteError::DuplicateKey(key.to_string()).into())
            }
            Err(e) => Err(StoreWriteError::Failed {
                key: key.to_string(),
                reason: e.to_string(),
            }
            .into()),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let result = self
            .collection
            .delete_one(doc! { "_id": key })
            .await
            .map_err(|e| StoreWriteError::Failed {
                key: key.to_string(),
                reason: e.to_string(),
            })?;
        if result.deleted_count == 0 {
            return Err(StoreWriteError::MissingKey(key.to_string()).into());
        }
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.collection
            .delete_one(doc! { "_id": key })
            .await
            .map_err(|e| StoreWriteError::Failed {
                key: key.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }
}

/// Check whether a driver error is a duplicate-key write error.
fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    use mongodb::error::{ErrorKind, WriteFailure};
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(we)) if we.code == 11000
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_uri_single_full_url() {
        let urls = vec!["mongodb://node1:27017/".to_string()];
        assert_eq!(MongoStore::build_uri(&urls), "mongodb://node1:27017/");
    }

    #[test]
    fn test_build_uri_host_list() {
        let urls = vec!["node1:27017".to_string(), "node2:27017".to_string()];
        assert_eq!(MongoStore::build_uri(&urls), "mongodb://node1:27017,node2:27017");
    }

    #[test]
    fn test_stored_document_without_expiry() {
        let stored = MongoStore::stored_document("k1", "body", None);
        assert_eq!(stored.get_str("_id").unwrap(), "k1");
        assert_eq!(stored.get_str(PAYLOAD_FIELD).unwrap(), "body");
        assert!(!stored.contains_key(EXPIRY_FIELD));
    }

    #[test]
    fn test_stored_document_with_expiry() {
        let stored = MongoStore::stored_document("k1", "body", Some(60));
        assert!(stored.get_datetime(EXPIRY_FIELD).is_ok());
    }

    #[test]
    fn test_entry_from_docferry_document() {
        let fetched = doc! { "_id": "k1", PAYLOAD_FIELD: "verbatim body" };
        let entry = MongoStore::entry_from_document(fetched, true);
        assert_eq!(entry.key, "k1");
        assert_eq!(entry.document, "verbatim body");
    }

    #[test]
    fn test_entry_from_foreign_document() {
        let fetched = doc! { "_id": "k2", "name": "ann" };
        let entry = MongoStore::entry_from_document(fetched, true);
        assert_eq!(entry.key, "k2");
        assert!(entry.document.contains("\"name\""));
    }

    #[test]
    fn test_entry_keys_only() {
        let fetched = doc! { "_id": "k3", PAYLOAD_FIELD: "ignored" };
        let entry = MongoStore::entry_from_document(fetched, false);
        assert_eq!(entry.key, "k3");
        assert!(entry.document.is_empty());
    }
}

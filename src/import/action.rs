//! Typed representation of one pending store mutation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::codec::DecodedRecord;
use crate::error::{CodecError, Result};

/// The kind of store mutation a record requests.
///
/// `Set`, `Delete` and `Remove` are idempotent, which matters because a
/// failed task attempt re-submits its whole split. `Add` is not: replaying
/// it hits a duplicate key, which the scheduler treats as success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    /// Create or replace the document under the key.
    Set,

    /// Create the document, failing on an existing key.
    Add,

    /// Delete the document; a missing key is a failure.
    Delete,

    /// Delete the document if present; a missing key is fine.
    Remove,
}

impl FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "set" => Ok(ActionKind::Set),
            "add" => Ok(ActionKind::Add),
            "delete" => Ok(ActionKind::Delete),
            "remove" => Ok(ActionKind::Remove),
            other => Err(format!(
                "unknown action '{other}' (expected set, add, delete or remove)"
            )),
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionKind::Set => "set",
            ActionKind::Add => "add",
            ActionKind::Delete => "delete",
            ActionKind::Remove => "remove",
        };
        write!(f, "{name}")
    }
}

/// One pending store mutation, decoded from one filesystem record.
///
/// Immutable after creation; consumed exactly once by the write scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkActionRecord {
    /// Target document key.
    pub key: String,

    /// Mutation kind.
    pub kind: ActionKind,

    /// Document payload. Required for `Set` and `Add`, ignored otherwise.
    pub document: Option<String>,

    /// Optional expiry in seconds from now.
    pub expiry: Option<u32>,
}

impl BulkActionRecord {
    /// Build an action from a decoded record.
    ///
    /// Fails when a `Set`/`Add` record carries no document payload.
    pub fn from_decoded(kind: ActionKind, record: DecodedRecord, expiry: Option<u32>) -> Result<Self> {
        if matches!(kind, ActionKind::Set | ActionKind::Add) && record.document.is_none() {
            return Err(CodecError::MissingDocument(record.key).into());
        }
        Ok(Self {
            key: record.key,
            kind,
            document: record.document,
            expiry,
        })
    }
}

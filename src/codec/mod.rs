//! Record codec for the page file format.
//!
//! Page files are plain text: one record per row, the key and the document
//! separated by a configurable field delimiter (TAB by default), rows
//! separated by a configurable row delimiter (LF by default). There is no
//! header, no trailing index and no checksum.
//!
//! The format does not escape embedded delimiters. Instead of silently
//! producing a corrupt file, the codec rejects keys containing either
//! delimiter and documents containing the row delimiter at encode time.

use serde::{Deserialize, Serialize};

use crate::error::{CodecError, Result};

fn default_field_delimiter() -> String {
    "\t".to_string()
}

fn default_row_delimiter() -> String {
    "\n".to_string()
}

/// Delimiter configuration for page record files.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecordFormat {
    /// Delimiter between the key and the document within one record.
    #[serde(default = "default_field_delimiter")]
    pub field_delimiter: String,

    /// Delimiter between records.
    #[serde(default = "default_row_delimiter")]
    pub row_delimiter: String,
}

impl Default for RecordFormat {
    fn default() -> Self {
        Self {
            field_delimiter: default_field_delimiter(),
            row_delimiter: default_row_delimiter(),
        }
    }
}

/// One record decoded from a page file.
///
/// A record may carry no document at all: delete-only inputs are lines that
/// contain just a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedRecord {
    /// Document key.
    pub key: String,

    /// Document payload, if the record has one.
    pub document: Option<String>,
}

/// Serializes and deserializes key+document records to and from the page
/// file format.
#[derive(Debug, Clone, Default)]
pub struct RecordCodec {
    format: RecordFormat,
}

impl RecordCodec {
    /// Create a codec for the given delimiter configuration.
    pub fn new(format: RecordFormat) -> Self {
        Self { format }
    }

    /// The delimiter configuration this codec encodes with.
    pub fn format(&self) -> &RecordFormat {
        &self.format
    }

    /// Encode one record, including the trailing row delimiter.
    ///
    /// Fails if the key contains either delimiter or the document contains
    /// the row delimiter, since the format has no escaping.
    pub fn encode(&self, key: &str, document: &str) -> Result<String> {
        if key.is_empty() {
            return Err(CodecError::EmptyKey.into());
        }
        if key.contains(&self.format.field_delimiter) || key.contains(&self.format.row_delimiter) {
            return Err(CodecError::DelimiterInKey(key.to_string()).into());
        }
        if document.contains(&self.format.row_delimiter) {
            return Err(CodecError::DelimiterInDocument(key.to_string()).into());
        }

        let mut record = String::with_capacity(
            key.len()
                + self.format.field_delimiter.len()
                + document.len()
                + self.format.row_delimiter.len(),
        );
        record.push_str(key);
        record.push_str(&self.format.field_delimiter);
        record.push_str(document);
        record.push_str(&self.format.row_delimiter);
        Ok(record)
    }

    /// Decode one row (without its trailing row delimiter) into a record.
    pub fn decode(&self, row: &str) -> Result<DecodedRecord> {
        match row.split_once(&self.format.field_delimiter) {
            Some((key, document)) => {
                if key.is_empty() {
                    return Err(CodecError::EmptyKey.into());
                }
                Ok(DecodedRecord {
                    key: key.to_string(),
                    document: Some(document.to_string()),
                })
            }
            None => {
                if row.is_empty() {
                    return Err(CodecError::EmptyKey.into());
                }
                Ok(DecodedRecord {
                    key: row.to_string(),
                    document: None,
                })
            }
        }
    }

    /// Split file contents into rows, dropping a trailing empty row left by
    /// the final row delimiter.
    pub fn split_rows<'a>(&self, contents: &'a str) -> Vec<&'a str> {
        let mut rows: Vec<&str> = contents.split(self.format.row_delimiter.as_str()).collect();
        if rows.last().is_some_and(|r| r.is_empty()) {
            rows.pop();
        }
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DocferryError;

    #[test]
    fn test_encode_default_delimiters() {
        let codec = RecordCodec::default();
        let record = codec.encode("user::1", "{\"name\":\"ann\"}").unwrap();
        assert_eq!(record, "user::1\t{\"name\":\"ann\"}\n");
    }

    #[test]
    fn test_encode_rejects_delimiter_in_key() {
        let codec = RecordCodec::default();
        let err = codec.encode("user\t1", "doc").unwrap_err();
        assert!(matches!(
            err,
            DocferryError::Codec(CodecError::DelimiterInKey(_))
        ));
    }

    #[test]
    fn test_encode_rejects_row_delimiter_in_document() {
        let codec = RecordCodec::default();
        let err = codec.encode("k", "line1\nline2").unwrap_err();
        assert!(matches!(
            err,
            DocferryError::Codec(CodecError::DelimiterInDocument(_))
        ));
    }

    #[test]
    fn test_encode_allows_field_delimiter_in_document() {
        // Only the row delimiter is structural inside a document.
        let codec = RecordCodec::default();
        let record = codec.encode("k", "a\tb").unwrap();
        assert_eq!(record, "k\ta\tb\n");
    }

    #[test]
    fn test_decode_key_and_document() {
        let codec = RecordCodec::default();
        let record = codec.decode("user::1\t{\"x\":1}").unwrap();
        assert_eq!(record.key, "user::1");
        assert_eq!(record.document.as_deref(), Some("{\"x\":1}"));
    }

    #[test]
    fn test_decode_key_only() {
        let codec = RecordCodec::default();
        let record = codec.decode("user::1").unwrap();
        assert_eq!(record.key, "user::1");
        assert_eq!(record.document, None);
    }

    #[test]
    fn test_decode_preserves_embedded_field_delimiters() {
        // Only the first field delimiter splits key from document.
        let codec = RecordCodec::default();
        let record = codec.decode("k\ta\tb").unwrap();
        assert_eq!(record.document.as_deref(), Some("a\tb"));
    }

    #[test]
    fn test_decode_empty_row() {
        let codec = RecordCodec::default();
        assert!(codec.decode("").is_err());
    }

    #[test]
    fn test_roundtrip_custom_delimiters() {
        let codec = RecordCodec::new(RecordFormat {
            field_delimiter: "|".to_string(),
            row_delimiter: ";".to_string(),
        });
        let encoded = codec.encode("k1", "v1").unwrap();
        assert_eq!(encoded, "k1|v1;");
        let decoded = codec.decode("k1|v1").unwrap();
        assert_eq!(decoded.key, "k1");
        assert_eq!(decoded.document.as_deref(), Some("v1"));
    }

    #[test]
    fn test_split_rows_drops_trailing_empty() {
        let codec = RecordCodec::default();
        let rows = codec.split_rows("a\tx\nb\ty\n");
        assert_eq!(rows, vec!["a\tx", "b\ty"]);
    }

    #[test]
    fn test_split_rows_without_trailing_delimiter() {
        let codec = RecordCodec::default();
        let rows = codec.split_rows("a\tx\nb\ty");
        assert_eq!(rows.len(), 2);
    }
}

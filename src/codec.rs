//! Byte encoding and document loading.
//!
//! The engines never call `serde_json` directly for bytes; they go through the
//! [`Codec`] carried by their options, so callers can swap the encoder per
//! call (pretty printing, a faster JSON implementation, ...).

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;

use crate::document::Document;
use crate::error::UnmarshalError;

/// Encodes and decodes JSON values.
pub trait Codec: Send + Sync {
    fn encode(&self, value: &Value) -> serde_json::Result<Vec<u8>>;
    fn decode(&self, bytes: &[u8]) -> serde_json::Result<Value>;
}

/// The `serde_json` codec.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonCodec {
    pub pretty: bool,
}

impl JsonCodec {
    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl Codec for JsonCodec {
    fn encode(&self, value: &Value) -> serde_json::Result<Vec<u8>> {
        if self.pretty {
            serde_json::to_vec_pretty(value)
        } else {
            serde_json::to_vec(value)
        }
    }

    fn decode(&self, bytes: &[u8]) -> serde_json::Result<Value> {
        serde_json::from_slice(bytes)
    }
}

pub(crate) fn default_codec() -> Arc<dyn Codec> {
    Arc::new(JsonCodec::default())
}

/// Decode `bytes` into a [`Document`] with `codec`.
pub(crate) fn decode_document(codec: &dyn Codec, bytes: &[u8]) -> Result<Document, UnmarshalError> {
    let value = codec
        .decode(bytes)
        .map_err(|source| UnmarshalError::Decode { source })?;
    serde_json::from_value(value).map_err(|source| UnmarshalError::Decode { source })
}

/// Load a document from a file path.
///
/// # Errors
///
/// Returns `UnmarshalError::Io` if the file can't be read,
/// or `UnmarshalError::Decode` if it isn't a JSON:API document.
pub fn load_document(path: &Path) -> Result<Document, UnmarshalError> {
    let content = std::fs::read(path).map_err(|source| UnmarshalError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    decode_document(&JsonCodec::default(), &content)
}

/// Load a document from a JSON string.
///
/// # Errors
///
/// Returns `UnmarshalError::Decode` if the string isn't a JSON:API document.
pub fn load_document_str(content: &str) -> Result<Document, UnmarshalError> {
    decode_document(&JsonCodec::default(), content.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn compact_and_pretty() {
        let value = json!({ "data": null });
        assert_eq!(JsonCodec::default().encode(&value).unwrap(), b"{\"data\":null}");
        let pretty = String::from_utf8(JsonCodec::pretty().encode(&value).unwrap()).unwrap();
        assert!(pretty.contains('\n'));
    }

    #[test]
    fn load_from_str() {
        let doc = load_document_str(r#"{"data":{"type":"users","id":"1"}}"#).unwrap();
        assert_eq!(doc.primary().count(), 1);
    }

    #[test]
    fn load_from_str_rejects_garbage() {
        let err = load_document_str("{not json").unwrap_err();
        assert!(matches!(err, UnmarshalError::Decode { .. }));
    }

    #[test]
    fn load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"meta":{{"total":3}}}}"#).unwrap();
        let doc = load_document(file.path()).unwrap();
        assert_eq!(doc.meta["total"], json!(3));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_document(Path::new("/nonexistent/doc.json")).unwrap_err();
        assert!(matches!(err, UnmarshalError::Io { .. }));
        assert_eq!(err.exit_code(), 3);
    }
}

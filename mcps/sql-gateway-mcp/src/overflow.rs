//! Content-addressed storage of complete result sets
//!
//! The full row set is serialized as a JSON array of rows (each row an
//! array of formatted value strings), hashed with SHA-256 and written under
//! `{digest}.json`. Identical result sets always land on the same key, so
//! rewriting an existing artifact is harmless.

use async_trait::async_trait;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::OverflowWriteError;
use crate::value::{format_value, SqlValue};

/// Shape of the artifact, spelled out for whoever fetches it
const FORMAT_NOTE: &str =
    "(format: [[row1_value1, row1_value2, ...], [row2_value1, row2_value2, ...], ...]])";

const FETCH_HINT: &str = "(ALWAYS prefer fetching this url in artifacts instead of hardcoding the values if at all possible)";

/// Reference to a stored artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverflowArtifact {
    /// Lowercase hex SHA-256 of the serialized rows
    pub content_hash: String,
    /// Key the artifact was written under
    pub file_name: String,
    /// Where a consumer can fetch it
    pub url: String,
}

impl OverflowArtifact {
    /// Note appended to a query response
    pub fn note(&self) -> String {
        format!(
            "\nFull result set url: {} {} {}",
            self.url, FORMAT_NOTE, FETCH_HINT
        )
    }
}

/// Destination for serialized artifacts
#[async_trait]
pub trait OverflowSink: Send + Sync {
    /// Store `bytes` under `key`, replacing any previous content
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), OverflowWriteError>;
}

/// Writes artifacts as files into an existing directory
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl OverflowSink for DirectorySink {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), OverflowWriteError> {
        let target = self.dir.join(key);
        let staging = self
            .dir
            .join(format!(".{}.{}.tmp", key, uuid::Uuid::new_v4()));

        // Write-then-rename keeps concurrent writers of the same key from
        // exposing a partially written file.
        if let Err(source) = tokio::fs::write(&staging, bytes).await {
            return Err(OverflowWriteError::Io {
                path: staging,
                source,
            });
        }
        if let Err(source) = tokio::fs::rename(&staging, &target).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(OverflowWriteError::Io {
                path: target,
                source,
            });
        }

        Ok(())
    }
}

/// Serializes, hashes and persists full result sets
#[derive(Clone)]
pub struct OverflowStore {
    sink: Arc<dyn OverflowSink>,
    base_url: String,
}

impl OverflowStore {
    pub fn new(sink: Arc<dyn OverflowSink>, base_url: impl Into<String>) -> Self {
        Self {
            sink,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Persist every row and return a reference to the artifact
    pub async fn store(
        &self,
        columns: &[String],
        rows: &[Vec<SqlValue>],
    ) -> Result<OverflowArtifact, OverflowWriteError> {
        let bytes = serialize_rows(rows)?;
        let content_hash = content_hash(&bytes);
        let file_name = format!("{}.json", content_hash);

        self.sink.put(&file_name, &bytes).await?;

        tracing::debug!(
            file = %file_name,
            rows = rows.len(),
            columns = columns.len(),
            bytes = bytes.len(),
            "Stored overflow artifact"
        );

        Ok(OverflowArtifact {
            url: format!("{}/{}", self.base_url, file_name),
            content_hash,
            file_name,
        })
    }
}

/// Canonical bytes of a row set: `[["1", "Alice"], ["2", "NULL"]]`
///
/// Elements are separated by `", "` and non-ASCII text is `\u`-escaped, so
/// the bytes match the common default JSON dumper layout.
pub fn serialize_rows(rows: &[Vec<SqlValue>]) -> Result<Vec<u8>, serde_json::Error> {
    let data: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.iter().map(format_value).collect())
        .collect();

    let mut bytes = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut bytes, AsciiSpacedFormatter);
    data.serialize(&mut serializer)?;
    Ok(bytes)
}

/// Lowercase hex SHA-256 digest
pub fn content_hash(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

struct AsciiSpacedFormatter;

impl serde_json::ser::Formatter for AsciiSpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }

    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut units = [0u16; 2];
        for ch in fragment.chars() {
            if (' '..='~').contains(&ch) {
                writer.write_all(&[ch as u8])?;
            } else {
                for unit in ch.encode_utf16(&mut units) {
                    write!(writer, "\\u{:04x}", unit)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tokio::sync::Mutex;

    /// Sink that records what it was given
    #[derive(Default)]
    struct RecordingSink {
        writes: Mutex<Vec<(String, Vec<u8>)>>,
    }

    #[async_trait]
    impl OverflowSink for RecordingSink {
        async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), OverflowWriteError> {
            self.writes.lock().await.push((key.to_string(), bytes.to_vec()));
            Ok(())
        }
    }

    fn columns() -> Vec<String> {
        vec!["id".to_string(), "name".to_string()]
    }

    fn rows() -> Vec<Vec<SqlValue>> {
        vec![
            vec![SqlValue::Integer(1), SqlValue::Text("Alice".into())],
            vec![SqlValue::Integer(2), SqlValue::Null],
        ]
    }

    #[test]
    fn test_serialization_layout() {
        let bytes = serialize_rows(&rows()).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"[["1", "Alice"], ["2", "NULL"]]"#
        );
    }

    #[test]
    fn test_serialization_escapes_non_ascii() {
        let rows = vec![vec![
            SqlValue::Text("café".into()),
            SqlValue::Text("a\"b\n".into()),
            SqlValue::Text("🦀".into()),
            SqlValue::Text("\u{7f}".into()),
        ]];
        let bytes = serialize_rows(&rows).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"[["caf\u00e9", "a\"b\n", "\ud83e\udd80", "\u007f"]]"#
        );
    }

    #[test]
    fn test_empty_row_set() {
        assert_eq!(serialize_rows(&[]).unwrap(), b"[]");
    }

    #[test]
    fn test_content_hash_known_value() {
        assert_eq!(
            content_hash(b"[]"),
            "4f53cda18c2baa0c0354bb5f9a3ecbe5ed12ab4d8e11ba873c2f11161202b945"
        );
    }

    #[tokio::test]
    async fn test_store_is_deterministic() {
        let sink = Arc::new(RecordingSink::default());
        let store = OverflowStore::new(sink.clone(), "https://files.example/");

        let first = store.store(&columns(), &rows()).await.unwrap();
        let second = store.store(&columns(), &rows()).await.unwrap();
        assert_eq!(first, second);

        let expected = content_hash(&serialize_rows(&rows()).unwrap());
        assert_eq!(first.content_hash, expected);
        assert_eq!(first.content_hash.len(), 64);
        assert_eq!(first.file_name, format!("{}.json", expected));
        assert_eq!(first.url, format!("https://files.example/{}.json", expected));

        let writes = sink.writes.lock().await;
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[0], writes[1]);
    }

    #[tokio::test]
    async fn test_different_rows_different_hash() {
        let store = OverflowStore::new(Arc::new(RecordingSink::default()), "http://x");
        let a = store.store(&columns(), &rows()).await.unwrap();
        let mut changed = rows();
        changed[1][1] = SqlValue::Text("Bob".into());
        let b = store.store(&columns(), &changed).await.unwrap();
        assert_ne!(a.content_hash, b.content_hash);
    }

    #[test]
    fn test_note_describes_shape() {
        let artifact = OverflowArtifact {
            content_hash: "abc".into(),
            file_name: "abc.json".into(),
            url: "http://x/abc.json".into(),
        };
        let note = artifact.note();
        assert!(note.starts_with("\nFull result set url: http://x/abc.json (format: [[row1_value1"));
        assert!(note.ends_with("if at all possible)"));
    }

    #[tokio::test]
    async fn test_directory_sink_writes_file() {
        let dir = tempdir().unwrap();
        let store = OverflowStore::new(Arc::new(DirectorySink::new(dir.path())), "http://x");

        let artifact = store.store(&columns(), &rows()).await.unwrap();
        let written = std::fs::read(dir.path().join(&artifact.file_name)).unwrap();
        assert_eq!(written, serialize_rows(&rows()).unwrap());

        // Same content again overwrites in place
        store.store(&columns(), &rows()).await.unwrap();
        let entries = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[tokio::test]
    async fn test_directory_sink_concurrent_same_key() {
        let dir = tempdir().unwrap();
        let store = OverflowStore::new(Arc::new(DirectorySink::new(dir.path())), "http://x");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.store(&columns(), &rows()).await })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_directory_sink_missing_directory() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");
        let store = OverflowStore::new(Arc::new(DirectorySink::new(missing)), "http://x");

        let err = store.store(&columns(), &rows()).await.unwrap_err();
        assert!(matches!(err, OverflowWriteError::Io { .. }));
    }
}

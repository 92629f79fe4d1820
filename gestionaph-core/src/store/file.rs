//! Journaled document store
//!
//! Same in-memory state as [`MemoryStore`](super::MemoryStore), made durable by
//! an append-only journal:
//!
//! ```text
//! data/<project>/
//! └── documents.journal   # one line per committed batch
//! ```
//!
//! Each line is `<crc32_hex>:<json>` where the JSON is a [`JournalEntry`].
//! The whole batch is one line. A torn last line (a crash mid-append) is cut
//! off on open; a corrupted line before it fails the open.

use super::state::DocumentState;
use super::{
    Document, DocumentStore, Listener, Query, StoreError, StoreResult, Subscription,
    SubscriptionHub, WriteBatch,
};
use chrono::{DateTime, Utc};
use crc32fast::Hasher as Crc32Hasher;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;

pub const JOURNAL_FILE: &str = "documents.journal";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    pub sequence: u64,
    pub committed_at: DateTime<Utc>,
    pub batch: WriteBatch,
}

#[inline]
pub fn calculate_crc32(data: &[u8]) -> u32 {
    let mut hasher = Crc32Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Format a journal line: `<crc32_hex>:<json>`
pub fn format_line(json: &str) -> String {
    format!("{:08x}:{}", calculate_crc32(json.as_bytes()), json)
}

/// Split a journal line and verify its checksum, returning the JSON part
pub fn parse_line(line: &str) -> Result<&str, String> {
    if line.len() <= 9 || line.as_bytes()[8] != b':' {
        return Err("missing checksum prefix".to_string());
    }
    let (crc_hex, json) = line.split_at(9);
    let expected = u32::from_str_radix(&crc_hex[..8], 16)
        .map_err(|_| format!("invalid CRC32 hex: {}", &crc_hex[..8]))?;
    let actual = calculate_crc32(json.as_bytes());
    if expected != actual {
        return Err(format!("CRC32 mismatch: expected {:08x}, got {:08x}", expected, actual));
    }
    Ok(json)
}

struct Journal {
    file: File,
    /// Bytes of fully committed lines
    len: u64,
    sequence: u64,
    fsync: bool,
}

impl Journal {
    fn append(&mut self, batch: &WriteBatch) -> StoreResult<()> {
        let entry = JournalEntry {
            sequence: self.sequence + 1,
            committed_at: Utc::now(),
            batch: batch.clone(),
        };
        let line = format!("{}\n", format_line(&serde_json::to_string(&entry)?));

        if let Err(e) = self.write_line(line.as_bytes()) {
            self.rollback();
            return Err(e.into());
        }
        self.len += line.len() as u64;
        self.sequence = entry.sequence;
        Ok(())
    }

    fn write_line(&mut self, line: &[u8]) -> std::io::Result<()> {
        self.file.write_all(line)?;
        self.file.flush()?;
        if self.fsync {
            self.file.sync_data()?;
        }
        Ok(())
    }

    /// Cut off whatever a failed append left behind
    fn rollback(&mut self) {
        if let Err(e) = self.file.set_len(self.len) {
            log::error!("Failed to roll journal back to {} bytes: {}", self.len, e);
        }
    }
}

#[derive(Clone)]
pub struct FileStore {
    path: PathBuf,
    state: Arc<RwLock<DocumentState>>,
    journal: Arc<Mutex<Journal>>,
    hub: Arc<SubscriptionHub>,
}

impl FileStore {
    /// Open (or create) the store in `dir`, replaying its journal
    pub fn open(dir: impl AsRef<Path>) -> StoreResult<Self> {
        Self::open_with(dir, true)
    }

    /// Like [`FileStore::open`]; `fsync` controls syncing after each batch
    pub fn open_with(dir: impl AsRef<Path>, fsync: bool) -> StoreResult<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let path = dir.join(JOURNAL_FILE);

        let mut state = DocumentState::new();
        let replayed = if path.exists() { replay(&path, &mut state)? } else { Replayed::default() };

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        if let Some(len) = replayed.torn_at {
            file.set_len(len)?;
        }
        let len = file.metadata()?.len();

        log::info!(
            "Opened document journal {} ({} batches, {} documents)",
            path.display(),
            replayed.sequence,
            state.document_count()
        );

        Ok(Self {
            path,
            state: Arc::new(RwLock::new(state)),
            journal: Arc::new(Mutex::new(Journal {
                file,
                len,
                sequence: replayed.sequence,
                fsync,
            })),
            hub: Arc::new(SubscriptionHub::new()),
        })
    }

    pub fn journal_path(&self) -> &Path {
        &self.path
    }

    pub async fn document_count(&self) -> usize {
        self.state.read().await.document_count()
    }
}

#[derive(Debug, Default)]
struct Replayed {
    sequence: u64,
    /// Offset of an uncommitted last line to cut off
    torn_at: Option<u64>,
}

fn decode_line(raw: &[u8]) -> Result<Option<JournalEntry>, String> {
    let line = std::str::from_utf8(raw).map_err(|e| e.to_string())?;
    if line.trim().is_empty() {
        return Ok(None);
    }
    let json = parse_line(line.trim_end_matches('\r'))?;
    serde_json::from_str(json).map(Some).map_err(|e| e.to_string())
}

/// Apply every journaled batch to `state`.
///
/// The last line is only committed once its newline is on disk; an
/// unterminated or unreadable last line is a batch whose commit never
/// returned, so it is dropped. A bad line anywhere else is corruption.
fn replay(path: &Path, state: &mut DocumentState) -> StoreResult<Replayed> {
    let content = fs::read(path)?;
    let mut replayed = Replayed::default();
    let mut offset = 0;
    let mut number = 0;

    while offset < content.len() {
        number += 1;
        let rest = &content[offset..];
        let (raw, next, terminated) = match rest.iter().position(|b| *b == b'\n') {
            Some(end) => (&rest[..end], offset + end + 1, true),
            None => (rest, content.len(), false),
        };
        let last = next >= content.len();

        let decoded = if terminated {
            decode_line(raw)
        } else {
            Err("missing line terminator".to_string())
        };
        match decoded {
            Ok(Some(entry)) => {
                state.apply(&entry.batch)?;
                replayed.sequence = entry.sequence;
            }
            Ok(None) => {}
            Err(e) if last => {
                log::warn!(
                    "Dropping uncommitted journal tail of {} at line {}: {}",
                    path.display(),
                    number,
                    e
                );
                replayed.torn_at = Some(offset as u64);
            }
            Err(e) => return Err(StoreError::Corrupted(format!("line {}: {}", number, e))),
        }
        offset = next;
    }
    Ok(replayed)
}

#[async_trait::async_trait]
impl DocumentStore for FileStore {
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        Ok(self.state.read().await.get(collection, id))
    }

    async fn query(&self, query: &Query) -> StoreResult<Vec<Document>> {
        Ok(self.state.read().await.query(query))
    }

    async fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let touched: Vec<String> = batch.collections().into_iter().collect();
        {
            let mut state = self.state.write().await;
            let staged = state.stage(&batch)?;
            {
                let mut journal = self
                    .journal
                    .lock()
                    .map_err(|_| StoreError::Corrupted("journal lock poisoned".into()))?;
                journal.append(&batch)?;
            }
            state.install(staged);
        }

        let state = self.state.read().await;
        self.hub.notify(&touched, |q| state.query(q));
        Ok(())
    }

    async fn list_collections(&self) -> StoreResult<Vec<String>> {
        Ok(self.state.read().await.collection_names())
    }

    async fn subscribe(&self, query: Query, listener: Listener) -> StoreResult<Subscription> {
        let state = self.state.read().await;
        listener(&state.query(&query));
        let id = self.hub.register(query, listener);
        Ok(Subscription::new(id, &self.hub))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map, Value};
    use tempfile::TempDir;

    fn fields(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn line_checksum_detects_tampering() {
        let line = format_line(r#"{"a":1}"#);
        assert_eq!(parse_line(&line).unwrap(), r#"{"a":1}"#);

        let tampered = line.replace("1}", "2}");
        assert!(parse_line(&tampered).unwrap_err().contains("CRC32 mismatch"));
        assert!(parse_line(r#"{"a":1}"#).is_err());
    }

    #[tokio::test]
    async fn documents_survive_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = FileStore::open_with(dir.path(), false).unwrap();
            let mut batch = WriteBatch::new();
            batch
                .set("profiles", "u1", fields(json!({"role": "resident"})))
                .set("profiles", "u2", fields(json!({"role": "admin"})));
            store.commit(batch).await.unwrap();
            store.update("profiles", "u1", fields(json!({"phone": "555"}))).await.unwrap();
            store.delete("profiles", "u2").await.unwrap();
        }

        let store = FileStore::open_with(dir.path(), false).unwrap();
        let u1 = store.get("profiles", "u1").await.unwrap().unwrap();
        assert_eq!(u1.get("phone"), Some(&json!("555")));
        assert!(store.get("profiles", "u2").await.unwrap().is_none());
        assert_eq!(store.document_count().await, 1);
    }

    #[tokio::test]
    async fn rejected_batch_is_not_journaled() {
        let dir = TempDir::new().unwrap();
        {
            let store = FileStore::open_with(dir.path(), false).unwrap();
            let mut batch = WriteBatch::new();
            batch
                .set("notifications", "n1", Map::new())
                .update("notifications", "ghost", fields(json!({"read": true})));
            assert!(store.commit(batch).await.is_err());
        }
        let content = fs::read_to_string(dir.path().join(JOURNAL_FILE)).unwrap();
        assert!(content.is_empty());
    }

    async fn seed_profiles(dir: &Path, ids: &[&str]) {
        let store = FileStore::open_with(dir, false).unwrap();
        for id in ids {
            store.set("profiles", id, fields(json!({"role": "resident"})), false).await.unwrap();
        }
    }

    #[tokio::test]
    async fn corrupted_journal_fails_to_open() {
        let dir = TempDir::new().unwrap();
        seed_profiles(dir.path(), &["u1", "u2"]).await;

        let path = dir.path().join(JOURNAL_FILE);
        let content = fs::read_to_string(&path).unwrap();
        let mut lines: Vec<String> = content.lines().map(str::to_string).collect();
        lines[0] = lines[0].replace("resident", "admin");
        fs::write(&path, format!("{}\n", lines.join("\n"))).unwrap();

        match FileStore::open_with(dir.path(), false) {
            Err(StoreError::Corrupted(msg)) => assert!(msg.contains("line 1")),
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("corrupted journal was accepted"),
        }
    }

    #[tokio::test]
    async fn torn_tail_is_dropped_on_open() {
        let dir = TempDir::new().unwrap();
        seed_profiles(dir.path(), &["u1", "u2", "u3"]).await;

        let path = dir.path().join(JOURNAL_FILE);
        let committed = fs::read_to_string(&path).unwrap();
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(br#"deadbeef:{"sequence":4,"commi"#).unwrap();
        drop(file);

        let store = FileStore::open_with(dir.path(), false).unwrap();
        assert_eq!(store.document_count().await, 3);
        assert_eq!(fs::read_to_string(&path).unwrap(), committed);

        store.set("profiles", "u4", fields(json!({"role": "admin"})), false).await.unwrap();
        drop(store);

        let store = FileStore::open_with(dir.path(), false).unwrap();
        assert_eq!(store.document_count().await, 4);
        let u4 = store.get("profiles", "u4").await.unwrap().unwrap();
        assert_eq!(u4.get("role"), Some(&json!("admin")));
    }

    #[tokio::test]
    async fn bad_checksum_on_last_line_is_dropped() {
        let dir = TempDir::new().unwrap();
        seed_profiles(dir.path(), &["u1", "u2"]).await;

        let path = dir.path().join(JOURNAL_FILE);
        let content = fs::read_to_string(&path).unwrap();
        let (first, second) = content.trim_end().split_once('\n').unwrap();
        fs::write(&path, format!("{}\n{}\n", first, second.replace("resident", "admin"))).unwrap();

        let store = FileStore::open_with(dir.path(), false).unwrap();
        assert!(store.get("profiles", "u1").await.unwrap().is_some());
        assert!(store.get("profiles", "u2").await.unwrap().is_none());
        assert_eq!(fs::read_to_string(&path).unwrap(), format!("{}\n", first));
    }

    #[test]
    fn rollback_cuts_partial_append() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(JOURNAL_FILE);
        let file = OpenOptions::new().create(true).append(true).open(&path).unwrap();
        let mut journal = Journal { file, len: 0, sequence: 0, fsync: false };

        let mut batch = WriteBatch::new();
        batch.set("profiles", "u1", Map::new());
        journal.append(&batch).unwrap();
        let committed = fs::read_to_string(&path).unwrap();

        journal.file.write_all(b"0badc0de:{\"sequence\":2").unwrap();
        journal.rollback();
        assert_eq!(fs::read_to_string(&path).unwrap(), committed);

        journal.append(&batch).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 2);
        assert_eq!(journal.sequence, 2);
    }
}

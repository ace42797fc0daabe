//! Durable storage for memory records.

use crate::error::MemoryError;
use crate::model::MemoryRecord;
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Storage backend used by [`crate::MemoryStore`].
///
/// Every method is synchronous; a successful return means the write is
/// durable.
pub trait MemoryProvider: Send + Sync {
    /// Load all records of a user in insertion order.
    fn load_user(&self, user_id: &str) -> Result<Vec<MemoryRecord>, MemoryError>;

    /// Append one record to its user's collection.
    fn append(&self, record: &MemoryRecord) -> Result<(), MemoryError>;

    /// Replace a user's full collection.
    fn rewrite_user(&self, user_id: &str, records: &[MemoryRecord]) -> Result<(), MemoryError>;

    /// List users with persisted records.
    fn list_users(&self) -> Result<Vec<String>, MemoryError>;
}

/// Cut `file` back to `len` when `result` failed, so a failed append
/// leaves no partial or unsynced line behind.
fn truncate_on_error(file: &File, len: u64, result: io::Result<()>) -> io::Result<()> {
    if let Err(err) = result {
        if let Err(truncate_err) = file.set_len(len).and_then(|()| file.sync_data()) {
            warn!("failed to roll back memory append (len={len}, error={truncate_err})");
        }
        return Err(err);
    }
    Ok(())
}

/// File-backed provider storing one JSONL file per user.
///
/// File names are the hex-encoded user id, so arbitrary ids are safe.
#[derive(Debug)]
pub struct FileMemoryProvider {
    /// Root directory for memory records.
    root: PathBuf,
    /// Serialize write access to user files.
    write_lock: Mutex<()>,
}

impl FileMemoryProvider {
    /// Create a new file-backed provider under the given root.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, MemoryError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        info!("initialized file memory provider (root={})", root.display());
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    /// Root directory of the provider.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path to the user JSONL file.
    fn user_path(&self, user_id: &str) -> PathBuf {
        self.root.join(format!("{}.jsonl", hex::encode(user_id)))
    }

    /// Path to the temporary user file.
    fn temp_path(&self, user_id: &str) -> PathBuf {
        self.root.join(format!("{}.jsonl.tmp", hex::encode(user_id)))
    }
}

impl MemoryProvider for FileMemoryProvider {
    fn load_user(&self, user_id: &str) -> Result<Vec<MemoryRecord>, MemoryError> {
        let path = self.user_path(user_id);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let file = OpenOptions::new().read(true).open(path)?;
        let reader = BufReader::new(file);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: MemoryRecord = serde_json::from_str(&line)?;
            records.push(record);
        }
        debug!(
            "loaded memory records (user_id={}, count={})",
            user_id,
            records.len()
        );
        Ok(records)
    }

    fn append(&self, record: &MemoryRecord) -> Result<(), MemoryError> {
        let _guard = self.write_lock.lock();
        let path = self.user_path(&record.user_id);
        let line = serde_json::to_string(record)?;
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        let len = file.metadata()?.len();
        let written = writeln!(file, "{line}").and_then(|()| file.sync_data());
        truncate_on_error(&file, len, written)?;
        debug!(
            "stored memory record (user_id={}, category={}, content_len={})",
            record.user_id,
            record.category,
            record.content.len()
        );
        Ok(())
    }

    /// Rewrite a user's records atomically.
    fn rewrite_user(&self, user_id: &str, records: &[MemoryRecord]) -> Result<(), MemoryError> {
        let _guard = self.write_lock.lock();
        let path = self.user_path(user_id);
        let temp_path = self.temp_path(user_id);
        {
            let mut file = OpenOptions::new()
                .create(true)
                .truncate(true)
                .write(true)
                .open(&temp_path)?;
            for record in records {
                let line = serde_json::to_string(record)?;
                writeln!(file, "{line}")?;
            }
            file.sync_data()?;
        }
        fs::rename(temp_path, path)?;
        debug!(
            "rewrote memory records (user_id={}, count={})",
            user_id,
            records.len()
        );
        Ok(())
    }

    fn list_users(&self) -> Result<Vec<String>, MemoryError> {
        let mut users = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("jsonl") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            let bytes =
                hex::decode(stem).map_err(|_| MemoryError::InvalidUserKey(stem.to_string()))?;
            let user_id = String::from_utf8(bytes)
                .map_err(|_| MemoryError::InvalidUserKey(stem.to_string()))?;
            users.push(user_id);
        }
        users.sort();
        Ok(users)
    }
}

/// Process-local provider; records live as long as the provider.
#[derive(Debug, Default)]
pub struct InMemoryProvider {
    users: Mutex<HashMap<String, Vec<MemoryRecord>>>,
}

impl InMemoryProvider {
    /// Create an empty provider.
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemoryProvider for InMemoryProvider {
    fn load_user(&self, user_id: &str) -> Result<Vec<MemoryRecord>, MemoryError> {
        Ok(self.users.lock().get(user_id).cloned().unwrap_or_default())
    }

    fn append(&self, record: &MemoryRecord) -> Result<(), MemoryError> {
        self.users
            .lock()
            .entry(record.user_id.clone())
            .or_default()
            .push(record.clone());
        Ok(())
    }

    fn rewrite_user(&self, user_id: &str, records: &[MemoryRecord]) -> Result<(), MemoryError> {
        self.users
            .lock()
            .insert(user_id.to_string(), records.to_vec());
        Ok(())
    }

    fn list_users(&self) -> Result<Vec<String>, MemoryError> {
        let mut users: Vec<String> = self.users.lock().keys().cloned().collect();
        users.sort();
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::{FileMemoryProvider, InMemoryProvider, MemoryProvider, truncate_on_error};
    use crate::{MemoryCategory, MemoryRecord};
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::fs::{self, OpenOptions};
    use std::io::{self, Write};
    use tempfile::tempdir;
    use uuid::Uuid;

    fn record(user_id: &str, content: &str) -> MemoryRecord {
        MemoryRecord {
            id: Uuid::now_v7(),
            user_id: user_id.to_string(),
            content: content.to_string(),
            category: MemoryCategory::Other("sleep".to_string()),
            base_importance: 0.42,
            created_at: Utc::now(),
            metadata: json!({ "source": "chat", "turn": 3 }),
        }
    }

    #[test]
    fn failed_append_is_cut_from_the_file() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("user.jsonl");
        fs::write(&path, "kept\n").expect("seed");

        let mut file = OpenOptions::new().append(true).open(&path).expect("open");
        let len = file.metadata().expect("metadata").len();
        writeln!(file, "partial").expect("write");
        let failed = Err(io::Error::other("sync failed"));
        assert!(truncate_on_error(&file, len, failed).is_err());
        assert_eq!(fs::read_to_string(&path).expect("read"), "kept\n");

        writeln!(file, "next").expect("write");
        assert!(truncate_on_error(&file, len, Ok(())).is_ok());
        assert_eq!(fs::read_to_string(&path).expect("read"), "kept\nnext\n");
    }

    #[test]
    fn file_provider_round_trips_all_fields() {
        let temp = tempdir().expect("tempdir");
        let provider = FileMemoryProvider::new(temp.path()).expect("provider");
        let first = record("ユーザー/1", "眠りが浅い日が続いている");
        let second = record("ユーザー/1", "寝る前にスマホを見てしまう");
        provider.append(&first).expect("append first");
        provider.append(&second).expect("append second");

        let reopened = FileMemoryProvider::new(temp.path()).expect("reopen");
        let loaded = reopened.load_user("ユーザー/1").expect("load");
        assert_eq!(loaded, vec![first, second]);
        assert_eq!(
            reopened.list_users().expect("users"),
            vec!["ユーザー/1".to_string()]
        );
    }

    #[test]
    fn file_provider_rewrite_replaces_records() {
        let temp = tempdir().expect("tempdir");
        let provider = FileMemoryProvider::new(temp.path()).expect("provider");
        let keep = record("u1", "keep this one");
        provider.append(&record("u1", "drop this one")).expect("append");
        provider.append(&keep).expect("append");

        provider
            .rewrite_user("u1", std::slice::from_ref(&keep))
            .expect("rewrite");
        assert_eq!(provider.load_user("u1").expect("load"), vec![keep]);
        assert!(!temp.path().join(format!("{}.jsonl.tmp", hex::encode("u1"))).exists());
    }

    #[test]
    fn missing_user_loads_empty() {
        let temp = tempdir().expect("tempdir");
        let provider = FileMemoryProvider::new(temp.path()).expect("provider");
        assert_eq!(provider.load_user("nobody").expect("load"), Vec::new());
    }

    #[test]
    fn in_memory_provider_partitions_users() {
        let provider = InMemoryProvider::new();
        let a = record("a", "first user memory");
        let b = record("b", "second user memory");
        provider.append(&a).expect("append");
        provider.append(&b).expect("append");
        assert_eq!(provider.load_user("a").expect("load"), vec![a]);
        assert_eq!(
            provider.list_users().expect("users"),
            vec!["a".to_string(), "b".to_string()]
        );
    }
}

//! File-backed [`TokenStore`].
//!
//! Tokens live in `~/.memberpass/storage.json` as a flat JSON object, the
//! bearer token under the `jwt` key:
//!
//! ```json
//! { "jwt": "eyJhbGciOi..." }
//! ```

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use crate::traits::{TokenStore, TokenStoreError, TOKEN_KEY};

const STORAGE_DIR: &str = ".memberpass";
const STORAGE_FILE: &str = "storage.json";

type Slots = BTreeMap<String, String>;

#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles from concurrent requests.
    write_lock: Mutex<()>,
}

impl FileTokenStore {
    /// Store under the home directory. `None` when there is no home.
    pub fn new() -> Option<Self> {
        let home = dirs::home_dir()?;
        Some(Self::in_dir(home.join(STORAGE_DIR)))
    }

    /// Store inside an explicit directory (`MEMBERPASS_HOME`, tests).
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(STORAGE_FILE),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_slots(&self) -> Result<Slots, TokenStoreError> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Slots::new()),
            Err(e) => return Err(TokenStoreError::LoadFailed(e.to_string())),
        };
        serde_json::from_reader(BufReader::new(file))
            .map_err(|e| TokenStoreError::Serialization(e.to_string()))
    }

    /// Write through a sibling temp file so a crash never leaves half a file.
    fn write_slots(&self, slots: &Slots) -> Result<(), TokenStoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| TokenStoreError::SaveFailed(e.to_string()))?;
        }

        let tmp = self.path.with_extension("json.tmp");
        let file = File::create(&tmp).map_err(|e| TokenStoreError::SaveFailed(e.to_string()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, slots)
            .map_err(|e| TokenStoreError::Serialization(e.to_string()))?;
        writer
            .flush()
            .map_err(|e| TokenStoreError::SaveFailed(e.to_string()))?;
        drop(writer);

        fs::rename(&tmp, &self.path).map_err(|e| TokenStoreError::SaveFailed(e.to_string()))
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn load(&self) -> Result<Option<String>, TokenStoreError> {
        let slots = self.read_slots()?;
        Ok(slots.get(TOKEN_KEY).filter(|t| !t.is_empty()).cloned())
    }

    async fn save(&self, token: &str) -> Result<(), TokenStoreError> {
        let _guard = self.write_lock.lock().await;
        let mut slots = self.read_slots().unwrap_or_default();
        slots.insert(TOKEN_KEY.to_string(), token.to_string());
        self.write_slots(&slots)
    }

    async fn clear(&self) -> Result<(), TokenStoreError> {
        let _guard = self.write_lock.lock().await;
        let mut corrupt = false;
        let mut slots = match self.read_slots() {
            Ok(slots) => slots,
            // A corrupt file cannot hold a usable token; start over.
            Err(TokenStoreError::Serialization(_)) => {
                corrupt = true;
                Slots::new()
            }
            Err(e) => return Err(TokenStoreError::ClearFailed(e.to_string())),
        };
        if slots.remove(TOKEN_KEY).is_none() && !corrupt {
            return Ok(());
        }
        if slots.is_empty() {
            return match fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(e) => Err(TokenStoreError::ClearFailed(e.to_string())),
            };
        }
        self.write_slots(&slots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, FileTokenStore) {
        let dir = TempDir::new().unwrap();
        let store = FileTokenStore::in_dir(dir.path());
        (dir, store)
    }

    #[tokio::test]
    async fn test_missing_file_loads_none() {
        let (_dir, store) = store();
        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let (_dir, store) = store();
        store.save("abc").await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some("abc".to_string()));

        let raw = fs::read_to_string(store.path()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["jwt"], "abc");
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let (_dir, store) = store();
        store.save("abc").await.unwrap();
        store.clear().await.unwrap();
        store.clear().await.unwrap();
        assert_eq!(store.load().await.unwrap(), None);
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_clear_keeps_other_slots() {
        let (_dir, store) = store();
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), r#"{"jwt":"abc","locale":"ja"}"#).unwrap();

        store.clear().await.unwrap();

        let raw = fs::read_to_string(store.path()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(json.get("jwt").is_none());
        assert_eq!(json["locale"], "ja");
    }

    #[tokio::test]
    async fn test_corrupt_file_reports_serialization_error() {
        let (_dir, store) = store();
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "not json").unwrap();

        assert!(matches!(
            store.load().await,
            Err(TokenStoreError::Serialization(_))
        ));
        store.clear().await.unwrap();
        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_empty_token_reads_as_absent() {
        let (_dir, store) = store();
        store.save("").await.unwrap();
        assert_eq!(store.load().await.unwrap(), None);
    }
}

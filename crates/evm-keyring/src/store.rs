//! Persistence of the encrypted vault blob.
//!
//! Stores never see plaintext. A failed `save` must leave the previously
//! stored blob in place.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::debug;

use crate::error::{KeyringError, Result};

/// Magic bytes identifying a keyring vault file.
pub const VAULT_FILE_MAGIC: &[u8; 4] = b"EVKR";

/// Current vault file format version.
pub const VAULT_FILE_VERSION: u32 = 1;

/// Backing storage for the single encrypted vault blob.
pub trait VaultStore: Send + Sync {
    /// The stored blob, if any.
    fn load(&self) -> Result<Option<String>>;

    /// Replace the stored blob.
    fn save(&self, blob: &str) -> Result<()>;
}

/// In-process store, mostly for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryVaultStore {
    blob: RwLock<Option<String>>,
}

impl MemoryVaultStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a blob.
    pub fn with_blob(blob: impl Into<String>) -> Self {
        Self {
            blob: RwLock::new(Some(blob.into())),
        }
    }
}

impl VaultStore for MemoryVaultStore {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.blob.read().clone())
    }

    fn save(&self, blob: &str) -> Result<()> {
        *self.blob.write() = Some(blob.to_string());
        Ok(())
    }
}

/// Vault file header serialized as JSON.
#[derive(serde::Serialize, serde::Deserialize)]
struct VaultFileHeader {
    magic: String,
    version: u32,
}

/// Store writing the blob to a single file.
///
/// # File format
/// ```text
/// header_len (4 bytes LE) || header_json || blob
/// ```
/// Writes go to a sibling temp file that is renamed over the target, so a
/// crash mid-write never leaves a truncated vault behind.
#[derive(Debug, Clone)]
pub struct FileVaultStore {
    path: PathBuf,
}

impl FileVaultStore {
    /// Store backed by `path`. The file is created on first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the vault file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "vault".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl VaultStore for FileVaultStore {
    fn load(&self) -> Result<Option<String>> {
        let file_data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(KeyringError::Persistence(e.to_string())),
        };

        if file_data.len() < 4 {
            return Err(KeyringError::CorruptedVault("file too short".into()));
        }
        let mut len_bytes = [0u8; 4];
        len_bytes.copy_from_slice(&file_data[..4]);
        let header_len = u32::from_le_bytes(len_bytes) as usize;
        if file_data.len() < 4 + header_len {
            return Err(KeyringError::CorruptedVault("header truncated".into()));
        }

        let header: VaultFileHeader = serde_json::from_slice(&file_data[4..4 + header_len])
            .map_err(|e| KeyringError::CorruptedVault(format!("invalid header: {e}")))?;
        if header.magic.as_bytes() != VAULT_FILE_MAGIC {
            return Err(KeyringError::CorruptedVault("invalid magic bytes".into()));
        }
        if header.version != VAULT_FILE_VERSION {
            return Err(KeyringError::CorruptedVault(format!(
                "unsupported file version: {}",
                header.version
            )));
        }

        let blob = String::from_utf8(file_data[4 + header_len..].to_vec())
            .map_err(|_| KeyringError::CorruptedVault("blob is not valid UTF-8".into()))?;
        Ok(Some(blob))
    }

    fn save(&self, blob: &str) -> Result<()> {
        let header = VaultFileHeader {
            magic: String::from_utf8_lossy(VAULT_FILE_MAGIC).to_string(),
            version: VAULT_FILE_VERSION,
        };
        let header_json =
            serde_json::to_vec(&header).map_err(|e| KeyringError::Serialization(e.to_string()))?;
        let header_len = u32::try_from(header_json.len())
            .map_err(|_| KeyringError::Serialization("header too large".into()))?;

        let mut file_data = Vec::with_capacity(4 + header_json.len() + blob.len());
        file_data.extend_from_slice(&header_len.to_le_bytes());
        file_data.extend_from_slice(&header_json);
        file_data.extend_from_slice(blob.as_bytes());

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| KeyringError::Persistence(e.to_string()))?;
        }
        let tmp = self.temp_path();
        let write = || -> std::io::Result<()> {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&file_data)?;
            file.sync_all()?;
            fs::rename(&tmp, &self.path)
        };
        write().map_err(|e| {
            let _ = fs::remove_file(&tmp);
            KeyringError::Persistence(e.to_string())
        })?;
        debug!(path = %self.path.display(), bytes = file_data.len(), "vault file written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_roundtrip() {
        let store = MemoryVaultStore::new();
        assert_eq!(store.load().unwrap(), None);
        store.save("abcd").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("abcd"));
        store.save("ef01").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("ef01"));
    }

    #[test]
    fn memory_store_seeded() {
        let store = MemoryVaultStore::with_blob("00ff");
        assert_eq!(store.load().unwrap().as_deref(), Some("00ff"));
    }

    #[test]
    fn file_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileVaultStore::new(dir.path().join("vault.dat"));
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileVaultStore::new(dir.path().join("nested").join("vault.dat"));
        store.save("deadbeef").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("deadbeef"));
        assert!(!store.temp_path().exists());
    }

    #[test]
    fn file_store_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileVaultStore::new(dir.path().join("vault.dat"));
        store.save("01").unwrap();
        store.save("02").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("02"));
    }

    #[test]
    fn file_store_garbage_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.dat");
        fs::write(&path, b"garbage").unwrap();
        let err = FileVaultStore::new(&path).load().unwrap_err();
        assert!(matches!(err, KeyringError::CorruptedVault(_)));
    }

    #[test]
    fn file_store_truncated_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.dat");
        fs::write(&path, [0u8; 2]).unwrap();
        let err = FileVaultStore::new(&path).load().unwrap_err();
        assert_eq!(err, KeyringError::CorruptedVault("file too short".into()));
    }

    #[test]
    fn file_store_wrong_magic_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.dat");
        let header = br#"{"magic":"RIWL","version":1}"#;
        let mut data = (header.len() as u32).to_le_bytes().to_vec();
        data.extend_from_slice(header);
        data.extend_from_slice(b"00");
        fs::write(&path, data).unwrap();
        let err = FileVaultStore::new(&path).load().unwrap_err();
        assert_eq!(err, KeyringError::CorruptedVault("invalid magic bytes".into()));
    }

    #[test]
    fn file_store_save_into_missing_dir_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"file, not a dir").unwrap();
        let store = FileVaultStore::new(blocker.join("vault.dat"));
        assert!(matches!(store.save("00"), Err(KeyringError::Persistence(_))));
    }
}

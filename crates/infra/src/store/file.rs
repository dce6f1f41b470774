use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use stockwatch_core::StreamId;
use stockwatch_inventory::Snapshot;

use super::cipher::StateCipher;
use super::r#trait::{SnapshotStore, StoreError};

/// One file per stream under a state directory: `{stream}.json`, or
/// `{stream}.enc` when a cipher is configured.
///
/// Writes go to `{file}.tmp` first and are renamed into place, so the
/// previous state survives a crash mid-write.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    dir: PathBuf,
    cipher: Option<StateCipher>,
}

impl FileSnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cipher: None,
        }
    }

    /// Encrypt state at rest. Plaintext files left from before are ignored.
    pub fn with_cipher(mut self, cipher: StateCipher) -> Self {
        self.cipher = Some(cipher);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn extension(&self) -> &'static str {
        if self.cipher.is_some() { "enc" } else { "json" }
    }

    pub fn path_for(&self, stream: &StreamId) -> PathBuf {
        self.dir.join(format!("{}.{}", stream.as_str(), self.extension()))
    }

    fn io_err(stream: &StreamId, source: io::Error) -> StoreError {
        StoreError::Io {
            stream: stream.clone(),
            source,
        }
    }

    fn corrupt(stream: &StreamId, reason: impl Into<String>) -> StoreError {
        StoreError::Corrupt {
            stream: stream.clone(),
            reason: reason.into(),
        }
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn load(&self, stream: &StreamId) -> Result<Option<Snapshot>, StoreError> {
        let path = self.path_for(stream);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Self::io_err(stream, e)),
        };

        let bytes = match &self.cipher {
            Some(cipher) => cipher
                .open_bytes(&bytes)
                .map_err(|e| Self::corrupt(stream, e.to_string()))?,
            None => bytes,
        };

        let snapshot: Snapshot =
            serde_json::from_slice(&bytes).map_err(|e| Self::corrupt(stream, e.to_string()))?;

        if snapshot.stream() != stream {
            return Err(Self::corrupt(
                stream,
                format!("file holds state for stream '{}'", snapshot.stream()),
            ));
        }

        debug!(stream = %stream, path = %path.display(), items = snapshot.len(), "loaded state");
        Ok(Some(snapshot))
    }

    fn save(&self, stream: &StreamId, snapshot: &Snapshot) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(|e| Self::io_err(stream, e))?;

        let json = serde_json::to_vec_pretty(snapshot).map_err(|e| StoreError::Encode {
            stream: stream.clone(),
            reason: e.to_string(),
        })?;
        let bytes = match &self.cipher {
            Some(cipher) => cipher.seal(&json).into_bytes(),
            None => json,
        };

        let path = self.path_for(stream);
        let tmp = path.with_extension(format!("{}.tmp", self.extension()));
        {
            let mut file = fs::File::create(&tmp).map_err(|e| Self::io_err(stream, e))?;
            file.write_all(&bytes).map_err(|e| Self::io_err(stream, e))?;
            file.sync_all().map_err(|e| Self::io_err(stream, e))?;
        }
        fs::rename(&tmp, &path).map_err(|e| Self::io_err(stream, e))?;

        debug!(stream = %stream, path = %path.display(), items = snapshot.len(), "saved state");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use stockwatch_core::RunId;
    use stockwatch_inventory::{Item, ItemKey, Quantity, Unit};

    use super::*;

    fn temp_store() -> FileSnapshotStore {
        FileSnapshotStore::new(std::env::temp_dir().join(format!("stockwatch-store-{}", RunId::new())))
    }

    fn stream(id: &str) -> StreamId {
        StreamId::new(id).unwrap()
    }

    fn snapshot(id: &str) -> Snapshot {
        Snapshot::new(
            stream(id),
            Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap(),
            vec![
                Item::new(ItemKey::new("Wings").unwrap(), Quantity::new(1240.0).unwrap()),
                Item::new(ItemKey::new("Gizzard").unwrap(), Quantity::new(12.5).unwrap())
                    .with_unit(Unit::Kilograms)
                    .with_attribute("grade", "A"),
            ],
        )
        .unwrap()
    }

    #[test]
    fn missing_file_is_cold_start() {
        let store = temp_store();
        assert!(store.load(&stream("stock")).unwrap().is_none());
    }

    #[test]
    fn save_then_load_returns_same_snapshot() {
        let store = temp_store();
        let snap = snapshot("stock");

        store.save(&stream("stock"), &snap).unwrap();
        let loaded = store.load(&stream("stock")).unwrap().unwrap();

        assert_eq!(loaded, snap);
        assert!(!store.path_for(&stream("stock")).with_extension("json.tmp").exists());
        fs::remove_dir_all(store.dir()).ok();
    }

    #[test]
    fn streams_are_isolated() {
        let store = temp_store();
        store.save(&stream("stock"), &snapshot("stock")).unwrap();

        assert!(store.load(&stream("parts")).unwrap().is_none());
        fs::remove_dir_all(store.dir()).ok();
    }

    #[test]
    fn undecodable_file_is_corrupt() {
        let store = temp_store();
        fs::create_dir_all(store.dir()).unwrap();
        fs::write(store.path_for(&stream("stock")), b"\x80\x04pickle").unwrap();

        let err = store.load(&stream("stock")).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
        fs::remove_dir_all(store.dir()).ok();
    }

    #[test]
    fn state_of_another_stream_is_corrupt() {
        let store = temp_store();
        fs::create_dir_all(store.dir()).unwrap();
        let foreign = serde_json::to_vec(&snapshot("parts")).unwrap();
        fs::write(store.path_for(&stream("stock")), foreign).unwrap();

        let err = store.load(&stream("stock")).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
        fs::remove_dir_all(store.dir()).ok();
    }

    fn cipher() -> StateCipher {
        StateCipher::from_key(&StateCipher::generate_key()).unwrap()
    }

    #[test]
    fn encrypted_state_round_trips_and_hides_contents() {
        let store = temp_store().with_cipher(cipher());
        let snap = snapshot("stock");

        store.save(&stream("stock"), &snap).unwrap();

        let path = store.path_for(&stream("stock"));
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("enc"));
        let raw = fs::read_to_string(&path).unwrap();
        assert!(!raw.contains("Gizzard"));
        assert_eq!(store.load(&stream("stock")).unwrap().unwrap(), snap);
        fs::remove_dir_all(store.dir()).ok();
    }

    #[test]
    fn state_sealed_with_another_key_is_corrupt() {
        let dir = std::env::temp_dir().join(format!("stockwatch-store-{}", RunId::new()));
        FileSnapshotStore::new(&dir)
            .with_cipher(cipher())
            .save(&stream("stock"), &snapshot("stock"))
            .unwrap();

        let err = FileSnapshotStore::new(&dir)
            .with_cipher(cipher())
            .load(&stream("stock"))
            .unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { reason, .. } if reason.contains("decrypted")));
        fs::remove_dir_all(dir).ok();
    }
}

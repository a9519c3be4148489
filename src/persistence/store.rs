//! Atomic whole-document JSON store.

use crate::domain::errors::StoreError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One JSON document on disk. `load` returns the default value when the file
/// does not exist yet; `save` rewrites via temp-file-then-rename.
pub struct JsonStore<T> {
    path: PathBuf,
    _doc: PhantomData<T>,
}

impl<T> JsonStore<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            _doc: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Result<T, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| StoreError::Malformed {
                path: self.path.display().to_string(),
                source: e,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
            Err(e) => Err(StoreError::Io {
                path: self.path.display().to_string(),
                source: e,
            }),
        }
    }

    pub async fn save(&self, doc: &T) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.display().to_string(),
            source,
        };

        let bytes = serde_json::to_vec_pretty(doc).map_err(|e| StoreError::Malformed {
            path: self.path.display().to_string(),
            source: e,
        })?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
            }
        }

        // Temp file lives next to the target so the rename stays on one
        // filesystem and is atomic.
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(io_err)?;

        debug!(path = %self.path.display(), bytes = bytes.len(), "document saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
    struct Doc {
        counter: u64,
        names: Vec<String>,
    }

    #[tokio::test]
    async fn load_missing_file_yields_default() {
        let dir = tempfile::tempdir().unwrap();
        let store: JsonStore<Doc> = JsonStore::new(dir.path().join("missing.json"));
        assert_eq!(store.load().await.unwrap(), Doc::default());
    }

    #[tokio::test]
    async fn save_then_load_roundtrips_and_leaves_no_tmp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        let store: JsonStore<Doc> = JsonStore::new(&path);

        let doc = Doc {
            counter: 3,
            names: vec!["a".into(), "b".into()],
        };
        store.save(&doc).await.unwrap();
        assert_eq!(store.load().await.unwrap(), doc);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn malformed_document_is_an_error_not_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        tokio::fs::write(&path, b"{ not json").await.unwrap();
        let store: JsonStore<Doc> = JsonStore::new(&path);
        assert!(matches!(
            store.load().await,
            Err(StoreError::Malformed { .. })
        ));
    }
}

//! File-backed document stores.
//!
//! Each store keeps its whole registry in memory and mirrors it to a single
//! JSON file holding an array of documents. Every mutation runs under the
//! store's async mutex as one unit: the change is applied to a copy of the
//! registry, the copy is written to disk, and only then does it replace the
//! live registry. Two mutations on the same store therefore never interleave,
//! and an older snapshot can never land on disk after a newer one.
//!
//! Writes go to a temporary file in the same directory and are renamed over
//! the durable file, so readers only ever see a complete snapshot.

mod cart;
mod error;
mod product;

use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::instrument;
use uuid::Uuid;

pub use cart::CartStore;
pub use error::StoreError;
pub use product::ProductStore;

use cartwire_core::{Cart, CartId, Product, ProductId};

/// A document that can live in a [`FileStore`].
pub trait Document: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Key type for the registry.
    type Id: Clone + Eq + Hash + Display + Send + Sync;

    /// Name used in log lines (e.g. `"cart"`).
    const KIND: &'static str;

    /// The document's key.
    fn id(&self) -> &Self::Id;
}

impl Document for Cart {
    type Id = CartId;
    const KIND: &'static str = "cart";

    fn id(&self) -> &CartId {
        &self.id
    }
}

impl Document for Product {
    type Id = ProductId;
    const KIND: &'static str = "product";

    fn id(&self) -> &ProductId {
        &self.id
    }
}

/// Result of a successful [`FileStore::initialize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The file parsed and this many documents were loaded.
    Loaded(usize),
    /// The file was empty or whitespace only.
    Empty,
    /// The file does not exist yet.
    Missing,
}

/// In-memory registry: documents in insertion order plus a key index.
#[derive(Clone)]
pub struct Registry<D: Document> {
    docs: Vec<D>,
    index: HashMap<D::Id, usize>,
}

impl<D: Document> Default for Registry<D> {
    fn default() -> Self {
        Self {
            docs: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<D: Document> Registry<D> {
    /// Number of documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    /// Whether the registry holds no documents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Look up a document by key.
    #[must_use]
    pub fn get(&self, id: &D::Id) -> Option<&D> {
        self.index.get(id).and_then(|&pos| self.docs.get(pos))
    }

    /// Mutable lookup by key.
    pub fn get_mut(&mut self, id: &D::Id) -> Option<&mut D> {
        let pos = *self.index.get(id)?;
        self.docs.get_mut(pos)
    }

    /// Insert a document, replacing any existing one with the same key in
    /// place so iteration order is preserved.
    pub fn upsert(&mut self, doc: D) {
        if let Some(&pos) = self.index.get(doc.id()) {
            if let Some(slot) = self.docs.get_mut(pos) {
                *slot = doc;
            }
            return;
        }
        self.index.insert(doc.id().clone(), self.docs.len());
        self.docs.push(doc);
    }

    /// Next id for a new document: sequence `len + 1`, moved forward past any
    /// id already taken by a loaded document.
    pub fn next_id(&self, make: impl Fn(usize) -> D::Id) -> D::Id {
        let mut n = self.len() + 1;
        loop {
            let id = make(n);
            if !self.index.contains_key(&id) {
                return id;
            }
            n += 1;
        }
    }

    /// Documents in iteration order.
    pub fn iter(&self) -> impl Iterator<Item = &D> {
        self.docs.iter()
    }
}

/// Generic JSON-array file store shared by carts and products.
pub struct FileStore<D: Document> {
    path: PathBuf,
    registry: Mutex<Registry<D>>,
    healthy: AtomicBool,
    /// The durable file failed to load and must be moved aside before the
    /// next write replaces it.
    set_aside: AtomicBool,
}

impl<D: Document> FileStore<D> {
    /// Create a store bound to `path`. Nothing is read until
    /// [`FileStore::initialize`] is called.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            registry: Mutex::new(Registry::default()),
            healthy: AtomicBool::new(true),
            set_aside: AtomicBool::new(false),
        }
    }

    /// Path of the durable file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the last load succeeded (or no load has failed yet).
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    /// Read the durable file into the registry.
    ///
    /// Documents are upserted by key, so loading the same file twice yields
    /// the same registry. A missing or blank file loads nothing. On error the
    /// registry is left untouched and the error is logged before being
    /// returned; callers may ignore it and keep serving. The unreadable file is
    /// renamed to `<file>.corrupt-<uuid>` before the next write, so its bytes
    /// are never overwritten.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Read`], [`StoreError::Parse`] or
    /// [`StoreError::NotAnArray`].
    #[instrument(skip(self), fields(kind = D::KIND, path = %self.path.display()))]
    pub async fn initialize(&self) -> Result<LoadOutcome, StoreError> {
        let result = self.load().await;
        match &result {
            Ok(LoadOutcome::Loaded(count)) => {
                tracing::info!(count, "{} store loaded", D::KIND);
            }
            Ok(LoadOutcome::Empty) => tracing::warn!("{} file is empty", D::KIND),
            Ok(LoadOutcome::Missing) => {
                tracing::warn!("{} file not found, starting empty", D::KIND);
            }
            Err(e) => tracing::error!(error = %e, "failed to load {} store", D::KIND),
        }
        self.healthy.store(result.is_ok(), Ordering::Relaxed);
        self.set_aside.store(result.is_err(), Ordering::Relaxed);
        result
    }

    async fn load(&self) -> Result<LoadOutcome, StoreError> {
        let data = match tokio::fs::read_to_string(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(LoadOutcome::Missing);
            }
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        if data.trim().is_empty() {
            return Ok(LoadOutcome::Empty);
        }

        let parse_err = |source| StoreError::Parse {
            path: self.path.clone(),
            source,
        };
        let value: serde_json::Value = serde_json::from_str(&data).map_err(parse_err)?;
        if !value.is_array() {
            return Err(StoreError::NotAnArray {
                path: self.path.clone(),
            });
        }
        let docs: Vec<D> = serde_json::from_value(value).map_err(parse_err)?;

        let count = docs.len();
        let mut registry = self.registry.lock().await;
        for doc in docs {
            registry.upsert(doc);
        }
        Ok(LoadOutcome::Loaded(count))
    }

    /// Clone of the document with this key.
    pub async fn get(&self, id: &D::Id) -> Option<D> {
        self.registry.lock().await.get(id).cloned()
    }

    /// Whether a document with this key exists.
    pub async fn contains(&self, id: &D::Id) -> bool {
        self.registry.lock().await.get(id).is_some()
    }

    /// All documents in registry order.
    pub async fn list(&self) -> Vec<D> {
        self.registry.lock().await.iter().cloned().collect()
    }

    /// Number of documents.
    pub async fn len(&self) -> usize {
        self.registry.lock().await.len()
    }

    /// Whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.registry.lock().await.is_empty()
    }

    /// Write the whole registry to the durable file.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Serialize`] or [`StoreError::Persist`]; the error
    /// is also logged.
    #[instrument(skip(self), fields(kind = D::KIND, path = %self.path.display()))]
    pub async fn flush(&self) -> Result<(), StoreError> {
        let registry = self.registry.lock().await;
        self.write_snapshot(&registry).await
    }

    /// Apply `f` to a copy of the registry, persist the copy, then commit it.
    ///
    /// The store lock is held for the whole call, so mutations are serialized.
    /// If `f` or the write fails, the live registry is unchanged.
    ///
    /// # Errors
    ///
    /// Returns whatever `f` returns, or the persist error.
    pub async fn mutate<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Registry<D>) -> Result<T, StoreError>,
    {
        let mut registry = self.registry.lock().await;
        let mut next = registry.clone();
        let out = f(&mut next)?;
        self.write_snapshot(&next).await?;
        *registry = next;
        Ok(out)
    }

    async fn write_snapshot(&self, registry: &Registry<D>) -> Result<(), StoreError> {
        let docs: Vec<&D> = registry.iter().collect();
        let content = serde_json::to_string_pretty(&docs).map_err(StoreError::Serialize)?;

        if self.set_aside.load(Ordering::Relaxed) {
            self.set_aside_unreadable().await?;
        }

        if let Err(source) = write_atomic(&self.path, content.as_bytes()).await {
            tracing::error!(
                error = %source,
                path = %self.path.display(),
                "failed to persist {} store",
                D::KIND
            );
            return Err(StoreError::Persist {
                path: self.path.clone(),
                source,
            });
        }

        tracing::debug!(count = registry.len(), "{} store flushed", D::KIND);
        Ok(())
    }

    /// Move a durable file that failed to load out of the way.
    ///
    /// Called with the registry lock held. A file that has since disappeared
    /// needs no preserving.
    async fn set_aside_unreadable(&self) -> Result<(), StoreError> {
        let file_name = self
            .path
            .file_name()
            .map_or_else(|| "store".into(), |n| n.to_string_lossy());
        let target = self
            .path
            .with_file_name(format!("{file_name}.corrupt-{}", Uuid::new_v4()));

        match tokio::fs::rename(&self.path, &target).await {
            Ok(()) => {
                tracing::warn!(
                    path = %self.path.display(),
                    moved_to = %target.display(),
                    "unreadable {} file moved aside before first write",
                    D::KIND
                );
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => {
                tracing::error!(
                    error = %source,
                    path = %self.path.display(),
                    "refusing to overwrite unreadable {} file",
                    D::KIND
                );
                return Err(StoreError::Persist {
                    path: self.path.clone(),
                    source,
                });
            }
        }

        self.set_aside.store(false, Ordering::Relaxed);
        Ok(())
    }
}

/// Write `content` to a temp file beside `path`, sync it, and rename it over
/// `path`.
async fn write_atomic(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    tokio::fs::create_dir_all(&dir).await?;

    let file_name = path
        .file_name()
        .map_or_else(|| "store".into(), |n| n.to_string_lossy());
    let tmp_path = dir.join(format!(".{file_name}-{}.tmp", Uuid::new_v4()));

    let result = async {
        let mut file = tokio::fs::File::create(&tmp_path).await?;
        file.write_all(content).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&tmp_path, path).await
    }
    .await;

    if result.is_err() {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return result;
    }

    // The snapshot is in place; a failed directory sync only weakens durability
    #[cfg(unix)]
    if let Err(e) = sync_dir(&dir).await {
        tracing::warn!(error = %e, dir = %dir.display(), "failed to sync store directory");
    }
    result
}

/// Flush the directory entry so the rename survives a crash.
#[cfg(unix)]
async fn sync_dir(dir: &Path) -> std::io::Result<()> {
    tokio::fs::File::open(dir).await?.sync_all().await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use cartwire_core::CartLine;
    use tempfile::TempDir;

    fn cart(id: &str, lines: &[(&str, u32)]) -> Cart {
        Cart {
            id: CartId::from(id),
            products: lines
                .iter()
                .map(|(pid, quantity)| CartLine {
                    product_id: ProductId::from(*pid),
                    quantity: *quantity,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let store: FileStore<Cart> = FileStore::new(dir.path().join("carts.json"));

        assert_eq!(store.initialize().await.unwrap(), LoadOutcome::Missing);
        assert!(store.is_empty().await);
        assert!(store.is_healthy());
    }

    #[tokio::test]
    async fn test_whitespace_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("carts.json");
        std::fs::write(&path, "  \n\t ").unwrap();
        let store: FileStore<Cart> = FileStore::new(&path);

        assert_eq!(store.initialize().await.unwrap(), LoadOutcome::Empty);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_object_root_is_load_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("carts.json");
        std::fs::write(&path, r#"{"id":"c1","products":[]}"#).unwrap();
        let store: FileStore<Cart> = FileStore::new(&path);

        let err = store.initialize().await.unwrap_err();
        assert!(matches!(err, StoreError::NotAnArray { .. }));
        assert!(store.is_empty().await);
        assert!(!store.is_healthy());
    }

    #[tokio::test]
    async fn test_invalid_json_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("carts.json");
        std::fs::write(&path, "[{\"id\":").unwrap();
        let store: FileStore<Cart> = FileStore::new(&path);

        let err = store.initialize().await.unwrap_err();
        assert!(matches!(err, StoreError::Parse { .. }));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_bad_document_loads_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("carts.json");
        std::fs::write(&path, r#"[{"id":"c1","products":[]},{"products":[]}]"#).unwrap();
        let store: FileStore<Cart> = FileStore::new(&path);

        assert!(store.initialize().await.is_err());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_flush_then_reload_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("carts.json");
        let store: FileStore<Cart> = FileStore::new(&path);
        store
            .mutate(|reg| {
                reg.upsert(cart("c1", &[("p1", 2)]));
                reg.upsert(cart("c2", &[]));
                reg.upsert(cart("c3", &[("p2", 1), ("p1", 5)]));
                Ok(())
            })
            .await
            .unwrap();
        store.flush().await.unwrap();

        let reloaded: FileStore<Cart> = FileStore::new(&path);
        assert_eq!(reloaded.initialize().await.unwrap(), LoadOutcome::Loaded(3));
        assert_eq!(reloaded.list().await, store.list().await);
    }

    #[tokio::test]
    async fn test_initialize_twice_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("carts.json");
        std::fs::write(
            &path,
            r#"[{"id":"c1","products":[{"productId":"p1","quantity":2}]},{"id":"c2","products":[]}]"#,
        )
        .unwrap();
        let store: FileStore<Cart> = FileStore::new(&path);

        store.initialize().await.unwrap();
        let first = store.list().await;
        store.initialize().await.unwrap();
        assert_eq!(store.list().await, first);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_duplicate_ids_keep_first_position() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("carts.json");
        std::fs::write(
            &path,
            r#"[{"id":"c1","products":[]},{"id":"c2","products":[]},{"id":"c1","products":[{"productId":"p1","quantity":1}]}]"#,
        )
        .unwrap();
        let store: FileStore<Cart> = FileStore::new(&path);
        store.initialize().await.unwrap();

        let carts = store.list().await;
        assert_eq!(carts.len(), 2);
        assert_eq!(carts[0].id.as_str(), "c1");
        assert_eq!(carts[0].products.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_mutation_leaves_registry_unchanged() {
        let dir = TempDir::new().unwrap();
        let store: FileStore<Cart> = FileStore::new(dir.path().join("carts.json"));

        let err = store
            .mutate(|reg| {
                reg.upsert(cart("c1", &[]));
                Err::<(), _>(StoreError::CartNotFound(CartId::from("c9")))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::CartNotFound(_)));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_failed_persist_leaves_registry_unchanged() {
        let dir = TempDir::new().unwrap();
        // A directory where the file should be makes the rename fail.
        let path = dir.path().join("carts.json");
        std::fs::create_dir(&path).unwrap();
        let store: FileStore<Cart> = FileStore::new(&path);

        let err = store
            .mutate(|reg| {
                reg.upsert(cart("c1", &[]));
                Ok(())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Persist { .. }));
        assert!(store.is_empty().await);

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_file_is_moved_aside_not_overwritten() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("carts.json");
        let original = r#"[{"id":"c1","products":[{"productId":"p1","quantity":3}]},{"id":"c2","#;
        std::fs::write(&path, original).unwrap();
        let store: FileStore<Cart> = FileStore::new(&path);
        store.initialize().await.unwrap_err();

        store
            .mutate(|reg| {
                reg.upsert(cart("c1", &[]));
                Ok(())
            })
            .await
            .unwrap();

        let preserved: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().starts_with("carts.json.corrupt-"))
            .collect();
        assert_eq!(preserved.len(), 1);
        assert_eq!(std::fs::read_to_string(preserved[0].path()).unwrap(), original);

        // Only the first write moves the file aside
        store.flush().await.unwrap();
        let count = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_snapshot_is_pretty_json_array() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("carts.json");
        let store: FileStore<Cart> = FileStore::new(&path);
        store
            .mutate(|reg| {
                reg.upsert(cart("c1", &[("p1", 2)]));
                Ok(())
            })
            .await
            .unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            value,
            serde_json::json!([{ "id": "c1", "products": [{ "productId": "p1", "quantity": 2 }] }])
        );
        assert!(raw.contains('\n'));
    }
}

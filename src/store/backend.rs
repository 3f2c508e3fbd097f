use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Mutex;

use crate::{error::AppResult, models::FilmCatalog};

/// Whole-document persistence for the film catalog
///
/// Reads and writes always cover every user at once; there are no partial
/// updates. Callers serialize access through the store actor.
#[async_trait::async_trait]
pub trait StoreBackend: Send + Sync {
    /// Loads the catalog, empty when nothing has been saved yet
    async fn load(&self) -> AppResult<FilmCatalog>;

    /// Replaces the stored catalog
    async fn save(&self, catalog: &FilmCatalog) -> AppResult<()>;
}

/// Catalog stored as one pretty-printed JSON document on disk
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl StoreBackend for JsonFileBackend {
    async fn load(&self) -> AppResult<FilmCatalog> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(FilmCatalog::new());
            }
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(FilmCatalog::new());
        }

        Ok(serde_json::from_str(&content)?)
    }

    async fn save(&self, catalog: &FilmCatalog) -> AppResult<()> {
        let json = serde_json::to_string_pretty(catalog)?;

        // Write-then-rename so a crash mid-write never truncates the catalog
        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, json).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;

        tracing::debug!(path = %self.path.display(), users = catalog.len(), "Film catalog saved");
        Ok(())
    }
}

/// In-memory catalog, used by tests and local runs
#[derive(Default)]
pub struct MemoryBackend {
    catalog: Mutex<FilmCatalog>,
    saves: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog(catalog: FilmCatalog) -> Self {
        Self {
            catalog: Mutex::new(catalog),
            saves: AtomicUsize::new(0),
        }
    }

    /// Number of completed `save` calls
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl StoreBackend for MemoryBackend {
    async fn load(&self) -> AppResult<FilmCatalog> {
        Ok(self.catalog.lock().await.clone())
    }

    async fn save(&self, catalog: &FilmCatalog) -> AppResult<()> {
        *self.catalog.lock().await = catalog.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

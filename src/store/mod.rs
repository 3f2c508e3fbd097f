use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::{AppError, AppResult};
use crate::models::{FilmCatalog, FilmId, FilmRecord, UserId};

pub mod backend;

pub use backend::{JsonFileBackend, MemoryBackend, StoreBackend};

/// Result of adding a film to a user's list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    /// A record with the same id already exists; nothing was written
    Duplicate,
}

/// Requests handled by the store task
#[derive(Debug)]
enum StoreCommand {
    Films {
        user_id: UserId,
        reply: oneshot::Sender<AppResult<Vec<FilmRecord>>>,
    },
    Add {
        user_id: UserId,
        film: FilmRecord,
        reply: oneshot::Sender<AppResult<AddOutcome>>,
    },
    Remove {
        user_id: UserId,
        film_id: FilmId,
        reply: oneshot::Sender<AppResult<Option<FilmRecord>>>,
    },
    Catalog {
        reply: oneshot::Sender<AppResult<FilmCatalog>>,
    },
}

/// Handle to the film store task
///
/// All reads and read-modify-write cycles are executed one at a time by a
/// single background task that owns the backend, so concurrent sessions can
/// never interleave a load with another session's save.
#[derive(Clone)]
pub struct FilmStore {
    command_tx: mpsc::UnboundedSender<StoreCommand>,
}

/// Handle for gracefully shutting down the store task
pub struct FilmStoreHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl FilmStoreHandle {
    /// Stops accepting new commands, finishes queued ones and waits for the task
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Film store task failed during shutdown");
        }
        tracing::info!("Film store stopped");
    }
}

impl FilmStore {
    /// Spawns the store task over the given backend
    pub fn spawn(backend: Arc<dyn StoreBackend>) -> (Self, FilmStoreHandle) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let task = tokio::spawn(async move {
            Self::store_task(backend, command_rx, shutdown_rx).await;
        });

        (Self { command_tx }, FilmStoreHandle { shutdown_tx, task })
    }

    /// Background task that applies commands in arrival order
    async fn store_task(
        backend: Arc<dyn StoreBackend>,
        mut command_rx: mpsc::UnboundedReceiver<StoreCommand>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::info!("Film store task started");

        loop {
            tokio::select! {
                Some(command) = command_rx.recv() => {
                    Self::apply(backend.as_ref(), command).await;
                }
                _ = shutdown_rx.recv() => {
                    command_rx.close();
                    let mut drained = 0;
                    while let Some(command) = command_rx.recv().await {
                        Self::apply(backend.as_ref(), command).await;
                        drained += 1;
                    }
                    tracing::info!(drained, "Film store task stopping");
                    break;
                }
            }
        }
    }

    async fn apply(backend: &dyn StoreBackend, command: StoreCommand) {
        match command {
            StoreCommand::Films { user_id, reply } => {
                let result = backend
                    .load()
                    .await
                    .map(|mut catalog| catalog.remove(&user_id).unwrap_or_default());
                let _ = reply.send(result);
            }
            StoreCommand::Add {
                user_id,
                film,
                reply,
            } => {
                let _ = reply.send(Self::add_film(backend, user_id, film).await);
            }
            StoreCommand::Remove {
                user_id,
                film_id,
                reply,
            } => {
                let _ = reply.send(Self::remove_film(backend, user_id, film_id).await);
            }
            StoreCommand::Catalog { reply } => {
                let _ = reply.send(backend.load().await);
            }
        }
    }

    async fn add_film(
        backend: &dyn StoreBackend,
        user_id: UserId,
        film: FilmRecord,
    ) -> AppResult<AddOutcome> {
        let mut catalog = backend.load().await?;
        let films = catalog.entry(user_id.clone()).or_default();

        if films.iter().any(|f| f.id == film.id) {
            return Ok(AddOutcome::Duplicate);
        }

        let film_id = film.id;
        films.push(film);
        backend.save(&catalog).await?;

        tracing::info!(user_id = %user_id, film_id, "Film added");
        Ok(AddOutcome::Added)
    }

    async fn remove_film(
        backend: &dyn StoreBackend,
        user_id: UserId,
        film_id: FilmId,
    ) -> AppResult<Option<FilmRecord>> {
        let mut catalog = backend.load().await?;
        let Some(films) = catalog.get_mut(&user_id) else {
            return Ok(None);
        };
        let Some(index) = films.iter().position(|f| f.id == film_id) else {
            return Ok(None);
        };

        let removed = films.remove(index);
        backend.save(&catalog).await?;

        tracing::info!(user_id = %user_id, film_id, "Film removed");
        Ok(Some(removed))
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<AppResult<T>>) -> StoreCommand,
    ) -> AppResult<T> {
        let (reply, response) = oneshot::channel();
        self.command_tx
            .send(make(reply))
            .map_err(|_| AppError::Internal("Film store is closed".to_string()))?;
        response
            .await
            .map_err(|_| AppError::Internal("Film store dropped the request".to_string()))?
    }

    /// The user's films in watch-log order
    pub async fn films(&self, user_id: &str) -> AppResult<Vec<FilmRecord>> {
        let user_id = user_id.to_string();
        self.request(|reply| StoreCommand::Films { user_id, reply })
            .await
    }

    /// Appends a film unless one with the same id is already saved
    pub async fn add(&self, user_id: &str, film: FilmRecord) -> AppResult<AddOutcome> {
        let user_id = user_id.to_string();
        self.request(|reply| StoreCommand::Add {
            user_id,
            film,
            reply,
        })
        .await
    }

    /// Removes the film with the given id, keeping the order of the rest
    pub async fn remove(&self, user_id: &str, film_id: FilmId) -> AppResult<Option<FilmRecord>> {
        let user_id = user_id.to_string();
        self.request(|reply| StoreCommand::Remove {
            user_id,
            film_id,
            reply,
        })
        .await
    }

    /// Snapshot of every user's films
    pub async fn catalog(&self) -> AppResult<FilmCatalog> {
        self.request(|reply| StoreCommand::Catalog { reply }).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    fn film(id: FilmId, title: &str) -> FilmRecord {
        FilmRecord {
            id,
            title: title.to_string(),
            genres: vec![],
        }
    }

    fn spawn_memory_store() -> (FilmStore, FilmStoreHandle, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        let (store, handle) = FilmStore::spawn(backend.clone());
        (store, handle, backend)
    }

    #[tokio::test]
    async fn test_unknown_user_has_no_films() {
        let (store, _handle, _) = spawn_memory_store();
        assert!(store.films("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_keeps_insertion_order() {
        let (store, _handle, _) = spawn_memory_store();
        store.add("1", film(10, "A")).await.unwrap();
        store.add("1", film(20, "B")).await.unwrap();
        store.add("1", film(5, "C")).await.unwrap();

        let ids: Vec<FilmId> = store.films("1").await.unwrap().iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![10, 20, 5]);
    }

    #[tokio::test]
    async fn test_duplicate_add_does_not_write() {
        let (store, _handle, backend) = spawn_memory_store();
        assert_eq!(store.add("1", film(10, "A")).await.unwrap(), AddOutcome::Added);
        assert_eq!(
            store.add("1", film(10, "A again")).await.unwrap(),
            AddOutcome::Duplicate
        );

        assert_eq!(backend.save_count(), 1);
        assert_eq!(store.films("1").await.unwrap(), vec![film(10, "A")]);
    }

    #[tokio::test]
    async fn test_users_are_independent() {
        let (store, _handle, _) = spawn_memory_store();
        store.add("1", film(10, "A")).await.unwrap();
        store.add("2", film(10, "A")).await.unwrap();

        let catalog = store.catalog().await.unwrap();
        assert_eq!(catalog.len(), 2);
    }

    #[tokio::test]
    async fn test_remove_preserves_order() {
        let (store, _handle, _) = spawn_memory_store();
        for (id, title) in [(1, "A"), (2, "B"), (3, "C")] {
            store.add("1", film(id, title)).await.unwrap();
        }

        let removed = store.remove("1", 2).await.unwrap();
        assert_eq!(removed, Some(film(2, "B")));
        assert_eq!(store.films("1").await.unwrap(), vec![film(1, "A"), film(3, "C")]);
    }

    #[tokio::test]
    async fn test_remove_missing_film_does_not_write() {
        let (store, _handle, backend) = spawn_memory_store();
        store.add("1", film(1, "A")).await.unwrap();

        assert_eq!(store.remove("1", 99).await.unwrap(), None);
        assert_eq!(store.remove("2", 1).await.unwrap(), None);
        assert_eq!(backend.save_count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_adds_from_many_users_are_not_lost() {
        let (store, _handle, _) = spawn_memory_store();

        let tasks: Vec<_> = (0..30u64)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.add(&format!("user-{}", i % 3), film(i, "F")).await })
            })
            .collect();
        for task in tasks {
            assert_ok!(task.await.unwrap());
        }

        let catalog = store.catalog().await.unwrap();
        let total: usize = catalog.values().map(Vec::len).sum();
        assert_eq!(total, 30);
    }

    #[tokio::test]
    async fn test_shutdown_flushes_queued_commands() {
        let (store, handle, backend) = spawn_memory_store();

        let (reply, response) = oneshot::channel();
        store
            .command_tx
            .send(StoreCommand::Add {
                user_id: "1".to_string(),
                film: film(7, "Queued"),
                reply,
            })
            .unwrap();
        handle.shutdown().await;

        assert_eq!(response.await.unwrap().unwrap(), AddOutcome::Added);
        assert_eq!(backend.save_count(), 1);
        assert_err!(store.films("1").await);
    }
}

use std::sync::Arc;

use crate::{
    config::Config,
    error::AppResult,
    models::FilmId,
    services::{
        metadata::{MetadataProvider, TmdbClient},
        rate_limiter::RateLimiter,
    },
    store::{FilmStore, FilmStoreHandle, JsonFileBackend},
};

/// Process-wide services shared by every conversation
///
/// Built once by [`AppContext::open`] and passed by value (it is cheap to
/// clone) to the bot; torn down through the returned [`ContextHandle`].
#[derive(Clone)]
pub struct AppContext {
    pub metadata: Arc<dyn MetadataProvider>,
    pub store: FilmStore,
    site_url: String,
    support_contact: Option<String>,
}

/// Owns the background tasks started by [`AppContext::open`]
pub struct ContextHandle {
    store: FilmStoreHandle,
}

impl ContextHandle {
    /// Flushes pending store writes and stops background tasks
    pub async fn close(self) {
        self.store.shutdown().await;
        tracing::info!("Application context closed");
    }
}

impl AppContext {
    /// Wires the rate limiter, TMDB client and JSON film store from config
    pub fn open(config: &Config) -> AppResult<(Self, ContextHandle)> {
        let rate_limiter = Arc::new(RateLimiter::new(
            config.rate_limit_max_requests,
            config.rate_limit_window(),
        ));
        let metadata = Arc::new(TmdbClient::new(config, rate_limiter)?);
        let backend = Arc::new(JsonFileBackend::new(config.data_file.clone()));

        tracing::info!(
            data_file = %backend.path().display(),
            max_requests = config.rate_limit_max_requests,
            window_ms = config.rate_limit_window_ms,
            "Application context opened"
        );

        let (store, store_handle) = FilmStore::spawn(backend);
        let mut context = Self::new(metadata, store, &config.tmdb_site_url);
        if let Some(contact) = &config.support_contact {
            context = context.with_support_contact(contact);
        }
        Ok((
            context,
            ContextHandle {
                store: store_handle,
            },
        ))
    }

    /// Builds a context from already constructed parts
    pub fn new(metadata: Arc<dyn MetadataProvider>, store: FilmStore, site_url: &str) -> Self {
        Self {
            metadata,
            store,
            site_url: site_url.trim_end_matches('/').to_string(),
            support_contact: None,
        }
    }

    pub fn with_support_contact(mut self, contact: &str) -> Self {
        self.support_contact = Some(contact.to_string());
        self
    }

    pub fn support_contact(&self) -> Option<&str> {
        self.support_contact.as_deref()
    }

    /// Public TMDB page of a film
    pub fn film_url(&self, film_id: FilmId) -> String {
        format!("{}/movie/{}", self.site_url, film_id)
    }
}

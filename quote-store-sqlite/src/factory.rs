use std::sync::Arc;

use async_trait::async_trait;
use quote_core::api::{Backend, BackendConfig, BackendFactory};
use quote_core::ApiError;
use sqlx::sqlite::SqlitePoolOptions;
use tracing::info;

use crate::draft_store::SqliteDraftStore;
use crate::repository::SqliteRepository;

/// Map a connection string from configuration to a sqlx URL.
///
/// * `":memory:"` becomes `sqlite::memory:`.
/// * Values that already start with `sqlite:` are passed through.
/// * Anything else is treated as a file path, created if missing.
fn database_url(connection_string: &str) -> String {
    let trimmed = connection_string.trim();
    if trimmed == ":memory:" {
        "sqlite::memory:".to_string()
    } else if trimmed.starts_with("sqlite:") {
        trimmed.to_string()
    } else {
        format!("sqlite:{}?mode=rwc", trimmed)
    }
}

/// [`BackendFactory`] for SQLite.
///
/// Register this with a [`quote_core::api::BackendRegistry`] to make the
/// `"sqlite"` backend available:
///
/// ```rust,no_run
/// use quote_core::api::BackendRegistry;
/// use quote_store_sqlite::SqliteBackendFactory;
///
/// let mut registry = BackendRegistry::new();
/// registry.register(Box::new(SqliteBackendFactory));
/// ```
pub struct SqliteBackendFactory;

#[async_trait]
impl BackendFactory for SqliteBackendFactory {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    /// Open the database described by `config.connection_string` and run
    /// migrations. The quote API and the draft store share one pool.
    async fn create(
        &self,
        config: &BackendConfig,
    ) -> Result<Backend, ApiError> {
        let url = database_url(&config.connection_string);

        // Every connection to `sqlite::memory:` is a separate database, so the
        // pool must hold exactly one connection and never recycle it.
        let in_memory = url.starts_with("sqlite::memory:");
        let options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(4)
        };

        let pool = options
            .connect(&url)
            .await
            .map_err(|e| ApiError::Connection(format!("{}: {}", url, e)))?;

        let repo = SqliteRepository::new_with_pool(pool.clone()).await;
        repo.run_migrations()
            .await
            .map_err(|e| ApiError::Database(format!("{:#}", e)))?;

        info!(%url, "sqlite backend ready");
        Ok(Backend {
            api: Arc::new(repo),
            drafts: Arc::new(SqliteDraftStore::new(pool)),
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use quote_core::models::NewService;

    use super::*;

    #[test]
    fn backend_name_is_sqlite() {
        assert_eq!(SqliteBackendFactory.backend_name(), "sqlite");
    }

    #[test]
    fn database_url_mapping() {
        assert_eq!(database_url(":memory:"), "sqlite::memory:");
        assert_eq!(database_url("quotes.db"), "sqlite:quotes.db?mode=rwc");
        assert_eq!(database_url("sqlite:other.db"), "sqlite:other.db");
    }

    #[tokio::test]
    async fn api_and_drafts_share_the_database() {
        let config = BackendConfig {
            backend: "sqlite".to_string(),
            connection_string: ":memory:".to_string(),
        };

        let backend = SqliteBackendFactory
            .create(&config)
            .await
            .expect("failed to create in-memory backend");

        backend
            .api
            .create_service(NewService {
                slug: "signage".to_string(),
                name: "Signage".to_string(),
                description: None,
            })
            .await
            .unwrap();
        backend.drafts.set("k", "v").await.unwrap();

        assert_eq!(backend.api.list_services().await.unwrap().len(), 1);
        assert_eq!(backend.drafts.get("k").await.unwrap(), Some("v".to_string()));
    }

    #[tokio::test]
    async fn unreachable_file_is_a_connection_error() {
        let config = BackendConfig {
            backend: "sqlite".to_string(),
            connection_string: "/nonexistent-dir/quotes.db".to_string(),
        };

        let result = SqliteBackendFactory.create(&config).await;

        assert!(matches!(result, Err(ApiError::Connection(_))));
    }
}

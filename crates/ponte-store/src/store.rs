//! SQLite-backed persistent store.
//!
//! Two tables: `contacts(address PRIMARY KEY, name)` and
//! `admins(telegram_id PRIMARY KEY)`. The contact directory is owned here;
//! the admin table is only a durable mirror behind [`crate::AdminRegistry`].

use ponte_core::{config::shellexpand, config::StoreConfig, error::PonteError};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::info;

/// A stored WhatsApp contact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub address: String,
    pub name: String,
}

/// Persistent store backed by SQLite.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open the store, running migrations on first use.
    pub async fn new(config: &StoreConfig) -> Result<Self, PonteError> {
        let db_path = shellexpand(&config.db_path);

        // Ensure parent directory exists.
        if let Some(parent) = std::path::Path::new(&db_path).parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| PonteError::Store(format!("failed to create data dir: {e}")))?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{db_path}"))
            .map_err(|e| PonteError::Store(format!("invalid db path: {e}")))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(opts)
            .await
            .map_err(|e| PonteError::Store(format!("failed to connect to sqlite: {e}")))?;

        Self::run_migrations(&pool).await?;

        info!("Store initialized at {db_path}");

        Ok(Self { pool })
    }

    /// Close the underlying pool. Part of the shutdown/restart sequence.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Run SQL migrations, tracking which have already been applied.
    async fn run_migrations(pool: &SqlitePool) -> Result<(), PonteError> {
        sqlx::raw_sql(
            "CREATE TABLE IF NOT EXISTS _migrations (
                name TEXT PRIMARY KEY,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            );",
        )
        .execute(pool)
        .await
        .map_err(|e| PonteError::Store(format!("failed to create migrations table: {e}")))?;

        let migrations: &[(&str, &str)] =
            &[("001_init", include_str!("../migrations/001_init.sql"))];

        for (name, sql) in migrations {
            let applied: Option<(String,)> =
                sqlx::query_as("SELECT name FROM _migrations WHERE name = ?")
                    .bind(name)
                    .fetch_optional(pool)
                    .await
                    .map_err(|e| {
                        PonteError::Store(format!("failed to check migration {name}: {e}"))
                    })?;

            if applied.is_some() {
                continue;
            }

            sqlx::raw_sql(sql)
                .execute(pool)
                .await
                .map_err(|e| PonteError::Store(format!("migration {name} failed: {e}")))?;

            sqlx::query("INSERT INTO _migrations (name) VALUES (?)")
                .bind(name)
                .execute(pool)
                .await
                .map_err(|e| {
                    PonteError::Store(format!("failed to record migration {name}: {e}"))
                })?;
        }
        Ok(())
    }

    // --- Contacts ---

    /// Look up the stored display name for an address.
    pub async fn contact_name(&self, address: &str) -> Result<Option<String>, PonteError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT name FROM contacts WHERE address = ?")
                .bind(address)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| PonteError::Store(format!("contact lookup failed: {e}")))?;

        Ok(row.map(|(n,)| n))
    }

    /// Insert or overwrite a contact.
    pub async fn upsert_contact(&self, address: &str, name: &str) -> Result<(), PonteError> {
        sqlx::query("INSERT OR REPLACE INTO contacts (address, name) VALUES (?, ?)")
            .bind(address)
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(|e| PonteError::Store(format!("contact upsert failed: {e}")))?;

        Ok(())
    }

    /// All stored contacts, ordered by display name.
    pub async fn all_contacts(&self) -> Result<Vec<Contact>, PonteError> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT address, name FROM contacts ORDER BY name")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| PonteError::Store(format!("contact list failed: {e}")))?;

        Ok(rows
            .into_iter()
            .map(|(address, name)| Contact { address, name })
            .collect())
    }

    // --- Admin mirror ---

    /// All persisted admin ids.
    pub async fn admin_ids(&self) -> Result<Vec<String>, PonteError> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT telegram_id FROM admins")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| PonteError::Store(format!("admin list failed: {e}")))?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Persist an admin id.
    pub async fn insert_admin(&self, telegram_id: &str) -> Result<(), PonteError> {
        sqlx::query("INSERT OR REPLACE INTO admins (telegram_id) VALUES (?)")
            .bind(telegram_id)
            .execute(&self.pool)
            .await
            .map_err(|e| PonteError::Store(format!("admin insert failed: {e}")))?;

        Ok(())
    }

    /// Remove a persisted admin id.
    pub async fn delete_admin(&self, telegram_id: &str) -> Result<(), PonteError> {
        sqlx::query("DELETE FROM admins WHERE telegram_id = ?")
            .bind(telegram_id)
            .execute(&self.pool)
            .await
            .map_err(|e| PonteError::Store(format!("admin delete failed: {e}")))?;

        Ok(())
    }
}

#[cfg(test)]
pub(crate) async fn test_store() -> Store {
    let opts = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(opts)
        .await
        .unwrap();
    Store::run_migrations(&pool).await.unwrap();
    Store { pool }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_contact_lookup_missing() {
        let store = test_store().await;
        assert_eq!(store.contact_name("6281234567").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_contact_upsert_and_lookup() {
        let store = test_store().await;
        store.upsert_contact("6281234567", "Alice").await.unwrap();
        assert_eq!(
            store.contact_name("6281234567").await.unwrap().as_deref(),
            Some("Alice")
        );
    }

    #[tokio::test]
    async fn test_contact_upsert_overwrites() {
        let store = test_store().await;
        store.upsert_contact("6281234567", "Alice").await.unwrap();
        store
            .upsert_contact("6281234567", "Alice Baker")
            .await
            .unwrap();
        assert_eq!(
            store.contact_name("6281234567").await.unwrap().as_deref(),
            Some("Alice Baker")
        );

        // Still exactly one row.
        let contacts = store.all_contacts().await.unwrap();
        assert_eq!(contacts.len(), 1);
    }

    #[tokio::test]
    async fn test_all_contacts_ordered_by_name() {
        let store = test_store().await;
        store.upsert_contact("111", "Charlie").await.unwrap();
        store.upsert_contact("222", "Alice").await.unwrap();
        store.upsert_contact("333", "Bob").await.unwrap();

        let names: Vec<String> = store
            .all_contacts()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Alice", "Bob", "Charlie"]);
    }

    #[tokio::test]
    async fn test_admin_insert_and_delete() {
        let store = test_store().await;
        store.insert_admin("42").await.unwrap();
        store.insert_admin("43").await.unwrap();
        // Duplicate insert is idempotent.
        store.insert_admin("42").await.unwrap();

        let mut ids = store.admin_ids().await.unwrap();
        ids.sort();
        assert_eq!(ids, vec!["42", "43"]);

        store.delete_admin("42").await.unwrap();
        assert_eq!(store.admin_ids().await.unwrap(), vec!["43"]);
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let store = test_store().await;
        // Re-running against an initialized pool must be a no-op.
        Store::run_migrations(&store.pool).await.unwrap();
        store.upsert_contact("1", "One").await.unwrap();
        Store::run_migrations(&store.pool).await.unwrap();
        assert_eq!(store.all_contacts().await.unwrap().len(), 1);
    }
}

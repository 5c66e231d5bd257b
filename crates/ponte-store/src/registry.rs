//! Admin allow-list with a durable SQLite mirror.
//!
//! The in-memory set is the authoritative runtime view. Mutations persist
//! first and update the set second; if the process dies between the two
//! steps, the set is rebuilt from the store (plus the immutable super-admin)
//! on the next startup, so the inconsistency heals itself.

use crate::Store;
use ponte_core::error::PonteError;
use std::collections::HashSet;
use tokio::sync::Mutex;

/// Registry of Telegram user ids allowed to drive the bridge.
///
/// One id is the super-admin: always present, never removable, and the only
/// identity allowed to mutate the registry itself.
pub struct AdminRegistry {
    store: Store,
    super_admin: String,
    admins: Mutex<HashSet<String>>,
}

impl AdminRegistry {
    /// Rebuild the registry from the persistent mirror.
    pub async fn load(store: Store, super_admin: &str) -> Result<Self, PonteError> {
        let mut admins: HashSet<String> = store.admin_ids().await?.into_iter().collect();
        admins.insert(super_admin.to_string());

        Ok(Self {
            store,
            super_admin: super_admin.to_string(),
            admins: Mutex::new(admins),
        })
    }

    pub fn super_admin(&self) -> &str {
        &self.super_admin
    }

    pub fn is_super_admin(&self, telegram_id: &str) -> bool {
        telegram_id == self.super_admin
    }

    pub async fn is_admin(&self, telegram_id: &str) -> bool {
        self.admins.lock().await.contains(telegram_id)
    }

    /// Add an admin: persist first, then update the in-memory set.
    pub async fn add(&self, telegram_id: &str) -> Result<(), PonteError> {
        self.store.insert_admin(telegram_id).await?;
        self.admins.lock().await.insert(telegram_id.to_string());
        Ok(())
    }

    /// Remove an admin. Removing the super-admin is always rejected and
    /// mutates nothing.
    pub async fn remove(&self, telegram_id: &str) -> Result<(), PonteError> {
        if telegram_id == self.super_admin {
            return Err(PonteError::Validation(
                "Cannot remove the super admin".to_string(),
            ));
        }

        self.store.delete_admin(telegram_id).await?;
        self.admins.lock().await.remove(telegram_id);
        Ok(())
    }

    /// All admin ids, super-admin first, the rest sorted.
    pub async fn list(&self) -> Vec<String> {
        let admins = self.admins.lock().await;
        let mut rest: Vec<String> = admins
            .iter()
            .filter(|id| **id != self.super_admin)
            .cloned()
            .collect();
        rest.sort();

        let mut out = Vec::with_capacity(rest.len() + 1);
        out.push(self.super_admin.clone());
        out.extend(rest);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_store;

    #[tokio::test]
    async fn test_super_admin_always_present() {
        let store = test_store().await;
        let registry = AdminRegistry::load(store, "100").await.unwrap();

        assert!(registry.is_admin("100").await);
        assert!(registry.is_super_admin("100"));
        assert_eq!(registry.list().await, vec!["100"]);
    }

    #[tokio::test]
    async fn test_load_rebuilds_from_store() {
        let store = test_store().await;
        store.insert_admin("200").await.unwrap();
        store.insert_admin("300").await.unwrap();

        let registry = AdminRegistry::load(store, "100").await.unwrap();
        assert!(registry.is_admin("200").await);
        assert!(registry.is_admin("300").await);
        assert!(!registry.is_admin("999").await);
        assert_eq!(registry.list().await, vec!["100", "200", "300"]);
    }

    #[tokio::test]
    async fn test_add_persists_and_updates_set() {
        let store = test_store().await;
        let registry = AdminRegistry::load(store.clone(), "100").await.unwrap();

        registry.add("200").await.unwrap();
        assert!(registry.is_admin("200").await);
        assert!(!registry.is_super_admin("200"));

        // The mirror carries the new admin too.
        assert!(store.admin_ids().await.unwrap().contains(&"200".to_string()));
    }

    #[tokio::test]
    async fn test_remove_admin() {
        let store = test_store().await;
        store.insert_admin("200").await.unwrap();
        let registry = AdminRegistry::load(store.clone(), "100").await.unwrap();

        registry.remove("200").await.unwrap();
        assert!(!registry.is_admin("200").await);
        assert!(store.admin_ids().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_super_admin_rejected() {
        let store = test_store().await;
        store.insert_admin("100").await.unwrap();
        let registry = AdminRegistry::load(store.clone(), "100").await.unwrap();

        let err = registry.remove("100").await.unwrap_err();
        assert!(err.to_string().contains("super admin"));

        // No mutation, in memory or on disk.
        assert!(registry.is_admin("100").await);
        assert_eq!(store.admin_ids().await.unwrap(), vec!["100"]);
    }

    #[tokio::test]
    async fn test_list_orders_super_admin_first() {
        let store = test_store().await;
        let registry = AdminRegistry::load(store, "500").await.unwrap();
        registry.add("300").await.unwrap();
        registry.add("100").await.unwrap();

        assert_eq!(registry.list().await, vec!["500", "100", "300"]);
    }
}

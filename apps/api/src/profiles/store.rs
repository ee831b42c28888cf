//! Profile Store: one JSON document per identity in the `profiles` table.
//!
//! Writes are create-or-merge so that a repeated bootstrap for the same
//! identity converges on a single document (see `Profile::merged_with`).

use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use thiserror::Error;
use tracing::debug;

use crate::identity::Identity;
use crate::models::profile::{Profile, ProfileError, Role};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("profile store unavailable: {0}")]
    Unavailable(#[from] sqlx::Error),

    #[error("stored profile document is unreadable: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("profile not found")]
    NotFound,

    #[error(transparent)]
    Rejected(#[from] ProfileError),
}

/// Edit applied to a stored profile inside `modify_profile`.
pub type ProfileEdit<'a> = dyn Fn(&mut Profile) -> Result<(), ProfileError> + Send + Sync + 'a;

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn read_profile(&self, id: &Identity) -> Result<Option<Profile>, StoreError>;

    /// Create-or-merge. Returns the document as stored after the write.
    async fn write_profile(&self, profile: &Profile) -> Result<Profile, StoreError>;

    /// Read-modify-write of an existing profile. The role cannot change.
    async fn modify_profile(
        &self,
        id: &Identity,
        edit: &ProfileEdit<'_>,
    ) -> Result<Profile, StoreError>;

    async fn list_by_role(&self, role: Role) -> Result<Vec<Profile>, StoreError>;
}

pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn read_profile(&self, id: &Identity) -> Result<Option<Profile>, StoreError> {
        let doc: Option<Value> = sqlx::query_scalar("SELECT doc FROM profiles WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(doc.map(serde_json::from_value).transpose()?)
    }

    async fn write_profile(&self, profile: &Profile) -> Result<Profile, StoreError> {
        let doc = serde_json::to_value(profile)?;
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO profiles (id, role, doc) VALUES ($1, $2, $3) ON CONFLICT (id) DO NOTHING",
        )
        .bind(profile.id.as_str())
        .bind(profile.role().as_str())
        .bind(&doc)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 1 {
            tx.commit().await?;
            debug!("Created profile document {}", profile.id);
            return Ok(profile.clone());
        }

        // Row already there (a retried or racing bootstrap): merge under a row lock.
        let stored: Value =
            sqlx::query_scalar("SELECT doc FROM profiles WHERE id = $1 FOR UPDATE")
                .bind(profile.id.as_str())
                .fetch_one(&mut *tx)
                .await?;
        let stored: Profile = serde_json::from_value(stored)?;
        let merged = stored.merged_with(profile.clone());

        sqlx::query("UPDATE profiles SET doc = $2, updated_at = NOW() WHERE id = $1")
            .bind(merged.id.as_str())
            .bind(serde_json::to_value(&merged)?)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        debug!("Merged profile document {}", merged.id);
        Ok(merged)
    }

    async fn modify_profile(
        &self,
        id: &Identity,
        edit: &ProfileEdit<'_>,
    ) -> Result<Profile, StoreError> {
        let mut tx = self.pool.begin().await?;

        let stored: Option<Value> =
            sqlx::query_scalar("SELECT doc FROM profiles WHERE id = $1 FOR UPDATE")
                .bind(id.as_str())
                .fetch_optional(&mut *tx)
                .await?;
        let mut profile: Profile = serde_json::from_value(stored.ok_or(StoreError::NotFound)?)?;
        edit(&mut profile)?;

        sqlx::query("UPDATE profiles SET doc = $2, updated_at = NOW() WHERE id = $1")
            .bind(id.as_str())
            .bind(serde_json::to_value(&profile)?)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(profile)
    }

    async fn list_by_role(&self, role: Role) -> Result<Vec<Profile>, StoreError> {
        let docs: Vec<Value> =
            sqlx::query_scalar("SELECT doc FROM profiles WHERE role = $1 ORDER BY created_at")
                .bind(role.as_str())
                .fetch_all(&self.pool)
                .await?;
        docs.into_iter()
            .map(|doc| serde_json::from_value(doc).map_err(StoreError::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::ContactAddress;

    // Run with `DATABASE_URL=... cargo test -- --ignored`; sqlx creates a
    // throwaway database per test and applies ./migrations.

    fn email(addr: &str) -> ContactAddress {
        ContactAddress::Email(addr.to_string())
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn test_repeated_write_merges_into_one_row(pool: PgPool) {
        let store = PgProfileStore::new(pool.clone());
        let id = Identity::new("uid-pg-worker");

        let mut first = Profile::bootstrap(id.clone(), email("w@example.com"), Role::Worker);
        first.set_skills(vec!["Wiring".to_string()]).unwrap();
        store.write_profile(&first).await.unwrap();

        // A racing bootstrap with defaults and a different role.
        let retry = Profile::bootstrap(id.clone(), email("other@example.com"), Role::Customer);
        let stored = store.write_profile(&retry).await.unwrap();

        assert_eq!(stored.role(), Role::Worker);
        assert_eq!(stored.contact_address, email("w@example.com"));
        assert_eq!(stored.worker().unwrap().skills, vec!["Wiring".to_string()]);

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM profiles WHERE id = $1")
            .bind(id.as_str())
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(rows, 1);
        assert_eq!(store.read_profile(&id).await.unwrap(), Some(stored));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn test_modify_and_list_by_role(pool: PgPool) {
        let store = PgProfileStore::new(pool);
        let worker = Profile::bootstrap(Identity::new("uid-w"), email("w@example.com"), Role::Worker);
        let customer =
            Profile::bootstrap(Identity::new("uid-c"), email("c@example.com"), Role::Customer);
        store.write_profile(&worker).await.unwrap();
        store.write_profile(&customer).await.unwrap();

        let edited = store
            .modify_profile(&worker.id, &|p: &mut Profile| {
                p.set_working_locations(vec!["Springfield".to_string()])
            })
            .await
            .unwrap();
        assert_eq!(
            edited.worker().unwrap().working_locations,
            vec!["Springfield".to_string()]
        );

        let rejected = store
            .modify_profile(&customer.id, &|p: &mut Profile| p.set_skills(vec!["x".to_string()]))
            .await;
        assert!(matches!(rejected, Err(StoreError::Rejected(_))));

        let missing = store
            .modify_profile(&Identity::new("uid-none"), &|_: &mut Profile| Ok(()))
            .await;
        assert!(matches!(missing, Err(StoreError::NotFound)));

        let workers = store.list_by_role(Role::Worker).await.unwrap();
        assert_eq!(workers, vec![edited]);
    }
}

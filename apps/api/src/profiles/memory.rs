//! In-memory profile store for tests. Mirrors the Postgres merge semantics
//! and counts calls so tests can assert on store traffic.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::store::{ProfileEdit, ProfileStore, StoreError};
use crate::identity::Identity;
use crate::models::profile::{Profile, Role};

#[derive(Default)]
pub struct MemoryProfileStore {
    docs: Mutex<HashMap<Identity, Profile>>,
    reads: AtomicUsize,
    writes: AtomicUsize,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
}

impl MemoryProfileStore {
    pub fn with_profile(profile: Profile) -> Self {
        let store = Self::default();
        store
            .docs
            .lock()
            .unwrap()
            .insert(profile.id.clone(), profile);
        store
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn document_count(&self) -> usize {
        self.docs.lock().unwrap().len()
    }

    pub fn get(&self, id: &Identity) -> Option<Profile> {
        self.docs.lock().unwrap().get(id).cloned()
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn read_profile(&self, id: &Identity) -> Result<Option<Profile>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(sqlx::Error::PoolTimedOut));
        }
        Ok(self.get(id))
    }

    async fn write_profile(&self, profile: &Profile) -> Result<Profile, StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(sqlx::Error::PoolTimedOut));
        }
        let mut docs = self.docs.lock().unwrap();
        let stored = match docs.remove(&profile.id) {
            Some(existing) => existing.merged_with(profile.clone()),
            None => profile.clone(),
        };
        docs.insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    async fn modify_profile(
        &self,
        id: &Identity,
        edit: &ProfileEdit<'_>,
    ) -> Result<Profile, StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut docs = self.docs.lock().unwrap();
        let stored = docs.get_mut(id).ok_or(StoreError::NotFound)?;
        let mut edited = stored.clone();
        edit(&mut edited)?;
        *stored = edited.clone();
        Ok(edited)
    }

    async fn list_by_role(&self, role: Role) -> Result<Vec<Profile>, StoreError> {
        let docs = self.docs.lock().unwrap();
        let mut profiles: Vec<Profile> = docs.values().filter(|p| p.role() == role).cloned().collect();
        profiles.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        Ok(profiles)
    }
}

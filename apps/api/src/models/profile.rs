use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::identity::{ContactAddress, Identity};

pub const PLACEHOLDER_AVATAR: &str = "https://placehold.co/128x128.png";
pub const DEFAULT_WORKER_SPECIALTY: &str = "New Worker";
const MIN_DISPLAY_NAME_CHARS: usize = 2;

/// Fixed at profile creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Customer,
    Worker,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Worker => "worker",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobRef(pub Uuid);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerDetails {
    pub specialty: String,
    #[serde(default)]
    pub rating: f32,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub working_locations: Vec<String>,
}

/// Role-specific part of a profile. Serialized inline as `"role": "customer" | "worker"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum ProfileKind {
    Customer,
    Worker(WorkerDetails),
}

/// Application-level user record, one per identity. Stored as a JSON document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Identity,
    pub display_name: String,
    pub contact_address: ContactAddress,
    pub avatar_ref: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub active_job_refs: Vec<JobRef>,
    #[serde(default)]
    pub completed_job_refs: Vec<JobRef>,
    #[serde(flatten)]
    pub kind: ProfileKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfileError {
    #[error("{0}")]
    Validation(String),

    #[error("only worker profiles have {0}")]
    NotAWorker(&'static str),
}

/// Editable profile fields.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileUpdate {
    pub display_name: String,
    pub specialty: Option<String>,
    pub bio: Option<String>,
}

impl Profile {
    /// Default profile for a newly verified identity.
    pub fn bootstrap(id: Identity, contact_address: ContactAddress, role: Role) -> Self {
        let kind = match role {
            Role::Customer => ProfileKind::Customer,
            Role::Worker => ProfileKind::Worker(WorkerDetails {
                specialty: DEFAULT_WORKER_SPECIALTY.to_string(),
                rating: 0.0,
                skills: Vec::new(),
                working_locations: Vec::new(),
            }),
        };
        Self {
            display_name: format!("User {}", id.short()),
            id,
            contact_address,
            avatar_ref: PLACEHOLDER_AVATAR.to_string(),
            bio: String::new(),
            active_job_refs: Vec::new(),
            completed_job_refs: Vec::new(),
            kind,
        }
    }

    pub fn role(&self) -> Role {
        match self.kind {
            ProfileKind::Customer => Role::Customer,
            ProfileKind::Worker(_) => Role::Worker,
        }
    }

    #[cfg(test)]
    pub fn worker(&self) -> Option<&WorkerDetails> {
        match &self.kind {
            ProfileKind::Worker(details) => Some(details),
            ProfileKind::Customer => None,
        }
    }

    /// Create-or-merge rule: `self` is the stored document, `incoming` the write.
    ///
    /// The stored role and contact are kept. Any stored field that is already
    /// populated is kept; only empty fields take the incoming value, so a
    /// repeated bootstrap write cannot reset edited data to defaults.
    pub fn merged_with(mut self, incoming: Profile) -> Profile {
        fill_if_empty(&mut self.display_name, incoming.display_name);
        fill_if_empty(&mut self.avatar_ref, incoming.avatar_ref);
        fill_if_empty(&mut self.bio, incoming.bio);
        fill_if_empty(&mut self.active_job_refs, incoming.active_job_refs);
        fill_if_empty(&mut self.completed_job_refs, incoming.completed_job_refs);

        if let (ProfileKind::Worker(stored), ProfileKind::Worker(incoming)) =
            (&mut self.kind, incoming.kind)
        {
            fill_if_empty(&mut stored.specialty, incoming.specialty);
            fill_if_empty(&mut stored.skills, incoming.skills);
            fill_if_empty(&mut stored.working_locations, incoming.working_locations);
        }
        self
    }

    pub fn apply_update(&mut self, update: &ProfileUpdate) -> Result<(), ProfileError> {
        let name = update.display_name.trim();
        if name.chars().count() < MIN_DISPLAY_NAME_CHARS {
            return Err(ProfileError::Validation(format!(
                "Name must be at least {MIN_DISPLAY_NAME_CHARS} characters."
            )));
        }

        let specialty = update
            .specialty
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        match (&mut self.kind, specialty) {
            (ProfileKind::Worker(details), Some(specialty)) => {
                details.specialty = specialty.to_string();
            }
            (ProfileKind::Customer, Some(_)) => return Err(ProfileError::NotAWorker("a specialty")),
            (_, None) => {}
        }

        self.display_name = name.to_string();
        if let Some(bio) = &update.bio {
            self.bio = bio.trim().to_string();
        }
        Ok(())
    }

    pub fn set_skills(&mut self, skills: Vec<String>) -> Result<(), ProfileError> {
        match &mut self.kind {
            ProfileKind::Worker(details) => {
                details.skills = normalize_entries(skills);
                Ok(())
            }
            ProfileKind::Customer => Err(ProfileError::NotAWorker("skills")),
        }
    }

    pub fn set_working_locations(&mut self, locations: Vec<String>) -> Result<(), ProfileError> {
        match &mut self.kind {
            ProfileKind::Worker(details) => {
                details.working_locations = normalize_entries(locations);
                Ok(())
            }
            ProfileKind::Customer => Err(ProfileError::NotAWorker("working locations")),
        }
    }
}

trait Emptiable {
    fn is_empty_value(&self) -> bool;
}

impl Emptiable for String {
    fn is_empty_value(&self) -> bool {
        self.trim().is_empty()
    }
}

impl<T> Emptiable for Vec<T> {
    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

fn fill_if_empty<T: Emptiable>(stored: &mut T, incoming: T) {
    if stored.is_empty_value() {
        *stored = incoming;
    }
}

/// Trims entries, drops blanks, and removes case-insensitive duplicates
/// keeping the first spelling.
pub fn normalize_entries(entries: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    entries
        .into_iter()
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
        .filter(|e| seen.insert(e.to_lowercase()))
        .collect()
}

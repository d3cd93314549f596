use log::{debug, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{LocalStore, StoreError};
use crate::models::Profile;

/// Persisted profile record. Legacy records also carried `isActive`; serde
/// ignores it on read and it is never written back.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StoredProfile {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl StoredProfile {
    fn into_profile(self, active_id: Option<&str>) -> Profile {
        let is_active = active_id == Some(self.id.as_str());
        Profile {
            id: self.id,
            name: self.name,
            avatar: self.avatar,
            is_active,
        }
    }
}

impl LocalStore {
    pub fn list_profiles(&self) -> Vec<Profile> {
        let active_id = self.active_profile_id();
        self.read_profiles()
            .into_iter()
            .map(|profile| profile.into_profile(active_id.as_deref()))
            .collect()
    }

    /// Appends a profile. The first profile in an empty collection also
    /// becomes the active one. Name rules belong to the caller.
    pub fn create_profile(
        &self,
        name: &str,
        avatar: Option<String>,
    ) -> Result<Profile, StoreError> {
        let _guard = self.lock();
        self.insert_profile(name, avatar, None)
    }

    /// Like `create_profile`, but refuses with `StoreError::ProfileLimit`
    /// once `limit` profiles exist. The count and the insert happen under
    /// one lock.
    pub fn create_profile_capped(
        &self,
        name: &str,
        avatar: Option<String>,
        limit: usize,
    ) -> Result<Profile, StoreError> {
        let _guard = self.lock();
        self.insert_profile(name, avatar, Some(limit))
    }

    fn insert_profile(
        &self,
        name: &str,
        avatar: Option<String>,
        limit: Option<usize>,
    ) -> Result<Profile, StoreError> {
        let mut profiles = self.read_profiles();
        if let Some(limit) = limit.filter(|limit| profiles.len() >= *limit) {
            return Err(StoreError::ProfileLimit { limit });
        }
        let becomes_active = profiles.is_empty();

        let stored = StoredProfile {
            id: Uuid::now_v7().to_string(),
            name: name.to_string(),
            avatar,
        };
        profiles.push(stored.clone());
        self.write_collection(&self.keys.profiles, &profiles)?;

        if becomes_active {
            if let Err(error) = self.write_scalar(&self.keys.active_profile, &stored.id) {
                profiles.pop();
                if let Err(rollback) = self.write_collection(&self.keys.profiles, &profiles) {
                    warn!("failed to roll back profile {}: {rollback}", stored.id);
                }
                return Err(error);
            }
        }

        debug!("created profile {} (active: {becomes_active})", stored.id);
        let active_id = becomes_active.then(|| stored.id.clone());
        Ok(stored.into_profile(active_id.as_deref()))
    }

    /// Removes the profile only. Its watchlist and continue-watching entries
    /// stay, and a pointer at it is left to resolve to `None` on read.
    pub fn delete_profile(&self, id: &str) -> Result<(), StoreError> {
        let _guard = self.lock();
        let mut profiles = self.read_profiles();
        let before = profiles.len();
        profiles.retain(|profile| profile.id != id);

        if profiles.len() == before {
            return Ok(());
        }

        self.write_collection(&self.keys.profiles, &profiles)?;
        debug!("deleted profile {id}");
        Ok(())
    }

    pub fn get_active_profile(&self) -> Option<Profile> {
        let active_id = self.active_profile_id()?;
        self.read_profiles()
            .into_iter()
            .find(|profile| profile.id == active_id)
            .map(|profile| profile.into_profile(Some(&active_id)))
    }

    pub fn set_active_profile(&self, id: &str) -> Result<(), StoreError> {
        let _guard = self.lock();
        self.write_scalar(&self.keys.active_profile, id)?;
        debug!("active profile set to {id}");
        Ok(())
    }

    /// The raw pointer, whether or not it still names a stored profile.
    pub fn active_profile_id(&self) -> Option<String> {
        self.read_scalar(&self.keys.active_profile)
    }

    fn read_profiles(&self) -> Vec<StoredProfile> {
        self.read_collection(&self.keys.profiles)
    }
}

//! Profile lookup for the doctor and patient identity pools.
//!
//! Profiles are owned by the wider portal; the messaging core only reads
//! display identity from them. The two pools are kept in separate maps so a
//! lookup through a [`ParticipantRef`] always consults the pool its tag
//! names.

use std::collections::HashMap;

use carechat_proto::conversation::OtherParticipant;
use carechat_proto::participant::{ParticipantId, ParticipantRef, Role};
use tokio::sync::RwLock;

/// Role-specific profile fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileDetails {
    /// Doctor profile fields.
    Doctor {
        /// Medical specialization, e.g. "Cardiology".
        specialization: Option<String>,
    },
    /// Patient profile fields.
    Patient {
        /// Health identifier shown to clinicians.
        health_id: Option<String>,
    },
}

/// Display identity of a participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    /// Participant identifier.
    pub id: ParticipantId,
    /// Display name.
    pub name: String,
    /// Avatar reference.
    pub avatar: Option<String>,
    /// Role-specific fields; also determines the pool.
    pub details: ProfileDetails,
}

impl Profile {
    /// Returns the role-tagged reference for this profile.
    #[must_use]
    pub fn participant(&self) -> ParticipantRef {
        ParticipantRef::new(self.role(), self.id.clone())
    }

    /// Returns the identity pool of this profile.
    #[must_use]
    pub const fn role(&self) -> Role {
        match self.details {
            ProfileDetails::Doctor { .. } => Role::Doctor,
            ProfileDetails::Patient { .. } => Role::Patient,
        }
    }

    /// Specialization for doctors, health identifier for patients.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        match &self.details {
            ProfileDetails::Doctor { specialization } => specialization.as_deref(),
            ProfileDetails::Patient { health_id } => health_id.as_deref(),
        }
    }

    /// Converts this profile to the wire representation used in listings.
    #[must_use]
    pub fn to_other_participant(&self) -> OtherParticipant {
        OtherParticipant {
            id: self.id.clone(),
            role: self.role(),
            name: self.name.clone(),
            avatar: self.avatar.clone(),
            label: self.label().map(str::to_string),
        }
    }
}

#[derive(Default)]
struct Pools {
    doctors: HashMap<ParticipantId, Profile>,
    patients: HashMap<ParticipantId, Profile>,
}

impl Pools {
    const fn pool(&self, role: Role) -> &HashMap<ParticipantId, Profile> {
        match role {
            Role::Doctor => &self.doctors,
            Role::Patient => &self.patients,
        }
    }

    const fn pool_mut(&mut self, role: Role) -> &mut HashMap<ParticipantId, Profile> {
        match role {
            Role::Doctor => &mut self.doctors,
            Role::Patient => &mut self.patients,
        }
    }
}

/// In-memory profile directory.
///
/// Thread-safe via [`RwLock`].
pub struct ProfileDirectory {
    pools: RwLock<Pools>,
}

impl Default for ProfileDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pools: RwLock::new(Pools::default()),
        }
    }

    /// Adds or replaces a profile in the pool its details name.
    pub async fn insert(&self, profile: Profile) {
        let mut pools = self.pools.write().await;
        pools.pool_mut(profile.role()).insert(profile.id.clone(), profile);
    }

    /// Removes a participant from its pool, returning the profile if it existed.
    pub async fn remove(&self, participant: &ParticipantRef) -> Option<Profile> {
        let mut pools = self.pools.write().await;
        pools.pool_mut(participant.role()).remove(participant.id())
    }

    /// Looks up a participant in the pool its tag names.
    pub async fn lookup(&self, participant: &ParticipantRef) -> Option<Profile> {
        let pools = self.pools.read().await;
        pools.pool(participant.role()).get(participant.id()).cloned()
    }

    /// Resolves a bare identifier against both pools.
    ///
    /// The pools are disjoint, so at most one can match.
    pub async fn resolve(&self, id: &ParticipantId) -> Option<Profile> {
        let pools = self.pools.read().await;
        pools
            .doctors
            .get(id)
            .or_else(|| pools.patients.get(id))
            .cloned()
    }
}

//! Participant identity shared by the server and the client.
//!
//! A participant is drawn from one of two disjoint identity pools, doctors and
//! patients. The messaging core never owns participant records; it only
//! carries the opaque ID together with the pool it belongs to.

use serde::{Deserialize, Serialize};

/// Opaque, globally unique participant identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    /// Creates a participant identifier from its string form.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the string form of this identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the identifier is empty or only whitespace.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Identity pool a participant belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Clinician account.
    Doctor,
    /// Patient account.
    Patient,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Doctor => write!(f, "doctor"),
            Self::Patient => write!(f, "patient"),
        }
    }
}

/// A participant reference tagged with its identity pool.
///
/// Conversations and messages are pool-agnostic and compare participants by
/// [`ParticipantId`] alone; the tag is only consulted at the profile lookup
/// boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRef {
    /// A participant from the doctor pool.
    Doctor(ParticipantId),
    /// A participant from the patient pool.
    Patient(ParticipantId),
}

impl ParticipantRef {
    /// Builds a reference from a role and an identifier.
    #[must_use]
    pub const fn new(role: Role, id: ParticipantId) -> Self {
        match role {
            Role::Doctor => Self::Doctor(id),
            Role::Patient => Self::Patient(id),
        }
    }

    /// Returns the participant identifier.
    #[must_use]
    pub const fn id(&self) -> &ParticipantId {
        match self {
            Self::Doctor(id) | Self::Patient(id) => id,
        }
    }

    /// Returns the identity pool of this participant.
    #[must_use]
    pub const fn role(&self) -> Role {
        match self {
            Self::Doctor(_) => Role::Doctor,
            Self::Patient(_) => Role::Patient,
        }
    }
}

impl std::fmt::Display for ParticipantRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.role(), self.id())
    }
}

/// Unordered pair of participant identifiers.
///
/// `PairKey::new(a, b) == PairKey::new(b, a)`; this is the uniqueness key for
/// conversations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PairKey {
    low: ParticipantId,
    high: ParticipantId,
}

impl PairKey {
    /// Creates the canonical key for the pair `{a, b}`.
    #[must_use]
    pub fn new(a: &ParticipantId, b: &ParticipantId) -> Self {
        if a <= b {
            Self {
                low: a.clone(),
                high: b.clone(),
            }
        } else {
            Self {
                low: b.clone(),
                high: a.clone(),
            }
        }
    }

    /// Returns `true` if `id` is one of the two members.
    #[must_use]
    pub fn contains(&self, id: &ParticipantId) -> bool {
        self.low == *id || self.high == *id
    }
}

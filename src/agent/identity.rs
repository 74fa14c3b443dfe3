//! Stable identities binding simulated household members to external records.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ConfigError;

/// The five fixed household slots, in interview order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberKey {
    UnderAwareAdult,
    OverloadedAdult,
    OldestChild,
    MiddleChild,
    YoungestChild,
}

impl MemberKey {
    pub const ALL: [MemberKey; 5] = [
        MemberKey::UnderAwareAdult,
        MemberKey::OverloadedAdult,
        MemberKey::OldestChild,
        MemberKey::MiddleChild,
        MemberKey::YoungestChild,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn role(self) -> Role {
        match self {
            MemberKey::UnderAwareAdult | MemberKey::OverloadedAdult => Role::Adult,
            _ => Role::Child,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MemberKey::UnderAwareAdult => "under_aware_adult",
            MemberKey::OverloadedAdult => "overloaded_adult",
            MemberKey::OldestChild => "oldest_child",
            MemberKey::MiddleChild => "middle_child",
            MemberKey::YoungestChild => "youngest_child",
        }
    }

    fn default_name(self) -> &'static str {
        match self {
            MemberKey::UnderAwareAdult => "Alex",
            MemberKey::OverloadedAdult => "Jordan",
            MemberKey::OldestChild => "Riley",
            MemberKey::MiddleChild => "Casey",
            MemberKey::YoungestChild => "Sam",
        }
    }

    fn default_age(self) -> Option<u8> {
        match self {
            MemberKey::OldestChild => Some(14),
            MemberKey::MiddleChild => Some(11),
            MemberKey::YoungestChild => Some(7),
            _ => None,
        }
    }
}

impl std::fmt::Display for MemberKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Adult,
    Child,
}

impl Role {
    /// The low-effort action a member of this role falls back to.
    pub fn default_action(self) -> &'static str {
        match self {
            Role::Adult => "check_calendar",
            Role::Child => "do_nothing",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Adult => "adult",
            Role::Child => "child",
        }
    }
}

/// External identity of one household member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub external_id: String,
    pub name: String,
    /// Only meaningful for children.
    #[serde(default)]
    pub age: Option<u8>,
}

/// Lightweight reference to the agent that originated an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRef {
    pub key: MemberKey,
    pub external_id: String,
}

/// Mapping from household slot to external identity, reusable across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityMap {
    members: BTreeMap<MemberKey, Identity>,
}

impl IdentityMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// A complete map with generated ids, stable for a given seed.
    pub fn generated(seed: u64) -> Self {
        let namespace = Uuid::new_v5(&Uuid::NAMESPACE_OID, format!("hearth:{seed}").as_bytes());
        let members = MemberKey::ALL
            .iter()
            .map(|key| {
                let identity = Identity {
                    external_id: Uuid::new_v5(&namespace, key.as_str().as_bytes()).to_string(),
                    name: key.default_name().to_string(),
                    age: key.default_age(),
                };
                (*key, identity)
            })
            .collect();
        Self { members }
    }

    /// Load a map from a TOML or JSON file (chosen by extension).
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::NotFound {
                path: path.to_path_buf(),
            },
            _ => ConfigError::Io(e),
        })?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            serde_json::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
        } else {
            toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
        }
    }

    pub fn insert(&mut self, key: MemberKey, identity: Identity) -> Option<Identity> {
        self.members.insert(key, identity)
    }

    pub fn get(&self, key: MemberKey) -> Option<&Identity> {
        self.members.get(&key)
    }

    /// Look up a member, failing with `MissingIdentity` when absent.
    pub fn require(&self, key: MemberKey) -> Result<&Identity, ConfigError> {
        self.get(key).ok_or_else(|| ConfigError::MissingIdentity {
            role: key.as_str().to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

//! The fixed five-member household handed to the orchestrator.

use std::sync::Arc;
use std::time::Duration;

use crate::agent::adult::{OverloadedAdult, UnderAwareAdult};
use crate::agent::child::{ChildAgent, ChildKind};
use crate::agent::identity::{IdentityMap, MemberKey};
use crate::agent::persona::Persona;
use crate::decision::DecisionBackend;
use crate::error::ConfigError;

/// Two adults and three children, each bound to a stable identity.
#[derive(Debug)]
pub struct Household {
    pub under_aware: UnderAwareAdult,
    pub overloaded: OverloadedAdult,
    pub oldest: ChildAgent,
    pub middle: ChildAgent,
    pub youngest: ChildAgent,
}

impl Household {
    pub fn builder() -> HouseholdBuilder {
        HouseholdBuilder::default()
    }

    /// Build every member from `identities`.
    ///
    /// Fails with `MissingIdentity` naming the first slot that has no entry.
    pub fn from_identities(identities: &IdentityMap, seed: u64) -> Result<Self, ConfigError> {
        Self::builder()
            .under_aware(UnderAwareAdult::new(
                identities.require(MemberKey::UnderAwareAdult)?.clone(),
                seed,
            ))
            .overloaded(OverloadedAdult::new(
                identities.require(MemberKey::OverloadedAdult)?.clone(),
                seed,
            ))
            .oldest(ChildAgent::new(
                ChildKind::Oldest,
                identities.require(MemberKey::OldestChild)?.clone(),
                seed,
            ))
            .middle(ChildAgent::new(
                ChildKind::Middle,
                identities.require(MemberKey::MiddleChild)?.clone(),
                seed,
            ))
            .youngest(ChildAgent::new(
                ChildKind::Youngest,
                identities.require(MemberKey::YoungestChild)?.clone(),
                seed,
            ))
            .build()
    }

    /// All members in interview order.
    pub fn members(&self) -> [&dyn Persona; 5] {
        [
            &self.under_aware,
            &self.overloaded,
            &self.oldest,
            &self.middle,
            &self.youngest,
        ]
    }

    pub fn members_mut(&mut self) -> [&mut dyn Persona; 5] {
        [
            &mut self.under_aware,
            &mut self.overloaded,
            &mut self.oldest,
            &mut self.middle,
            &mut self.youngest,
        ]
    }

    pub fn children(&self) -> [&ChildAgent; 3] {
        [&self.oldest, &self.middle, &self.youngest]
    }

    pub fn children_mut(&mut self) -> [&mut ChildAgent; 3] {
        [&mut self.oldest, &mut self.middle, &mut self.youngest]
    }

    pub fn member(&self, key: MemberKey) -> &dyn Persona {
        self.members()[key.index()]
    }

    pub fn member_mut(&mut self, key: MemberKey) -> &mut dyn Persona {
        match key {
            MemberKey::UnderAwareAdult => &mut self.under_aware,
            MemberKey::OverloadedAdult => &mut self.overloaded,
            MemberKey::OldestChild => &mut self.oldest,
            MemberKey::MiddleChild => &mut self.middle,
            MemberKey::YoungestChild => &mut self.youngest,
        }
    }

    /// Point every member at the same decision strategy.
    pub fn attach_backend(&mut self, backend: Arc<dyn DecisionBackend>, timeout: Duration) {
        for member in self.members_mut() {
            member.agent_mut().set_backend(Arc::clone(&backend), timeout);
        }
    }
}

/// Assembles a [`Household`], checking that every slot is filled with the
/// right kind of member.
#[derive(Debug, Default)]
pub struct HouseholdBuilder {
    under_aware: Option<UnderAwareAdult>,
    overloaded: Option<OverloadedAdult>,
    oldest: Option<ChildAgent>,
    middle: Option<ChildAgent>,
    youngest: Option<ChildAgent>,
}

impl HouseholdBuilder {
    pub fn under_aware(mut self, adult: UnderAwareAdult) -> Self {
        self.under_aware = Some(adult);
        self
    }

    pub fn overloaded(mut self, adult: OverloadedAdult) -> Self {
        self.overloaded = Some(adult);
        self
    }

    pub fn oldest(mut self, child: ChildAgent) -> Self {
        self.oldest = Some(child);
        self
    }

    pub fn middle(mut self, child: ChildAgent) -> Self {
        self.middle = Some(child);
        self
    }

    pub fn youngest(mut self, child: ChildAgent) -> Self {
        self.youngest = Some(child);
        self
    }

    pub fn build(self) -> Result<Household, ConfigError> {
        fn missing(key: MemberKey) -> ConfigError {
            ConfigError::MissingIdentity {
                role: key.as_str().to_string(),
            }
        }
        fn check(child: ChildAgent, kind: ChildKind) -> Result<ChildAgent, ConfigError> {
            if child.kind() != kind {
                return Err(ConfigError::InvalidValue {
                    key: kind.key().as_str().to_string(),
                    message: format!("expected a {:?} child, got {:?}", kind, child.kind()),
                });
            }
            Ok(child)
        }

        Ok(Household {
            under_aware: self
                .under_aware
                .ok_or_else(|| missing(MemberKey::UnderAwareAdult))?,
            overloaded: self
                .overloaded
                .ok_or_else(|| missing(MemberKey::OverloadedAdult))?,
            oldest: check(
                self.oldest.ok_or_else(|| missing(MemberKey::OldestChild))?,
                ChildKind::Oldest,
            )?,
            middle: check(
                self.middle.ok_or_else(|| missing(MemberKey::MiddleChild))?,
                ChildKind::Middle,
            )?,
            youngest: check(
                self.youngest.ok_or_else(|| missing(MemberKey::YoungestChild))?,
                ChildKind::Youngest,
            )?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_from_generated_identities() {
        let household = Household::from_identities(&IdentityMap::generated(1), 1).unwrap();
        let keys: Vec<MemberKey> = household.members().iter().map(|m| m.agent().key()).collect();
        assert_eq!(keys, MemberKey::ALL.to_vec());
        assert_eq!(household.member(MemberKey::MiddleChild).archetype(), "middle_child");
    }

    #[test]
    fn missing_identity_is_fatal() {
        let full = IdentityMap::generated(1);
        let mut identities = IdentityMap::new();
        for key in [
            MemberKey::UnderAwareAdult,
            MemberKey::OverloadedAdult,
            MemberKey::OldestChild,
            MemberKey::MiddleChild,
        ] {
            identities.insert(key, full.get(key).unwrap().clone());
        }
        let err = Household::from_identities(&identities, 1).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingIdentity { ref role } if role == "youngest_child"
        ));
    }

    #[test]
    fn builder_rejects_swapped_children() {
        let ids = IdentityMap::generated(1);
        let id = |k| ids.require(k).unwrap().clone();
        let err = Household::builder()
            .under_aware(UnderAwareAdult::new(id(MemberKey::UnderAwareAdult), 1))
            .overloaded(OverloadedAdult::new(id(MemberKey::OverloadedAdult), 1))
            .oldest(ChildAgent::new(ChildKind::Youngest, id(MemberKey::YoungestChild), 1))
            .middle(ChildAgent::new(ChildKind::Middle, id(MemberKey::MiddleChild), 1))
            .youngest(ChildAgent::new(ChildKind::Oldest, id(MemberKey::OldestChild), 1))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn builder_reports_first_missing_slot() {
        let err = Household::builder().build().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingIdentity { ref role } if role == "under_aware_adult"
        ));
    }
}

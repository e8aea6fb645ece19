//! Collapses a person's rules into mandatory, optional and excluded sessions.

use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use super::SessionIndex;
use crate::models::{Membership, Rule, RuleType};

/// Rules reachable through one person's group memberships, bucketed by effect.
///
/// A session may sit in several buckets at once when rules disagree. Exclusion
/// is applied by the engine, not here, so [`Resolution::is_excluded`] must be
/// checked before acting on the other buckets.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Session id to the highest priority among include rules referencing it.
    mandatory: HashMap<Uuid, i32>,
    /// Session id to the highest priority among optional rules referencing it.
    optional: HashMap<Uuid, i32>,
    excluded: HashSet<Uuid>,
}

impl Resolution {
    pub fn is_excluded(&self, session_id: &Uuid) -> bool {
        self.excluded.contains(session_id)
    }

    pub fn is_mandatory(&self, session_id: &Uuid) -> bool {
        self.mandatory.contains_key(session_id)
    }

    pub fn is_optional(&self, session_id: &Uuid) -> bool {
        self.optional.contains_key(session_id)
    }

    /// Highest include-rule priority for a mandatory session.
    pub fn priority_of(&self, session_id: &Uuid) -> Option<i32> {
        self.mandatory.get(session_id).copied()
    }

    /// Mandatory sessions in processing order.
    ///
    /// Descending include priority; ties broken by session code, then session id,
    /// both ascending.
    pub fn mandatory_in_order(&self, sessions: &SessionIndex<'_>) -> Vec<Uuid> {
        ordered(&self.mandatory, sessions)
    }

    /// Optional sessions in processing order, using the same keys as
    /// [`Resolution::mandatory_in_order`] over optional-rule priorities.
    pub fn optional_in_order(&self, sessions: &SessionIndex<'_>) -> Vec<Uuid> {
        ordered(&self.optional, sessions)
    }

    fn insert(&mut self, rule: &Rule, session_id: Uuid) {
        match rule.kind {
            RuleType::Include => raise(&mut self.mandatory, session_id, rule.priority),
            RuleType::Optional => raise(&mut self.optional, session_id, rule.priority),
            RuleType::Exclude => {
                self.excluded.insert(session_id);
            }
        }
    }
}

fn raise(bucket: &mut HashMap<Uuid, i32>, session_id: Uuid, priority: i32) {
    let entry = bucket.entry(session_id).or_insert(priority);
    *entry = (*entry).max(priority);
}

fn ordered(bucket: &HashMap<Uuid, i32>, sessions: &SessionIndex<'_>) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = bucket.keys().copied().collect();
    ids.sort_by_cached_key(|id| {
        let code = sessions
            .get(id)
            .map(|session| session.code.clone())
            .unwrap_or_default();
        (Reverse(bucket[id]), code, *id)
    });
    ids
}

/// Indexes memberships and rules once so each person resolves in time
/// proportional to their own rules.
pub struct RuleResolver<'a> {
    groups_by_person: HashMap<Uuid, HashSet<Uuid>>,
    rules_by_group: HashMap<Uuid, Vec<&'a Rule>>,
}

impl<'a> RuleResolver<'a> {
    pub fn new(memberships: &[Membership], rules: &'a [Rule]) -> Self {
        let mut groups_by_person: HashMap<Uuid, HashSet<Uuid>> = HashMap::new();
        for membership in memberships {
            groups_by_person
                .entry(membership.person_id)
                .or_default()
                .insert(membership.group_id);
        }

        let mut rules_by_group: HashMap<Uuid, Vec<&'a Rule>> = HashMap::new();
        for rule in rules {
            rules_by_group.entry(rule.group_id).or_default().push(rule);
        }

        Self {
            groups_by_person,
            rules_by_group,
        }
    }

    /// Resolve every rule reaching `person_id`.
    ///
    /// References to sessions missing from `sessions` (deleted, or belonging to
    /// another event) are dropped silently.
    pub fn resolve(&self, person_id: Uuid, sessions: &SessionIndex<'_>) -> Resolution {
        let mut resolution = Resolution::default();
        let Some(groups) = self.groups_by_person.get(&person_id) else {
            return resolution;
        };

        let rules = groups
            .iter()
            .filter_map(|group_id| self.rules_by_group.get(group_id))
            .flatten();
        for rule in rules {
            for session_id in &rule.session_ids {
                if sessions.contains_key(session_id) {
                    resolution.insert(rule, *session_id);
                }
            }
        }
        resolution
    }
}

//! Ordered collection of admitted rules and the duplicate scan over it.

use super::{Rule, RuleId};
use crate::tenant::TenantId;

/// A semantic duplicate found by [`RuleInventory::find_conflict`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    /// The rule already admitted.
    pub existing: Rule,
    /// Its current owner.
    pub owner: TenantId,
}

/// Admitted rules in insertion order.
///
/// Holds at most one entry per identifier. Insertion order is the scan order
/// of [`find_conflict`](Self::find_conflict).
#[derive(Debug, Clone, Default)]
pub struct RuleInventory {
    rules: Vec<Rule>,
}

impl RuleInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    fn position(&self, id: &RuleId) -> Option<usize> {
        self.rules.iter().position(|rule| rule.id == *id)
    }

    pub fn contains(&self, id: &RuleId) -> bool {
        self.position(id).is_some()
    }

    /// Appends a rule. Returns false, leaving the inventory untouched, if the
    /// identifier is already present.
    pub fn insert(&mut self, rule: Rule) -> bool {
        if self.contains(&rule.id) {
            return false;
        }
        self.rules.push(rule);
        true
    }

    pub fn remove(&mut self, id: &RuleId) -> Option<Rule> {
        self.position(id).map(|index| self.rules.remove(index))
    }

    /// Swaps the entry for `id` with `rule`, keeping its scan position.
    ///
    /// Returns the replaced rule, or `None` (without inserting) when `id` is
    /// absent or `rule.id` already names a different entry.
    pub fn replace(&mut self, id: &RuleId, rule: Rule) -> Option<Rule> {
        if rule.id != *id && self.contains(&rule.id) {
            return None;
        }
        let index = self.position(id)?;
        Some(std::mem::replace(&mut self.rules[index], rule))
    }

    /// Largest sequence among the rules `tenant` owns, or 0 if it owns none.
    pub fn highest_sequence(&self, tenant: TenantId) -> u32 {
        self.rules
            .iter()
            .filter(|rule| rule.owner() == tenant)
            .map(|rule| rule.id.sequence)
            .max()
            .unwrap_or(0)
    }

    /// Scans in insertion order and returns the first full match.
    pub fn find_conflict(&self, candidate: &Rule) -> Option<Conflict> {
        self.rules
            .iter()
            .find(|existing| existing.is_duplicate_of(candidate))
            .map(|existing| Conflict {
                existing: existing.clone(),
                owner: existing.owner(),
            })
    }
}

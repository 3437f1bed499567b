use std::collections::BTreeMap;

use thiserror::Error;

pub const DEFAULT_GROUPS: [&str; 3] = ["Group 1", "Group 2", "Group 3"];

/// How toggling behaves for a record that is already selected. The two
/// variants are both deliberate; pick one at construction and stick to it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TagPolicy {
    /// Toggling under a group the record does not carry appends that tag;
    /// toggling under a group it carries removes only that tag.
    MultiTag,
    /// Toggling an already-selected record always removes it entirely.
    SingleTag,
}

impl TagPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "multi" | "multi-tag" | "multitag" => Some(Self::MultiTag),
            "single" | "single-tag" | "singletag" => Some(Self::SingleTag),
            _ => None,
        }
    }
}

/// What happens to a selected record whose last tag was removed by
/// `delete_group`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrphanPolicy {
    /// The record leaves the selection together with its membership entry.
    Drop,
    /// The record is re-tagged onto the first remaining group.
    Retag,
}

impl OrphanPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "drop" => Some(Self::Drop),
            "retag" | "re-tag" => Some(Self::Retag),
            _ => None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("group name cannot be empty")]
    EmptyGroupName,

    #[error("group '{name}' already exists")]
    DuplicateGroup { name: String },

    #[error("no such group '{name}'")]
    UnknownGroup { name: String },

    #[error("cannot delete the only remaining group")]
    LastGroup,
}

/// The whole curation state: ordered group list, selection set, per-record
/// tag lists, and the active group new selections are tagged into.
///
/// Invariants upheld by every operation:
/// - group names are unique and at least one group exists,
/// - an id is in `selection` iff it has a non-empty entry in `membership`,
/// - `active_group` is always a member of `groups`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppState {
    pub groups: Vec<String>,
    pub selection: Vec<i64>,
    pub membership: BTreeMap<i64, Vec<String>>,
    pub active_group: String,
    tag_policy: TagPolicy,
    orphan_policy: OrphanPolicy,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(TagPolicy::MultiTag, OrphanPolicy::Retag)
    }
}

impl AppState {
    pub fn new(tag_policy: TagPolicy, orphan_policy: OrphanPolicy) -> Self {
        let groups: Vec<String> = DEFAULT_GROUPS.iter().map(|g| g.to_string()).collect();
        let active_group = groups[0].clone();
        Self {
            groups,
            selection: Vec::new(),
            membership: BTreeMap::new(),
            active_group,
            tag_policy,
            orphan_policy,
        }
    }

    /// Rebuild a state from its persisted parts. An active group that is no
    /// longer a member of the group list falls back to the first group, and
    /// the selection/membership pair is reconciled rather than trusted.
    pub fn from_parts(
        groups: Vec<String>,
        selection: Vec<i64>,
        membership: BTreeMap<i64, Vec<String>>,
        active_group: String,
        tag_policy: TagPolicy,
        orphan_policy: OrphanPolicy,
    ) -> Self {
        let groups = if groups.is_empty() {
            DEFAULT_GROUPS.iter().map(|g| g.to_string()).collect()
        } else {
            groups
        };
        let active_group = if groups.contains(&active_group) {
            active_group
        } else {
            groups[0].clone()
        };
        let mut state = Self {
            groups,
            selection,
            membership,
            active_group,
            tag_policy,
            orphan_policy,
        };
        state.reconcile();
        state
    }

    pub fn tag_policy(&self) -> TagPolicy {
        self.tag_policy
    }

    pub fn orphan_policy(&self) -> OrphanPolicy {
        self.orphan_policy
    }

    pub fn is_selected(&self, id: i64) -> bool {
        self.selection.contains(&id)
    }

    /// Tags for a selected id, defaulting to the active group for ids that
    /// predate tagged selection. Callers render and export through this.
    pub fn tags_for(&self, id: i64) -> Vec<String> {
        match self.membership.get(&id) {
            Some(tags) if !tags.is_empty() => tags.clone(),
            _ => vec![self.active_group.clone()],
        }
    }

    /// Add or remove a record from the selection. Ids are opaque here; a
    /// toggle of an id the record store has never seen follows the same
    /// bookkeeping and is harmless.
    pub fn toggle_selection(&mut self, id: i64) {
        if !self.selection.contains(&id) {
            self.selection.push(id);
            let tags = self.membership.entry(id).or_default();
            if !tags.contains(&self.active_group) {
                tags.push(self.active_group.clone());
            }
            return;
        }

        match self.tag_policy {
            TagPolicy::SingleTag => {
                self.selection.retain(|&sel| sel != id);
                self.membership.remove(&id);
            }
            TagPolicy::MultiTag => {
                let tags = self.membership.entry(id).or_default();
                if tags.contains(&self.active_group) {
                    tags.retain(|t| t != &self.active_group);
                    if tags.is_empty() {
                        self.membership.remove(&id);
                        self.selection.retain(|&sel| sel != id);
                    }
                } else {
                    tags.push(self.active_group.clone());
                }
            }
        }
    }

    /// Append a new group and make it active.
    pub fn create_group(&mut self, name: &str) -> Result<(), StateError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StateError::EmptyGroupName);
        }
        if self.groups.iter().any(|g| g == name) {
            return Err(StateError::DuplicateGroup {
                name: name.to_string(),
            });
        }
        self.groups.push(name.to_string());
        self.active_group = name.to_string();
        Ok(())
    }

    /// Rename a group in place, rewriting every membership tag that carried
    /// the old name.
    pub fn rename_group(&mut self, old: &str, new: &str) -> Result<(), StateError> {
        let new = new.trim();
        if new.is_empty() {
            return Err(StateError::EmptyGroupName);
        }
        if self.groups.iter().any(|g| g == new) {
            return Err(StateError::DuplicateGroup {
                name: new.to_string(),
            });
        }
        if !self.groups.iter().any(|g| g == old) {
            return Err(StateError::UnknownGroup {
                name: old.to_string(),
            });
        }
        for g in self.groups.iter_mut() {
            if g == old {
                *g = new.to_string();
            }
        }
        for tags in self.membership.values_mut() {
            for tag in tags.iter_mut() {
                if tag == old {
                    *tag = new.to_string();
                }
            }
        }
        if self.active_group == old {
            self.active_group = new.to_string();
        }
        Ok(())
    }

    /// Remove a group. Entries orphaned by the removal follow the configured
    /// `OrphanPolicy`; the active group falls back to the first remaining
    /// group when it was the one deleted.
    pub fn delete_group(&mut self, name: &str) -> Result<(), StateError> {
        if self.groups.len() <= 1 {
            return Err(StateError::LastGroup);
        }
        if !self.groups.iter().any(|g| g == name) {
            return Err(StateError::UnknownGroup {
                name: name.to_string(),
            });
        }
        self.groups.retain(|g| g != name);

        let first = self.groups[0].clone();
        let mut orphaned: Vec<i64> = Vec::new();
        for (id, tags) in self.membership.iter_mut() {
            tags.retain(|t| t != name);
            if tags.is_empty() {
                match self.orphan_policy {
                    OrphanPolicy::Retag => tags.push(first.clone()),
                    OrphanPolicy::Drop => orphaned.push(*id),
                }
            }
        }
        for id in orphaned {
            self.membership.remove(&id);
            self.selection.retain(|&sel| sel != id);
        }

        if self.active_group == name {
            self.active_group = first;
        }
        Ok(())
    }

    /// Move `source` to immediately before `target`. A no-op when either
    /// name is absent or they are equal.
    pub fn reorder_groups(&mut self, source: &str, target: &str) {
        let from = self.groups.iter().position(|g| g == source);
        let to = self.groups.iter().position(|g| g == target);
        if let (Some(from), Some(to)) = (from, to) {
            if from != to {
                let moved = self.groups.remove(from);
                let to = self.groups.iter().position(|g| g == target).unwrap_or(to);
                self.groups.insert(to, moved);
            }
        }
    }

    pub fn set_active_group(&mut self, name: &str) -> Result<(), StateError> {
        if !self.groups.iter().any(|g| g == name) {
            return Err(StateError::UnknownGroup {
                name: name.to_string(),
            });
        }
        self.active_group = name.to_string();
        Ok(())
    }

    /// Force selection and membership back into lockstep. Only needed when
    /// ingesting persisted state that something else may have written.
    fn reconcile(&mut self) {
        self.membership.retain(|_, tags| {
            tags.retain(|t| !t.trim().is_empty());
            !tags.is_empty()
        });
        let membership = &self.membership;
        self.selection.retain(|id| membership.contains_key(id));
        let mut seen = std::collections::HashSet::new();
        self.selection.retain(|id| seen.insert(*id));
        for id in self.membership.keys() {
            if !self.selection.contains(id) {
                self.selection.push(*id);
            }
        }
    }

    /// Test hook: the selection/membership bijection and the active-group
    /// membership, checked after operations in the test suite.
    pub fn invariants_hold(&self) -> bool {
        let bijective = self.selection.iter().all(|id| {
            self.membership
                .get(id)
                .map(|tags| !tags.is_empty())
                .unwrap_or(false)
        }) && self
            .membership
            .keys()
            .all(|id| self.selection.contains(id));
        let unique_groups = {
            let mut seen = std::collections::HashSet::new();
            self.groups.iter().all(|g| seen.insert(g))
        };
        bijective
            && unique_groups
            && !self.groups.is_empty()
            && self.groups.contains(&self.active_group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh(tag: TagPolicy, orphan: OrphanPolicy) -> AppState {
        let mut state = AppState::new(tag, orphan);
        state.groups = vec!["G1".to_string(), "G2".to_string()];
        state.active_group = "G1".to_string();
        state
    }

    #[test]
    fn toggle_selects_and_tags_with_active_group() {
        let mut state = fresh(TagPolicy::MultiTag, OrphanPolicy::Retag);
        state.toggle_selection(5);
        assert_eq!(state.selection, vec![5]);
        assert_eq!(state.membership[&5], vec!["G1".to_string()]);
        assert!(state.invariants_hold());
    }

    #[test]
    fn toggle_twice_is_identity_for_fresh_record() {
        for policy in [TagPolicy::MultiTag, TagPolicy::SingleTag] {
            let mut state = fresh(policy, OrphanPolicy::Retag);
            let before = (state.selection.clone(), state.membership.clone());
            state.toggle_selection(5);
            state.toggle_selection(5);
            assert_eq!(state.selection, before.0);
            assert_eq!(state.membership, before.1);
            assert!(state.invariants_hold());
        }
    }

    #[test]
    fn multi_tag_toggle_under_second_group_appends() {
        let mut state = fresh(TagPolicy::MultiTag, OrphanPolicy::Retag);
        state.toggle_selection(5);
        state.set_active_group("G2").unwrap();
        state.toggle_selection(5);
        assert_eq!(state.selection, vec![5]);
        assert_eq!(
            state.membership[&5],
            vec!["G1".to_string(), "G2".to_string()]
        );
        assert!(state.invariants_hold());
    }

    #[test]
    fn single_tag_toggle_under_second_group_deselects() {
        let mut state = fresh(TagPolicy::SingleTag, OrphanPolicy::Retag);
        state.toggle_selection(5);
        state.set_active_group("G2").unwrap();
        state.toggle_selection(5);
        assert!(state.selection.is_empty());
        assert!(state.membership.is_empty());
        assert!(state.invariants_hold());
    }

    #[test]
    fn multi_tag_removing_last_tag_drops_entry() {
        let mut state = fresh(TagPolicy::MultiTag, OrphanPolicy::Retag);
        state.toggle_selection(5);
        state.toggle_selection(5);
        assert!(state.selection.is_empty());
        assert!(state.membership.is_empty());
    }

    #[test]
    fn create_group_rejects_empty_and_duplicate() {
        let mut state = fresh(TagPolicy::MultiTag, OrphanPolicy::Retag);
        assert_eq!(state.create_group("  "), Err(StateError::EmptyGroupName));
        assert_eq!(
            state.create_group("G1"),
            Err(StateError::DuplicateGroup {
                name: "G1".to_string()
            })
        );
        state.create_group("Home").unwrap();
        assert_eq!(state.active_group, "Home");
        assert_eq!(state.groups, vec!["G1", "G2", "Home"]);
    }

    #[test]
    fn rename_rewrites_membership_and_active_group() {
        let mut state = fresh(TagPolicy::MultiTag, OrphanPolicy::Retag);
        state.toggle_selection(5);
        state.rename_group("G1", "Home").unwrap();
        assert_eq!(state.groups, vec!["Home", "G2"]);
        assert_eq!(state.membership[&5], vec!["Home".to_string()]);
        assert_eq!(state.active_group, "Home");
        assert!(state.invariants_hold());
    }

    #[test]
    fn rename_rejects_empty_duplicate_and_unknown() {
        let mut state = fresh(TagPolicy::MultiTag, OrphanPolicy::Retag);
        assert_eq!(state.rename_group("G1", ""), Err(StateError::EmptyGroupName));
        assert_eq!(
            state.rename_group("G1", "G2"),
            Err(StateError::DuplicateGroup {
                name: "G2".to_string()
            })
        );
        assert_eq!(
            state.rename_group("nope", "Home"),
            Err(StateError::UnknownGroup {
                name: "nope".to_string()
            })
        );
    }

    #[test]
    fn delete_last_group_is_rejected() {
        let mut state = AppState::new(TagPolicy::MultiTag, OrphanPolicy::Retag);
        state.groups = vec!["G1".to_string()];
        state.active_group = "G1".to_string();
        assert_eq!(state.delete_group("G1"), Err(StateError::LastGroup));
        assert_eq!(state.groups, vec!["G1"]);
        assert!(state.invariants_hold());
    }

    #[test]
    fn delete_group_retag_policy_moves_orphans_to_first_group() {
        let mut state = fresh(TagPolicy::MultiTag, OrphanPolicy::Retag);
        state.set_active_group("G2").unwrap();
        state.toggle_selection(7);
        state.delete_group("G2").unwrap();
        assert_eq!(state.membership[&7], vec!["G1".to_string()]);
        assert_eq!(state.selection, vec![7]);
        assert_eq!(state.active_group, "G1");
        assert!(state.invariants_hold());
    }

    #[test]
    fn delete_group_drop_policy_removes_orphans() {
        let mut state = fresh(TagPolicy::MultiTag, OrphanPolicy::Drop);
        state.set_active_group("G2").unwrap();
        state.toggle_selection(7);
        state.delete_group("G2").unwrap();
        assert!(state.membership.is_empty());
        assert!(state.selection.is_empty());
        assert_eq!(state.active_group, "G1");
        assert!(state.invariants_hold());
    }

    #[test]
    fn delete_group_keeps_entries_with_remaining_tags() {
        let mut state = fresh(TagPolicy::MultiTag, OrphanPolicy::Drop);
        state.toggle_selection(5);
        state.set_active_group("G2").unwrap();
        state.toggle_selection(5);
        state.delete_group("G2").unwrap();
        assert_eq!(state.membership[&5], vec!["G1".to_string()]);
        assert_eq!(state.selection, vec![5]);
    }

    #[test]
    fn reorder_moves_source_before_target() {
        let mut state = AppState::new(TagPolicy::MultiTag, OrphanPolicy::Retag);
        state.reorder_groups("Group 3", "Group 1");
        assert_eq!(state.groups, vec!["Group 3", "Group 1", "Group 2"]);
        state.reorder_groups("Group 1", "Group 1");
        assert_eq!(state.groups, vec!["Group 3", "Group 1", "Group 2"]);
        state.reorder_groups("missing", "Group 1");
        assert_eq!(state.groups, vec!["Group 3", "Group 1", "Group 2"]);
    }

    #[test]
    fn set_active_group_requires_membership() {
        let mut state = fresh(TagPolicy::MultiTag, OrphanPolicy::Retag);
        assert!(state.set_active_group("G2").is_ok());
        assert_eq!(
            state.set_active_group("nope"),
            Err(StateError::UnknownGroup {
                name: "nope".to_string()
            })
        );
        assert_eq!(state.active_group, "G2");
    }

    #[test]
    fn from_parts_repairs_foreign_state() {
        let mut membership = BTreeMap::new();
        membership.insert(1, vec!["G1".to_string()]);
        membership.insert(2, Vec::new());
        let state = AppState::from_parts(
            vec!["G1".to_string()],
            vec![1, 1, 3],
            membership,
            "gone".to_string(),
            TagPolicy::MultiTag,
            OrphanPolicy::Retag,
        );
        assert_eq!(state.active_group, "G1");
        assert_eq!(state.selection, vec![1]);
        assert_eq!(state.membership.len(), 1);
        assert!(state.invariants_hold());
    }
}

/// Group collection and its persistence in the extension's local store
///
/// The whole ordered list of groups is one record. Every mutation reads the
/// full list, changes it and writes the full list back.
use futures::lock::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TabKeeperError};
use crate::store::{GROUPS_KEY, KeyValueStore, load_json, save_json};
use crate::tab_data::{ExportMode, Group, RuleSet};

/// In-memory snapshot of all groups
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupStore {
    pub groups: Vec<Group>,
}

impl GroupStore {
    pub fn new() -> Self {
        GroupStore { groups: Vec::new() }
    }

    pub fn from_groups(groups: Vec<Group>) -> Self {
        GroupStore { groups }
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Group> {
        self.groups.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Group> {
        self.groups.get_mut(index)
    }

    pub fn find_group_by_name(&self, name: &str) -> Option<usize> {
        self.groups.iter().position(|g| g.name == name)
    }

    pub fn total_tabs(&self) -> usize {
        self.groups.iter().map(|g| g.tabs.len()).sum()
    }

    /// Append a new group with default rules and export settings
    pub fn add_group(&mut self, name: &str) -> Result<usize> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TabKeeperError::InvalidGroupName);
        }
        if self.find_group_by_name(name).is_some() {
            return Err(TabKeeperError::DuplicateGroupName(name.to_string()));
        }
        self.groups.push(Group::new(name));
        Ok(self.groups.len() - 1)
    }

    /// Name for the next "New Group N" the options page creates
    pub fn next_group_name(&self) -> String {
        let mut n = self.groups.len() + 1;
        loop {
            let candidate = format!("New Group {}", n);
            if self.find_group_by_name(&candidate).is_none() {
                return candidate;
            }
            n += 1;
        }
    }

    pub fn rename_group(&mut self, index: usize, new_name: &str) -> Result<bool> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(TabKeeperError::InvalidGroupName);
        }
        if self
            .groups
            .iter()
            .enumerate()
            .any(|(i, g)| i != index && g.name == new_name)
        {
            return Err(TabKeeperError::DuplicateGroupName(new_name.to_string()));
        }
        Ok(self
            .group_mut_or_warn(index)
            .map(|group| group.name = new_name.to_string())
            .is_some())
    }

    pub fn delete_group(&mut self, index: usize) -> Option<Group> {
        if index < self.groups.len() {
            Some(self.groups.remove(index))
        } else {
            log::warn!("Group at index {} not found", index);
            None
        }
    }

    pub fn move_group_up(&mut self, index: usize) -> bool {
        if index == 0 || index >= self.groups.len() {
            return false;
        }
        self.groups.swap(index - 1, index);
        true
    }

    pub fn move_group_down(&mut self, index: usize) -> bool {
        if index + 1 >= self.groups.len() {
            return false;
        }
        self.groups.swap(index, index + 1);
        true
    }

    pub fn set_rules(&mut self, index: usize, rules: RuleSet) -> bool {
        self.group_mut_or_warn(index)
            .map(|group| group.rules = rules)
            .is_some()
    }

    pub fn set_export_path(&mut self, index: usize, path: &str) -> bool {
        self.group_mut_or_warn(index)
            .map(|group| group.export_path = path.to_string())
            .is_some()
    }

    pub fn set_export_template(&mut self, index: usize, template: &str) -> bool {
        self.group_mut_or_warn(index)
            .map(|group| group.export_template = template.to_string())
            .is_some()
    }

    pub fn set_export_mode(&mut self, index: usize, mode: ExportMode) -> bool {
        self.group_mut_or_warn(index)
            .map(|group| group.export_mode = mode)
            .is_some()
    }

    /// Stamp every tab lacking `savedAt` with `now`. Returns the number stamped.
    pub fn migrate_saved_at(&mut self, now: i64) -> usize {
        self.groups
            .iter_mut()
            .flat_map(|g| g.tabs.iter_mut())
            .map(|tab| tab.backfill_saved_at(now))
            .filter(|stamped| *stamped)
            .count()
    }

    pub(crate) fn group_mut_or_warn(&mut self, index: usize) -> Option<&mut Group> {
        let group = self.groups.get_mut(index);
        if group.is_none() {
            log::warn!("Group at index {} not found", index);
        }
        group
    }
}

/// Loads and saves the group collection as one record.
///
/// `update` runs read-mutate-write cycles one at a time for everything
/// sharing this repository. Writers in other extension pages are not
/// covered and still race last-write-wins.
pub struct GroupRepository<'a, S: KeyValueStore> {
    store: &'a S,
    lock: Mutex<()>,
}

impl<'a, S: KeyValueStore> GroupRepository<'a, S> {
    pub fn new(store: &'a S) -> Self {
        GroupRepository {
            store,
            lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &'a S {
        self.store
    }

    /// Load all groups, backfilling missing `savedAt` stamps.
    ///
    /// When any tab had to be stamped, the migrated collection is written
    /// back once before returning.
    pub async fn load(&self, now: i64) -> Result<GroupStore> {
        let mut groups = GroupStore::from_groups(
            load_json(self.store, GROUPS_KEY).await?.unwrap_or_default(),
        );
        let migrated = groups.migrate_saved_at(now);
        if migrated > 0 {
            log::info!("Backfilled savedAt on {} tab(s)", migrated);
            self.save(&groups).await?;
        }
        Ok(groups)
    }

    /// Replace the whole collection
    pub async fn save(&self, groups: &GroupStore) -> Result<()> {
        save_json(self.store, GROUPS_KEY, groups).await
    }

    /// Re-fetch, apply `mutate` and write back if it reports a change.
    pub async fn update<T, F>(&self, now: i64, mutate: F) -> Result<T>
    where
        F: FnOnce(&mut GroupStore) -> Result<(T, bool)>,
    {
        let _guard = self.lock.lock().await;
        let mut groups = self.load(now).await?;
        let (outcome, changed) = mutate(&mut groups)?;
        if changed {
            self.save(&groups).await?;
        }
        Ok(outcome)
    }

    /// Append a group, named "New Group N" when no name is given
    pub async fn add_group(&self, name: Option<&str>, now: i64) -> Result<usize> {
        self.update(now, |groups| {
            let name = name.map_or_else(|| groups.next_group_name(), str::to_string);
            Ok((groups.add_group(&name)?, true))
        })
        .await
    }
}

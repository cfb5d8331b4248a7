/// Tab operations inside and across groups: moves, deletes, dedupe, import.
///
/// Any tab that moves is stamped with `now` if it has no `savedAt` yet.
/// Out-of-range indices log a warning and leave the store untouched.
use std::collections::HashSet;

use crate::storage::GroupStore;
use crate::tab_data::{SavedTab, Tab};

fn tab_exists(store: &GroupStore, group: usize, tab: usize) -> bool {
    let exists = store.get(group).is_some_and(|g| tab < g.tabs.len());
    if !exists {
        log::warn!("Tab {} of group {} not found", tab, group);
    }
    exists
}

/// Drop a tab onto another tab's position (drag and drop between items)
pub fn move_tab(
    store: &mut GroupStore,
    from_group: usize,
    from_tab: usize,
    to_group: usize,
    to_tab: usize,
    now: i64,
) -> bool {
    if from_group == to_group && from_tab == to_tab {
        return false;
    }
    if !tab_exists(store, from_group, from_tab) || store.get(to_group).is_none() {
        return false;
    }

    let mut tab = store.groups[from_group].tabs.remove(from_tab);
    tab.backfill_saved_at(now);
    let target = &mut store.groups[to_group].tabs;
    let position = to_tab.min(target.len());
    target.insert(position, tab);
    true
}

/// Drop a tab onto a group's list, appending it at the end.
///
/// Dropping onto its own non-empty group is refused.
pub fn move_tab_to_group(
    store: &mut GroupStore,
    from_group: usize,
    from_tab: usize,
    to_group: usize,
    now: i64,
) -> bool {
    if !tab_exists(store, from_group, from_tab) || store.get(to_group).is_none() {
        return false;
    }
    if from_group == to_group {
        return false;
    }

    let mut tab = store.groups[from_group].tabs.remove(from_tab);
    tab.backfill_saved_at(now);
    store.groups[to_group].tabs.push(tab);
    true
}

/// Move a tab one step up.
///
/// With `shift`, or from the first position, the tab crosses to the end of
/// the previous group instead.
pub fn move_tab_up(store: &mut GroupStore, group: usize, tab: usize, shift: bool, now: i64) -> bool {
    if !tab_exists(store, group, tab) {
        return false;
    }

    if group > 0 && (shift || tab == 0) {
        return move_tab_to_group(store, group, tab, group - 1, now);
    }
    if !shift && tab > 0 {
        let tabs = &mut store.groups[group].tabs;
        tabs[tab].backfill_saved_at(now);
        tabs[tab - 1].backfill_saved_at(now);
        tabs.swap(tab - 1, tab);
        return true;
    }
    false
}

/// Move a tab one step down, crossing into the next group like `move_tab_up`
pub fn move_tab_down(store: &mut GroupStore, group: usize, tab: usize, shift: bool, now: i64) -> bool {
    if !tab_exists(store, group, tab) {
        return false;
    }

    let last_tab = store.groups[group].tabs.len() - 1;
    let last_group = store.len() - 1;

    if group < last_group && (shift || tab == last_tab) {
        return move_tab_to_group(store, group, tab, group + 1, now);
    }
    if !shift && tab < last_tab {
        let tabs = &mut store.groups[group].tabs;
        tabs[tab].backfill_saved_at(now);
        tabs[tab + 1].backfill_saved_at(now);
        tabs.swap(tab, tab + 1);
        return true;
    }
    false
}

pub fn delete_tab(store: &mut GroupStore, group: usize, tab: usize) -> Option<SavedTab> {
    if !tab_exists(store, group, tab) {
        return None;
    }
    Some(store.groups[group].tabs.remove(tab))
}

/// Empty a group, returning its tabs in order
pub fn take_all_tabs(store: &mut GroupStore, group: usize) -> Option<Vec<SavedTab>> {
    store
        .group_mut_or_warn(group)
        .map(|g| std::mem::take(&mut g.tabs))
}

/// Make a group's tabs unique by URL (keep first occurrence).
/// Returns the number of tabs removed.
pub fn remove_duplicates(store: &mut GroupStore, group: usize) -> Option<usize> {
    let group = store.group_mut_or_warn(group)?;
    let mut seen_urls = HashSet::new();
    let original_len = group.tabs.len();
    group.tabs.retain(|tab| seen_urls.insert(tab.url.clone()));
    Some(original_len - group.tabs.len())
}

/// Append bare urls to one group, title = url, skipping urls it already has.
/// Returns the number of tabs added.
pub fn import_urls_into_group(
    store: &mut GroupStore,
    group: usize,
    urls: &[String],
    now: i64,
) -> Option<usize> {
    let group = store.group_mut_or_warn(group)?;
    let mut existing: HashSet<String> = group.tabs.iter().map(|t| t.url.clone()).collect();
    let mut added = 0;

    for url in urls {
        if existing.insert(url.clone()) {
            group.tabs.push(SavedTab::new(&Tab::new(url.clone(), url.clone()), now));
            added += 1;
        }
    }
    Some(added)
}

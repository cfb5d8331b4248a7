/// Short histories kept next to the groups: recently removed tabs for undo
/// and the last saved tabs shown in the popup
use std::collections::VecDeque;

use crate::error::Result;
use crate::store::{KeyValueStore, LAST_SAVED_TABS_KEY, RECENTLY_REMOVED_KEY, load_json, save_json};
use crate::tab_data::{RemovedTab, SavedTab, Tab};

pub const RECENTLY_REMOVED_CAPACITY: usize = 10;

/// Bounded FIFO of removed tabs.
///
/// Persisted oldest-first; `list` returns most-recent-first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecentlyRemoved {
    entries: VecDeque<RemovedTab>,
}

impl RecentlyRemoved {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<RemovedTab>) -> Self {
        let mut history = RecentlyRemoved {
            entries: entries.into(),
        };
        history.evict();
        history
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn push(&mut self, entry: RemovedTab) {
        self.entries.push_back(entry);
        self.evict();
    }

    /// Record tabs removed from `group` at `now`
    pub fn push_tabs(&mut self, tabs: impl IntoIterator<Item = SavedTab>, group: &str, now: i64) {
        for tab in tabs {
            self.push(RemovedTab::new(tab, group, now));
        }
    }

    /// Most recent first
    pub fn list(&self) -> Vec<&RemovedTab> {
        self.entries.iter().rev().collect()
    }

    fn evict(&mut self) {
        while self.entries.len() > RECENTLY_REMOVED_CAPACITY {
            self.entries.pop_front();
        }
    }

    pub async fn load<S: KeyValueStore>(store: &S) -> Result<Self> {
        let entries: Vec<RemovedTab> = load_json(store, RECENTLY_REMOVED_KEY).await?.unwrap_or_default();
        Ok(Self::from_entries(entries))
    }

    pub async fn save<S: KeyValueStore>(&self, store: &S) -> Result<()> {
        let entries: Vec<&RemovedTab> = self.entries.iter().collect();
        save_json(store, RECENTLY_REMOVED_KEY, &entries).await
    }

    /// Load, append `tabs` and save in one step
    pub async fn record<S: KeyValueStore>(
        store: &S,
        tabs: Vec<SavedTab>,
        group: &str,
        now: i64,
    ) -> Result<()> {
        if tabs.is_empty() {
            return Ok(());
        }
        let mut history = Self::load(store).await?;
        history.push_tabs(tabs, group, now);
        log::info!("Recently removed now holds {} tab(s)", history.len());
        history.save(store).await
    }
}

/// Tabs captured by the latest saves, most recent first
pub struct LastSavedTabs;

impl LastSavedTabs {
    pub async fn load<S: KeyValueStore>(store: &S) -> Result<Vec<Tab>> {
        Ok(load_json(store, LAST_SAVED_TABS_KEY).await?.unwrap_or_default())
    }

    /// Put `captured` in front of the stored list and keep `capacity` entries
    pub async fn update<S: KeyValueStore>(store: &S, captured: &[Tab], capacity: usize) -> Result<Vec<Tab>> {
        let current = Self::load(store).await?;
        let updated: Vec<Tab> = captured
            .iter()
            .cloned()
            .chain(current)
            .take(capacity)
            .collect();
        save_json(store, LAST_SAVED_TABS_KEY, &updated).await?;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use futures::executor::block_on;

    fn create_removed(n: i64) -> RemovedTab {
        let tab = SavedTab::new(&Tab::new(format!("Tab {}", n), format!("https://example.com/{}", n)), n);
        RemovedTab::new(tab, "Reading", 1_000 + n)
    }

    #[test]
    fn test_push_eleven_keeps_last_ten() {
        let mut history = RecentlyRemoved::new();

        for n in 1..=11 {
            history.push(create_removed(n));
        }

        assert_eq!(history.len(), 10);
        let urls: Vec<&str> = history.list().iter().map(|e| e.tab.url.as_str()).collect();
        assert!(!urls.contains(&"https://example.com/1"));
        assert_eq!(urls[0], "https://example.com/11");
        assert_eq!(urls[9], "https://example.com/2");
    }

    #[test]
    fn test_list_most_recent_first() {
        let mut history = RecentlyRemoved::new();
        history.push(create_removed(1));
        history.push(create_removed(2));

        let list = history.list();

        assert_eq!(list[0].removed_at, 1_002);
        assert_eq!(list[1].removed_at, 1_001);
    }

    #[test]
    fn test_from_entries_truncates_oldest() {
        let entries: Vec<RemovedTab> = (1..=15).map(create_removed).collect();

        let history = RecentlyRemoved::from_entries(entries);

        assert_eq!(history.len(), 10);
        assert_eq!(history.list().last().unwrap().tab.title, "Tab 6");
    }

    #[test]
    fn test_persisted_oldest_first() {
        let kv = MemoryStore::new();
        let mut history = RecentlyRemoved::new();
        history.push(create_removed(1));
        history.push(create_removed(2));

        block_on(history.save(&kv)).unwrap();

        let stored = block_on(kv.get(RECENTLY_REMOVED_KEY)).unwrap().unwrap();
        assert_eq!(stored[0]["url"], "https://example.com/1");
        assert_eq!(stored[0]["removedAt"], 1_001);
        assert_eq!(stored[0]["group"], "Reading");
        assert_eq!(block_on(RecentlyRemoved::load(&kv)).unwrap(), history);
    }

    #[test]
    fn test_record_appends_to_stored_history() {
        let kv = MemoryStore::new();
        let tabs: Vec<SavedTab> = (1..=4)
            .map(|n| SavedTab::new(&Tab::new("t", format!("https://e.com/{}", n)), n))
            .collect();

        block_on(RecentlyRemoved::record(&kv, tabs.clone(), "A", 10)).unwrap();
        block_on(RecentlyRemoved::record(&kv, tabs.clone(), "B", 20)).unwrap();
        block_on(RecentlyRemoved::record(&kv, tabs, "C", 30)).unwrap();

        let history = block_on(RecentlyRemoved::load(&kv)).unwrap();
        assert_eq!(history.len(), 10);
        assert_eq!(history.list()[0].group, "C");
        assert_eq!(history.list()[9].group, "A");
    }

    #[test]
    fn test_record_nothing_does_not_write() {
        let kv = MemoryStore::new();
        block_on(RecentlyRemoved::record(&kv, Vec::new(), "A", 10)).unwrap();
        assert!(kv.is_empty());
    }

    #[test]
    fn test_last_saved_tabs_capped_most_recent_first() {
        let kv = MemoryStore::new();

        block_on(LastSavedTabs::update(&kv, &[Tab::new("A", "https://a.com")], 3)).unwrap();
        let updated = block_on(LastSavedTabs::update(
            &kv,
            &[
                Tab::new("B", "https://b.com"),
                Tab::new("C", "https://c.com"),
                Tab::new("D", "https://d.com"),
            ],
            3,
        ))
        .unwrap();

        let titles: Vec<&str> = updated.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["B", "C", "D"]);
        assert_eq!(block_on(LastSavedTabs::load(&kv)).unwrap(), updated);
    }
}

/// User-facing flows combining the browser, the store and the exporter
use crate::classify::{Classification, SingleClassification, classify_batch, classify_single};
use crate::error::Result;
use crate::export::{DownloadSink, ExportReport, Exporter, RemoteDocuments};
use crate::import::extract_links;
use crate::operations;
use crate::recent::{LastSavedTabs, RecentlyRemoved};
use crate::remote::RestVault;
use crate::settings::{Settings, SettingsBundle};
use crate::storage::{GroupRepository, GroupStore};
use crate::store::KeyValueStore;
use crate::tab_data::{CapturedTab, ExportMode, Group, RemovedTab, RuleSet, SavedTab, Tab};

/// Reads the browser's open tabs
#[allow(async_fn_in_trait)]
pub trait TabSource {
    /// Active tab of the focused window
    async fn active_tab(&self) -> Result<Option<CapturedTab>>;

    /// Tabs of the current window, or of every window
    async fn tabs_in_scope(&self, all_windows: bool) -> Result<Vec<CapturedTab>>;
}

/// Opens and closes browser tabs
#[allow(async_fn_in_trait)]
pub trait TabSink {
    async fn open(&self, url: &str, active: bool) -> Result<()>;

    async fn close(&self, ids: &[i32]) -> Result<()>;
}

/// Outcome of a save from the popup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveReport {
    /// Everything captured, including rejected tabs
    pub captured: Vec<Tab>,
    pub classification: Classification,
    pub closed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Unique links found in the file
    pub found: usize,
    pub classification: Classification,
}

impl ImportReport {
    pub fn imported(&self) -> usize {
        self.classification.placements.len()
    }
}

pub struct TabKeeper<'a, S: KeyValueStore, T, D> {
    store: &'a S,
    groups: GroupRepository<'a, S>,
    tabs: &'a T,
    downloads: &'a D,
}

impl<'a, S, T, D> TabKeeper<'a, S, T, D>
where
    S: KeyValueStore,
    T: TabSource + TabSink,
    D: DownloadSink,
{
    pub fn new(store: &'a S, tabs: &'a T, downloads: &'a D) -> Self {
        TabKeeper {
            store,
            groups: GroupRepository::new(store),
            tabs,
            downloads,
        }
    }

    pub fn groups(&self) -> &GroupRepository<'a, S> {
        &self.groups
    }

    pub async fn load_groups(&self, now: i64) -> Result<GroupStore> {
        self.groups.load(now).await
    }

    pub async fn settings(&self) -> Result<Settings> {
        Settings::load(self.store).await
    }

    async fn save_captured(&self, captured: &[CapturedTab], settings: &Settings, now: i64) -> Result<SaveReport> {
        let tabs: Vec<Tab> = captured.iter().map(CapturedTab::to_tab).collect();
        let policy = settings.duplicate_policy();

        let classification = self
            .groups
            .update(now, |groups| {
                let result = classify_batch(groups, &tabs, policy, now);
                let changed = !result.placements.is_empty();
                Ok((result, changed))
            })
            .await?;

        LastSavedTabs::update(self.store, &tabs, settings.popup_capacity()).await?;

        Ok(SaveReport {
            captured: tabs,
            classification,
            closed: 0,
        })
    }

    /// Save the active tab.
    ///
    /// The tab is closed afterwards when `closeOnSaveOne` is set, inverted
    /// by `shift`.
    pub async fn save_current_tab(&self, shift: bool, now: i64) -> Result<SaveReport> {
        let Some(active) = self.tabs.active_tab().await? else {
            log::info!("No active tab to save");
            return Ok(SaveReport::default());
        };
        let settings = self.settings().await?;

        let mut report = self.save_captured(std::slice::from_ref(&active), &settings, now).await?;

        if settings.close_on_save_one != shift {
            self.tabs.close(&[active.id]).await?;
            report.closed = 1;
        }
        Ok(report)
    }

    /// Save every tab of the current window, or of all windows.
    ///
    /// With `closeOnSaveAll`, closes the saved tabs that are neither pinned
    /// nor browser-internal pages.
    pub async fn save_all_tabs(&self, all_windows: bool, now: i64) -> Result<SaveReport> {
        let captured = self.tabs.tabs_in_scope(all_windows).await?;
        if captured.is_empty() {
            log::info!("No tabs found to save");
            return Ok(SaveReport::default());
        }
        let settings = self.settings().await?;

        let mut report = self.save_captured(&captured, &settings, now).await?;

        if settings.close_on_save_all {
            let ids: Vec<i32> = captured
                .iter()
                .filter(|tab| tab.is_closable())
                .map(|tab| tab.id)
                .collect();
            if !ids.is_empty() {
                self.tabs.close(&ids).await?;
            }
            report.closed = ids.len();
        }
        Ok(report)
    }

    /// Place one tab by the rules, falling back to "Auto Group"
    pub async fn auto_save_tab(&self, tab: &Tab, now: i64) -> Result<Option<SingleClassification>> {
        let policy = self.settings().await?.duplicate_policy();
        self.groups
            .update(now, |groups| {
                let placed = classify_single(groups, tab, policy, now);
                let changed = placed.is_some_and(|p| p.inserted);
                Ok((placed, changed))
            })
            .await
    }

    /// Classify the links of a Markdown or text file into the groups
    pub async fn import_markdown(&self, text: &str, now: i64) -> Result<ImportReport> {
        let links = extract_links(text);
        if links.is_empty() {
            log::info!("No links found in imported file");
            return Ok(ImportReport::default());
        }
        let policy = self.settings().await?.duplicate_policy();

        let classification = self
            .groups
            .update(now, |groups| {
                let result = classify_batch(groups, &links, policy, now);
                let changed = !result.placements.is_empty();
                Ok((result, changed))
            })
            .await?;

        Ok(ImportReport {
            found: links.len(),
            classification,
        })
    }

    /// Export a group through the remote API when configured, else as a
    /// download
    pub async fn export_group(&self, index: usize, now: i64) -> Result<Option<ExportReport>> {
        match self.settings().await?.remote() {
            Some(config) => {
                let vault = RestVault::new(&config)?;
                self.export_group_to(index, Some(&vault), now).await
            }
            None => self.export_group_to::<RestVault>(index, None, now).await,
        }
    }

    pub async fn export_group_to<R: RemoteDocuments>(
        &self,
        index: usize,
        remote: Option<&R>,
        now: i64,
    ) -> Result<Option<ExportReport>> {
        Exporter::new(remote, self.downloads)
            .export(&self.groups, index, now)
            .await
    }

    /// Open a saved tab without removing it
    pub async fn open_tab(&self, group: usize, tab: usize, background: bool, now: i64) -> Result<bool> {
        let groups = self.groups.load(now).await?;
        let Some(saved) = groups.get(group).and_then(|g| g.tabs.get(tab)) else {
            log::warn!("Tab {} of group {} not found", tab, group);
            return Ok(false);
        };
        self.tabs.open(&saved.url, !background).await?;
        Ok(true)
    }

    /// Remove a tab from its group into the recently-removed history
    pub async fn delete_tab(&self, group: usize, tab: usize, now: i64) -> Result<Option<SavedTab>> {
        let removed = self
            .groups
            .update(now, |groups| {
                let name = groups.get(group).map(|g| g.name.clone());
                let removed = operations::delete_tab(groups, group, tab).zip(name);
                let changed = removed.is_some();
                Ok((removed, changed))
            })
            .await?;

        let Some((saved, name)) = removed else {
            return Ok(None);
        };
        RecentlyRemoved::record(self.store, vec![saved.clone()], &name, now).await?;
        log::info!("Removed {} from \"{}\"", saved.url, name);
        Ok(Some(saved))
    }

    /// Open a saved tab, then remove it like `delete_tab`
    pub async fn open_and_remove_tab(
        &self,
        group: usize,
        tab: usize,
        background: bool,
        now: i64,
    ) -> Result<Option<SavedTab>> {
        if !self.open_tab(group, tab, background, now).await? {
            return Ok(None);
        }
        self.delete_tab(group, tab, now).await
    }

    /// Open every tab of a group, keeping them saved. Returns the count.
    pub async fn restore_group(&self, group: usize, now: i64) -> Result<usize> {
        let groups = self.groups.load(now).await?;
        let Some(g) = groups.get(group) else {
            log::warn!("Group at index {} not found", group);
            return Ok(0);
        };
        for tab in &g.tabs {
            self.tabs.open(&tab.url, false).await?;
        }
        Ok(g.tabs.len())
    }

    /// Open every tab of a group and empty it; the group itself stays.
    ///
    /// The tabs go to the recently-removed history before any is opened.
    pub async fn restore_and_delete_group(&self, group: usize, now: i64) -> Result<usize> {
        let taken = self
            .groups
            .update(now, |groups| {
                let name = groups.get(group).map(|g| g.name.clone());
                let taken = operations::take_all_tabs(groups, group).zip(name);
                let changed = taken.as_ref().is_some_and(|(tabs, _)| !tabs.is_empty());
                Ok((taken, changed))
            })
            .await?;

        let Some((tabs, name)) = taken else {
            return Ok(0);
        };
        RecentlyRemoved::record(self.store, tabs.clone(), &name, now).await?;
        for tab in &tabs {
            self.tabs.open(&tab.url, false).await?;
        }
        log::info!("Restored {} tab(s) from \"{}\"", tabs.len(), name);
        Ok(tabs.len())
    }

    /// Reopen a recently removed tab. The history and groups are unchanged.
    pub async fn restore_removed(&self, entry: &RemovedTab) -> Result<()> {
        self.tabs.open(&entry.tab.url, true).await
    }

    /// Removed tabs, most recent first
    pub async fn recently_removed(&self) -> Result<Vec<RemovedTab>> {
        let history = RecentlyRemoved::load(self.store).await?;
        Ok(history.list().into_iter().cloned().collect())
    }

    pub async fn last_saved_tabs(&self) -> Result<Vec<Tab>> {
        LastSavedTabs::load(self.store).await
    }

    pub async fn remove_duplicates(&self, group: usize, now: i64) -> Result<usize> {
        self.groups
            .update(now, |groups| {
                let removed = operations::remove_duplicates(groups, group).unwrap_or(0);
                Ok((removed, removed > 0))
            })
            .await
    }

    pub async fn move_tab_up(&self, group: usize, tab: usize, shift: bool, now: i64) -> Result<bool> {
        self.groups
            .update(now, |groups| {
                let moved = operations::move_tab_up(groups, group, tab, shift, now);
                Ok((moved, moved))
            })
            .await
    }

    pub async fn move_tab_down(&self, group: usize, tab: usize, shift: bool, now: i64) -> Result<bool> {
        self.groups
            .update(now, |groups| {
                let moved = operations::move_tab_down(groups, group, tab, shift, now);
                Ok((moved, moved))
            })
            .await
    }

    pub async fn move_group_up(&self, group: usize, now: i64) -> Result<bool> {
        self.groups
            .update(now, |groups| {
                let moved = groups.move_group_up(group);
                Ok((moved, moved))
            })
            .await
    }

    pub async fn move_group_down(&self, group: usize, now: i64) -> Result<bool> {
        self.groups
            .update(now, |groups| {
                let moved = groups.move_group_down(group);
                Ok((moved, moved))
            })
            .await
    }

    pub async fn add_group(&self, name: Option<&str>, now: i64) -> Result<usize> {
        self.groups.add_group(name, now).await
    }

    pub async fn rename_group(&self, group: usize, name: &str, now: i64) -> Result<bool> {
        self.groups
            .update(now, |groups| {
                let renamed = groups.rename_group(group, name)?;
                Ok((renamed, renamed))
            })
            .await
    }

    /// Remove a group with all its tabs
    pub async fn delete_group(&self, group: usize, now: i64) -> Result<Option<Group>> {
        let deleted = self
            .groups
            .update(now, |groups| {
                let deleted = groups.delete_group(group);
                let changed = deleted.is_some();
                Ok((deleted, changed))
            })
            .await?;
        if let Some(g) = &deleted {
            log::info!("Deleted group \"{}\" with {} tab(s)", g.name, g.tabs.len());
        }
        Ok(deleted)
    }

    pub async fn set_group_rules(&self, group: usize, rules: RuleSet, now: i64) -> Result<bool> {
        self.groups
            .update(now, |groups| {
                let found = groups.set_rules(group, rules);
                Ok((found, found))
            })
            .await
    }

    /// Export destination, template and mode of one group
    pub async fn set_group_export(
        &self,
        group: usize,
        path: &str,
        template: &str,
        mode: ExportMode,
        now: i64,
    ) -> Result<bool> {
        self.groups
            .update(now, |groups| {
                let found = groups.set_export_path(group, path)
                    && groups.set_export_template(group, template)
                    && groups.set_export_mode(group, mode);
                Ok((found, found))
            })
            .await
    }

    /// Drop a tab onto another tab's position
    pub async fn move_tab(
        &self,
        from_group: usize,
        from_tab: usize,
        to_group: usize,
        to_tab: usize,
        now: i64,
    ) -> Result<bool> {
        self.groups
            .update(now, |groups| {
                let moved = operations::move_tab(groups, from_group, from_tab, to_group, to_tab, now);
                Ok((moved, moved))
            })
            .await
    }

    /// Drop a tab onto the end of another group
    pub async fn move_tab_to_group(
        &self,
        from_group: usize,
        from_tab: usize,
        to_group: usize,
        now: i64,
    ) -> Result<bool> {
        self.groups
            .update(now, |groups| {
                let moved = operations::move_tab_to_group(groups, from_group, from_tab, to_group, now);
                Ok((moved, moved))
            })
            .await
    }

    /// Add pasted urls, one per line, to a single group. Returns the count added.
    pub async fn import_urls_into_group(&self, group: usize, text: &str, now: i64) -> Result<usize> {
        let urls: Vec<String> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        if urls.is_empty() {
            return Ok(0);
        }
        self.groups
            .update(now, |groups| {
                let added = operations::import_urls_into_group(groups, group, &urls, now).unwrap_or(0);
                Ok((added, added > 0))
            })
            .await
    }

    /// Download settings and groups as one JSON backup
    pub async fn export_settings(&self, now: i64) -> Result<String> {
        let bundle = SettingsBundle::collect(self.store).await?;
        let filename = SettingsBundle::file_name(now);
        self.downloads.download(&filename, &bundle.to_json()?).await?;
        Ok(filename)
    }

    /// Replace settings and groups from a JSON backup
    pub async fn import_settings(&self, json: &str) -> Result<()> {
        let bundle = SettingsBundle::from_json(json)?;
        bundle.apply(self.store).await
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::error::TabKeeperError;
    use crate::export::fakes::{FakeDownloads, FakeRemote};
    use crate::store::MemoryStore;
    use crate::tab_data::{PatternLists, UNGROUPED};
    use futures::executor::block_on;

    #[derive(Default)]
    struct FakeBrowser {
        open_tabs: Vec<CapturedTab>,
        opened: RefCell<Vec<(String, bool)>>,
        closed: RefCell<Vec<i32>>,
    }

    impl FakeBrowser {
        fn with_tabs(tabs: Vec<CapturedTab>) -> Self {
            FakeBrowser {
                open_tabs: tabs,
                ..FakeBrowser::default()
            }
        }

        fn opened_urls(&self) -> Vec<String> {
            self.opened.borrow().iter().map(|(url, _)| url.clone()).collect()
        }
    }

    impl TabSource for FakeBrowser {
        async fn active_tab(&self) -> Result<Option<CapturedTab>> {
            Ok(self.open_tabs.first().cloned())
        }

        async fn tabs_in_scope(&self, _all_windows: bool) -> Result<Vec<CapturedTab>> {
            Ok(self.open_tabs.clone())
        }
    }

    impl TabSink for FakeBrowser {
        async fn open(&self, url: &str, active: bool) -> Result<()> {
            if url.is_empty() {
                return Err(TabKeeperError::TabApi("empty url".to_string()));
            }
            self.opened.borrow_mut().push((url.to_string(), active));
            Ok(())
        }

        async fn close(&self, ids: &[i32]) -> Result<()> {
            self.closed.borrow_mut().extend_from_slice(ids);
            Ok(())
        }
    }

    fn captured(id: i32, title: &str, url: &str, pinned: bool) -> CapturedTab {
        CapturedTab::new(id, url.to_string(), title.to_string(), pinned)
    }

    fn docs_group() -> Group {
        let mut group = Group::new("Docs");
        group.rules = RuleSet {
            whitelist: PatternLists {
                title: vec![],
                url: vec!["docs\\.".to_string()],
            },
            blacklist: PatternLists::default(),
            match_all: true,
        };
        group
    }

    fn seed(kv: &MemoryStore, groups: Vec<Group>, settings: Settings) {
        block_on(GroupRepository::new(kv).save(&GroupStore::from_groups(groups))).unwrap();
        block_on(settings.save(kv)).unwrap();
    }

    #[test]
    fn test_save_current_tab() {
        let kv = MemoryStore::new();
        seed(&kv, vec![docs_group()], Settings::default());
        let browser = FakeBrowser::with_tabs(vec![captured(7, "API", "https://docs.rs/x", false)]);
        let downloads = FakeDownloads::default();
        let keeper = TabKeeper::new(&kv, &browser, &downloads);

        let report = block_on(keeper.save_current_tab(false, 1_000)).unwrap();

        assert_eq!(report.classification.placements.len(), 1);
        assert_eq!(report.closed, 0);
        let groups = block_on(keeper.load_groups(2_000)).unwrap();
        assert_eq!(groups.groups[0].tabs[0].saved_at, Some(1_000));
        assert_eq!(block_on(keeper.last_saved_tabs()).unwrap()[0].url, "https://docs.rs/x");
    }

    #[test]
    fn test_save_current_tab_close_inverted_by_shift() {
        let kv = MemoryStore::new();
        let settings = Settings {
            close_on_save_one: true,
            ..Settings::default()
        };
        seed(&kv, vec![], settings);
        let browser = FakeBrowser::with_tabs(vec![captured(7, "API", "https://docs.rs/x", false)]);
        let downloads = FakeDownloads::default();
        let keeper = TabKeeper::new(&kv, &browser, &downloads);

        block_on(keeper.save_current_tab(true, 1)).unwrap();
        assert!(browser.closed.borrow().is_empty());

        block_on(keeper.save_current_tab(false, 2)).unwrap();
        assert_eq!(*browser.closed.borrow(), vec![7]);
    }

    #[test]
    fn test_save_current_tab_without_active_tab() {
        let kv = MemoryStore::new();
        let browser = FakeBrowser::default();
        let downloads = FakeDownloads::default();
        let keeper = TabKeeper::new(&kv, &browser, &downloads);

        let report = block_on(keeper.save_current_tab(false, 1)).unwrap();

        assert_eq!(report, SaveReport::default());
        assert!(kv.is_empty());
    }

    #[test]
    fn test_save_all_closes_only_closable() {
        let kv = MemoryStore::new();
        let settings = Settings {
            close_on_save_all: true,
            ..Settings::default()
        };
        seed(&kv, vec![docs_group()], settings);
        let browser = FakeBrowser::with_tabs(vec![
            captured(1, "API", "https://docs.rs/x", false),
            captured(2, "Mail", "https://mail.example.com", true),
            captured(3, "Settings", "chrome://settings", false),
            captured(4, "Shop", "https://shop.example.com", false),
        ]);
        let downloads = FakeDownloads::default();
        let keeper = TabKeeper::new(&kv, &browser, &downloads);

        let report = block_on(keeper.save_all_tabs(false, 1_000)).unwrap();

        assert_eq!(*browser.closed.borrow(), vec![1, 4]);
        assert_eq!(report.closed, 2);
        let groups = block_on(keeper.load_groups(2_000)).unwrap();
        assert_eq!(groups.groups[0].tabs.len(), 1);
        assert_eq!(groups.groups[1].name, UNGROUPED);
        assert_eq!(groups.groups[1].tabs.len(), 3);
    }

    #[test]
    fn test_save_all_reports_rejected_and_caps_last_saved() {
        let kv = MemoryStore::new();
        let settings = Settings {
            refuse_existing_tabs: true,
            popup_tab_count: 2,
            ..Settings::default()
        };
        seed(&kv, vec![docs_group()], settings);
        let browser = FakeBrowser::with_tabs(vec![
            captured(1, "API", "https://docs.rs/x", false),
            captured(2, "API copy", "https://docs.rs/x", false),
            captured(3, "Other", "https://docs.rs/y", false),
        ]);
        let downloads = FakeDownloads::default();
        let keeper = TabKeeper::new(&kv, &browser, &downloads);

        let report = block_on(keeper.save_all_tabs(true, 1)).unwrap();

        assert_eq!(report.classification.rejected, vec!["https://docs.rs/x".to_string()]);
        assert!(browser.closed.borrow().is_empty());
        let last: Vec<String> = block_on(keeper.last_saved_tabs()).unwrap().into_iter().map(|t| t.title).collect();
        assert_eq!(last, vec!["API".to_string(), "API copy".to_string()]);
    }

    #[test]
    fn test_auto_save_tab() {
        let kv = MemoryStore::new();
        seed(&kv, vec![docs_group()], Settings::default());
        let browser = FakeBrowser::default();
        let downloads = FakeDownloads::default();
        let keeper = TabKeeper::new(&kv, &browser, &downloads);
        let tab = Tab::new("Shop", "https://shop.example.com");

        let first = block_on(keeper.auto_save_tab(&tab, 1)).unwrap().unwrap();
        let second = block_on(keeper.auto_save_tab(&tab, 2)).unwrap().unwrap();

        assert!(first.inserted);
        assert!(!second.inserted);
        let groups = block_on(keeper.load_groups(3)).unwrap();
        assert_eq!(groups.groups[first.group].tabs.len(), 1);
    }

    #[test]
    fn test_import_markdown() {
        let kv = MemoryStore::new();
        seed(&kv, vec![docs_group()], Settings::default());
        let browser = FakeBrowser::default();
        let downloads = FakeDownloads::default();
        let keeper = TabKeeper::new(&kv, &browser, &downloads);
        let text = "# Links\n- [Serde docs](https://docs.serde.rs)\n* [[Shop]] - https://shop.example.com\n";

        let report = block_on(keeper.import_markdown(text, 1_000)).unwrap();

        assert_eq!(report.found, 2);
        assert_eq!(report.imported(), 2);
        let groups = block_on(keeper.load_groups(2_000)).unwrap();
        assert_eq!(groups.groups[0].tabs[0].title, "Serde docs");
        assert_eq!(groups.groups[1].tabs[0].url, "https://shop.example.com");
    }

    #[test]
    fn test_import_without_links_writes_nothing() {
        let kv = MemoryStore::new();
        let browser = FakeBrowser::default();
        let downloads = FakeDownloads::default();
        let keeper = TabKeeper::new(&kv, &browser, &downloads);

        let report = block_on(keeper.import_markdown("no links here", 1)).unwrap();

        assert_eq!(report.found, 0);
        assert!(kv.is_empty());
    }

    #[test]
    fn test_export_without_remote_downloads() {
        let kv = MemoryStore::new();
        let mut group = docs_group();
        group.tabs.push(SavedTab::new(&Tab::new("API", "https://docs.rs/x"), 1));
        seed(&kv, vec![group], Settings::default());
        let browser = FakeBrowser::default();
        let downloads = FakeDownloads::default();
        let keeper = TabKeeper::new(&kv, &browser, &downloads);

        let report = block_on(keeper.export_group(0, 5)).unwrap().unwrap();

        assert_eq!(report.exported_tabs, 1);
        assert_eq!(downloads.files.borrow()[0].0, "Docs.md");
        assert_eq!(downloads.files.borrow()[0].1, "* [[API]] - https://docs.rs/x");
    }

    #[test]
    fn test_export_to_remote() {
        let kv = MemoryStore::new();
        let mut group = docs_group();
        group.export_path = "Inbox/docs".to_string();
        group.tabs.push(SavedTab::new(&Tab::new("API", "https://docs.rs/x"), 1));
        seed(&kv, vec![group], Settings::default());
        let browser = FakeBrowser::default();
        let downloads = FakeDownloads::default();
        let remote = FakeRemote::default();
        let keeper = TabKeeper::new(&kv, &browser, &downloads);

        block_on(keeper.export_group_to(0, Some(&remote), 5)).unwrap();

        assert!(remote.documents.borrow().contains_key("Inbox/docs.md"));
        assert!(downloads.files.borrow().is_empty());
        let groups = block_on(keeper.load_groups(6)).unwrap();
        assert_eq!(groups.groups[0].last_exported_at, Some(5));
    }

    #[test]
    fn test_delete_tab_records_history() {
        let kv = MemoryStore::new();
        let mut group = docs_group();
        group.tabs.push(SavedTab::new(&Tab::new("API", "https://docs.rs/x"), 1));
        seed(&kv, vec![group], Settings::default());
        let browser = FakeBrowser::default();
        let downloads = FakeDownloads::default();
        let keeper = TabKeeper::new(&kv, &browser, &downloads);

        let removed = block_on(keeper.delete_tab(0, 0, 10)).unwrap().unwrap();

        assert_eq!(removed.url, "https://docs.rs/x");
        let history = block_on(keeper.recently_removed()).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].group, "Docs");
        assert_eq!(history[0].removed_at, 10);
        assert!(block_on(keeper.delete_tab(0, 0, 11)).unwrap().is_none());
    }

    #[test]
    fn test_open_and_remove_tab() {
        let kv = MemoryStore::new();
        let mut group = docs_group();
        group.tabs.push(SavedTab::new(&Tab::new("API", "https://docs.rs/x"), 1));
        seed(&kv, vec![group], Settings::default());
        let browser = FakeBrowser::default();
        let downloads = FakeDownloads::default();
        let keeper = TabKeeper::new(&kv, &browser, &downloads);

        block_on(keeper.open_and_remove_tab(0, 0, true, 10)).unwrap();

        assert_eq!(*browser.opened.borrow(), vec![("https://docs.rs/x".to_string(), false)]);
        assert!(block_on(keeper.load_groups(11)).unwrap().groups[0].tabs.is_empty());
        assert_eq!(block_on(keeper.recently_removed()).unwrap().len(), 1);
    }

    #[test]
    fn test_restore_group_keeps_tabs() {
        let kv = MemoryStore::new();
        let mut group = docs_group();
        group.tabs.push(SavedTab::new(&Tab::new("A", "https://docs.rs/a"), 1));
        group.tabs.push(SavedTab::new(&Tab::new("B", "https://docs.rs/b"), 1));
        seed(&kv, vec![group], Settings::default());
        let browser = FakeBrowser::default();
        let downloads = FakeDownloads::default();
        let keeper = TabKeeper::new(&kv, &browser, &downloads);

        assert_eq!(block_on(keeper.restore_group(0, 5)).unwrap(), 2);

        assert_eq!(browser.opened_urls(), vec!["https://docs.rs/a", "https://docs.rs/b"]);
        assert_eq!(block_on(keeper.load_groups(6)).unwrap().total_tabs(), 2);
        assert_eq!(block_on(keeper.restore_group(4, 5)).unwrap(), 0);
    }

    #[test]
    fn test_restore_and_delete_group() {
        let kv = MemoryStore::new();
        let mut group = docs_group();
        group.tabs.push(SavedTab::new(&Tab::new("A", "https://docs.rs/a"), 1));
        group.tabs.push(SavedTab::new(&Tab::new("B", "https://docs.rs/b"), 1));
        seed(&kv, vec![group], Settings::default());
        let browser = FakeBrowser::default();
        let downloads = FakeDownloads::default();
        let keeper = TabKeeper::new(&kv, &browser, &downloads);

        let restored = block_on(keeper.restore_and_delete_group(0, 5)).unwrap();

        assert_eq!(restored, 2);
        assert_eq!(browser.opened_urls().len(), 2);
        let groups = block_on(keeper.load_groups(6)).unwrap();
        assert_eq!(groups.len(), 1);
        assert!(groups.groups[0].tabs.is_empty());
        let history = block_on(keeper.recently_removed()).unwrap();
        assert_eq!(history[0].tab.url, "https://docs.rs/b");
    }

    #[test]
    fn test_restore_removed_only_opens() {
        let kv = MemoryStore::new();
        let browser = FakeBrowser::default();
        let downloads = FakeDownloads::default();
        let keeper = TabKeeper::new(&kv, &browser, &downloads);
        let entry = RemovedTab::new(SavedTab::new(&Tab::new("A", "https://a.com"), 1), "Docs", 2);

        block_on(keeper.restore_removed(&entry)).unwrap();

        assert_eq!(*browser.opened.borrow(), vec![("https://a.com".to_string(), true)]);
        assert!(kv.is_empty());
    }

    #[test]
    fn test_remove_duplicates_and_moves() {
        let kv = MemoryStore::new();
        let mut group = docs_group();
        group.tabs.push(SavedTab::new(&Tab::new("A", "https://docs.rs/a"), 1));
        group.tabs.push(SavedTab::new(&Tab::new("A", "https://docs.rs/a"), 2));
        seed(&kv, vec![group, Group::new("Later")], Settings::default());
        let browser = FakeBrowser::default();
        let downloads = FakeDownloads::default();
        let keeper = TabKeeper::new(&kv, &browser, &downloads);

        assert_eq!(block_on(keeper.remove_duplicates(0, 3)).unwrap(), 1);
        assert!(block_on(keeper.move_tab_down(0, 0, false, 4)).unwrap());
        assert!(block_on(keeper.move_group_up(1, 5)).unwrap());

        let groups = block_on(keeper.load_groups(6)).unwrap();
        assert_eq!(groups.groups[0].name, "Later");
        assert_eq!(groups.groups[0].tabs.len(), 1);
        assert!(!block_on(keeper.move_group_down(1, 7)).unwrap());
    }

    #[test]
    fn test_settings_backup_round_trip() {
        let kv = MemoryStore::new();
        seed(&kv, vec![docs_group()], Settings { popup_tab_count: 9, ..Settings::default() });
        let browser = FakeBrowser::default();
        let downloads = FakeDownloads::default();
        let keeper = TabKeeper::new(&kv, &browser, &downloads);

        let filename = block_on(keeper.export_settings(0)).unwrap();
        assert_eq!(filename, "tab_saver_settings_1970-01-01T00-00-00-000Z.json");
        let backup = downloads.files.borrow()[0].1.clone();

        let other = MemoryStore::new();
        let restored = TabKeeper::new(&other, &browser, &downloads);
        block_on(restored.import_settings(&backup)).unwrap();

        assert_eq!(block_on(restored.settings()).unwrap().popup_tab_count, 9);
        assert_eq!(block_on(restored.load_groups(1)).unwrap().groups[0].name, "Docs");
        assert!(block_on(restored.import_settings("{\"groups\": []}")).is_err());
    }

    #[test]
    fn test_add_rename_and_delete_groups() {
        let kv = MemoryStore::new();
        let browser = FakeBrowser::default();
        let downloads = FakeDownloads::default();
        let keeper = TabKeeper::new(&kv, &browser, &downloads);

        assert_eq!(block_on(keeper.add_group(None, 1)).unwrap(), 0);
        assert_eq!(block_on(keeper.add_group(Some("Docs"), 1)).unwrap(), 1);
        assert!(matches!(
            block_on(keeper.add_group(Some("Docs"), 1)),
            Err(TabKeeperError::DuplicateGroupName(_))
        ));

        assert!(block_on(keeper.rename_group(0, "Inbox", 2)).unwrap());
        assert!(block_on(keeper.rename_group(0, "Docs", 2)).is_err());

        let deleted = block_on(keeper.delete_group(1, 3)).unwrap();
        assert_eq!(deleted.map(|g| g.name), Some("Docs".to_string()));
        assert!(block_on(keeper.delete_group(5, 3)).unwrap().is_none());

        let groups = block_on(keeper.load_groups(4)).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups.groups[0].name, "Inbox");
    }

    #[test]
    fn test_configure_group() {
        let kv = MemoryStore::new();
        seed(&kv, vec![docs_group()], Settings::default());
        let browser = FakeBrowser::default();
        let downloads = FakeDownloads::default();
        let keeper = TabKeeper::new(&kv, &browser, &downloads);

        assert!(block_on(keeper.set_group_rules(0, RuleSet::default(), 1)).unwrap());
        assert!(block_on(keeper.set_group_export(0, "Inbox/docs", "- ${url}", ExportMode::AppendNew, 1)).unwrap());
        assert!(!block_on(keeper.set_group_export(3, "x", "y", ExportMode::Overwrite, 1)).unwrap());

        let group = block_on(keeper.load_groups(2)).unwrap().groups[0].clone();
        assert_eq!(group.rules, RuleSet::default());
        assert_eq!(group.export_path, "Inbox/docs");
        assert_eq!(group.template(), "- ${url}");
        assert_eq!(group.export_mode, ExportMode::AppendNew);
    }

    #[test]
    fn test_drag_and_drop_moves() {
        let kv = MemoryStore::new();
        let mut group = docs_group();
        group.tabs.push(SavedTab::new(&Tab::new("A", "https://docs.rs/a"), 1));
        group.tabs.push(SavedTab::new(&Tab::new("B", "https://docs.rs/b"), 1));
        seed(&kv, vec![group, Group::new("Later")], Settings::default());
        let browser = FakeBrowser::default();
        let downloads = FakeDownloads::default();
        let keeper = TabKeeper::new(&kv, &browser, &downloads);

        assert!(block_on(keeper.move_tab(0, 1, 0, 0, 2)).unwrap());
        assert!(block_on(keeper.move_tab_to_group(0, 0, 1, 3)).unwrap());
        assert!(!block_on(keeper.move_tab_to_group(1, 0, 1, 4)).unwrap());

        let groups = block_on(keeper.load_groups(5)).unwrap();
        assert_eq!(groups.groups[0].tabs[0].title, "A");
        assert_eq!(groups.groups[0].tabs.len(), 1);
        assert_eq!(groups.groups[1].tabs[0].title, "B");
    }

    #[test]
    fn test_import_urls_into_group() {
        let kv = MemoryStore::new();
        let mut group = docs_group();
        group.tabs.push(SavedTab::new(&Tab::new("A", "https://docs.rs/a"), 1));
        seed(&kv, vec![group], Settings::default());
        let browser = FakeBrowser::default();
        let downloads = FakeDownloads::default();
        let keeper = TabKeeper::new(&kv, &browser, &downloads);

        let text = "https://docs.rs/a\n\n  https://docs.rs/b \nhttps://docs.rs/b\n";
        assert_eq!(block_on(keeper.import_urls_into_group(0, text, 7)).unwrap(), 1);
        assert_eq!(block_on(keeper.import_urls_into_group(0, "  \n", 8)).unwrap(), 0);

        let groups = block_on(keeper.load_groups(9)).unwrap();
        let added = &groups.groups[0].tabs[1];
        assert_eq!(added.title, "https://docs.rs/b");
        assert_eq!(added.saved_at, Some(7));
    }
}

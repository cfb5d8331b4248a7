/// Assigning captured tabs to groups
///
/// Groups are scanned from last to first, so newer groups win ties. A tab
/// no group accepts goes to a fallback group, created on first use. The
/// batch path falls back to "Ungrouped", single-tab classification to
/// "Auto Group". A group without rules accepts every tab, fallback groups
/// included, so once created it catches the tabs older groups would take.
use std::collections::HashSet;

use crate::rules::CompiledRules;
use crate::settings::DuplicatePolicy;
use crate::storage::GroupStore;
use crate::tab_data::{AUTO_GROUP, Group, SavedTab, Tab, UNGROUPED};

/// Where one tab ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub url: String,
    pub group: usize,
}

/// Result of classifying a batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    /// Urls refused by the duplicate policy, in input order
    pub rejected: Vec<String>,
    pub placements: Vec<Placement>,
}

impl Classification {
    pub fn is_rejected(&self, url: &str) -> bool {
        self.rejected.iter().any(|u| u == url)
    }
}

/// Result of classifying a single tab
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SingleClassification {
    pub group: usize,
    /// False when the destination already held the url
    pub inserted: bool,
}

enum Outcome {
    Placed(usize),
    Rejected(Option<usize>),
}

/// Rules compiled once per snapshot, plus the set of urls already saved
struct Classifier {
    compiled: Vec<CompiledRules>,
    saved_urls: HashSet<String>,
    policy: DuplicatePolicy,
}

impl Classifier {
    fn new(store: &GroupStore, policy: DuplicatePolicy) -> Classifier {
        let compiled = store
            .groups
            .iter()
            .map(|g| CompiledRules::compile(&g.rules))
            .collect();
        let saved_urls = if policy.refuse_existing {
            store
                .groups
                .iter()
                .flat_map(|g| g.tabs.iter().map(|t| t.url.clone()))
                .collect()
        } else {
            HashSet::new()
        };
        Classifier {
            compiled,
            saved_urls,
            policy,
        }
    }

    /// Last group whose rules accept the tab
    fn find_group(&self, store: &GroupStore, tab: &Tab) -> Option<usize> {
        (0..store.len()).rev().find(|&i| self.compiled[i].matches(tab))
    }

    fn is_refused(&self, group: Option<&Group>, url: &str) -> bool {
        if self.policy.refuse_existing && self.saved_urls.contains(url) {
            return true;
        }
        self.policy.refuse_existing_in_group && group.is_some_and(|g| g.contains_url(url))
    }

    fn place(&mut self, store: &mut GroupStore, tab: &Tab, fallback: &str, now: i64) -> Outcome {
        let destination = self
            .find_group(store, tab)
            .or_else(|| store.find_group_by_name(fallback));

        if self.is_refused(destination.and_then(|i| store.get(i)), &tab.url) {
            log::debug!("Refusing already saved url {}", tab.url);
            return Outcome::Rejected(destination);
        }

        let index = match destination {
            Some(index) => index,
            None => {
                log::info!("No group matches {}, creating \"{}\"", tab.url, fallback);
                let group = Group::fallback(fallback);
                self.compiled.push(CompiledRules::compile(&group.rules));
                store.groups.push(group);
                store.len() - 1
            }
        };

        store.groups[index].tabs.push(SavedTab::new(tab, now));
        if self.policy.refuse_existing {
            self.saved_urls.insert(tab.url.clone());
        }
        Outcome::Placed(index)
    }
}

/// Classify a batch of tabs against one snapshot of the groups.
///
/// The caller persists `store` once afterwards.
pub fn classify_batch(
    store: &mut GroupStore,
    tabs: &[Tab],
    policy: DuplicatePolicy,
    now: i64,
) -> Classification {
    let mut classifier = Classifier::new(store, policy);
    let mut result = Classification::default();

    for tab in tabs {
        match classifier.place(store, tab, UNGROUPED, now) {
            Outcome::Placed(group) => result.placements.push(Placement {
                url: tab.url.clone(),
                group,
            }),
            Outcome::Rejected(_) => result.rejected.push(tab.url.clone()),
        }
    }

    log::info!(
        "Classified {} tab(s), {} rejected",
        result.placements.len(),
        result.rejected.len()
    );
    result
}

/// Classify one tab, falling back to "Auto Group".
///
/// A url already in the destination group is never added twice; the global
/// part of `policy` still applies. `None` means the tab was refused before
/// any group was chosen.
pub fn classify_single(
    store: &mut GroupStore,
    tab: &Tab,
    policy: DuplicatePolicy,
    now: i64,
) -> Option<SingleClassification> {
    let policy = DuplicatePolicy {
        refuse_existing_in_group: true,
        ..policy
    };
    let mut classifier = Classifier::new(store, policy);

    match classifier.place(store, tab, AUTO_GROUP, now) {
        Outcome::Placed(group) => Some(SingleClassification {
            group,
            inserted: true,
        }),
        Outcome::Rejected(group) => group.map(|group| SingleClassification {
            group,
            inserted: false,
        }),
    }
}

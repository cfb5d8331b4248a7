/// Data structures for Tab Keeper
use serde::{Deserialize, Serialize};

/// Template used when a group has none configured
pub const DEFAULT_EXPORT_TEMPLATE: &str = "* [[${title}]] - ${url}";

/// Fallback group receiving unmatched tabs from batch saves and imports
pub const UNGROUPED: &str = "Ungrouped";

/// Fallback group receiving unmatched tabs from single-tab classification
pub const AUTO_GROUP: &str = "Auto Group";

/// A title/url pair, the unit the classifier works on
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tab {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
}

impl Tab {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Tab {
        Tab {
            title: title.into(),
            url: url.into(),
        }
    }
}

/// Information about a live browser tab
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapturedTab {
    pub id: i32,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub pinned: bool,
}

impl CapturedTab {
    pub fn new(id: i32, url: String, title: String, pinned: bool) -> CapturedTab {
        CapturedTab {
            id,
            url,
            title,
            pinned,
        }
    }

    pub fn to_tab(&self) -> Tab {
        Tab::new(self.title.clone(), self.url.clone())
    }

    /// Browser-internal pages and pinned tabs are never closed after saving
    pub fn is_closable(&self) -> bool {
        if self.url.is_empty() || self.pinned {
            return false;
        }
        !["chrome://", "chrome-extension://", "about:"]
            .iter()
            .any(|prefix| self.url.starts_with(prefix))
    }
}

/// A tab stored inside a group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedTab {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    /// Insertion time in ms; absent on records written before it existed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<i64>,
}

impl SavedTab {
    pub fn new(tab: &Tab, saved_at: i64) -> SavedTab {
        SavedTab {
            title: tab.title.clone(),
            url: tab.url.clone(),
            saved_at: Some(saved_at),
        }
    }

    /// Stamp `now` if the tab predates `savedAt`. Returns true when stamped.
    pub fn backfill_saved_at(&mut self, now: i64) -> bool {
        if self.saved_at.is_none() {
            self.saved_at = Some(now);
            true
        } else {
            false
        }
    }

    pub fn to_tab(&self) -> Tab {
        Tab::new(self.title.clone(), self.url.clone())
    }
}

/// Title and url regex lists
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternLists {
    #[serde(default)]
    pub title: Vec<String>,
    #[serde(default)]
    pub url: Vec<String>,
}

/// Whitelist/blacklist rules deciding group membership
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSet {
    #[serde(default)]
    pub whitelist: PatternLists,
    #[serde(default)]
    pub blacklist: PatternLists,
    #[serde(default)]
    pub match_all: bool,
}

/// Which tabs an export writes, relative to the previously published content
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExportMode {
    AppendNew,
    AppendRecent,
    Overwrite,
    /// Unknown stored values fall back here, like a missing mode
    #[default]
    #[serde(other)]
    AppendAll,
}

impl ExportMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportMode::AppendAll => "append-all",
            ExportMode::AppendNew => "append-new",
            ExportMode::AppendRecent => "append-recent",
            ExportMode::Overwrite => "overwrite",
        }
    }

    /// Whether the mode concatenates onto previously published content
    pub fn reads_previous(&self) -> bool {
        !matches!(self, ExportMode::Overwrite)
    }
}

/// A named bucket of saved tabs with its own rules and export settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub name: String,
    #[serde(default)]
    pub rules: RuleSet,
    #[serde(default)]
    pub tabs: Vec<SavedTab>,
    #[serde(default)]
    pub export_path: String,
    #[serde(default)]
    pub export_template: String,
    #[serde(default)]
    pub export_mode: ExportMode,
    #[serde(default)]
    pub last_exported_at: Option<i64>,
}

impl Group {
    /// A user-created group: match-all rules, default template, append-all
    pub fn new(name: impl Into<String>) -> Group {
        Group {
            name: name.into(),
            rules: RuleSet {
                match_all: true,
                ..RuleSet::default()
            },
            tabs: Vec::new(),
            export_path: String::new(),
            export_template: DEFAULT_EXPORT_TEMPLATE.to_string(),
            export_mode: ExportMode::AppendAll,
            last_exported_at: None,
        }
    }

    /// A classifier-created group, holding no rules of its own
    pub fn fallback(name: &str) -> Group {
        Group {
            rules: RuleSet::default(),
            ..Group::new(name)
        }
    }

    /// Template in effect, substituting the default for a blank one
    pub fn template(&self) -> &str {
        if self.export_template.is_empty() {
            DEFAULT_EXPORT_TEMPLATE
        } else {
            &self.export_template
        }
    }

    pub fn contains_url(&self, url: &str) -> bool {
        self.tabs.iter().any(|t| t.url == url)
    }
}

/// An entry of the recently-removed history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovedTab {
    #[serde(flatten)]
    pub tab: SavedTab,
    pub removed_at: i64,
    /// Name of the group the tab was removed from
    #[serde(default)]
    pub group: String,
}

impl RemovedTab {
    pub fn new(tab: SavedTab, group: &str, removed_at: i64) -> RemovedTab {
        RemovedTab {
            tab,
            removed_at,
            group: group.to_string(),
        }
    }
}

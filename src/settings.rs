/// User settings and the settings/rulebook backup format
use serde::{Deserialize, Serialize};

use crate::error::{Result, TabKeeperError};
use crate::store::{GROUPS_KEY, KeyValueStore, SETTINGS_KEY, load_json, save_json};
use crate::tab_data::Group;

pub const DEFAULT_POPUP_TAB_COUNT: usize = 5;

/// Flat settings record stored under `settings`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub popup_tab_count: usize,
    pub close_on_save_one: bool,
    pub close_on_save_all: bool,
    pub refuse_existing_tabs: bool,
    pub refuse_existing_tabs_group: bool,
    #[serde(alias = "obsidianEnabled")]
    pub remote_integration_enabled: bool,
    #[serde(alias = "obsidianApiKey")]
    pub remote_api_key: String,
    #[serde(alias = "obsidianApiPath")]
    pub remote_api_path: String,
    pub display_raw_links: bool,
    pub disable_drag_drop: bool,
    pub shift_drag_drop: bool,
    pub disable_save_all_confirm: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            popup_tab_count: DEFAULT_POPUP_TAB_COUNT,
            close_on_save_one: false,
            close_on_save_all: false,
            refuse_existing_tabs: false,
            refuse_existing_tabs_group: false,
            remote_integration_enabled: false,
            remote_api_key: String::new(),
            remote_api_path: String::new(),
            display_raw_links: false,
            disable_drag_drop: false,
            shift_drag_drop: false,
            disable_save_all_confirm: false,
        }
    }
}

/// Endpoint and credential of the remote document API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    pub endpoint: String,
    pub api_key: String,
}

/// Which existing urls make the classifier refuse a tab
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DuplicatePolicy {
    /// Refuse urls present in any group
    pub refuse_existing: bool,
    /// Refuse urls present in the destination group
    pub refuse_existing_in_group: bool,
}

impl Settings {
    /// Remote sink, only when the integration is on and fully configured
    pub fn remote(&self) -> Option<RemoteConfig> {
        let endpoint = self.remote_api_path.trim();
        let api_key = self.remote_api_key.trim();
        if !self.remote_integration_enabled || endpoint.is_empty() || api_key.is_empty() {
            return None;
        }
        Some(RemoteConfig {
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn duplicate_policy(&self) -> DuplicatePolicy {
        DuplicatePolicy {
            refuse_existing: self.refuse_existing_tabs,
            refuse_existing_in_group: self.refuse_existing_tabs_group,
        }
    }

    /// Capacity of the last-saved list; zero is treated as unset
    pub fn popup_capacity(&self) -> usize {
        if self.popup_tab_count == 0 {
            DEFAULT_POPUP_TAB_COUNT
        } else {
            self.popup_tab_count
        }
    }

    pub async fn load<S: KeyValueStore>(store: &S) -> Result<Settings> {
        Ok(load_json(store, SETTINGS_KEY).await?.unwrap_or_default())
    }

    pub async fn save<S: KeyValueStore>(&self, store: &S) -> Result<()> {
        save_json(store, SETTINGS_KEY, self).await
    }
}

/// Backup of settings plus the whole rulebook
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsBundle {
    pub settings: Settings,
    pub groups: Vec<Group>,
}

impl SettingsBundle {
    pub async fn collect<S: KeyValueStore>(store: &S) -> Result<SettingsBundle> {
        let settings = Settings::load(store).await?;
        let groups = load_json(store, GROUPS_KEY).await?.unwrap_or_default();
        Ok(SettingsBundle { settings, groups })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a backup, requiring both a settings object and a groups array
    pub fn from_json(text: &str) -> Result<SettingsBundle> {
        let value: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| TabKeeperError::InvalidSettingsBundle(e.to_string()))?;

        if !value.get("settings").is_some_and(|s| s.is_object()) {
            return Err(TabKeeperError::InvalidSettingsBundle(
                "missing settings".to_string(),
            ));
        }
        if !value.get("groups").is_some_and(|g| g.is_array()) {
            return Err(TabKeeperError::InvalidSettingsBundle(
                "missing groups".to_string(),
            ));
        }

        serde_json::from_value(value)
            .map_err(|e| TabKeeperError::InvalidSettingsBundle(e.to_string()))
    }

    /// Replace both records in the store
    pub async fn apply<S: KeyValueStore>(&self, store: &S) -> Result<()> {
        self.settings.save(store).await?;
        save_json(store, GROUPS_KEY, &self.groups).await?;
        log::info!(
            "Imported settings and {} group(s) from backup",
            self.groups.len()
        );
        Ok(())
    }

    /// File name for a backup taken at `now` (ms epoch)
    pub fn file_name(now: i64) -> String {
        let stamp = crate::template::iso_timestamp(now).replace([':', '.'], "-");
        format!("tab_saver_settings_{}.json", stamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use futures::executor::block_on;

    #[test]
    fn test_defaults_for_missing_fields() {
        let settings: Settings = serde_json::from_str(r#"{ "closeOnSaveAll": true }"#).unwrap();

        assert!(settings.close_on_save_all);
        assert_eq!(settings.popup_tab_count, 5);
        assert!(!settings.refuse_existing_tabs);
        assert!(settings.remote().is_none());
    }

    #[test]
    fn test_remote_requires_all_fields() {
        let mut settings = Settings {
            remote_integration_enabled: true,
            remote_api_key: "secret".to_string(),
            ..Settings::default()
        };
        assert!(settings.remote().is_none());

        settings.remote_api_path = "https://127.0.0.1:27124/".to_string();
        let remote = settings.remote().unwrap();
        assert_eq!(remote.api_key, "secret");

        settings.remote_integration_enabled = false;
        assert!(settings.remote().is_none());
    }

    #[test]
    fn test_legacy_remote_aliases() {
        let json = r#"{
            "obsidianEnabled": true,
            "obsidianApiKey": "k",
            "obsidianApiPath": "https://localhost:27124"
        }"#;
        let settings: Settings = serde_json::from_str(json).unwrap();

        assert_eq!(
            settings.remote(),
            Some(RemoteConfig {
                endpoint: "https://localhost:27124".to_string(),
                api_key: "k".to_string(),
            })
        );
    }

    #[test]
    fn test_duplicate_policy() {
        let settings = Settings {
            refuse_existing_tabs_group: true,
            ..Settings::default()
        };
        let policy = settings.duplicate_policy();
        assert!(!policy.refuse_existing);
        assert!(policy.refuse_existing_in_group);
    }

    #[test]
    fn test_zero_popup_count_uses_default() {
        let settings = Settings {
            popup_tab_count: 0,
            ..Settings::default()
        };
        assert_eq!(settings.popup_capacity(), DEFAULT_POPUP_TAB_COUNT);
    }

    #[test]
    fn test_bundle_rejects_missing_groups() {
        let result = SettingsBundle::from_json(r#"{ "settings": {} }"#);
        assert!(matches!(result, Err(TabKeeperError::InvalidSettingsBundle(_))));

        let result = SettingsBundle::from_json("not json");
        assert!(matches!(result, Err(TabKeeperError::InvalidSettingsBundle(_))));
    }

    #[test]
    fn test_bundle_apply_and_collect() {
        let store = MemoryStore::new();
        let bundle = SettingsBundle::from_json(
            r#"{ "settings": { "popupTabCount": 8 }, "groups": [{ "name": "Docs" }] }"#,
        )
        .unwrap();

        block_on(bundle.apply(&store)).unwrap();
        let collected = block_on(SettingsBundle::collect(&store)).unwrap();

        assert_eq!(collected.settings.popup_tab_count, 8);
        assert_eq!(collected.groups.len(), 1);
        assert_eq!(collected.groups[0].name, "Docs");
    }

    #[test]
    fn test_bundle_file_name() {
        // 2024-05-01T12:00:00.000Z
        let name = SettingsBundle::file_name(1_714_564_800_000);
        assert_eq!(name, "tab_saver_settings_2024-05-01T12-00-00-000Z.json");
    }
}

/// Chrome extension APIs behind the store, tab and download traits
use serde::Serialize;
use serde_json::Value;
use wasm_bindgen::prelude::*;

use crate::actions::{TabSink, TabSource};
use crate::error::{Result, TabKeeperError};
use crate::export::DownloadSink;
use crate::store::KeyValueStore;
use crate::tab_data::CapturedTab;

#[wasm_bindgen(module = "/bridge.js")]
extern "C" {
    #[wasm_bindgen(catch)]
    async fn storageGet(key: &str) -> std::result::Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn storageSet(key: &str, value: JsValue) -> std::result::Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn storageRemove(key: &str) -> std::result::Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn queryActiveTab() -> std::result::Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn queryTabs(all_windows: bool) -> std::result::Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn createTab(url: &str, active: bool) -> std::result::Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn removeTabs(tab_ids: JsValue) -> std::result::Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    fn downloadText(filename: &str, content: &str) -> std::result::Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn openFullView() -> std::result::Result<(), JsValue>;
}

/// Current time in ms since epoch
pub fn now() -> i64 {
    js_sys::Date::now() as i64
}

pub async fn open_full_view() -> Result<()> {
    openFullView()
        .await
        .map_err(|e| TabKeeperError::TabApi(format!("{:?}", e)))
}

fn to_js<T: Serialize>(value: &T) -> std::result::Result<JsValue, String> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| format!("Failed to serialize: {:?}", e))
}

/// `chrome.storage.local`
#[derive(Debug, Default, Clone, Copy)]
pub struct ChromeStore;

impl KeyValueStore for ChromeStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let js = storageGet(key)
            .await
            .map_err(|e| TabKeeperError::Storage(format!("Failed to get {}: {:?}", key, e)))?;
        if js.is_null() || js.is_undefined() {
            return Ok(None);
        }
        serde_wasm_bindgen::from_value(js)
            .map(Some)
            .map_err(|e| TabKeeperError::Storage(format!("Failed to parse {}: {:?}", key, e)))
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let js = to_js(&value).map_err(TabKeeperError::Storage)?;
        storageSet(key, js)
            .await
            .map_err(|e| TabKeeperError::Storage(format!("Failed to save {}: {:?}", key, e)))
    }

    async fn remove(&self, key: &str) -> Result<()> {
        storageRemove(key)
            .await
            .map_err(|e| TabKeeperError::Storage(format!("Failed to remove {}: {:?}", key, e)))
    }
}

/// `chrome.tabs`
#[derive(Debug, Default, Clone, Copy)]
pub struct ChromeTabs;

impl TabSource for ChromeTabs {
    async fn active_tab(&self) -> Result<Option<CapturedTab>> {
        let js = queryActiveTab()
            .await
            .map_err(|e| TabKeeperError::TabApi(format!("Failed to get active tab: {:?}", e)))?;
        if js.is_null() || js.is_undefined() {
            return Ok(None);
        }
        serde_wasm_bindgen::from_value(js)
            .map(Some)
            .map_err(|e| TabKeeperError::TabApi(format!("Failed to parse tab: {:?}", e)))
    }

    async fn tabs_in_scope(&self, all_windows: bool) -> Result<Vec<CapturedTab>> {
        let js = queryTabs(all_windows)
            .await
            .map_err(|e| TabKeeperError::TabApi(format!("Failed to get tabs: {:?}", e)))?;
        serde_wasm_bindgen::from_value(js)
            .map_err(|e| TabKeeperError::TabApi(format!("Failed to parse tabs: {:?}", e)))
    }
}

impl TabSink for ChromeTabs {
    async fn open(&self, url: &str, active: bool) -> Result<()> {
        createTab(url, active)
            .await
            .map_err(|e| TabKeeperError::TabApi(format!("Failed to open {}: {:?}", url, e)))
    }

    async fn close(&self, ids: &[i32]) -> Result<()> {
        let tab_ids = to_js(&ids).map_err(TabKeeperError::TabApi)?;
        removeTabs(tab_ids)
            .await
            .map_err(|e| TabKeeperError::TabApi(format!("Failed to close tabs: {:?}", e)))
    }
}

/// Blob download through a temporary anchor element
#[derive(Debug, Default, Clone, Copy)]
pub struct BlobDownloads;

impl DownloadSink for BlobDownloads {
    async fn download(&self, filename: &str, content: &str) -> Result<()> {
        downloadText(filename, content)
            .map_err(|e| TabKeeperError::Download(format!("{}: {:?}", filename, e)))
    }
}

/// Tab Keeper - Chrome extension that files tabs into rule-based groups
/// and exports them to Markdown.
/// Built with Rust + WASM + Yew

pub mod actions;
pub mod browser;
pub mod classify;
pub mod error;
pub mod export;
pub mod import;
pub mod operations;
pub mod recent;
pub mod remote;
pub mod rules;
pub mod settings;
pub mod storage;
pub mod store;
pub mod tab_data;
pub mod template;
pub mod ui;

pub use error::{Result, TabKeeperError};

use wasm_bindgen::prelude::*;

// Set up panic hook for better error messages in the browser console
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

/// Number of the tabs saved across all groups, for the badge
#[wasm_bindgen]
pub async fn saved_tab_count() -> std::result::Result<usize, JsValue> {
    let groups = ui::keeper()
        .load_groups(browser::now())
        .await
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    Ok(groups.total_tabs())
}

// Start the Yew app for the popup
#[wasm_bindgen]
pub fn start_popup() {
    yew::Renderer::<ui::popup::App>::new().render();
}

// Start the Yew app for the full-page group view
#[wasm_bindgen]
pub fn start_groups_view() {
    yew::Renderer::<ui::groups::GroupsView>::new().render();
}

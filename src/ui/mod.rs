/// Yew pages of the extension
use std::sync::LazyLock;

use crate::actions::TabKeeper;
use crate::browser::{BlobDownloads, ChromeStore, ChromeTabs};

pub mod groups;
pub mod popup;

static STORE: ChromeStore = ChromeStore;
static TABS: ChromeTabs = ChromeTabs;
static DOWNLOADS: BlobDownloads = BlobDownloads;

type BrowserKeeper = TabKeeper<'static, ChromeStore, ChromeTabs, BlobDownloads>;

// One instance per page, so group updates from every view share one queue
static KEEPER: LazyLock<BrowserKeeper> = LazyLock::new(|| TabKeeper::new(&STORE, &TABS, &DOWNLOADS));

/// Flows bound to the browser's storage, tabs and downloads
pub(crate) fn keeper() -> &'static BrowserKeeper {
    &KEEPER
}

/// Ask the user to confirm; without a window, assume yes
pub(crate) fn confirm(message: &str) -> bool {
    web_sys::window()
        .and_then(|w| w.confirm_with_message(message).ok())
        .unwrap_or(true)
}

/// Ask the user for text; `None` when cancelled or without a window
pub(crate) fn prompt(message: &str, default: &str) -> Option<String> {
    web_sys::window()
        .and_then(|w| w.prompt_with_message_and_default(message, default).ok())
        .flatten()
}

/// Link extraction from Markdown or plain-text files
///
/// Three passes, earlier passes taking precedence for a url:
/// 1. `[title](url)` links
/// 2. `[[title]] - url` lines, the shape the default export template writes
/// 3. bare urls, titled after the nearest preceding non-empty line that
///    holds no url (its first `[title]` token if it has one)
///
/// Urls without a usable title are titled with the url itself.
use std::collections::HashSet;
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use crate::tab_data::Tab;

static MARKDOWN_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([^\]]+)\]\((https?://[^)]+)\)").expect("markdown link pattern is valid")
});

static WIKI_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[\[([^\]]+)\]\]\s*-\s*(https?://\S+)").expect("wiki link pattern is valid")
});

static BARE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://[\w\-._~:/?#\[\]@!$&'()*+,;=%]+").expect("url pattern is valid")
});

static BRACKETED_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]").expect("title pattern is valid"));

#[derive(Default)]
struct Links {
    tabs: Vec<Tab>,
    seen: HashSet<String>,
    /// Byte ranges of urls taken by the titled passes
    claimed: Vec<Range<usize>>,
}

impl Links {
    fn add(&mut self, title: &str, url: &str) {
        if !self.seen.insert(url.to_string()) {
            return;
        }
        let title = title.trim();
        let title = if title.is_empty() { url } else { title };
        self.tabs.push(Tab::new(title, url));
    }

    fn add_titled(&mut self, pattern: &Regex, text: &str) {
        for caps in pattern.captures_iter(text) {
            let (Some(title), Some(url)) = (caps.get(1), caps.get(2)) else {
                continue;
            };
            self.claimed.push(url.range());
            self.add(title.as_str(), url.as_str());
        }
    }

    fn is_claimed(&self, offset: usize) -> bool {
        self.claimed.iter().any(|range| range.contains(&offset))
    }
}

/// Title for a bare url found on line `index`
fn infer_title<'t>(lines: &[(usize, &'t str)], index: usize) -> Option<&'t str> {
    let &(_, line) = lines[..index]
        .iter()
        .rev()
        .find(|(_, line)| !line.trim().is_empty() && !BARE_URL.is_match(line))?;

    match BRACKETED_TITLE.captures(line).and_then(|caps| caps.get(1)) {
        Some(title) => Some(title.as_str()),
        None => Some(line.trim()),
    }
}

/// Extract links from `text`, unique by url, in pass order
pub fn extract_links(text: &str) -> Vec<Tab> {
    let mut links = Links::default();
    links.add_titled(&MARKDOWN_LINK, text);
    links.add_titled(&WIKI_LINK, text);

    let mut lines = Vec::new();
    let mut offset = 0;
    for line in text.split('\n') {
        lines.push((offset, line.strip_suffix('\r').unwrap_or(line)));
        offset += line.len() + 1;
    }

    for (index, (start, line)) in lines.iter().enumerate() {
        let mut bare = BARE_URL
            .find_iter(line)
            .filter(|m| !links.is_claimed(start + m.start()))
            .map(|m| m.as_str())
            .peekable();
        if bare.peek().is_none() {
            continue;
        }
        let title = infer_title(&lines, index).unwrap_or_default();
        let urls: Vec<&str> = bare.collect();
        for url in urls {
            links.add(title, url);
        }
    }

    log::debug!("Extracted {} link(s) from imported text", links.tabs.len());
    links.tabs
}

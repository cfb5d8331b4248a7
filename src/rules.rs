/// Whitelist/blacklist rule matching
///
/// Algorithm:
/// 1. Any blacklist title pattern matching the title, or blacklist url
///    pattern matching the url, rejects the tab. Blacklist always wins.
/// 2. Both whitelist lists empty → the tab passes.
/// 3. Otherwise a list matches when it is empty or one of its patterns
///    matches; `matchAll` combines the title and url results with AND,
///    otherwise with OR.
///
/// Patterns are case-insensitive. A pattern that fails to compile never
/// matches, on either list, and never aborts the caller.
use regex::{Regex, RegexBuilder};

use crate::tab_data::{PatternLists, RuleSet, Tab};

/// A rule set with its patterns compiled once
#[derive(Debug, Clone)]
pub struct CompiledRules {
    whitelist_title: Vec<Option<Regex>>,
    whitelist_url: Vec<Option<Regex>>,
    blacklist_title: Vec<Option<Regex>>,
    blacklist_url: Vec<Option<Regex>>,
    match_all: bool,
}

impl CompiledRules {
    pub fn compile(rules: &RuleSet) -> CompiledRules {
        let (whitelist_title, whitelist_url) = compile_lists(&rules.whitelist);
        let (blacklist_title, blacklist_url) = compile_lists(&rules.blacklist);
        CompiledRules {
            whitelist_title,
            whitelist_url,
            blacklist_title,
            blacklist_url,
            match_all: rules.match_all,
        }
    }

    pub fn matches(&self, tab: &Tab) -> bool {
        if any_match(&self.blacklist_title, &tab.title) || any_match(&self.blacklist_url, &tab.url) {
            return false;
        }

        if self.whitelist_title.is_empty() && self.whitelist_url.is_empty() {
            return true;
        }

        let title_match = self.whitelist_title.is_empty() || any_match(&self.whitelist_title, &tab.title);
        let url_match = self.whitelist_url.is_empty() || any_match(&self.whitelist_url, &tab.url);

        if self.match_all {
            title_match && url_match
        } else {
            title_match || url_match
        }
    }
}

/// Evaluate `rules` against `tab`, compiling the patterns on the spot
pub fn matches(tab: &Tab, rules: &RuleSet) -> bool {
    CompiledRules::compile(rules).matches(tab)
}

/// Compile one pattern case-insensitively, `None` if it is not a valid regex
pub fn compile_pattern(pattern: &str) -> Option<Regex> {
    match RegexBuilder::new(pattern).case_insensitive(true).build() {
        Ok(regex) => Some(regex),
        Err(e) => {
            log::warn!("Ignoring invalid rule pattern {:?}: {}", pattern, e);
            None
        }
    }
}

fn compile_lists(lists: &PatternLists) -> (Vec<Option<Regex>>, Vec<Option<Regex>>) {
    (compile_all(&lists.title), compile_all(&lists.url))
}

fn compile_all(patterns: &[String]) -> Vec<Option<Regex>> {
    patterns.iter().map(|p| compile_pattern(p)).collect()
}

// Invalid patterns are kept as `None` so a list holding only broken
// patterns still counts as non-empty.
fn any_match(patterns: &[Option<Regex>], value: &str) -> bool {
    patterns.iter().flatten().any(|re| re.is_match(value))
}

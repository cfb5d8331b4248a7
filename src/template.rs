/// Export templates
///
/// Grammar, parsed once per template:
/// - `${title}`, `{{tab.title}}`: tab title
/// - `${url}`, `{{tab.url}}`: tab url
/// - `{{group.name}}`, `{{timestamp}}`
/// - `{{Counter}}`: 1-based position of the tab being rendered
/// - `{{tabCount}}`: number of tabs being rendered
/// - `{{#each tabs}}...{{/each}}`: body repeated once per tab
/// - `{{#special}}...{{/special}}`: body rendered once with aggregate values
///
/// A template containing an each-block renders once as a document. Any
/// other template is rendered once per tab and the lines joined with `\n`.
/// Unknown or unterminated tags are kept as literal text.
use chrono::{DateTime, SecondsFormat, Utc};

use crate::tab_data::SavedTab;

const EACH_OPEN: &str = "#each tabs";
const EACH_CLOSE: &str = "{{/each}}";
const SPECIAL_OPEN: &str = "#special";
const SPECIAL_CLOSE: &str = "{{/special}}";

/// ISO-8601 UTC with milliseconds, e.g. `2024-05-01T12:00:00.000Z`
pub fn iso_timestamp(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Url,
    GroupName,
    Timestamp,
    Counter,
    TabCount,
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Text(String),
    /// A placeholder and the source text it was parsed from
    Field(Field, String),
    Each(Vec<Node>),
    Special(Vec<Node>),
}

/// Values available to every placeholder
#[derive(Debug, Clone)]
pub struct RenderContext<'a> {
    pub group_name: &'a str,
    pub timestamp: String,
}

impl<'a> RenderContext<'a> {
    pub fn new(group_name: &'a str, now: i64) -> Self {
        RenderContext {
            group_name,
            timestamp: iso_timestamp(now),
        }
    }
}

/// A compiled export template
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    nodes: Vec<Node>,
    has_each: bool,
}

impl Template {
    pub fn parse(source: &str) -> Template {
        let nodes = parse_nodes(source, true);
        let has_each = nodes.iter().any(|n| matches!(n, Node::Each(_)));
        Template { nodes, has_each }
    }

    /// Whether the template renders as one document around an each-block
    pub fn is_document(&self) -> bool {
        self.has_each
    }

    pub fn render(&self, ctx: &RenderContext<'_>, tabs: &[SavedTab]) -> String {
        if self.has_each {
            let mut out = String::new();
            render_nodes(&self.nodes, ctx, tabs, None, &mut out);
            out
        } else {
            tabs.iter()
                .enumerate()
                .map(|(i, tab)| {
                    let mut line = String::new();
                    render_nodes(&self.nodes, ctx, tabs, Some((i, tab)), &mut line);
                    line
                })
                .collect::<Vec<_>>()
                .join("\n")
        }
    }
}

fn parse_nodes(source: &str, allow_blocks: bool) -> Vec<Node> {
    let mut nodes = Vec::new();
    let mut text = String::new();
    let mut i = 0;

    while i < source.len() {
        let rest = &source[i..];
        if let Some((node, consumed)) = parse_tag(rest, allow_blocks) {
            if !text.is_empty() {
                nodes.push(Node::Text(std::mem::take(&mut text)));
            }
            nodes.push(node);
            i += consumed;
            continue;
        }
        let Some(ch) = rest.chars().next() else {
            break;
        };
        text.push(ch);
        i += ch.len_utf8();
    }

    if !text.is_empty() {
        nodes.push(Node::Text(text));
    }
    nodes
}

/// Parse a tag at the start of `rest`, returning it and its byte length
fn parse_tag(rest: &str, allow_blocks: bool) -> Option<(Node, usize)> {
    if let Some(after) = rest.strip_prefix("${") {
        let end = after.find('}')?;
        let field = match &after[..end] {
            "title" => Field::Title,
            "url" => Field::Url,
            _ => return None,
        };
        let consumed = 2 + end + 1;
        return Some((Node::Field(field, rest[..consumed].to_string()), consumed));
    }

    let after = rest.strip_prefix("{{")?;
    let end = after.find("}}")?;
    let name = after[..end].trim();
    let consumed = 2 + end + 2;

    if allow_blocks && (name == EACH_OPEN || name == SPECIAL_OPEN) {
        let close = if name == EACH_OPEN { EACH_CLOSE } else { SPECIAL_CLOSE };
        let body_len = rest[consumed..].find(close)?;
        let body = parse_nodes(&rest[consumed..consumed + body_len], false);
        let node = if name == EACH_OPEN {
            Node::Each(body)
        } else {
            Node::Special(body)
        };
        return Some((node, consumed + body_len + close.len()));
    }

    let field = match name {
        "tab.title" => Field::Title,
        "tab.url" => Field::Url,
        "group.name" => Field::GroupName,
        "timestamp" => Field::Timestamp,
        "Counter" | "counter" => Field::Counter,
        "tabCount" => Field::TabCount,
        _ => return None,
    };
    Some((Node::Field(field, rest[..consumed].to_string()), consumed))
}

fn render_nodes(
    nodes: &[Node],
    ctx: &RenderContext<'_>,
    tabs: &[SavedTab],
    current: Option<(usize, &SavedTab)>,
    out: &mut String,
) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Field(field, raw) => match (field, current) {
                (Field::Title, Some((_, tab))) => out.push_str(&tab.title),
                (Field::Url, Some((_, tab))) => out.push_str(&tab.url),
                (Field::Counter, Some((i, _))) => out.push_str(&(i + 1).to_string()),
                // Per-tab placeholders outside any tab stay as written
                (Field::Title | Field::Url | Field::Counter, None) => out.push_str(raw),
                (Field::GroupName, _) => out.push_str(ctx.group_name),
                (Field::Timestamp, _) => out.push_str(&ctx.timestamp),
                (Field::TabCount, _) => out.push_str(&tabs.len().to_string()),
            },
            Node::Each(body) => {
                for (i, tab) in tabs.iter().enumerate() {
                    render_nodes(body, ctx, tabs, Some((i, tab)), out);
                }
            }
            Node::Special(body) => render_nodes(body, ctx, tabs, None, out),
        }
    }
}

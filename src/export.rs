/// Group export to Markdown
///
/// The export mode decides what reaches the sink:
/// - `overwrite`: the rendered group replaces the document.
/// - `append-all`: every tab is appended to the previous content.
/// - `append-new`: only tabs whose url does not occur in the previous
///   content are appended.
/// - `append-recent`: only tabs saved after the last export are appended.
///   Tabs without `savedAt` never qualify.
///
/// Previous content can only be read back from the remote document API.
/// Without it the download sink always starts from an empty document.
use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::Result;
use crate::storage::GroupRepository;
use crate::store::KeyValueStore;
use crate::tab_data::{ExportMode, Group, SavedTab};
use crate::template::{RenderContext, Template};

static LINK_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://[^\s)\]]+").expect("link pattern is valid")
});

/// Remote notes API holding previously exported documents
#[allow(async_fn_in_trait)]
pub trait RemoteDocuments {
    /// Current document text, `None` when it does not exist
    async fn fetch(&self, path: &str) -> Result<Option<String>>;

    async fn put(&self, path: &str, content: &str) -> Result<()>;
}

/// Local file download trigger
#[allow(async_fn_in_trait)]
pub trait DownloadSink {
    async fn download(&self, filename: &str, content: &str) -> Result<()>;
}

/// Where an export was written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportTarget {
    Remote(String),
    Download(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    pub target: ExportTarget,
    /// Tabs rendered by this export (appended, or written for overwrite)
    pub exported_tabs: usize,
    pub content: String,
}

/// Text and tab count an export writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPlan {
    pub content: String,
    pub exported_tabs: usize,
}

/// Every http(s) url occurring in `text`
pub fn extract_urls(text: &str) -> HashSet<String> {
    LINK_PATTERN
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Whether `url` occurs in `text` as a whole link, not as the prefix of a
/// longer one. Catches urls with `)` or `]` that the link scan cuts short.
fn mentions_url(text: &str, url: &str) -> bool {
    !url.is_empty()
        && text.match_indices(url).any(|(start, _)| {
            text[start + url.len()..]
                .chars()
                .next()
                .is_none_or(|c| c.is_whitespace() || matches!(c, ')' | ']' | '>'))
        })
}

/// Tabs an export in `group.export_mode` writes, given the previous content
pub fn select_tabs<'g>(group: &'g Group, previous: &str) -> Vec<&'g SavedTab> {
    match group.export_mode {
        ExportMode::Overwrite | ExportMode::AppendAll => group.tabs.iter().collect(),
        ExportMode::AppendNew => {
            let existing = extract_urls(previous);
            group
                .tabs
                .iter()
                .filter(|tab| !existing.contains(&tab.url) && !mentions_url(previous, &tab.url))
                .collect()
        }
        ExportMode::AppendRecent => {
            let since = group.last_exported_at.unwrap_or(0);
            group
                .tabs
                .iter()
                .filter(|tab| tab.saved_at.is_some_and(|saved| saved > since))
                .collect()
        }
    }
}

/// Compute the full text to write for `group`
pub fn plan_export(group: &Group, previous: &str, now: i64) -> ExportPlan {
    let selected: Vec<SavedTab> = select_tabs(group, previous).into_iter().cloned().collect();
    let template = Template::parse(group.template());
    let ctx = RenderContext::new(&group.name, now);

    log::debug!(
        "Export of \"{}\" ({}) selected {} of {} tab(s)",
        group.name,
        group.export_mode.as_str(),
        selected.len(),
        group.tabs.len()
    );

    let content = match group.export_mode {
        ExportMode::Overwrite => template.render(&ctx, &selected),
        ExportMode::AppendAll => append(previous, &template.render(&ctx, &selected)),
        ExportMode::AppendNew | ExportMode::AppendRecent => {
            if selected.is_empty() {
                previous.to_string()
            } else {
                append(previous, &template.render(&ctx, &selected))
            }
        }
    };

    ExportPlan {
        content,
        exported_tabs: selected.len(),
    }
}

fn append(previous: &str, rendered: &str) -> String {
    if previous.is_empty() {
        rendered.to_string()
    } else if rendered.is_empty() {
        previous.to_string()
    } else {
        format!("{}\n{}", previous, rendered)
    }
}

fn with_md_extension(name: &str) -> String {
    if name.to_lowercase().ends_with(".md") {
        name.to_string()
    } else {
        format!("{}.md", name)
    }
}

/// Document path on the remote API: the export path, or `<name>.md`
pub fn remote_path(group: &Group) -> String {
    let path = group.export_path.trim();
    if path.is_empty() {
        with_md_extension(group.name.trim())
    } else {
        with_md_extension(path)
    }
}

/// Download file name: the group name with `/ \ ? % * : | " < >` replaced
pub fn download_file_name(group: &Group) -> String {
    let safe: String = group
        .name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | '?' | '%' | '*' | ':' | '|' | '"' | '<' | '>' => '_',
            c => c,
        })
        .collect();
    with_md_extension(&safe)
}

/// Renders groups and writes them to the remote API or a download
pub struct Exporter<'a, R: RemoteDocuments, D: DownloadSink> {
    remote: Option<&'a R>,
    downloads: &'a D,
}

impl<'a, R: RemoteDocuments, D: DownloadSink> Exporter<'a, R, D> {
    /// `remote` is `None` unless the integration is enabled and configured
    pub fn new(remote: Option<&'a R>, downloads: &'a D) -> Self {
        Exporter { remote, downloads }
    }

    /// Export the group at `index` and record `lastExportedAt`.
    ///
    /// Returns `Ok(None)` when the group no longer exists. On any sink
    /// failure nothing is persisted.
    pub async fn export<S: KeyValueStore>(
        &self,
        repo: &GroupRepository<'_, S>,
        index: usize,
        now: i64,
    ) -> Result<Option<ExportReport>> {
        let groups = repo.load(now).await?;
        let Some(group) = groups.get(index) else {
            log::warn!("Group at index {} not found, nothing exported", index);
            return Ok(None);
        };

        let report = self.write(group, now).await?;

        let name = group.name.clone();
        repo.update(now, |groups| {
            let position = groups
                .find_group_by_name(&name)
                .or_else(|| groups.get(index).map(|_| index));
            let changed = match position {
                Some(i) => {
                    groups.groups[i].last_exported_at = Some(now);
                    true
                }
                None => false,
            };
            Ok(((), changed))
        })
        .await?;

        log::info!(
            "Exported {} tab(s) of \"{}\" to {:?}",
            report.exported_tabs,
            name,
            report.target
        );
        Ok(Some(report))
    }

    async fn write(&self, group: &Group, now: i64) -> Result<ExportReport> {
        match self.remote {
            Some(remote) => {
                let path = remote_path(group);
                let previous = if group.export_mode.reads_previous() {
                    remote.fetch(&path).await?.unwrap_or_default()
                } else {
                    String::new()
                };
                let plan = plan_export(group, &previous, now);
                remote.put(&path, &plan.content).await?;
                Ok(ExportReport {
                    target: ExportTarget::Remote(path),
                    exported_tabs: plan.exported_tabs,
                    content: plan.content,
                })
            }
            None => {
                let filename = download_file_name(group);
                let plan = plan_export(group, "", now);
                self.downloads.download(&filename, &plan.content).await?;
                Ok(ExportReport {
                    target: ExportTarget::Download(filename),
                    exported_tabs: plan.exported_tabs,
                    content: plan.content,
                })
            }
        }
    }
}

/// Full-page group view: every group with its tabs, plus the
/// recently-removed history

use patternfly_yew::prelude::*;
use wasm_bindgen_futures::{JsFuture, spawn_local};
use web_sys::HtmlInputElement;
use yew::prelude::*;

use crate::browser::now;
use crate::error::Result;
use crate::export::ExportTarget;
use crate::storage::GroupStore;
use crate::tab_data::{Group, RemovedTab};
use crate::template::iso_timestamp;
use crate::ui::{confirm, keeper, prompt};

#[derive(Clone, PartialEq)]
enum ViewState {
    Loading,
    Idle,
    Busy(String),
    Notice(String),
    Error(String),
}

/// Everything a button on this page can ask for
#[derive(Clone, PartialEq)]
enum GroupAction {
    Export(usize),
    Restore(usize),
    RestoreAndDelete(usize),
    RemoveDuplicates(usize),
    MoveGroupUp(usize),
    MoveGroupDown(usize),
    OpenTab { group: usize, tab: usize, background: bool },
    OpenAndRemove { group: usize, tab: usize, background: bool },
    DeleteTab { group: usize, tab: usize },
    MoveTabUp { group: usize, tab: usize, shift: bool },
    MoveTabDown { group: usize, tab: usize, shift: bool },
    RestoreRemoved(RemovedTab),
    Import(String),
    AddGroup,
    RenameGroup(usize, String),
    DeleteGroup(usize),
    ImportUrls(usize, String),
}

impl GroupAction {
    fn busy_message(&self) -> Option<&'static str> {
        match self {
            GroupAction::Export(_) => Some("Exporting..."),
            GroupAction::Restore(_) | GroupAction::RestoreAndDelete(_) => Some("Restoring tabs..."),
            GroupAction::Import(_) => Some("Importing links..."),
            _ => None,
        }
    }
}

/// Run an action, returning a message worth showing
async fn perform(action: GroupAction) -> Result<Option<String>> {
    let keeper = keeper();
    let now = now();

    let notice = match action {
        GroupAction::Export(index) => keeper.export_group(index, now).await?.map(|report| {
            let target = match report.target {
                ExportTarget::Remote(path) => path,
                ExportTarget::Download(file) => file,
            };
            format!("Exported {} tab(s) to {}", report.exported_tabs, target)
        }),
        GroupAction::Restore(index) => {
            let opened = keeper.restore_group(index, now).await?;
            Some(format!("Opened {} tab(s)", opened))
        }
        GroupAction::RestoreAndDelete(index) => {
            let opened = keeper.restore_and_delete_group(index, now).await?;
            Some(format!("Restored {} tab(s)", opened))
        }
        GroupAction::RemoveDuplicates(index) => {
            let removed = keeper.remove_duplicates(index, now).await?;
            Some(format!("Removed {} duplicate(s)", removed))
        }
        GroupAction::MoveGroupUp(index) => {
            keeper.move_group_up(index, now).await?;
            None
        }
        GroupAction::MoveGroupDown(index) => {
            keeper.move_group_down(index, now).await?;
            None
        }
        GroupAction::OpenTab { group, tab, background } => {
            keeper.open_tab(group, tab, background, now).await?;
            None
        }
        GroupAction::OpenAndRemove { group, tab, background } => {
            keeper.open_and_remove_tab(group, tab, background, now).await?;
            None
        }
        GroupAction::DeleteTab { group, tab } => {
            keeper.delete_tab(group, tab, now).await?;
            None
        }
        GroupAction::MoveTabUp { group, tab, shift } => {
            keeper.move_tab_up(group, tab, shift, now).await?;
            None
        }
        GroupAction::MoveTabDown { group, tab, shift } => {
            keeper.move_tab_down(group, tab, shift, now).await?;
            None
        }
        GroupAction::RestoreRemoved(entry) => {
            keeper.restore_removed(&entry).await?;
            None
        }
        GroupAction::AddGroup => {
            keeper.add_group(None, now).await?;
            None
        }
        GroupAction::RenameGroup(index, name) => {
            keeper.rename_group(index, &name, now).await?;
            None
        }
        GroupAction::DeleteGroup(index) => keeper
            .delete_group(index, now)
            .await?
            .map(|group| format!("Deleted \"{}\"", group.name)),
        GroupAction::ImportUrls(index, text) => {
            let added = keeper.import_urls_into_group(index, &text, now).await?;
            Some(format!("Added {} url(s)", added))
        }
        GroupAction::Import(text) => {
            let report = keeper.import_markdown(&text, now).await?;
            let rejected = report.classification.rejected.len();
            Some(if report.found == 0 {
                "No links found in the selected file.".to_string()
            } else if rejected == report.found {
                "No new links were imported (all were duplicates).".to_string()
            } else {
                format!("Imported {} new link(s), {} duplicate(s) skipped", report.imported(), rejected)
            })
        }
    };
    Ok(notice)
}

async fn load_view() -> Result<(GroupStore, Vec<RemovedTab>)> {
    let keeper = keeper();
    let groups = keeper.load_groups(now()).await?;
    let removed = keeper.recently_removed().await?;
    Ok((groups, removed))
}

async fn read_selected_file(input: &HtmlInputElement) -> std::result::Result<Option<String>, String> {
    let Some(file) = input.files().and_then(|files| files.get(0)) else {
        return Ok(None);
    };
    let text = JsFuture::from(file.text())
        .await
        .map_err(|e| format!("Failed to read {}: {:?}", file.name(), e))?;
    Ok(text.as_string())
}

#[function_component(GroupsView)]
pub fn groups_view() -> Html {
    let state = use_state(|| ViewState::Loading);
    let groups = use_state(GroupStore::new);
    let removed = use_state(Vec::<RemovedTab>::new);
    let reload = use_state(|| 0u32);

    // Load on mount and after every action
    {
        let state = state.clone();
        let groups = groups.clone();
        let removed = removed.clone();

        use_effect_with(*reload, move |_| {
            spawn_local(async move {
                match load_view().await {
                    Ok((loaded, history)) => {
                        groups.set(loaded);
                        removed.set(history);
                        if matches!(*state, ViewState::Loading) {
                            state.set(ViewState::Idle);
                        }
                    }
                    Err(e) => state.set(ViewState::Error(format!("Failed to load: {}", e))),
                }
            });
            || ()
        });
    }

    let on_action = {
        let state = state.clone();
        let reload = reload.clone();

        Callback::from(move |action: GroupAction| {
            let state = state.clone();
            let reload = reload.clone();

            if let Some(msg) = action.busy_message() {
                state.set(ViewState::Busy(msg.to_string()));
            }

            spawn_local(async move {
                match perform(action).await {
                    Ok(Some(msg)) => state.set(ViewState::Notice(msg)),
                    Ok(None) => state.set(ViewState::Idle),
                    Err(e) => state.set(ViewState::Error(e.to_string())),
                }
                reload.set(*reload + 1);
            });
        })
    };

    let on_import = {
        let state = state.clone();
        let on_action = on_action.clone();

        Callback::from(move |e: Event| {
            let Some(input) = e.target_dyn_into::<HtmlInputElement>() else {
                return;
            };
            let state = state.clone();
            let on_action = on_action.clone();

            spawn_local(async move {
                match read_selected_file(&input).await {
                    Ok(Some(text)) => on_action.emit(GroupAction::Import(text)),
                    Ok(None) => {}
                    Err(e) => state.set(ViewState::Error(e)),
                }
                input.set_value("");
            });
        })
    };

    html! {
        <div class="container">
            <div class="header">
                <h1 class="main-title">{"Groups"}</h1>
                <Button onclick={on_action.reform(|_: MouseEvent| GroupAction::AddGroup)} variant={ButtonVariant::Secondary}>
                    {"New Group"}
                </Button>
                <label class="import-label">
                    {"Import links "}
                    <input type="file" accept=".md,text/markdown,text/plain" onchange={on_import} />
                </label>
            </div>

            {match &*state {
                ViewState::Loading => html! {
                    <div class="loading-text-center">
                        <Spinner />
                        <p class="loading-text">{"Loading groups..."}</p>
                    </div>
                },
                ViewState::Busy(msg) => html! {
                    <div class="loading-text-center">
                        <Spinner />
                        <p class="loading-text">{msg}</p>
                    </div>
                },
                ViewState::Notice(msg) => html! {
                    <Alert r#type={AlertType::Info} title={msg.clone()} inline={true}>
                    </Alert>
                },
                ViewState::Error(err) => html! {
                    <Alert r#type={AlertType::Danger} title={"Error"} inline={true}>
                        {err.clone()}
                    </Alert>
                },
                ViewState::Idle => html! {}
            }}

            if groups.is_empty() {
                <div class="empty-state">
                    <p>{"No groups yet."}</p>
                    <p class="empty-state-hint">{"Use the popup to save tabs."}</p>
                </div>
            } else {
                <div class="sessions-list">
                    {for groups.groups.iter().enumerate().map(|(index, group)| html! {
                        <GroupCard
                            key={group.name.clone()}
                            group={group.clone()}
                            index={index}
                            is_last={index + 1 == groups.len()}
                            on_action={on_action.clone()}
                        />
                    })}
                </div>
            }

            <RecentlyRemovedList entries={(*removed).clone()} on_action={on_action.clone()} />

            <div class="footer">
                {format!("{} groups • {} total tabs", groups.len(), groups.total_tabs())}
            </div>
        </div>
    }
}

#[derive(Properties, PartialEq)]
struct GroupCardProps {
    group: Group,
    index: usize,
    is_last: bool,
    on_action: Callback<GroupAction>,
}

#[function_component(GroupCard)]
fn group_card(props: &GroupCardProps) -> Html {
    let expanded = use_state(|| true);
    let group = &props.group;
    let index = props.index;

    let toggle_expanded = {
        let expanded = expanded.clone();
        Callback::from(move |_| {
            expanded.set(!*expanded);
        })
    };

    let emit = |action: GroupAction| props.on_action.reform(move |_: MouseEvent| action.clone());

    let on_restore_delete = {
        let on_action = props.on_action.clone();
        let name = group.name.clone();
        Callback::from(move |_: MouseEvent| {
            if confirm(&format!("Restore and delete all tabs in \"{}\"?", name)) {
                on_action.emit(GroupAction::RestoreAndDelete(index));
            }
        })
    };

    let on_rename = {
        let on_action = props.on_action.clone();
        let name = group.name.clone();
        Callback::from(move |_: MouseEvent| {
            if let Some(new_name) = prompt("Group name", &name) {
                on_action.emit(GroupAction::RenameGroup(index, new_name));
            }
        })
    };

    let on_delete = {
        let on_action = props.on_action.clone();
        let name = group.name.clone();
        Callback::from(move |_: MouseEvent| {
            if confirm(&format!("Delete \"{}\" and all its tabs?", name)) {
                on_action.emit(GroupAction::DeleteGroup(index));
            }
        })
    };

    let on_add_urls = {
        let on_action = props.on_action.clone();
        Callback::from(move |_: MouseEvent| {
            if let Some(text) = prompt("Urls to add, one per line", "") {
                on_action.emit(GroupAction::ImportUrls(index, text));
            }
        })
    };

    let exported = match group.last_exported_at {
        Some(at) => format!("exported {}", iso_timestamp(at)),
        None => "never exported".to_string(),
    };

    html! {
        <div class="session-card">
            <div class="session-header">
                <div class="session-title-container">
                    <h3 class="session-title">{&group.name}</h3>
                    <p class="session-date">
                        {format!("{} tabs • {} • {}", group.tabs.len(), group.export_mode.as_str(), exported)}
                    </p>
                </div>

                <div class="session-actions">
                    <Button onclick={toggle_expanded.reform(|_| ())} variant={ButtonVariant::Secondary}>
                        {if *expanded { "▲" } else { "▼" }}
                    </Button>
                    <Button onclick={emit(GroupAction::MoveGroupUp(index))} variant={ButtonVariant::Secondary} disabled={index == 0}>
                        {"↑"}
                    </Button>
                    <Button onclick={emit(GroupAction::MoveGroupDown(index))} variant={ButtonVariant::Secondary} disabled={props.is_last}>
                        {"↓"}
                    </Button>
                    <Button onclick={emit(GroupAction::Export(index))}>
                        {"Export"}
                    </Button>
                    <Button onclick={emit(GroupAction::Restore(index))} variant={ButtonVariant::Secondary}>
                        {"Restore"}
                    </Button>
                    <Button onclick={on_restore_delete} variant={ButtonVariant::Secondary}>
                        {"Restore & Delete"}
                    </Button>
                    <Button onclick={emit(GroupAction::RemoveDuplicates(index))} variant={ButtonVariant::Secondary}>
                        {"Dedupe"}
                    </Button>
                    <Button onclick={on_add_urls} variant={ButtonVariant::Secondary}>
                        {"Add Urls"}
                    </Button>
                    <Button onclick={on_rename} variant={ButtonVariant::Secondary}>
                        {"Rename"}
                    </Button>
                    <Button onclick={on_delete} variant={ButtonVariant::Danger}>
                        {"Delete"}
                    </Button>
                </div>
            </div>

            if *expanded {
                <div class="tabs-list">
                    {for group.tabs.iter().enumerate().map(|(tab, saved)| {
                        let on_action = props.on_action.clone();
                        let with_shift = move |make: fn(usize, usize, bool) -> GroupAction| {
                            on_action.reform(move |e: MouseEvent| make(index, tab, e.shift_key()))
                        };

                        html! {
                            <div key={format!("{}-{}", tab, saved.url)} class="tab-item">
                                <div class="tab-content">
                                    <div class="tab-title">{&saved.title}</div>
                                    <div class="tab-url">{&saved.url}</div>
                                </div>
                                <div class="tab-actions">
                                    <Button
                                        onclick={with_shift(|group, tab, background| GroupAction::OpenTab { group, tab, background })}
                                        size={ButtonSize::Small}
                                    >
                                        {"Open"}
                                    </Button>
                                    <Button
                                        onclick={with_shift(|group, tab, background| GroupAction::OpenAndRemove { group, tab, background })}
                                        size={ButtonSize::Small}
                                    >
                                        {"Open & Remove"}
                                    </Button>
                                    <Button
                                        onclick={with_shift(|group, tab, shift| GroupAction::MoveTabUp { group, tab, shift })}
                                        variant={ButtonVariant::Secondary}
                                        size={ButtonSize::Small}
                                    >
                                        {"↑"}
                                    </Button>
                                    <Button
                                        onclick={with_shift(|group, tab, shift| GroupAction::MoveTabDown { group, tab, shift })}
                                        variant={ButtonVariant::Secondary}
                                        size={ButtonSize::Small}
                                    >
                                        {"↓"}
                                    </Button>
                                    <Button
                                        onclick={emit(GroupAction::DeleteTab { group: index, tab })}
                                        variant={ButtonVariant::Danger}
                                        size={ButtonSize::Small}
                                    >
                                        {"✗"}
                                    </Button>
                                </div>
                            </div>
                        }
                    })}
                </div>
            }
        </div>
    }
}

#[derive(Properties, PartialEq)]
struct RecentlyRemovedProps {
    entries: Vec<RemovedTab>,
    on_action: Callback<GroupAction>,
}

#[function_component(RecentlyRemovedList)]
fn recently_removed_list(props: &RecentlyRemovedProps) -> Html {
    if props.entries.is_empty() {
        return html! {};
    }

    html! {
        <div class="stats-container">
            <h2 class="stats-title">{"Recently removed"}</h2>
            <div class="tabs-list">
                {for props.entries.iter().map(|entry| {
                    let restore = entry.clone();
                    html! {
                        <div class="tab-item">
                            <div class="tab-content">
                                <div class="tab-title">{&entry.tab.title}</div>
                                <div class="tab-url">
                                    {format!("{} • from {} • {}", entry.tab.url, entry.group, iso_timestamp(entry.removed_at))}
                                </div>
                            </div>
                            <div class="tab-actions">
                                <Button
                                    onclick={props.on_action.reform(move |_| GroupAction::RestoreRemoved(restore.clone()))}
                                    size={ButtonSize::Small}
                                >
                                    {"Reopen"}
                                </Button>
                            </div>
                        </div>
                    }
                })}
            </div>
        </div>
    }
}

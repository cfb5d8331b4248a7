/// Popup UI: save the current tab or all tabs, show what was saved last
use patternfly_yew::prelude::*;
use wasm_bindgen_futures::spawn_local;
use yew::prelude::*;

use crate::actions::SaveReport;
use crate::browser::{now, open_full_view};
use crate::tab_data::Tab;
use crate::ui::{confirm, keeper};

#[derive(Clone, PartialEq)]
enum AppState {
    Idle,
    Loading(String),
    Saved(String),
    Error(String),
}

#[derive(Clone, Copy, PartialEq)]
enum SaveScope {
    Current,
    Window,
    AllWindows,
}

fn summary(report: &SaveReport) -> String {
    let saved = report.classification.placements.len();
    let rejected = report.classification.rejected.len();
    let mut msg = format!("Saved {} tab(s)", saved);
    if rejected > 0 {
        msg.push_str(&format!(", {} already saved", rejected));
    }
    if report.closed > 0 {
        msg.push_str(&format!(", closed {}", report.closed));
    }
    msg
}

#[function_component(App)]
pub fn app() -> Html {
    let state = use_state(|| AppState::Idle);
    let last_saved = use_state(Vec::<Tab>::new);
    let rejected = use_state(Vec::<String>::new);

    // Load the last saved list on mount
    {
        let state = state.clone();
        let last_saved = last_saved.clone();
        use_effect_with((), move |_| {
            spawn_local(async move {
                match keeper().last_saved_tabs().await {
                    Ok(tabs) => last_saved.set(tabs),
                    Err(e) => state.set(AppState::Error(format!("Failed to load: {}", e))),
                }
            });
            || ()
        });
    }

    let on_save = {
        let state = state.clone();
        let last_saved = last_saved.clone();
        let rejected = rejected.clone();

        move |scope: SaveScope| {
            let state = state.clone();
            let last_saved = last_saved.clone();
            let rejected = rejected.clone();

            Callback::from(move |e: MouseEvent| {
                let shift = e.shift_key();
                let state = state.clone();
                let last_saved = last_saved.clone();
                let rejected = rejected.clone();

                state.set(AppState::Loading("Saving tabs...".to_string()));

                spawn_local(async move {
                    let keeper = keeper();
                    if scope != SaveScope::Current {
                        let skip_confirm = keeper
                            .settings()
                            .await
                            .map(|s| s.disable_save_all_confirm)
                            .unwrap_or(false);
                        if !skip_confirm && !confirm("Save all tabs?") {
                            state.set(AppState::Idle);
                            return;
                        }
                    }

                    let result = match scope {
                        SaveScope::Current => keeper.save_current_tab(shift, now()).await,
                        SaveScope::Window => keeper.save_all_tabs(false, now()).await,
                        SaveScope::AllWindows => keeper.save_all_tabs(true, now()).await,
                    };

                    match result {
                        Ok(report) => {
                            rejected.set(report.classification.rejected.clone());
                            state.set(AppState::Saved(summary(&report)));
                            if let Ok(tabs) = keeper.last_saved_tabs().await {
                                last_saved.set(tabs);
                            }
                        }
                        Err(e) => state.set(AppState::Error(format!("Save failed: {}", e))),
                    }
                });
            })
        }
    };

    let on_open_groups = {
        let state = state.clone();
        Callback::from(move |_| {
            let state = state.clone();
            spawn_local(async move {
                if let Err(e) = open_full_view().await {
                    state.set(AppState::Error(e.to_string()));
                }
            });
        })
    };

    let is_busy = matches!(*state, AppState::Loading(_));

    html! {
        <div class="padding-20">
            <h1 class="popup-title">{"Tab Keeper"}</h1>

            <div class="flex-column-gap">
                <Button onclick={on_save(SaveScope::Current)} disabled={is_busy} variant={ButtonVariant::Primary} block={true}>
                    {"Save Tab"}
                </Button>
                <Button onclick={on_save(SaveScope::Window)} disabled={is_busy} variant={ButtonVariant::Secondary} block={true}>
                    {"Save Window"}
                </Button>
                <Button onclick={on_save(SaveScope::AllWindows)} disabled={is_busy} variant={ButtonVariant::Secondary} block={true}>
                    {"Save All Windows"}
                </Button>
                <Button onclick={on_open_groups} variant={ButtonVariant::Secondary} block={true}>
                    {"Open Groups"}
                </Button>
            </div>

            {match &*state {
                AppState::Loading(msg) => html! {
                    <div class="loading-text-center">
                        <Spinner />
                        <p class="loading-text">{msg}</p>
                    </div>
                },
                AppState::Saved(msg) => html! {
                    <div class="message-top-margin">
                        <Alert r#type={AlertType::Success} title={msg.clone()} inline={true}>
                        </Alert>
                    </div>
                },
                AppState::Error(err) => html! {
                    <div class="message-top-margin">
                        <Alert r#type={AlertType::Danger} title={"Error"} inline={true}>
                            {err.clone()}
                        </Alert>
                    </div>
                },
                AppState::Idle => html! {}
            }}

            if !last_saved.is_empty() {
                <div class="stats-container">
                    <h2 class="stats-title">{"Last saved"}</h2>
                    <div class="stats-box">
                        {for last_saved.iter().map(|tab| {
                            let is_rejected = rejected.contains(&tab.url);
                            html! {
                                <div class={classes!("stat-item", is_rejected.then_some("rejected"))}>
                                    <span class="stat-domain" title={tab.url.clone()}>{&tab.title}</span>
                                    if is_rejected {
                                        <span class="stat-count">{"already saved"}</span>
                                    }
                                </div>
                            }
                        })}
                    </div>
                </div>
            }

            <p class="footer-popup">
                {"Tab Keeper v0.1.0"}
            </p>
        </div>
    }
}

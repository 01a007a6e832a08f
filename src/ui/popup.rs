/// Popup UI for the Tab Warden extension

use yew::prelude::*;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::HtmlInputElement;
use patternfly_yew::prelude::*;
use crate::curation;
use crate::operations::{format_time, inactive_tabs, limit_exceeded, sort_groups_for_display};
use crate::stats::{achievement_points, default_achievements, productivity_split, score_productive_day, timeline};
use crate::storage::{self, Settings};
use crate::tab_data::{CloseTabsResponse, DomainGroup, PopupRequest, TabRecord};
use crate::ui::curation::CurationWorkflow;
use std::collections::HashMap;

// Import JS bridge functions
#[wasm_bindgen(module = "/popup.js")]
extern "C" {
    #[wasm_bindgen(catch)]
    async fn getStorage(key: &str) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn setStorage(key: &str, value: JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn sendMessage(request: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn closeTab(tab_id: i32) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn getActivePageContent() -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn callGenerativeApi(prompt: &str) -> Result<JsValue, JsValue>;
}

// tabData arrives keyed by the id strings the storage layout uses
#[derive(Clone, PartialEq, Default)]
struct UsageData {
    tab_data: HashMap<String, TabRecord>,
    tab_groups: HashMap<String, DomainGroup>,
}

#[derive(Clone, PartialEq)]
enum AppState {
    Loading(String),
    Idle,
    Error(String),
}

#[derive(Clone, Copy, PartialEq)]
enum ActiveTab {
    Overview,
    Groups,
    Inactive,
    Curate,
    Settings,
}

#[function_component(App)]
pub fn app() -> Html {
    let state = use_state(|| AppState::Loading("Loading usage...".to_string()));
    let active_tab = use_state(|| ActiveTab::Overview);
    let usage = use_state(UsageData::default);
    let settings = use_state(Settings::default);
    let summary = use_state(|| None::<String>);
    let curate_domain = use_state(|| None::<String>);

    // Load usage data and settings on mount
    {
        let state = state.clone();
        let usage = usage.clone();
        let settings = settings.clone();
        use_effect_with((), move |_| {
            spawn_local(async move {
                match load_usage().await {
                    Ok(data) => {
                        usage.set(data);
                        settings.set(load_settings().await);
                        state.set(AppState::Idle);
                    }
                    Err(e) => state.set(AppState::Error(format!("Failed to load: {}", e))),
                }
            });
            || ()
        });
    }

    // Close every tab of a domain through the background worker
    let on_close_domain = {
        let state = state.clone();
        let usage = usage.clone();

        Callback::from(move |domain: String| {
            let state = state.clone();
            let usage = usage.clone();

            state.set(AppState::Loading(format!("Closing {} tabs...", domain)));
            spawn_local(async move {
                match close_domain_tabs(&domain).await {
                    Ok(response) if response.success => {
                        log::info!("closed {} tabs on {}", response.closed_count, domain);
                        if let Ok(data) = load_usage().await {
                            usage.set(data);
                        }
                        state.set(AppState::Idle);
                    }
                    Ok(_) => state.set(AppState::Error(format!("Could not close {} tabs", domain))),
                    Err(e) => state.set(AppState::Error(e)),
                }
            });
        })
    };

    // Close a single inactive tab
    let on_close_tab = {
        let state = state.clone();
        let usage = usage.clone();

        Callback::from(move |tab_id: String| {
            let Ok(id) = tab_id.parse::<i32>() else {
                return;
            };
            let state = state.clone();
            let usage = usage.clone();

            spawn_local(async move {
                if let Err(e) = closeTab(id).await {
                    state.set(AppState::Error(format!("Failed to close tab: {:?}", e)));
                    return;
                }
                // The background worker prunes the ledger on the removal
                // event; drop the row locally so the list updates now.
                let mut data = (*usage).clone();
                data.tab_data.remove(&tab_id);
                usage.set(data);
            });
        })
    };

    // Summarize the page in the active tab
    let on_summarize = {
        let state = state.clone();
        let summary = summary.clone();

        Callback::from(move |_| {
            let state = state.clone();
            let summary = summary.clone();

            state.set(AppState::Loading("Summarizing page...".to_string()));
            spawn_local(async move {
                match summarize_active_page().await {
                    Ok(text) => {
                        summary.set(Some(text));
                        state.set(AppState::Idle);
                    }
                    Err(e) => state.set(AppState::Error(e)),
                }
            });
        })
    };

    // Jump from a group row into the curation workflow
    let on_curate = {
        let active_tab = active_tab.clone();
        let curate_domain = curate_domain.clone();

        Callback::from(move |domain: String| {
            curate_domain.set(Some(domain));
            active_tab.set(ActiveTab::Curate);
        })
    };

    let on_settings_changed = {
        let state = state.clone();
        let settings = settings.clone();

        Callback::from(move |updated: Settings| {
            let state = state.clone();
            let settings = settings.clone();

            settings.set(updated.clone());
            spawn_local(async move {
                if let Err(e) = save_settings(&updated).await {
                    state.set(AppState::Error(e));
                }
            });
        })
    };

    let is_busy = matches!(*state, AppState::Loading(_));

    let on_tab_click = {
        let active_tab = active_tab.clone();
        move |tab: ActiveTab| {
            let active_tab = active_tab.clone();
            Callback::from(move |_| {
                active_tab.set(tab);
            })
        }
    };

    let nav_item = |tab: ActiveTab, label: &str| -> Html {
        let class = if *active_tab == tab {
            "pf-v5-c-tabs__item pf-m-current"
        } else {
            "pf-v5-c-tabs__item"
        };
        html! {
            <li class={class}>
                <button class="pf-v5-c-tabs__link" onclick={on_tab_click(tab)}>
                    <span class="pf-v5-c-tabs__item-text">{label}</span>
                </button>
            </li>
        }
    };

    html! {
        <div class="padding-20">
            <h1 class="popup-title">{"Tab Warden"}</h1>

            // Tab navigation
            <div class="pf-v5-c-tabs tabs-nav">
                <ul class="pf-v5-c-tabs__list">
                    {nav_item(ActiveTab::Overview, "Overview")}
                    {nav_item(ActiveTab::Groups, "Groups")}
                    {nav_item(ActiveTab::Inactive, "Inactive")}
                    {nav_item(ActiveTab::Curate, "Curate")}
                    {nav_item(ActiveTab::Settings, "Settings")}
                </ul>
            </div>

            // Status display
            {match &*state {
                AppState::Loading(msg) => html! {
                    <div class="loading-text-center">
                        <Spinner />
                        <p class="loading-text">{msg}</p>
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

            // Tab content
            <div class="tab-pane-content">
                {match *active_tab {
                    ActiveTab::Overview => view_overview(&usage, &settings, &summary, on_summarize, is_busy),
                    ActiveTab::Groups => view_groups(&usage, &settings, on_close_domain, on_curate, is_busy),
                    ActiveTab::Inactive => view_inactive(&usage, on_close_tab),
                    ActiveTab::Curate => view_curate(&usage, &curate_domain),
                    ActiveTab::Settings => view_settings(&settings, on_settings_changed),
                }}
            </div>

            <p class="footer-popup">
                {"Tab Warden v0.1.0"}
            </p>
        </div>
    }
}

fn view_overview(
    usage: &UsageData,
    settings: &Settings,
    summary: &UseStateHandle<Option<String>>,
    on_summarize: Callback<MouseEvent>,
    is_busy: bool,
) -> Html {
    if usage.tab_groups.is_empty() {
        return html! {
            <p class="empty-state">{"No data available yet. Start browsing!"}</p>
        };
    }

    let split = productivity_split(&usage.tab_data, settings);
    let total = split.total_minutes().max(1.0);

    let mut achievements = default_achievements();
    score_productive_day(&mut achievements, split);
    let points = achievement_points(&achievements);

    let groups = sort_groups_for_display(&usage.tab_groups, settings);
    let max_time = groups
        .first()
        .map(|(_, group)| group.total_time)
        .unwrap_or(1.0)
        .max(1.0);

    html! {
        <div class="flex-column-gap">
            <div class="stats-container">
                <h2 class="stats-title">{"Time Spent by Website"}</h2>
                <div class="stats-box">
                    {for groups.iter().map(|(domain, group)| html! {
                        <div class="stat-item">
                            <span class="stat-domain">{domain}</span>
                            <span class="stat-count">{format_time(group.total_time)}</span>
                            <Progress value={group.total_time / max_time * 100.0} />
                        </div>
                    })}
                </div>
            </div>

            <div class="stats-container">
                <h2 class="stats-title">{"Time Distribution"}</h2>
                <div class="stats-box">
                    <div class="stat-item">
                        <span class="stat-domain">{"Productive"}</span>
                        <span class="stat-count">{format!("{:.0}m", split.productive_minutes)}</span>
                        <Progress value={split.productive_minutes / total * 100.0} />
                    </div>
                    <div class="stat-item">
                        <span class="stat-domain">{"Social"}</span>
                        <span class="stat-count">{format!("{:.0}m", split.social_minutes)}</span>
                        <Progress value={split.social_minutes / total * 100.0} />
                    </div>
                    <div class="stat-item">
                        <span class="stat-domain">{"Other"}</span>
                        <span class="stat-count">{format!("{:.0}m", split.other_minutes)}</span>
                        <Progress value={split.other_minutes / total * 100.0} />
                    </div>
                </div>
                <p class="stats-points">{format!("Achievement points: {}", points)}</p>
            </div>

            <div class="stats-container">
                <h2 class="stats-title">{"Tab Lifecycle"}</h2>
                <div class="tab-timeline">
                    {for timeline(&usage.tab_data).into_iter().take(8).map(|(_, record)| html! {
                        <div class="timeline-item">
                            <span class="domain">{record.domain.clone()}</span>
                            <span class="duration">{format_time(record.total_active_time)}</span>
                        </div>
                    })}
                </div>
            </div>

            <Button onclick={on_summarize} disabled={is_busy} variant={ButtonVariant::Secondary} block={true}>
                {"📝 Summarize Current Page"}
            </Button>
            if let Some(text) = (**summary).clone() {
                <div class="summary-text">
                    {Html::from_html_unchecked(AttrValue::from(text))}
                </div>
            }
        </div>
    }
}

fn view_groups(
    usage: &UsageData,
    settings: &Settings,
    on_close_domain: Callback<String>,
    on_curate: Callback<String>,
    is_busy: bool,
) -> Html {
    let groups = sort_groups_for_display(&usage.tab_groups, settings);
    if groups.is_empty() {
        return html! {
            <p class="empty-state">{"No tab groups yet. Open some tabs to get started!"}</p>
        };
    }

    html! {
        <div class="flex-column-gap">
            {for groups.into_iter().map(|(domain, group)| {
                let exceeded = limit_exceeded(settings, &domain, group.total_time);
                let minutes = (group.total_time / 60_000.0).floor();
                let close = on_close_domain.reform({
                    let domain = domain.clone();
                    move |_| domain.clone()
                });
                let curate = on_curate.reform({
                    let domain = domain.clone();
                    move |_| domain.clone()
                });

                html! {
                    <div key={domain.clone()} class={if exceeded { "group-item time-limit-reached" } else { "group-item" }}>
                        <h3>{&domain}</h3>
                        <p>{format!("Open tabs: {}", group.tabs.len())}</p>
                        <p>{format!("Total time: {}", format_time(group.total_time))}</p>
                        if exceeded {
                            <Alert r#type={AlertType::Warning} title={"Time limit reached"} inline={true}>
                                {format!(
                                    "You've spent {} minutes on {}. Consider taking a break!",
                                    minutes, domain
                                )}
                            </Alert>
                            <Button onclick={close} disabled={is_busy} variant={ButtonVariant::Danger}>
                                {"Close All Tabs"}
                            </Button>
                        }
                        <Button onclick={curate} disabled={is_busy} variant={ButtonVariant::Secondary}>
                            {"Curate"}
                        </Button>
                    </div>
                }
            })}
        </div>
    }
}

fn view_inactive(usage: &UsageData, on_close_tab: Callback<String>) -> Html {
    if usage.tab_data.is_empty() {
        return html! {
            <p class="empty-state">{"No inactive tabs detected."}</p>
        };
    }

    let now = js_sys::Date::now();
    let idle = inactive_tabs(&usage.tab_data, now);
    if idle.is_empty() {
        return html! {
            <p class="empty-state">{"All tabs are active!"}</p>
        };
    }

    html! {
        <div class="flex-column-gap">
            {for idle.into_iter().map(|(tab_id, record, idle_for)| {
                let close = on_close_tab.reform({
                    let tab_id = tab_id.clone();
                    move |_| tab_id.clone()
                });
                html! {
                    <div key={tab_id} class="inactive-tab">
                        <div>
                            <p>{record.domain.clone()}</p>
                            <p>{format!("Inactive for: {}", format_time(idle_for))}</p>
                        </div>
                        <Button onclick={close} size={ButtonSize::Small}>
                            {"Close"}
                        </Button>
                    </div>
                }
            })}
        </div>
    }
}

fn view_curate(usage: &UsageData, curate_domain: &UseStateHandle<Option<String>>) -> Html {
    match (**curate_domain).clone() {
        Some(domain) => html! {
            <CurationWorkflow domain={domain} />
        },
        None => {
            let mut domains: Vec<String> = usage.tab_groups.keys().cloned().collect();
            domains.sort();

            html! {
                <div class="flex-column-gap">
                    <p class="empty-state">{"Pick a domain to curate its tabs."}</p>
                    {for domains.into_iter().map(|domain| {
                        let curate_domain = curate_domain.clone();
                        let pick = {
                            let domain = domain.clone();
                            Callback::from(move |_| curate_domain.set(Some(domain.clone())))
                        };
                        html! {
                            <Button onclick={pick} variant={ButtonVariant::Secondary} block={true}>
                                {domain}
                            </Button>
                        }
                    })}
                </div>
            }
        }
    }
}

fn view_settings(settings: &Settings, on_changed: Callback<Settings>) -> Html {
    html! {
        <div class="flex-column-gap">
            <LimitEditor settings={settings.clone()} on_changed={on_changed.clone()} />
            <SiteListEditor
                title="Productive Sites"
                productive={true}
                settings={settings.clone()}
                on_changed={on_changed.clone()}
            />
            <SiteListEditor
                title="Social Sites"
                productive={false}
                settings={settings.clone()}
                on_changed={on_changed}
            />
        </div>
    }
}

#[derive(Properties, PartialEq)]
struct LimitEditorProps {
    settings: Settings,
    on_changed: Callback<Settings>,
}

#[function_component(LimitEditor)]
fn limit_editor(props: &LimitEditorProps) -> Html {
    let domain_input = use_state(String::new);
    let minutes_input = use_state(String::new);

    let on_domain_input = {
        let domain_input = domain_input.clone();
        Callback::from(move |e: InputEvent| {
            if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
                domain_input.set(input.value());
            }
        })
    };
    let on_minutes_input = {
        let minutes_input = minutes_input.clone();
        Callback::from(move |e: InputEvent| {
            if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
                minutes_input.set(input.value());
            }
        })
    };

    let on_add = {
        let domain_input = domain_input.clone();
        let minutes_input = minutes_input.clone();
        let settings = props.settings.clone();
        let on_changed = props.on_changed.clone();

        Callback::from(move |_| {
            let domain = domain_input.trim().to_string();
            let minutes = minutes_input.trim().parse::<u32>().unwrap_or(0);
            if domain.is_empty() || minutes == 0 {
                return;
            }
            let mut updated = settings.clone();
            updated.set_limit(&domain, minutes);
            on_changed.emit(updated);
            domain_input.set(String::new());
            minutes_input.set(String::new());
        })
    };

    let mut limits: Vec<(String, u32)> = props
        .settings
        .site_limits
        .iter()
        .map(|(domain, minutes)| (domain.clone(), *minutes))
        .collect();
    limits.sort();

    html! {
        <div class="stats-container">
            <h2 class="stats-title">{"Time Limits"}</h2>
            {for limits.into_iter().map(|(domain, minutes)| {
                let remove = {
                    let settings = props.settings.clone();
                    let on_changed = props.on_changed.clone();
                    let domain = domain.clone();
                    Callback::from(move |_| {
                        let mut updated = settings.clone();
                        updated.remove_limit(&domain);
                        on_changed.emit(updated);
                    })
                };
                html! {
                    <div key={domain.clone()} class="limit-item">
                        <span>{format!("{}: {} minutes", domain, minutes)}</span>
                        <Button onclick={remove} variant={ButtonVariant::Danger} size={ButtonSize::Small}>
                            {"Remove"}
                        </Button>
                    </div>
                }
            })}
            <div class="limit-form">
                <input
                    type="text"
                    placeholder="Domain (e.g. www.youtube.com)"
                    value={(*domain_input).clone()}
                    oninput={on_domain_input}
                />
                <input
                    type="number"
                    placeholder="Minutes"
                    value={(*minutes_input).clone()}
                    oninput={on_minutes_input}
                />
                <Button onclick={on_add}>{"Add Limit"}</Button>
            </div>
        </div>
    }
}

#[derive(Properties, PartialEq)]
struct SiteListEditorProps {
    title: AttrValue,
    productive: bool,
    settings: Settings,
    on_changed: Callback<Settings>,
}

#[function_component(SiteListEditor)]
fn site_list_editor(props: &SiteListEditorProps) -> Html {
    let site_input = use_state(String::new);

    let on_input = {
        let site_input = site_input.clone();
        Callback::from(move |e: InputEvent| {
            if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
                site_input.set(input.value());
            }
        })
    };

    let on_add = {
        let site_input = site_input.clone();
        let settings = props.settings.clone();
        let on_changed = props.on_changed.clone();
        let productive = props.productive;

        Callback::from(move |_| {
            let domain = site_input.trim().to_string();
            if domain.is_empty() {
                return;
            }
            let mut updated = settings.clone();
            let added = if productive {
                updated.add_productive(&domain)
            } else {
                updated.add_social(&domain)
            };
            if added {
                on_changed.emit(updated);
            }
            site_input.set(String::new());
        })
    };

    let sites = if props.productive {
        props.settings.productive_sites.clone()
    } else {
        props.settings.social_sites.clone()
    };

    html! {
        <div class="stats-container">
            <h2 class="stats-title">{props.title.clone()}</h2>
            {for sites.into_iter().map(|domain| {
                let remove = {
                    let settings = props.settings.clone();
                    let on_changed = props.on_changed.clone();
                    let productive = props.productive;
                    let domain = domain.clone();
                    Callback::from(move |_| {
                        let mut updated = settings.clone();
                        if productive {
                            updated.remove_productive(&domain);
                        } else {
                            updated.remove_social(&domain);
                        }
                        on_changed.emit(updated);
                    })
                };
                html! {
                    <div key={domain.clone()} class="site-list-item">
                        <span>{domain.clone()}</span>
                        <Button onclick={remove} variant={ButtonVariant::Danger} size={ButtonSize::Small}>
                            {"Remove"}
                        </Button>
                    </div>
                }
            })}
            <div class="limit-form">
                <input
                    type="text"
                    placeholder="Domain"
                    value={(*site_input).clone()}
                    oninput={on_input}
                />
                <Button onclick={on_add}>{"Add"}</Button>
            </div>
        </div>
    }
}

// Helper functions

async fn load_usage() -> Result<UsageData, String> {
    let tab_data_js = getStorage(storage::TAB_DATA_KEY)
        .await
        .map_err(|e| format!("Failed to get tab data: {:?}", e))?;
    let tab_groups_js = getStorage(storage::TAB_GROUPS_KEY)
        .await
        .map_err(|e| format!("Failed to get tab groups: {:?}", e))?;

    let tab_data = if tab_data_js.is_null() || tab_data_js.is_undefined() {
        HashMap::new()
    } else {
        serde_wasm_bindgen::from_value(tab_data_js)
            .map_err(|e| format!("Failed to parse tab data: {:?}", e))?
    };
    let tab_groups = if tab_groups_js.is_null() || tab_groups_js.is_undefined() {
        HashMap::new()
    } else {
        serde_wasm_bindgen::from_value(tab_groups_js)
            .map_err(|e| format!("Failed to parse tab groups: {:?}", e))?
    };

    Ok(UsageData { tab_data, tab_groups })
}

/// The background worker owns settings recovery; the popup just falls back
/// to defaults for display when nothing is stored yet.
async fn load_settings() -> Settings {
    match getStorage(storage::SETTINGS_KEY).await {
        Ok(value) if !value.is_null() && !value.is_undefined() => {
            serde_wasm_bindgen::from_value(value).unwrap_or_default()
        }
        _ => Settings::default(),
    }
}

async fn save_settings(settings: &Settings) -> Result<(), String> {
    let value = serde_wasm_bindgen::to_value(settings)
        .map_err(|e| format!("Failed to serialize settings: {:?}", e))?;
    setStorage(storage::SETTINGS_KEY, value)
        .await
        .map_err(|e| format!("Failed to save settings: {:?}", e))
}

async fn close_domain_tabs(domain: &str) -> Result<CloseTabsResponse, String> {
    let request = serde_wasm_bindgen::to_value(&PopupRequest::CloseTabs {
        domain: domain.to_string(),
    })
    .map_err(|e| format!("Failed to serialize request: {:?}", e))?;

    let response = sendMessage(request)
        .await
        .map_err(|e| format!("closeTabs message failed: {:?}", e))?;
    serde_wasm_bindgen::from_value(response)
        .map_err(|e| format!("Failed to parse response: {:?}", e))
}

async fn summarize_active_page() -> Result<String, String> {
    let content_js = getActivePageContent()
        .await
        .map_err(|e| format!("Failed to read page content: {:?}", e))?;
    let content = content_js
        .as_string()
        .ok_or_else(|| "Page content was not a string".to_string())?;

    let prompt = curation::summary_prompt(&content);
    let body_js = callGenerativeApi(&prompt)
        .await
        .map_err(|e| format!("Summary request failed: {:?}", e))?;
    let body = body_js
        .as_string()
        .ok_or_else(|| "API returned a non-string response".to_string())?;

    Ok(curation::parse_summary(&body))
}

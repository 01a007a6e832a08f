/// Background worker: browser lifecycle events in, notifications and
/// storage flushes out.
///
/// The JS side (background.js) wires chrome.tabs/windows/runtime listeners
/// and a 10-second interval to the exported handlers below. All handlers
/// funnel into one `TabTracker` behind a thread-local `RefCell`: events and
/// the tick are two producers feeding the same serialized entry point,
/// never parallel writers. Storage writes are fire-and-forget; every flush
/// writes the full current state, so out-of-order completion is harmless.
use std::cell::RefCell;

use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

use crate::storage::{self, Settings};
use crate::tab_data::{CloseTabsResponse, PopupRequest, TabInfo};
use crate::tracker::{LimitNotice, TabTracker, TrackerConfig};

// Import JS bridge functions
#[wasm_bindgen(module = "/background.js")]
extern "C" {
    #[wasm_bindgen(catch)]
    async fn getStorage(key: &str) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn setStorage(key: &str, value: JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn queryAllTabs() -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn closeTabs(tab_ids: JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn createNotification(
        id: &str,
        title: &str,
        message: &str,
        tab_id: i32,
    ) -> Result<(), JsValue>;
}

thread_local! {
    static TRACKER: RefCell<Option<TabTracker>> = const { RefCell::new(None) };
}

fn with_tracker<R>(f: impl FnOnce(&mut TabTracker) -> R) -> Option<R> {
    TRACKER.with(|cell| cell.borrow_mut().as_mut().map(f))
}

/// Load settings, substituting and persisting defaults when the stored
/// value is absent or malformed.
async fn load_settings() -> Settings {
    let raw = match getStorage(storage::SETTINGS_KEY).await {
        Ok(value) => serde_wasm_bindgen::from_value::<serde_json::Value>(value)
            .ok()
            .filter(|value| !value.is_null()),
        Err(e) => {
            log::warn!("settings read failed: {:?}", e);
            None
        }
    };

    let (settings, substituted) = storage::recover_settings(raw);
    if substituted {
        match serde_wasm_bindgen::to_value(&settings) {
            Ok(value) => {
                if let Err(e) = setStorage(storage::SETTINGS_KEY, value).await {
                    log::warn!("default settings write failed: {:?}", e);
                }
            }
            Err(e) => log::warn!("default settings serialize failed: {:?}", e),
        }
    }
    settings
}

/// Flush the full ledger and aggregate state under their storage keys.
async fn flush() {
    let Some(snapshot) = with_tracker(|tracker| tracker.snapshot()) else {
        return;
    };

    match serde_wasm_bindgen::to_value(&snapshot.tab_data) {
        Ok(value) => {
            if let Err(e) = setStorage(storage::TAB_DATA_KEY, value).await {
                log::warn!("tabData flush failed: {:?}", e);
            }
        }
        Err(e) => log::warn!("tabData serialize failed: {:?}", e),
    }
    match serde_wasm_bindgen::to_value(&snapshot.tab_groups) {
        Ok(value) => {
            if let Err(e) = setStorage(storage::TAB_GROUPS_KEY, value).await {
                log::warn!("tabGroups flush failed: {:?}", e);
            }
        }
        Err(e) => log::warn!("tabGroups serialize failed: {:?}", e),
    }
}

async fn raise_notification(notice: LimitNotice) {
    let id = format!("limit-{}", notice.tab_id);
    let message = format!(
        "You've spent {} minutes on {}. Consider taking a break!",
        notice.minutes_spent, notice.domain
    );
    if let Err(e) = createNotification(&id, "Time Limit Reached", &message, notice.tab_id).await {
        log::warn!("notification failed for {}: {:?}", notice.domain, e);
    }
}

/// Start tracking: resolve settings into tracker policies, then enumerate
/// every open tab so pages from before the worker started are counted.
pub fn start() {
    spawn_local(async {
        let settings = load_settings().await;
        let config = TrackerConfig {
            limit_policy: settings.limit_policy,
            activation_scope: settings.activation_scope,
        };
        TRACKER.with(|cell| *cell.borrow_mut() = Some(TabTracker::new(config)));

        match queryAllTabs().await {
            Ok(value) => match serde_wasm_bindgen::from_value::<Vec<TabInfo>>(value) {
                Ok(tabs) => {
                    let now = js_sys::Date::now();
                    with_tracker(|tracker| {
                        for tab in &tabs {
                            tracker.observe(tab.id, &tab.url, tab.active, tab.window_id, now);
                        }
                    });
                }
                Err(e) => log::warn!("tab enumeration parse failed: {:?}", e),
            },
            Err(e) => log::warn!("tab enumeration failed: {:?}", e),
        }

        flush().await;
        let tracked = with_tracker(|tracker| tracker.tab_count()).unwrap_or(0);
        log::info!("tab tracking started with {} tabs", tracked);
    });
}

/// chrome.tabs.onActivated: flip the active tab, then check its domain
/// limit against freshly-loaded settings.
#[wasm_bindgen]
pub fn tab_activated(tab_id: i32, window_id: i32) {
    let now = js_sys::Date::now();
    let window = (window_id >= 0).then_some(window_id);
    with_tracker(|tracker| tracker.activate(tab_id, window, now));

    spawn_local(async move {
        let settings = load_settings().await;
        let notice = with_tracker(|tracker| {
            let domain = tracker.record(tab_id)?.domain.clone();
            let limit = *settings.site_limits.get(&domain)?;
            tracker.check_limit(tab_id, limit, js_sys::Date::now())
        })
        .flatten();

        if let Some(notice) = notice {
            raise_notification(notice).await;
        }
        flush().await;
    });
}

/// chrome.tabs.onUpdated: track the tab once its load completes.
#[wasm_bindgen]
pub fn tab_updated(tab_id: i32, status: String, tab: JsValue) {
    if status != "complete" {
        return;
    }
    let info: TabInfo = match serde_wasm_bindgen::from_value(tab) {
        Ok(info) => info,
        Err(e) => {
            log::warn!("tab update parse failed for {}: {:?}", tab_id, e);
            return;
        }
    };

    let now = js_sys::Date::now();
    let tracked =
        with_tracker(|tracker| tracker.observe(info.id, &info.url, info.active, info.window_id, now))
            .unwrap_or(false);
    if tracked {
        spawn_local(flush());
    }
}

/// chrome.tabs.onRemoved.
#[wasm_bindgen]
pub fn tab_removed(tab_id: i32) {
    with_tracker(|tracker| tracker.remove(tab_id));
    spawn_local(flush());
}

/// Window state changes sampled by the JS bridge (chrome.windows events).
#[wasm_bindgen]
pub fn window_state_changed(window_id: i32, state: String) {
    let minimized = state.contains("minimized");
    let now = js_sys::Date::now();
    with_tracker(|tracker| tracker.window_state_changed(window_id, minimized, now));
    if minimized {
        spawn_local(flush());
    }
}

/// The 10-second interval: settle accrual for active tabs and flush so
/// totals in storage are never more than one interval stale.
#[wasm_bindgen]
pub fn run_tick() {
    let now = js_sys::Date::now();
    with_tracker(|tracker| tracker.tick(now));

    spawn_local(async {
        if log::log_enabled!(log::Level::Debug) {
            let settings = load_settings().await;
            with_tracker(|tracker| {
                for (domain, limit) in &settings.site_limits {
                    if let Some(group) = tracker.group(domain) {
                        log::debug!(
                            "{}: {} minutes (limit {})",
                            domain,
                            (group.total_time / 60_000.0).floor(),
                            limit
                        );
                    }
                }
            });
        }
        flush().await;
    });
}

/// chrome.runtime.onMessage: currently only the popup's closeTabs request.
#[wasm_bindgen]
pub async fn handle_message(request: JsValue) -> JsValue {
    let request: PopupRequest = match serde_wasm_bindgen::from_value(request) {
        Ok(request) => request,
        Err(e) => {
            log::warn!("unrecognized popup message: {:?}", e);
            return JsValue::NULL;
        }
    };

    match request {
        PopupRequest::CloseTabs { domain } => {
            let ids = with_tracker(|tracker| tracker.tabs_for_domain(&domain)).unwrap_or_default();
            let count = ids.len();

            let response = if count == 0 {
                CloseTabsResponse { success: true, closed_count: 0 }
            } else {
                let ids_js = match serde_wasm_bindgen::to_value(&ids) {
                    Ok(value) => value,
                    Err(e) => {
                        log::warn!("closeTabs serialize failed: {:?}", e);
                        return JsValue::NULL;
                    }
                };
                match closeTabs(ids_js).await {
                    // onRemoved fires per closed tab and prunes the ledger
                    Ok(()) => CloseTabsResponse { success: true, closed_count: count },
                    Err(e) => {
                        log::warn!("closeTabs failed for {}: {:?}", domain, e);
                        CloseTabsResponse { success: false, closed_count: 0 }
                    }
                }
            };

            serde_wasm_bindgen::to_value(&response).unwrap_or(JsValue::NULL)
        }
    }
}

/// Data structures for Tab Warden
use serde::{Deserialize, Serialize};

/// Information about a browser tab, as delivered by the tabs API bridge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabInfo {
    pub id: i32,
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub window_id: Option<i32>,
}

/// Per-tab activity record; the authoritative source of per-tab timings.
///
/// All timestamps are epoch milliseconds (`Date.now()` on the JS side),
/// `total_active_time` is a millisecond accumulator. Field names serialize
/// camelCase to match the `tabData` storage layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabRecord {
    pub domain: String,
    pub url: String,
    pub start_time: f64,
    pub last_active_time: f64,
    pub total_active_time: f64,
    pub last_inactive_time: Option<f64>,
    pub is_active: bool,
    #[serde(default)]
    pub window_id: Option<i32>,
}

/// Derived per-domain aggregate over all tracked tabs sharing a domain.
///
/// `total_time` is a cache of the member-record sum, never independent
/// state; the tracker recomputes it after every mutation that touches
/// accrued time or membership.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainGroup {
    pub tabs: Vec<i32>,
    pub total_time: f64,
}

/// Which tabs get deactivated when one tab activates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActivationScope {
    /// Activation is tracked across all browser windows: activating a tab
    /// anywhere marks every other tracked tab inactive.
    #[default]
    Global,
    /// Activation only deactivates tabs in the activated tab's window.
    PerWindow,
}

/// What the limit notification compares against the configured minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LimitPolicy {
    /// The activated tab's own accumulated time.
    #[default]
    ActivatedTab,
    /// The domain aggregate across all of the domain's open tabs.
    DomainTotal,
}

/// Request sent from the popup to the background worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum PopupRequest {
    CloseTabs { domain: String },
}

/// Background worker reply to a `closeTabs` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseTabsResponse {
    pub success: bool,
    pub closed_count: usize,
}

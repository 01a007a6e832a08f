/// Tab activity tracking core: ledger, domain aggregation, limit checks.
///
/// A single `TabTracker` owns every mutable map; browser event handlers and
/// the periodic tick both feed the same serialized entry points, so no
/// locking is needed beyond the `RefCell` the background worker wraps this
/// in. All operations take an explicit `now` (epoch ms) supplied by the
/// caller, which keeps the accrual logic pure and testable.
use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::domain::extract_domain;
use crate::storage::StorageSnapshot;
use crate::tab_data::{ActivationScope, DomainGroup, LimitPolicy, TabRecord};

/// Minimum time between limit notifications for one domain.
pub const NOTIFICATION_COOLDOWN_MS: f64 = 5.0 * 60.0 * 1000.0;

/// Tracking policies, resolved from stored settings at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrackerConfig {
    pub limit_policy: LimitPolicy,
    pub activation_scope: ActivationScope,
}

/// A limit breach the caller should surface as a notification.
#[derive(Debug, Clone, PartialEq)]
pub struct LimitNotice {
    pub tab_id: i32,
    pub domain: String,
    pub minutes_spent: u32,
    pub limit_minutes: u32,
}

pub struct TabTracker {
    config: TrackerConfig,
    tab_data: HashMap<i32, TabRecord>,
    tab_groups: HashMap<String, DomainGroup>,
    // domain → last notification time; process memory only, never flushed
    notifications_sent: HashMap<String, f64>,
}

impl TabTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            tab_data: HashMap::new(),
            tab_groups: HashMap::new(),
            notifications_sent: HashMap::new(),
        }
    }

    pub fn config(&self) -> TrackerConfig {
        self.config
    }

    /// Idempotent upsert from a tab activation, update-complete, or startup
    /// enumeration. Returns false when the URL has a non-web scheme and the
    /// tab is not tracked.
    ///
    /// Existing records settle accrual before any state changes; a tab that
    /// navigated to a different domain moves between groups so membership
    /// always follows `TabRecord.domain`.
    pub fn observe(
        &mut self,
        tab_id: i32,
        url: &str,
        is_active: bool,
        window_id: Option<i32>,
        now: f64,
    ) -> bool {
        let Some(domain) = extract_domain(url) else {
            return false;
        };

        let previous_domain = match self.tab_data.entry(tab_id) {
            Entry::Vacant(slot) => {
                slot.insert(TabRecord {
                    domain: domain.clone(),
                    url: url.to_string(),
                    start_time: now,
                    last_active_time: now,
                    total_active_time: 0.0,
                    last_inactive_time: if is_active { None } else { Some(now) },
                    is_active,
                    window_id,
                });
                None
            }
            Entry::Occupied(slot) => {
                let record = slot.into_mut();
                if record.is_active {
                    record.total_active_time += now - record.last_active_time;
                }
                record.last_active_time = now;
                record.is_active = is_active;
                record.last_inactive_time = if is_active { None } else { Some(now) };
                if window_id.is_some() {
                    record.window_id = window_id;
                }
                record.url = url.to_string();
                if record.domain != domain {
                    Some(std::mem::replace(&mut record.domain, domain.clone()))
                } else {
                    None
                }
            }
        };

        if let Some(old_domain) = previous_domain {
            self.detach_from_group(tab_id, &old_domain);
        }
        self.attach_to_group(tab_id, &domain);
        self.recompute_total(&domain);
        true
    }

    /// Mark exactly `tab_id` active and every other tab in the activation
    /// scope inactive, settling accrual for all previously-active tabs
    /// first so elapsed time is never double-counted or lost.
    ///
    /// Activating an untracked id (a tab the ledger skipped) still
    /// deactivates the rest: the user did switch away from whatever was
    /// active. Under `PerWindow` scope an activation with no known window
    /// falls back to deactivating everything.
    pub fn activate(&mut self, tab_id: i32, window_id: Option<i32>, now: f64) {
        if let Some(record) = self.tab_data.get_mut(&tab_id) {
            if window_id.is_some() {
                record.window_id = window_id;
            }
        }
        let scope_window = match self.config.activation_scope {
            ActivationScope::Global => None,
            ActivationScope::PerWindow => window_id
                .or_else(|| self.tab_data.get(&tab_id).and_then(|record| record.window_id)),
        };

        let mut touched = Vec::new();
        for (id, record) in self.tab_data.iter_mut() {
            if let Some(window) = scope_window {
                if record.window_id != Some(window) && *id != tab_id {
                    continue;
                }
            }
            if record.is_active {
                record.total_active_time += now - record.last_active_time;
                record.last_active_time = now;
                touched.push(record.domain.clone());
            }
            record.is_active = false;
            // keep an earlier inactivity start if one exists
            if record.last_inactive_time.is_none() {
                record.last_inactive_time = Some(now);
            }
        }

        if let Some(record) = self.tab_data.get_mut(&tab_id) {
            record.is_active = true;
            record.last_active_time = now;
            record.last_inactive_time = None;
        }

        self.recompute_touched(touched);
    }

    /// Settle accrual for every active record so totals are never more than
    /// one tick interval stale. Inactive records missing an inactivity
    /// start get one backfilled.
    pub fn tick(&mut self, now: f64) {
        let mut touched = Vec::new();
        for record in self.tab_data.values_mut() {
            if record.is_active {
                record.total_active_time += now - record.last_active_time;
                record.last_active_time = now;
                touched.push(record.domain.clone());
            } else if record.last_inactive_time.is_none() {
                record.last_inactive_time = Some(now);
            }
        }
        self.recompute_touched(touched);
    }

    /// Drop a closed tab and its group membership. Removing an untracked
    /// tab is a no-op. The last member's removal deletes the whole group so
    /// stale totals cannot resurface.
    pub fn remove(&mut self, tab_id: i32) {
        let Some(record) = self.tab_data.remove(&tab_id) else {
            return;
        };
        self.detach_from_group(tab_id, &record.domain);
    }

    /// A minimized window backgrounds all of its tabs: settle and
    /// deactivate them. Records with no known window are treated as
    /// belonging to the minimized one. Restoring a window re-activates
    /// nothing; the next activation event settles what is foregrounded.
    pub fn window_state_changed(&mut self, window_id: i32, minimized: bool, now: f64) {
        if !minimized {
            return;
        }
        let mut touched = Vec::new();
        for record in self.tab_data.values_mut() {
            let in_window = record.window_id.is_none_or(|id| id == window_id);
            if !in_window || !record.is_active {
                continue;
            }
            record.total_active_time += now - record.last_active_time;
            record.last_active_time = now;
            record.is_active = false;
            if record.last_inactive_time.is_none() {
                record.last_inactive_time = Some(now);
            }
            touched.push(record.domain.clone());
        }
        self.recompute_touched(touched);
    }

    /// Check the activated tab against its domain's configured limit.
    ///
    /// Fires at most once per domain per cooldown window; repeated
    /// activations inside the window stay silent even as time keeps
    /// accruing. The compared quantity follows the configured
    /// `LimitPolicy`.
    pub fn check_limit(&mut self, tab_id: i32, limit_minutes: u32, now: f64) -> Option<LimitNotice> {
        let record = self.tab_data.get(&tab_id)?;
        let domain = record.domain.clone();
        let tracked_ms = match self.config.limit_policy {
            LimitPolicy::ActivatedTab => record.total_active_time,
            LimitPolicy::DomainTotal => self
                .tab_groups
                .get(&domain)
                .map_or(record.total_active_time, |group| group.total_time),
        };

        let minutes_spent = tracked_ms / 60_000.0;
        if minutes_spent < f64::from(limit_minutes) {
            return None;
        }
        if let Some(last) = self.notifications_sent.get(&domain) {
            if now - last <= NOTIFICATION_COOLDOWN_MS {
                return None;
            }
        }

        self.notifications_sent.insert(domain.clone(), now);
        Some(LimitNotice {
            tab_id,
            domain,
            minutes_spent: minutes_spent.floor() as u32,
            limit_minutes,
        })
    }

    /// Ids of every tracked tab whose domain matches exactly.
    pub fn tabs_for_domain(&self, domain: &str) -> Vec<i32> {
        let mut ids: Vec<i32> = self
            .tab_data
            .iter()
            .filter(|(_, record)| record.domain == domain)
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn record(&self, tab_id: i32) -> Option<&TabRecord> {
        self.tab_data.get(&tab_id)
    }

    pub fn group(&self, domain: &str) -> Option<&DomainGroup> {
        self.tab_groups.get(domain)
    }

    pub fn tab_count(&self) -> usize {
        self.tab_data.len()
    }

    /// Clone of the full persisted state for a storage flush, with tab ids
    /// rendered as the string keys the storage layout uses.
    pub fn snapshot(&self) -> StorageSnapshot {
        StorageSnapshot {
            tab_data: self
                .tab_data
                .iter()
                .map(|(id, record)| (id.to_string(), record.clone()))
                .collect(),
            tab_groups: self.tab_groups.clone(),
        }
    }

    fn attach_to_group(&mut self, tab_id: i32, domain: &str) {
        let group = self.tab_groups.entry(domain.to_string()).or_default();
        if !group.tabs.contains(&tab_id) {
            group.tabs.push(tab_id);
        }
    }

    fn detach_from_group(&mut self, tab_id: i32, domain: &str) {
        let now_empty = match self.tab_groups.get_mut(domain) {
            Some(group) => {
                group.tabs.retain(|id| *id != tab_id);
                group.tabs.is_empty()
            }
            None => return,
        };
        if now_empty {
            self.tab_groups.remove(domain);
        } else {
            self.recompute_total(domain);
        }
    }

    fn recompute_total(&mut self, domain: &str) {
        let total: f64 = self
            .tab_data
            .values()
            .filter(|record| record.domain == domain)
            .map(|record| record.total_active_time)
            .sum();
        if let Some(group) = self.tab_groups.get_mut(domain) {
            group.total_time = total;
        }
    }

    fn recompute_touched(&mut self, mut domains: Vec<String>) {
        domains.sort_unstable();
        domains.dedup();
        for domain in domains {
            self.recompute_total(&domain);
        }
    }
}

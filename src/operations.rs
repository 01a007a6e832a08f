/// Popup view helpers: group ordering, inactive-tab detection, formatting

use crate::storage::Settings;
use crate::tab_data::{DomainGroup, TabRecord};
use std::collections::HashMap;

/// Tabs idle at least this long show up in the inactive list.
pub const INACTIVE_THRESHOLD_MS: f64 = 5.0 * 60.0 * 1000.0;

/// True when a domain's tracked time has reached its configured limit.
///
/// The popup banner always compares the domain aggregate, which is why it
/// can disagree with a per-tab limit notification.
pub fn limit_exceeded(settings: &Settings, domain: &str, total_time: f64) -> bool {
    match settings.site_limits.get(domain) {
        Some(limit) => total_time / 60_000.0 >= f64::from(*limit),
        None => false,
    }
}

/// Order groups for display: exceeded limits first, then by total time
/// descending, ties by domain name.
pub fn sort_groups_for_display(
    groups: &HashMap<String, DomainGroup>,
    settings: &Settings,
) -> Vec<(String, DomainGroup)> {
    let mut entries: Vec<(String, DomainGroup)> = groups
        .iter()
        .map(|(domain, group)| (domain.clone(), group.clone()))
        .collect();

    entries.sort_by(|a, b| {
        let a_exceeded = limit_exceeded(settings, &a.0, a.1.total_time);
        let b_exceeded = limit_exceeded(settings, &b.0, b.1.total_time);
        b_exceeded
            .cmp(&a_exceeded)
            .then_with(|| b.1.total_time.total_cmp(&a.1.total_time))
            .then_with(|| a.0.cmp(&b.0))
    });

    entries
}

/// Tabs inactive past the threshold, most stale first, with how long each
/// has been idle. Keys are the id strings of the stored `tabData` map.
pub fn inactive_tabs(
    tab_data: &HashMap<String, TabRecord>,
    now: f64,
) -> Vec<(String, TabRecord, f64)> {
    let mut idle: Vec<(String, TabRecord, f64)> = tab_data
        .iter()
        .filter_map(|(id, record)| {
            let since = record.last_inactive_time?;
            let idle_for = now - since;
            (idle_for > INACTIVE_THRESHOLD_MS).then(|| (id.clone(), record.clone(), idle_for))
        })
        .collect();

    idle.sort_by(|a, b| b.2.total_cmp(&a.2).then_with(|| a.0.cmp(&b.0)));
    idle
}

/// "2h 5m" / "12m" formatting used across the popup.
pub fn format_time(ms: f64) -> String {
    let minutes = (ms / 60_000.0).floor() as i64;
    let hours = minutes / 60;
    if hours > 0 {
        format!("{}h {}m", hours, minutes % 60)
    } else {
        format!("{}m", minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(domain: &str, total: f64, last_inactive: Option<f64>) -> TabRecord {
        TabRecord {
            domain: domain.to_string(),
            url: format!("https://{}/", domain),
            start_time: 0.0,
            last_active_time: 0.0,
            total_active_time: total,
            last_inactive_time: last_inactive,
            is_active: last_inactive.is_none(),
            window_id: None,
        }
    }

    fn group(tabs: Vec<i32>, total_time: f64) -> DomainGroup {
        DomainGroup { tabs, total_time }
    }

    #[test]
    fn test_limit_exceeded() {
        let settings = Settings::default(); // www.youtube.com: 2 minutes
        assert!(limit_exceeded(&settings, "www.youtube.com", 125_000.0));
        assert!(limit_exceeded(&settings, "www.youtube.com", 120_000.0));
        assert!(!limit_exceeded(&settings, "www.youtube.com", 119_999.0));
        assert!(!limit_exceeded(&settings, "unlimited.example", 999_999_999.0));
    }

    #[test]
    fn test_sort_groups_exceeded_first_then_time() {
        let settings = Settings::default();
        let mut groups = HashMap::new();
        groups.insert("big.example".to_string(), group(vec![1], 600_000.0));
        groups.insert("www.youtube.com".to_string(), group(vec![2], 180_000.0)); // over 2m limit
        groups.insert("small.example".to_string(), group(vec![3], 60_000.0));

        let sorted = sort_groups_for_display(&groups, &settings);
        let order: Vec<&str> = sorted.iter().map(|(d, _)| d.as_str()).collect();
        assert_eq!(order, vec!["www.youtube.com", "big.example", "small.example"]);
    }

    #[test]
    fn test_sort_groups_ties_by_domain() {
        let settings = Settings::default();
        let mut groups = HashMap::new();
        groups.insert("b.example".to_string(), group(vec![1], 60_000.0));
        groups.insert("a.example".to_string(), group(vec![2], 60_000.0));

        let sorted = sort_groups_for_display(&groups, &settings);
        assert_eq!(sorted[0].0, "a.example");
        assert_eq!(sorted[1].0, "b.example");
    }

    #[test]
    fn test_inactive_tabs_threshold() {
        let now = 1_000_000.0;
        let mut tab_data = HashMap::new();
        tab_data.insert("1".to_string(), record("a.example", 0.0, Some(now - 301_000.0))); // just past 5m
        tab_data.insert("2".to_string(), record("b.example", 0.0, Some(now - 299_000.0))); // not yet
        tab_data.insert("3".to_string(), record("c.example", 0.0, None)); // active
        tab_data.insert("4".to_string(), record("d.example", 0.0, Some(now - 900_000.0))); // stalest

        let idle = inactive_tabs(&tab_data, now);
        let ids: Vec<&str> = idle.iter().map(|(id, _, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["4", "1"]);
        assert_eq!(idle[0].2, 900_000.0);
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0.0), "0m");
        assert_eq!(format_time(59_999.0), "0m");
        assert_eq!(format_time(60_000.0), "1m");
        assert_eq!(format_time(125_000.0), "2m");
        assert_eq!(format_time(3_600_000.0), "1h 0m");
        assert_eq!(format_time(7_560_000.0), "2h 6m");
    }
}

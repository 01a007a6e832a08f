/// Storage layout and settings for chrome.storage.local

use crate::curation::LearningPlan;
use crate::tab_data::{ActivationScope, DomainGroup, LimitPolicy, TabRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

pub const SETTINGS_KEY: &str = "settings";
pub const TAB_DATA_KEY: &str = "tabData";
pub const TAB_GROUPS_KEY: &str = "tabGroups";
pub const LEARNING_PLANS_KEY: &str = "learningPlans";

/// User-configured site limits, category lists, and tracking policies.
///
/// Serialized camelCase under the `settings` storage key. Every field has a
/// default so partially-written settings from older versions still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub site_limits: HashMap<String, u32>,
    pub productive_sites: Vec<String>,
    pub social_sites: Vec<String>,
    pub limit_policy: LimitPolicy,
    pub activation_scope: ActivationScope,
}

impl Default for Settings {
    fn default() -> Self {
        let mut site_limits = HashMap::new();
        site_limits.insert("www.youtube.com".to_string(), 2);
        site_limits.insert("facebook.com".to_string(), 30);
        site_limits.insert("twitter.com".to_string(), 20);

        Settings {
            site_limits,
            productive_sites: vec![
                "github.com".to_string(),
                "stackoverflow.com".to_string(),
                "docs.google.com".to_string(),
                "linkedin.com".to_string(),
            ],
            social_sites: vec![
                "facebook.com".to_string(),
                "twitter.com".to_string(),
                "instagram.com".to_string(),
                "www.youtube.com".to_string(),
            ],
            limit_policy: LimitPolicy::default(),
            activation_scope: ActivationScope::default(),
        }
    }
}

/// How a domain counts toward the productivity split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteCategory {
    Productive,
    Social,
    Other,
}

impl Settings {
    pub fn set_limit(&mut self, domain: &str, minutes: u32) {
        self.site_limits.insert(domain.to_string(), minutes);
    }

    pub fn remove_limit(&mut self, domain: &str) -> bool {
        self.site_limits.remove(domain).is_some()
    }

    /// Add to the productive list; duplicates are not added twice.
    pub fn add_productive(&mut self, domain: &str) -> bool {
        add_unique(&mut self.productive_sites, domain)
    }

    pub fn remove_productive(&mut self, domain: &str) -> bool {
        remove_site(&mut self.productive_sites, domain)
    }

    pub fn add_social(&mut self, domain: &str) -> bool {
        add_unique(&mut self.social_sites, domain)
    }

    pub fn remove_social(&mut self, domain: &str) -> bool {
        remove_site(&mut self.social_sites, domain)
    }

    /// Productive wins when a domain appears in both lists.
    pub fn category_of(&self, domain: &str) -> SiteCategory {
        if self.productive_sites.iter().any(|site| site == domain) {
            SiteCategory::Productive
        } else if self.social_sites.iter().any(|site| site == domain) {
            SiteCategory::Social
        } else {
            SiteCategory::Other
        }
    }
}

fn add_unique(sites: &mut Vec<String>, domain: &str) -> bool {
    if sites.iter().any(|site| site == domain) {
        return false;
    }
    sites.push(domain.to_string());
    true
}

fn remove_site(sites: &mut Vec<String>, domain: &str) -> bool {
    let before = sites.len();
    sites.retain(|site| site != domain);
    sites.len() < before
}

/// Rebuild settings from whatever the store returned. The second value is
/// true when defaults were substituted and should be persisted back.
pub fn recover_settings(raw: Option<serde_json::Value>) -> (Settings, bool) {
    match raw {
        Some(value) => match serde_json::from_value(value) {
            Ok(settings) => (settings, false),
            Err(_) => (Settings::default(), true),
        },
        None => (Settings::default(), true),
    }
}

/// Full tracker state as flushed to storage: `tabData` keyed by tab id
/// rendered as a string (the key-value store's object-key shape),
/// `tabGroups` keyed by domain. Each map is written under its own key.
#[derive(Debug, Clone, Default)]
pub struct StorageSnapshot {
    pub tab_data: HashMap<String, TabRecord>,
    pub tab_groups: HashMap<String, DomainGroup>,
}

/// Saved learning plans under the `learningPlans` key, id → plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LearningPlanBook(pub HashMap<String, LearningPlan>);

impl LearningPlanBook {
    pub fn add(&mut self, plan: LearningPlan) -> String {
        let id = Uuid::new_v4().to_string();
        self.0.insert(id.clone(), plan);
        id
    }

    pub fn remove(&mut self, id: &str) -> bool {
        self.0.remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_match_reference() {
        let settings = Settings::default();
        assert_eq!(settings.site_limits.get("www.youtube.com"), Some(&2));
        assert_eq!(settings.site_limits.get("facebook.com"), Some(&30));
        assert_eq!(settings.site_limits.get("twitter.com"), Some(&20));
        assert!(settings.productive_sites.contains(&"github.com".to_string()));
        assert!(settings.social_sites.contains(&"instagram.com".to_string()));
        assert_eq!(settings.limit_policy, LimitPolicy::ActivatedTab);
        assert_eq!(settings.activation_scope, ActivationScope::Global);
    }

    #[test]
    fn test_recover_settings_absent() {
        let (settings, substituted) = recover_settings(None);
        assert!(substituted);
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_recover_settings_malformed() {
        let raw = serde_json::json!({ "siteLimits": "definitely not a map" });
        let (settings, substituted) = recover_settings(Some(raw));
        assert!(substituted);
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_recover_settings_partial_fills_defaults() {
        // settings written before the policy fields existed
        let raw = serde_json::json!({
            "siteLimits": { "reddit.com": 15 },
            "productiveSites": [],
            "socialSites": ["reddit.com"]
        });
        let (settings, substituted) = recover_settings(Some(raw));
        assert!(!substituted);
        assert_eq!(settings.site_limits.get("reddit.com"), Some(&15));
        assert_eq!(settings.limit_policy, LimitPolicy::ActivatedTab);
        assert_eq!(settings.activation_scope, ActivationScope::Global);
    }

    #[test]
    fn test_settings_wire_format() {
        let json = serde_json::to_value(Settings::default()).unwrap();
        assert!(json["siteLimits"].is_object());
        assert!(json["productiveSites"].is_array());
        assert!(json["socialSites"].is_array());
        assert_eq!(json["limitPolicy"], "activatedTab");
        assert_eq!(json["activationScope"], "global");
    }

    #[test]
    fn test_limit_crud() {
        let mut settings = Settings::default();
        settings.set_limit("reddit.com", 10);
        assert_eq!(settings.site_limits.get("reddit.com"), Some(&10));
        settings.set_limit("reddit.com", 25);
        assert_eq!(settings.site_limits.get("reddit.com"), Some(&25));
        assert!(settings.remove_limit("reddit.com"));
        assert!(!settings.remove_limit("reddit.com"));
    }

    #[test]
    fn test_site_list_crud_rejects_duplicates() {
        let mut settings = Settings::default();
        assert!(settings.add_productive("news.ycombinator.com"));
        assert!(!settings.add_productive("news.ycombinator.com"));
        assert!(settings.remove_productive("news.ycombinator.com"));
        assert!(!settings.remove_productive("news.ycombinator.com"));

        assert!(settings.add_social("tiktok.com"));
        assert!(!settings.add_social("tiktok.com"));
        assert!(settings.remove_social("tiktok.com"));
    }

    #[test]
    fn test_category_of() {
        let settings = Settings::default();
        assert_eq!(settings.category_of("github.com"), SiteCategory::Productive);
        assert_eq!(settings.category_of("facebook.com"), SiteCategory::Social);
        assert_eq!(settings.category_of("example.com"), SiteCategory::Other);
    }

    #[test]
    fn test_learning_plan_book() {
        let mut book = LearningPlanBook::default();
        assert!(book.is_empty());

        let id = book.add(LearningPlan::default());
        assert_eq!(book.len(), 1);
        assert!(book.0.contains_key(&id));

        let other = book.add(LearningPlan::default());
        assert_ne!(id, other, "every saved plan gets its own id");

        assert!(book.remove(&id));
        assert!(!book.remove(&id));
        assert_eq!(book.len(), 1);
    }

    #[test]
    fn test_learning_plan_book_round_trip() {
        let mut book = LearningPlanBook::default();
        book.add(LearningPlan::default());
        let json = serde_json::to_string(&book).unwrap();
        let back: LearningPlanBook = serde_json::from_str(&json).unwrap();
        assert_eq!(back, book);
    }
}

/// Usage analytics: productivity split, tab timeline, achievements

use crate::storage::{Settings, SiteCategory};
use crate::tab_data::TabRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Minutes of tracked time per site category.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProductivitySplit {
    pub productive_minutes: f64,
    pub social_minutes: f64,
    pub other_minutes: f64,
}

impl ProductivitySplit {
    pub fn total_minutes(&self) -> f64 {
        self.productive_minutes + self.social_minutes + self.other_minutes
    }
}

pub fn productivity_split(
    tab_data: &HashMap<String, TabRecord>,
    settings: &Settings,
) -> ProductivitySplit {
    let mut split = ProductivitySplit::default();
    for record in tab_data.values() {
        let minutes = record.total_active_time / 60_000.0;
        match settings.category_of(&record.domain) {
            SiteCategory::Productive => split.productive_minutes += minutes,
            SiteCategory::Social => split.social_minutes += minutes,
            SiteCategory::Other => split.other_minutes += minutes,
        }
    }
    split
}

/// Records ordered newest-opened first, for the lifecycle timeline.
pub fn timeline(tab_data: &HashMap<String, TabRecord>) -> Vec<(String, TabRecord)> {
    let mut entries: Vec<(String, TabRecord)> = tab_data
        .iter()
        .map(|(id, record)| (id.clone(), record.clone()))
        .collect();
    entries.sort_by(|a, b| b.1.start_time.total_cmp(&a.1.start_time).then_with(|| a.0.cmp(&b.0)));
    entries
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub title: String,
    pub description: String,
    pub points: u32,
    pub progress: u32,
    pub target: u32,
}

impl Achievement {
    fn new(title: &str, description: &str, points: u32, target: u32) -> Self {
        Achievement {
            title: title.to_string(),
            description: description.to_string(),
            points,
            progress: 0,
            target,
        }
    }

    pub fn completed(&self) -> bool {
        self.progress >= self.target
    }
}

pub fn default_achievements() -> Vec<Achievement> {
    vec![
        Achievement::new("Tab Manager", "Close 10 inactive tabs", 50, 10),
        Achievement::new("Focused Browser", "Keep under 5 tabs open for 1 hour", 100, 60),
        Achievement::new(
            "Productive Day",
            "Spend more time on productive sites than social media",
            200,
            1,
        ),
    ]
}

/// Points earned: an achievement pays out once progress reaches target.
pub fn achievement_points(achievements: &[Achievement]) -> u32 {
    achievements
        .iter()
        .filter(|achievement| achievement.completed())
        .map(|achievement| achievement.points)
        .sum()
}

/// Bump the Productive Day achievement when productive time leads social.
pub fn score_productive_day(achievements: &mut [Achievement], split: ProductivitySplit) {
    if split.productive_minutes <= split.social_minutes {
        return;
    }
    if let Some(achievement) = achievements
        .iter_mut()
        .find(|achievement| achievement.title == "Productive Day")
    {
        achievement.progress = (achievement.progress + 1).min(achievement.target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIN: f64 = 60_000.0;

    fn record(domain: &str, total_ms: f64, start: f64) -> TabRecord {
        TabRecord {
            domain: domain.to_string(),
            url: format!("https://{}/", domain),
            start_time: start,
            last_active_time: start,
            total_active_time: total_ms,
            last_inactive_time: None,
            is_active: false,
            window_id: None,
        }
    }

    #[test]
    fn test_productivity_split() {
        let settings = Settings::default();
        let mut tab_data = HashMap::new();
        tab_data.insert("1".to_string(), record("github.com", 10.0 * MIN, 0.0));
        tab_data.insert("2".to_string(), record("stackoverflow.com", 5.0 * MIN, 0.0));
        tab_data.insert("3".to_string(), record("facebook.com", 4.0 * MIN, 0.0));
        tab_data.insert("4".to_string(), record("example.com", 2.0 * MIN, 0.0));

        let split = productivity_split(&tab_data, &settings);
        assert_eq!(split.productive_minutes, 15.0);
        assert_eq!(split.social_minutes, 4.0);
        assert_eq!(split.other_minutes, 2.0);
        assert_eq!(split.total_minutes(), 21.0);
    }

    #[test]
    fn test_timeline_newest_first() {
        let mut tab_data = HashMap::new();
        tab_data.insert("1".to_string(), record("a.example", 0.0, 1000.0));
        tab_data.insert("2".to_string(), record("b.example", 0.0, 3000.0));
        tab_data.insert("3".to_string(), record("c.example", 0.0, 2000.0));

        let timeline = timeline(&tab_data);
        let ids: Vec<&str> = timeline.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["2", "3", "1"]);
    }

    #[test]
    fn test_achievement_points_only_completed() {
        let mut achievements = default_achievements();
        assert_eq!(achievement_points(&achievements), 0);

        achievements[0].progress = 10;
        assert_eq!(achievement_points(&achievements), 50);

        achievements[2].progress = 1;
        assert_eq!(achievement_points(&achievements), 250);
    }

    #[test]
    fn test_score_productive_day() {
        let mut achievements = default_achievements();
        let productive = ProductivitySplit {
            productive_minutes: 30.0,
            social_minutes: 10.0,
            other_minutes: 0.0,
        };
        score_productive_day(&mut achievements, productive);
        assert!(achievements[2].completed());
        assert_eq!(achievement_points(&achievements), 200);

        // progress saturates at target
        score_productive_day(&mut achievements, productive);
        assert_eq!(achievements[2].progress, 1);
    }

    #[test]
    fn test_score_productive_day_requires_lead() {
        let mut achievements = default_achievements();
        let tied = ProductivitySplit {
            productive_minutes: 10.0,
            social_minutes: 10.0,
            other_minutes: 0.0,
        };
        score_productive_day(&mut achievements, tied);
        assert!(!achievements[2].completed());
    }
}

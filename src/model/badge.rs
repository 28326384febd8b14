use serde::{Deserialize, Serialize};

/// Scoring period a badge was awarded for.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum BadgeType {
    Day,
    Month,
}

/// A gamification award for one scored day or month.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
    pub badge_type: BadgeType,
    /// Performance rank, 1 is best
    pub level: u32,
    pub points_awarded: i64,
    /// Awarded day or month, epoch milliseconds
    pub date: i64,
    pub state: String,
    pub used_badge_levels: Option<Vec<BadgeLevel>>,
}

/// Score band that maps to one badge level.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeLevel {
    pub level: u32,
    pub minimum_value: f64,
    pub maximum_value: f64,
}
